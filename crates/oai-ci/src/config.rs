use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ci_common::NetworkFunction;
use ci_common::paths::DEFAULT_ARCHIVES_DIR;
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

use crate::error::{CiError, CiResult};

pub(crate) const DEFAULT_STARTUP_WAIT_SECS: u64 = 3;
pub(crate) const DEFAULT_LOG_WAIT_SECS: u64 = 1;

/// Network / container topology of the sanity-check deployment.
///
/// Every field defaults to the stock CI topology, so an empty file is valid.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Where captured logs land.
    pub archives_dir: PathBuf,
    /// Where generated cfg scripts / env lists are written before use.
    pub work_dir: PathBuf,
    pub networks: NetworksConfig,
    pub spgwc: FunctionConfig,
    pub spgwu: FunctionConfig,
    /// Wait between `start` and capturing the configuration log.
    pub startup_wait_secs: u64,
    /// Wait before capturing the run log.
    pub log_wait_secs: u64,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            archives_dir: PathBuf::from(DEFAULT_ARCHIVES_DIR),
            work_dir: PathBuf::from("."),
            networks: NetworksConfig::default(),
            spgwc: FunctionConfig::spgwc(),
            spgwu: FunctionConfig::spgwu(),
            startup_wait_secs: DEFAULT_STARTUP_WAIT_SECS,
            log_wait_secs: DEFAULT_LOG_WAIT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    pub subnet: Ipv4Net,
}

impl NetworkConfig {
    /// `192.168.<third_octet>.0/24`.
    fn ci(name: &str, third_octet: u8) -> Self {
        let base = Ipv4Addr::new(192, 168, third_octet, 0);
        Self {
            name: name.to_string(),
            subnet: Ipv4Net::new(base, 24).unwrap_or_else(|_| Ipv4Net::from(base)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworksConfig {
    pub s11: NetworkConfig,
    pub sx: NetworkConfig,
    pub s1u: NetworkConfig,
}

impl Default for NetworksConfig {
    fn default() -> Self {
        Self {
            s11: NetworkConfig::ci("ci-s11", 28),
            sx: NetworkConfig::ci("ci-sx", 29),
            s1u: NetworkConfig::ci("ci-s1u", 30),
        }
    }
}

impl NetworksConfig {
    pub fn all(&self) -> [&NetworkConfig; 3] {
        [&self.s11, &self.sx, &self.s1u]
    }

    pub fn names(&self) -> [&str; 3] {
        [&self.sx.name, &self.s11.name, &self.s1u.name]
    }

    fn find(&self, name: &str) -> Option<&NetworkConfig> {
        self.all().into_iter().find(|n| n.name == name)
    }
}

/// One gateway container. A section given in YAML replaces the stock values
/// wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionConfig {
    /// Image repository, without the tag.
    pub image: String,
    pub container: String,
    /// Network the container is created on.
    pub network: String,
    pub ip: Ipv4Addr,
    /// Address on the SX network, attached after creation.
    pub sx_ip: Ipv4Addr,
    /// Working directory of legacy (non-entrypoint) images.
    pub workdir: String,
    pub binary: String,
    pub config_file: String,
}

impl FunctionConfig {
    pub fn spgwc() -> Self {
        Self {
            image: "oai-spgwc".to_string(),
            container: "ci-oai-spgwc".to_string(),
            network: "ci-s11".to_string(),
            ip: Ipv4Addr::new(192, 168, 28, 2),
            sx_ip: Ipv4Addr::new(192, 168, 29, 2),
            workdir: "/openair-spgwc".to_string(),
            binary: "oai_spgwc".to_string(),
            config_file: "./etc/spgw_c.conf".to_string(),
        }
    }

    pub fn spgwu() -> Self {
        Self {
            image: "oai-spgwu-tiny".to_string(),
            container: "ci-oai-spgwu".to_string(),
            network: "ci-s1u".to_string(),
            ip: Ipv4Addr::new(192, 168, 30, 3),
            sx_ip: Ipv4Addr::new(192, 168, 29, 3),
            workdir: "/openair-spgwu-tiny".to_string(),
            binary: "oai_spgwu".to_string(),
            config_file: "./etc/spgw_u.conf".to_string(),
        }
    }

    pub fn image_ref(&self, tag: &str) -> String {
        format!("{}:{tag}", self.image)
    }
}

impl DeployConfig {
    pub fn function(&self, nf: NetworkFunction) -> &FunctionConfig {
        match nf {
            NetworkFunction::SpgwC => &self.spgwc,
            NetworkFunction::SpgwU => &self.spgwu,
        }
    }

    pub fn startup_wait(&self) -> Duration {
        Duration::from_secs(self.startup_wait_secs)
    }

    pub fn log_wait(&self) -> Duration {
        Duration::from_secs(self.log_wait_secs)
    }

    /// Resolve relative paths against `config_dir` (the directory containing the YAML file).
    fn resolve_relative_paths(&mut self, config_dir: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = config_dir.join(&*p);
            }
        };
        resolve(&mut self.archives_dir);
        resolve(&mut self.work_dir);
    }

    fn validate(&self) -> CiResult<()> {
        for network in self.networks.all() {
            if network.subnet.addr() != network.subnet.network() {
                return Err(CiError::Config(format!(
                    "network {}: subnet {} has host bits set",
                    network.name, network.subnet
                )));
            }
        }
        for nf in NetworkFunction::ALL {
            let function = self.function(nf);
            let primary = self.networks.find(&function.network).ok_or_else(|| {
                CiError::Config(format!(
                    "{nf}: unknown network {}",
                    function.network
                ))
            })?;
            if !primary.subnet.contains(&function.ip) {
                return Err(CiError::Config(format!(
                    "{nf}: {} is outside {} ({})",
                    function.ip, primary.name, primary.subnet
                )));
            }
            if !self.networks.sx.subnet.contains(&function.sx_ip) {
                return Err(CiError::Config(format!(
                    "{nf}: sx_ip {} is outside {} ({})",
                    function.sx_ip, self.networks.sx.name, self.networks.sx.subnet
                )));
            }
        }
        Ok(())
    }
}

/// Load and validate a deployment config from a YAML file.
///
/// Relative paths in the config are resolved against the config file's parent directory.
pub async fn load(path: &Path) -> CiResult<DeployConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CiError::Config(format!("read {}: {e}", path.display())))?;
    let mut config: DeployConfig = if content.trim().is_empty() {
        DeployConfig::default()
    } else {
        serde_yaml_ng::from_str(&content)
            .map_err(|e| CiError::Config(format!("parse {}: {e}", path.display())))?
    };
    if let Some(config_dir) = path.parent() {
        config.resolve_relative_paths(config_dir);
    }
    config.validate()?;
    Ok(config)
}

/// The config at `path`, or the stock topology when no file is given.
pub async fn load_or_default(path: Option<&Path>) -> CiResult<DeployConfig> {
    match path {
        Some(path) => load(path).await,
        None => Ok(DeployConfig::default()),
    }
}
