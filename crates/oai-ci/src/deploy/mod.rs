//! Sanity-check deployment: three CI networks, one SPGW-C and one SPGW-U
//! container, started and stopped one action per invocation.

mod strategy;

use std::path::{Path, PathBuf};

use ci_common::scan::split_at_options_parsed;
use ci_common::{ArchivePaths, NetworkFunction};
use clap::{Args, ValueEnum};
use container_cli::{ContainerCli, ContainerError, InspectDocument, RunSpec};
use tracing::info;

pub use strategy::{LaunchStrategy, needs_multi_spgwu_fallback};

use crate::config::{self, DeployConfig, FunctionConfig};
use crate::config_gen::{GatewayConfig, OutputFormat, SpgwcConfig, SpgwuConfig};
use crate::error::{CiError, CiResult};

/// Interface names inside the containers follow attachment order.
const PRIMARY_INTERFACE: &str = "eth0";
const SX_INTERFACE: &str = "eth1";

/// Tag of the user-plane build that pairs with a multi-SGW-U control plane.
const MULTI_SPGWU_TAG: &str = "multi-spgwu";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    #[value(name = "CreateNetworks")]
    CreateNetworks,
    #[value(name = "RemoveNetworks")]
    RemoveNetworks,
    #[value(name = "DeploySPGWC")]
    DeploySpgwc,
    #[value(name = "DeploySPGWU")]
    DeploySpgwu,
    #[value(name = "StartSPGWC")]
    StartSpgwc,
    #[value(name = "StartSPGWU")]
    StartSpgwu,
    #[value(name = "StopSPGWC")]
    StopSpgwc,
    #[value(name = "StopSPGWU")]
    StopSpgwu,
    #[value(name = "RetrieveLogsSPGWC")]
    RetrieveLogsSpgwc,
    #[value(name = "RetrieveLogsSPGWU")]
    RetrieveLogsSpgwu,
    #[value(name = "RemoveAllContainers")]
    RemoveAllContainers,
}

impl Action {
    /// The function a per-function action targets; those actions need `--tag`.
    pub fn network_function(self) -> Option<NetworkFunction> {
        match self {
            Self::DeploySpgwc | Self::StartSpgwc | Self::StopSpgwc | Self::RetrieveLogsSpgwc => {
                Some(NetworkFunction::SpgwC)
            }
            Self::DeploySpgwu | Self::StartSpgwu | Self::StopSpgwu | Self::RetrieveLogsSpgwu => {
                Some(NetworkFunction::SpgwU)
            }
            Self::CreateNetworks | Self::RemoveNetworks | Self::RemoveAllContainers => None,
        }
    }
}

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Step to perform.
    #[arg(long, value_enum, ignore_case = true)]
    pub action: Action,
    /// Image tag; required by every per-function action.
    #[arg(long)]
    pub tag: Option<String>,
    /// YAML file overriding the deployment topology.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl DeployArgs {
    pub fn validate(&self) -> Result<(), String> {
        let Some(nf) = self.action.network_function() else {
            return Ok(());
        };
        match self.tag.as_deref() {
            Some(tag) if !tag.is_empty() => Ok(()),
            _ => Err(format!(
                "Missing OAI-{} image tag (--tag)",
                nf.label().replace('-', "")
            )),
        }
    }
}

/// Inspect failures abort the whole action with the dedicated exit status.
fn inspect_failure(e: ContainerError) -> CiError {
    match e {
        ContainerError::NoRuntime => CiError::NoRuntime,
        other => CiError::Inspect(other.to_string()),
    }
}

pub struct Deployment {
    cli: ContainerCli,
    config: DeployConfig,
    archives: ArchivePaths,
}

impl Deployment {
    pub fn new(cli: ContainerCli, config: DeployConfig) -> Self {
        let archives = ArchivePaths::new(config.archives_dir.clone());
        Self {
            cli,
            config,
            archives,
        }
    }

    pub async fn run(&self, action: Action, tag: &str) -> CiResult<()> {
        match action {
            Action::CreateNetworks => self.create_networks().await,
            Action::RemoveNetworks => {
                self.remove_networks().await;
                Ok(())
            }
            Action::DeploySpgwc => self.deploy(NetworkFunction::SpgwC, tag).await,
            Action::DeploySpgwu => {
                let tag = self.resolve_spgwu_tag(tag).await?;
                self.deploy(NetworkFunction::SpgwU, &tag).await
            }
            Action::StartSpgwc => self.start(NetworkFunction::SpgwC, tag).await,
            Action::StartSpgwu => self.start(NetworkFunction::SpgwU, tag).await,
            Action::StopSpgwc => self.stop(NetworkFunction::SpgwC, tag).await,
            Action::StopSpgwu => self.stop(NetworkFunction::SpgwU, tag).await,
            Action::RetrieveLogsSpgwc => self.retrieve_logs(NetworkFunction::SpgwC, tag).await,
            Action::RetrieveLogsSpgwu => self.retrieve_logs(NetworkFunction::SpgwU, tag).await,
            Action::RemoveAllContainers => {
                self.remove_all_containers().await;
                Ok(())
            }
        }
    }

    // -- networks -----------------------------------------------------------

    pub async fn create_networks(&self) -> CiResult<()> {
        let names = self.config.networks.names();
        let existing = self.cli.network_names().await?;
        if existing.iter().any(|n| names.contains(&n.as_str())) {
            info!("CI networks already present, removing them first");
            self.remove_networks().await;
        }
        for network in self.config.networks.all() {
            let subnet = network.subnet.to_string();
            self.cli.network_create(&network.name, &subnet).await?;
        }
        Ok(())
    }

    pub async fn remove_networks(&self) {
        self.cli.network_remove(&self.config.networks.names()).await;
    }

    pub async fn remove_all_containers(&self) {
        self.cli
            .remove_containers(&[
                self.config.spgwc.container.as_str(),
                self.config.spgwu.container.as_str(),
            ])
            .await;
    }

    // -- per-function actions ---------------------------------------------

    async fn inspect_image(&self, image: &str) -> CiResult<InspectDocument> {
        self.cli.image_inspect(image).await.map_err(inspect_failure)
    }

    async fn strategy(&self, nf: NetworkFunction, tag: &str) -> CiResult<LaunchStrategy> {
        let image = self.config.function(nf).image_ref(tag);
        let strategy = LaunchStrategy::detect(&self.inspect_image(&image).await?);
        info!(image = %image, ?strategy, "launch strategy");
        Ok(strategy)
    }

    /// Tag to deploy for SPGW-U given the running SPGW-C's capabilities.
    async fn resolve_spgwu_tag(&self, tag: &str) -> CiResult<String> {
        let spgwc = self
            .cli
            .inspect(&self.config.spgwc.container)
            .await
            .map_err(inspect_failure)?;
        if !spgwc.label_is_true(strategy::MULTI_SGWU_LABEL) {
            return Ok(tag.to_string());
        }
        let spgwu = self
            .inspect_image(&self.config.spgwu.image_ref(tag))
            .await?;
        if needs_multi_spgwu_fallback(&spgwc, &spgwu) {
            info!("SPGW-C supports multiple SGW-U instances, switching SPGW-U to {MULTI_SPGWU_TAG}");
            return Ok(MULTI_SPGWU_TAG.to_string());
        }
        Ok(tag.to_string())
    }

    fn gateway_config(&self, nf: NetworkFunction) -> GatewayConfig {
        match nf {
            NetworkFunction::SpgwC => {
                let mut config = SpgwcConfig::new(PRIMARY_INTERFACE, SX_INTERFACE);
                config.from_docker_file = true;
                GatewayConfig::Spgwc(config)
            }
            NetworkFunction::SpgwU => {
                let mut config =
                    SpgwuConfig::new(PRIMARY_INTERFACE, SX_INTERFACE, self.config.spgwc.sx_ip);
                config.from_docker_file = true;
                GatewayConfig::Spgwu(config)
            }
        }
    }

    fn run_spec(&self, function: &FunctionConfig, tag: &str) -> RunSpec {
        RunSpec {
            name: function.container.clone(),
            image: function.image_ref(tag),
            network: Some(function.network.clone()),
            ip: Some(function.ip.to_string()),
            privileged: true,
            ..RunSpec::default()
        }
    }

    async fn connect_sx(&self, function: &FunctionConfig) -> CiResult<()> {
        self.cli
            .network_connect(
                &self.config.networks.sx.name,
                &function.container,
                &function.sx_ip.to_string(),
            )
            .await?;
        Ok(())
    }

    pub async fn deploy(&self, nf: NetworkFunction, tag: &str) -> CiResult<()> {
        let function = self.config.function(nf);
        let gateway = self.gateway_config(nf);
        tokio::fs::create_dir_all(self.archives.dir()).await?;

        match self.strategy(nf, tag).await? {
            LaunchStrategy::Entrypoint => {
                let env_file = gateway
                    .write(OutputFormat::EnvList, &self.config.work_dir)
                    .await?;
                let spec = RunSpec {
                    env_file: Some(env_file),
                    ..self.run_spec(function, tag)
                };
                self.cli.create(&spec).await?;
                self.connect_sx(function).await?;
                self.cli.start(&function.container).await?;

                tokio::time::sleep(self.config.startup_wait()).await;
                let logs = self.cli.logs(&function.container).await?;
                let (config_part, _) = split_at_options_parsed(&logs);
                write_archive(&self.archives.config_log(nf), &config_part).await?;
            }
            LaunchStrategy::Legacy => {
                let spec = RunSpec {
                    detach: true,
                    command: vec![
                        "/bin/bash".to_string(),
                        "-c".to_string(),
                        "sleep infinity".to_string(),
                    ],
                    ..self.run_spec(function, tag)
                };
                self.cli.run_container(&spec).await?;
                self.connect_sx(function).await?;

                let script = gateway
                    .write(OutputFormat::Script, &self.config.work_dir)
                    .await?;
                self.cli
                    .copy(
                        &script.display().to_string(),
                        &format!("{}:{}", function.container, function.workdir),
                    )
                    .await?;
                let script_name = OutputFormat::Script.file_name(nf);
                let configure = format!(
                    "cd {} && chmod 777 {script_name} && ./{script_name}",
                    function.workdir
                );
                self.cli
                    .run_to_file(
                        &[
                            "exec",
                            function.container.as_str(),
                            "/bin/bash",
                            "-c",
                            configure.as_str(),
                        ],
                        &self.archives.config_log(nf),
                        true,
                    )
                    .await?;
            }
        }
        info!("{nf} deployed as {}", function.container);
        Ok(())
    }

    pub async fn start(&self, nf: NetworkFunction, tag: &str) -> CiResult<()> {
        let function = self.config.function(nf);
        match self.strategy(nf, tag).await? {
            LaunchStrategy::Entrypoint => info!("there is an entrypoint -- no need"),
            LaunchStrategy::Legacy => {
                let daemon = format!(
                    "nohup ./bin/{} -o -c {} > {}_check_run.log 2>&1",
                    function.binary,
                    function.config_file,
                    nf.slug()
                );
                self.cli
                    .exec_bash_detached(&function.container, &daemon)
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn stop(&self, nf: NetworkFunction, tag: &str) -> CiResult<()> {
        let function = self.config.function(nf);
        match self.strategy(nf, tag).await? {
            LaunchStrategy::Entrypoint => info!("there is an entrypoint -- no need"),
            LaunchStrategy::Legacy => {
                self.cli
                    .exec_bash(&function.container, &format!("killall {}", function.binary))
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn retrieve_logs(&self, nf: NetworkFunction, tag: &str) -> CiResult<()> {
        let function = self.config.function(nf);
        let strategy = self.strategy(nf, tag).await?;
        tokio::fs::create_dir_all(self.archives.dir()).await?;
        match strategy {
            LaunchStrategy::Entrypoint => {
                tokio::time::sleep(self.config.log_wait()).await;
                let logs = self.cli.logs(&function.container).await?;
                let (_, run_part) = split_at_options_parsed(&logs);
                write_archive(&self.archives.check_run_log(nf), &run_part).await?;
            }
            LaunchStrategy::Legacy => {
                let source = format!(
                    "{}:{}/{}_check_run.log",
                    function.container,
                    function.workdir,
                    nf.slug()
                );
                self.cli
                    .copy(&source, &self.archives.dir().display().to_string())
                    .await?;
            }
        }
        Ok(())
    }
}

async fn write_archive(path: &Path, content: &str) -> CiResult<()> {
    tokio::fs::write(path, content).await?;
    info!(path = %path.display(), "archived");
    Ok(())
}

pub async fn run_deploy(args: DeployArgs) -> CiResult<()> {
    let config = config::load_or_default(args.config.as_deref()).await?;
    let tag = args.tag.unwrap_or_default();
    Deployment::new(ContainerCli::docker(), config)
        .run(args.action, &tag)
        .await
}
