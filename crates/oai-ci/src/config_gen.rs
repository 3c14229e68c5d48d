//! Gateway configuration generator.
//!
//! Renders either a bash "configurer" that substitutes `@KEY@` tokens in the
//! gateway's shipped templates, or an env list consumed by the image's
//! entrypoint script.

use std::fmt::Write as _;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use ci_common::NetworkFunction;
use clap::{Args, ValueEnum};
use ipnet::Ipv4Net;
use tracing::info;

use crate::error::{CiError, CiResult};

pub(crate) const DEFAULT_APN1: &str = "apn1.oai.svc.cluster.local";
pub(crate) const DEFAULT_APN2: &str = "apn2.oai.svc.cluster.local";
pub(crate) const DEFAULT_DNS1: &str = "192.168.18.129";
pub(crate) const DEFAULT_DNS2: &str = "8.8.4.4";
const DEFAULT_UE_NETWORK: &str = "12.1.1.0/24";
const DEFAULT_UE_POOL1: &str = "12.1.1.2 - 12.1.1.254";
const DEFAULT_UE_POOL2: &str = "192.168.21.2 - 192.168.21.254";

const SED_LOOP: &str = "  egrep -lRZ \"$K\" $PREFIX | xargs -0 -l sed -i -e \"s|$K|${CONF[$K]}|g\"\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    #[value(name = "SPGW-C")]
    SpgwC,
    #[value(name = "SPGW-U")]
    SpgwU,
}

impl From<Kind> for NetworkFunction {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::SpgwC => NetworkFunction::SpgwC,
            Kind::SpgwU => NetworkFunction::SpgwU,
        }
    }
}

#[derive(Args, Debug)]
pub struct GenerateConfigArgs {
    /// Which gateway half to configure.
    #[arg(long, value_enum, ignore_case = true)]
    pub kind: Kind,
    /// SPGW-C S11 interface name.
    #[arg(long)]
    pub s11c: Option<String>,
    /// SPGW-C SX interface name.
    #[arg(long)]
    pub sxc: Option<String>,
    /// SPGW-U SX interface name.
    #[arg(long)]
    pub sxu: Option<String>,
    /// SPGW-U S1-U interface name.
    #[arg(long)]
    pub s1u: Option<String>,
    /// SPGW-U SGi interface name (defaults to the S1-U interface).
    #[arg(long)]
    pub sgi: Option<String>,
    /// SX address of the SPGW-C the user plane associates with.
    #[arg(long, alias = "sxc_ip_addr")]
    pub sxc_ip_addr: Option<Ipv4Addr>,
    /// Access point name.
    #[arg(long, default_value = DEFAULT_APN1)]
    pub apn: String,
    #[arg(long, alias = "dns1_ip", default_value = DEFAULT_DNS1)]
    pub dns1_ip: IpAddr,
    #[arg(long, alias = "dns2_ip", default_value = DEFAULT_DNS2)]
    pub dns2_ip: IpAddr,
    /// UE address pool in CIDR notation, e.g. 12.1.1.0/24.
    #[arg(long, alias = "network_ue_ip")]
    pub network_ue_ip: Option<Ipv4Net>,
    /// `yes` or `no`.
    #[arg(long, alias = "network_ue_nat_option", default_value = "no")]
    pub network_ue_nat_option: String,
    /// `yes` (any case) enables the push protocol.
    #[arg(long, alias = "push_protocol_option", default_value = "no")]
    pub push_protocol_option: String,
    /// Paths inside the image instead of a host install.
    #[arg(long, alias = "from_docker_file")]
    pub from_docker_file: bool,
    /// Write an env list for the entrypoint script instead of a bash configurer.
    #[arg(long, alias = "env_for_entrypoint")]
    pub env_for_entrypoint: bool,
    /// Directory the generated file is written to.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
}

impl GenerateConfigArgs {
    /// Checks flag combinations clap cannot express; the message is shown with usage.
    pub fn validate(&self) -> Result<(), String> {
        let missing = |value: &Option<String>, what: &str| match value.as_deref() {
            Some(v) if !v.is_empty() => Ok(()),
            _ => Err(format!("missing {what}")),
        };
        match self.kind {
            Kind::SpgwC => {
                missing(&self.s11c, "S11 Interface Name on SPGW-C container (--s11c)")?;
                missing(&self.sxc, "SX Interface Name on SPGW-C container (--sxc)")?;
            }
            Kind::SpgwU => {
                missing(&self.sxu, "SX Interface Name on SPGW-U container (--sxu)")?;
                missing(&self.s1u, "S1-U Interface Name on SPGW-U container (--s1u)")?;
                if self.sxc_ip_addr.is_none() {
                    return Err("missing SPGW-C SX IP address (--sxc-ip-addr)".to_string());
                }
            }
        }
        Ok(())
    }

    fn into_config(self) -> CiResult<GatewayConfig> {
        let config = match self.kind {
            Kind::SpgwC => {
                let mut config = SpgwcConfig::new(
                    self.s11c.unwrap_or_default(),
                    self.sxc.unwrap_or_default(),
                );
                config.apn1 = self.apn;
                config.dns1 = self.dns1_ip;
                config.dns2 = self.dns2_ip;
                config.push_protocol = parse_yes(&self.push_protocol_option);
                config.from_docker_file = self.from_docker_file;
                if let Some(network) = self.network_ue_ip {
                    config.ue_pool1_range = ue_pool_range(network)?;
                }
                GatewayConfig::Spgwc(config)
            }
            Kind::SpgwU => {
                let s1u = self.s1u.unwrap_or_default();
                let sxc_ip = self
                    .sxc_ip_addr
                    .ok_or_else(|| CiError::Config("missing --sxc-ip-addr".to_string()))?;
                let mut config =
                    SpgwuConfig::new(s1u, self.sxu.unwrap_or_default(), sxc_ip);
                if let Some(sgi) = self.sgi {
                    config.sgi_interface = sgi;
                }
                if let Some(network) = self.network_ue_ip {
                    ue_pool_range(network)?;
                    config.ue_network = Some(network);
                }
                config.nat = parse_yes(&self.network_ue_nat_option);
                config.from_docker_file = self.from_docker_file;
                GatewayConfig::Spgwu(config)
            }
        };
        Ok(config)
    }
}

fn parse_yes(value: &str) -> bool {
    value.eq_ignore_ascii_case("yes")
}

/// Usable UE range of `network`: network address + 2 up to the broadcast address.
pub fn ue_pool_range(network: Ipv4Net) -> CiResult<String> {
    if network.addr() != network.network() {
        return Err(CiError::Config(format!(
            "UE network {network} has host bits set"
        )));
    }
    if network.prefix_len() > 30 {
        return Err(CiError::Config(format!(
            "UE network {network} is too small for an address pool"
        )));
    }
    let first = Ipv4Addr::from(u32::from(network.network()) + 2);
    Ok(format!("{first} - {}", network.broadcast()))
}

/// Control-plane settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpgwcConfig {
    pub s11_interface: String,
    pub sx_interface: String,
    pub apn1: String,
    pub apn2: String,
    pub dns1: IpAddr,
    pub dns2: IpAddr,
    pub ue_pool1_range: String,
    pub ue_pool2_range: String,
    pub push_protocol: bool,
    pub from_docker_file: bool,
}

impl SpgwcConfig {
    pub fn new(s11_interface: impl Into<String>, sx_interface: impl Into<String>) -> Self {
        Self {
            s11_interface: s11_interface.into(),
            sx_interface: sx_interface.into(),
            apn1: DEFAULT_APN1.to_string(),
            apn2: DEFAULT_APN2.to_string(),
            dns1: IpAddr::V4(Ipv4Addr::new(192, 168, 18, 129)),
            dns2: IpAddr::V4(Ipv4Addr::new(8, 8, 4, 4)),
            ue_pool1_range: DEFAULT_UE_POOL1.to_string(),
            ue_pool2_range: DEFAULT_UE_POOL2.to_string(),
            push_protocol: false,
            from_docker_file: false,
        }
    }

    fn push_protocol_value(&self) -> &'static str {
        if self.push_protocol { "yes" } else { "false" }
    }

    pub fn render_script(&self) -> String {
        let mut out = String::new();
        let (home, prefix) = install_dirs(NetworkFunction::SpgwC, self.from_docker_file);
        let _ = write!(
            out,
            "#!/bin/bash\n\ncd {home}\n\nPREFIX='{prefix}'\n\n\
             MY_APN='{}'\nMY_PRIMARY_DNS='{}'\nMY_SECONDARY_DNS='{}'\n\n",
            self.apn1, self.dns1, self.dns2
        );
        if !self.from_docker_file {
            out.push_str("mkdir -p $PREFIX\ncp etc/spgw_c.conf  $PREFIX\n\n");
        }
        let entries = [
            ("PID_DIRECTORY", "'/var/run'".to_string()),
            ("SGW_INTERFACE_NAME_FOR_S11", quote(&self.s11_interface)),
            ("PGW_INTERFACE_NAME_FOR_SX", quote(&self.sx_interface)),
            ("SGW_IP_FOR_S5_S8_CP", "127.0.0.11/8".to_string()),
            ("PGW_IP_FOR_S5_S8_CP", "127.0.0.12/8".to_string()),
            ("DEFAULT_DNS_IPV4_ADDRESS", "$MY_PRIMARY_DNS".to_string()),
            ("DEFAULT_DNS_SEC_IPV4_ADDRESS", "$MY_SECONDARY_DNS".to_string()),
            ("DEFAULT_APN", "$MY_APN".to_string()),
            ("UE_IP_ADDRESS_POOL", quote(&self.ue_pool1_range)),
            ("PUSH_PROTOCOL_OPTION", quote(self.push_protocol_value())),
        ];
        render_substitutions(&mut out, &entries);
        out
    }

    pub fn render_env_list(&self) -> String {
        let mut out =
            String::from("# Environment Variables used by the OAI-SPGW-C Entrypoint Script\n");
        let entries = [
            ("SGW_INTERFACE_NAME_FOR_S11", self.s11_interface.clone()),
            ("PGW_INTERFACE_NAME_FOR_SX", self.sx_interface.clone()),
            ("DEFAULT_DNS_IPV4_ADDRESS", self.dns1.to_string()),
            ("DEFAULT_DNS_SEC_IPV4_ADDRESS", self.dns2.to_string()),
            ("PUSH_PROTOCOL_OPTION", self.push_protocol_value().to_string()),
            ("APN_NI_1", self.apn1.clone()),
            ("APN_NI_2", self.apn2.clone()),
            ("DEFAULT_APN_NI_1", self.apn1.clone()),
            ("UE_IP_ADDRESS_POOL_1", self.ue_pool1_range.clone()),
            ("UE_IP_ADDRESS_POOL_2", self.ue_pool2_range.clone()),
        ];
        for (key, value) in entries {
            let _ = writeln!(out, "{key}={value}");
        }
        out.push_str("MCC=208\nMNC=99\nMNC03=099\nTAC=1\nGW_ID=1\nREALM=openairinterface.org\n");
        out
    }
}

/// User-plane settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpgwuConfig {
    pub s1u_interface: String,
    pub sx_interface: String,
    pub sgi_interface: String,
    pub spgwc_sx_ip: Ipv4Addr,
    /// `None` keeps the stock 12.1.1.0/24 pool.
    pub ue_network: Option<Ipv4Net>,
    pub nat: bool,
    pub from_docker_file: bool,
}

impl SpgwuConfig {
    /// The SGi interface starts out as the S1-U one.
    pub fn new(
        s1u_interface: impl Into<String>,
        sx_interface: impl Into<String>,
        spgwc_sx_ip: Ipv4Addr,
    ) -> Self {
        let s1u_interface = s1u_interface.into();
        Self {
            sgi_interface: s1u_interface.clone(),
            s1u_interface,
            sx_interface: sx_interface.into(),
            spgwc_sx_ip,
            ue_network: None,
            nat: false,
            from_docker_file: false,
        }
    }

    fn ue_network_value(&self) -> String {
        self.ue_network
            .map_or_else(|| DEFAULT_UE_NETWORK.to_string(), |n| n.to_string())
    }

    fn nat_value(&self) -> &'static str {
        if self.nat { "yes" } else { "no" }
    }

    pub fn render_script(&self) -> String {
        let mut out = String::new();
        let (home, prefix) = install_dirs(NetworkFunction::SpgwU, self.from_docker_file);
        let _ = write!(out, "#!/bin/bash\n\ncd {home}\n\nPREFIX='{prefix}'\n\n");
        if !self.from_docker_file {
            out.push_str("mkdir -p $PREFIX\ncp etc/spgw_u.conf  $PREFIX\n\n");
        }
        let entries = [
            ("PID_DIRECTORY", "'/var/run'".to_string()),
            ("SGW_INTERFACE_NAME_FOR_S1U_S12_S4_UP", quote(&self.s1u_interface)),
            ("SGW_INTERFACE_NAME_FOR_SX", quote(&self.sx_interface)),
            ("PGW_INTERFACE_NAME_FOR_SGI", quote(&self.sgi_interface)),
            ("NETWORK_UE_IP", quote(&self.ue_network_value())),
            ("NETWORK_UE_NAT_OPTION", quote(self.nat_value())),
            ("SPGWC0_IP_ADDRESS", quote(&self.spgwc_sx_ip.to_string())),
        ];
        render_substitutions(&mut out, &entries);
        out
    }

    pub fn render_env_list(&self) -> String {
        let mut out = String::from(
            "# Environment Variables used by the OAI-SPGW-U-TINY Entrypoint Script\n",
        );
        let entries = [
            ("PID_DIRECTORY", "/var/run".to_string()),
            ("SGW_INTERFACE_NAME_FOR_S1U_S12_S4_UP", self.s1u_interface.clone()),
            ("SGW_INTERFACE_NAME_FOR_SX", self.sx_interface.clone()),
            ("PGW_INTERFACE_NAME_FOR_SGI", self.sgi_interface.clone()),
            ("NETWORK_UE_IP", self.ue_network_value()),
            ("NETWORK_UE_NAT_OPTION", self.nat_value().to_string()),
            ("SPGWC0_IP_ADDRESS", self.spgwc_sx_ip.to_string()),
        ];
        for (key, value) in entries {
            let _ = writeln!(out, "{key}={value}");
        }
        out.push_str("GW_ID=1\nMCC=208\nMNC=99\nMNC03=099\nREALM=openairinterface.org\n");
        out
    }
}

fn install_dirs(nf: NetworkFunction, from_docker_file: bool) -> (&'static str, &'static str) {
    match (nf, from_docker_file) {
        (NetworkFunction::SpgwC, true) => ("/openair-spgwc", "/openair-spgwc/etc"),
        (NetworkFunction::SpgwU, true) => ("/openair-spgwu-tiny", "/openair-spgwu-tiny/etc"),
        (_, false) => ("/home", "/usr/local/etc/oai"),
    }
}

fn quote(value: &str) -> String {
    format!("'{value}'")
}

fn render_substitutions(out: &mut String, entries: &[(&str, String)]) {
    out.push_str("declare -A CONF\n\n");
    for (key, value) in entries {
        let _ = writeln!(out, "CONF[@{key}@]={value}");
    }
    out.push_str("\nfor K in \"${!CONF[@]}\"; do \n");
    out.push_str(SED_LOOP);
    out.push_str("done\n\nexit 0\n");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayConfig {
    Spgwc(SpgwcConfig),
    Spgwu(SpgwuConfig),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `<nf>-cfg.sh`, run inside the container.
    Script,
    /// `<nf>-env.list`, passed to `--env-file`.
    EnvList,
}

impl OutputFormat {
    pub fn file_name(self, nf: NetworkFunction) -> String {
        match self {
            Self::Script => format!("{}-cfg.sh", nf.slug()),
            Self::EnvList => format!("{}-env.list", nf.slug()),
        }
    }
}

impl GatewayConfig {
    pub fn network_function(&self) -> NetworkFunction {
        match self {
            Self::Spgwc(_) => NetworkFunction::SpgwC,
            Self::Spgwu(_) => NetworkFunction::SpgwU,
        }
    }

    pub fn render(&self, format: OutputFormat) -> String {
        match (self, format) {
            (Self::Spgwc(c), OutputFormat::Script) => c.render_script(),
            (Self::Spgwc(c), OutputFormat::EnvList) => c.render_env_list(),
            (Self::Spgwu(u), OutputFormat::Script) => u.render_script(),
            (Self::Spgwu(u), OutputFormat::EnvList) => u.render_env_list(),
        }
    }

    /// Render into `dir`, overwriting any previous output. Returns the written path.
    pub async fn write(&self, format: OutputFormat, dir: &Path) -> CiResult<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format.file_name(self.network_function()));
        tokio::fs::write(&path, self.render(format)).await?;
        info!(path = %path.display(), "generated {} configuration", self.network_function());
        Ok(path)
    }
}

pub async fn run_generate_config(args: GenerateConfigArgs) -> CiResult<()> {
    let format = if args.env_for_entrypoint {
        OutputFormat::EnvList
    } else {
        OutputFormat::Script
    };
    let dir = args.output_dir.clone();
    let config = args.into_config()?;
    config.write(format, &dir).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(s: &str) -> Ipv4Net {
        s.parse().unwrap()
    }

    #[test]
    fn ue_pool_range_spans_network_plus_two_to_broadcast() {
        assert_eq!(ue_pool_range(net("12.1.1.0/24")).unwrap(), "12.1.1.2 - 12.1.1.255");
        assert_eq!(ue_pool_range(net("10.0.0.0/16")).unwrap(), "10.0.0.2 - 10.0.255.255");
        assert_eq!(ue_pool_range(net("10.0.0.4/30")).unwrap(), "10.0.0.6 - 10.0.0.7");
    }

    #[test]
    fn ue_pool_range_rejects_host_bits_and_tiny_prefixes() {
        assert!(ue_pool_range(net("12.1.1.7/24")).is_err());
        assert!(ue_pool_range(net("12.1.1.0/31")).is_err());
        assert!(ue_pool_range(net("12.1.1.1/32")).is_err());
    }

    #[test]
    fn spgwc_defaults_keep_literal_pools() {
        let env = SpgwcConfig::new("eth0", "eth1").render_env_list();
        assert!(env.starts_with("# Environment Variables used by the OAI-SPGW-C"));
        assert!(env.contains("SGW_INTERFACE_NAME_FOR_S11=eth0\n"));
        assert!(env.contains("PGW_INTERFACE_NAME_FOR_SX=eth1\n"));
        assert!(env.contains("UE_IP_ADDRESS_POOL_1=12.1.1.2 - 12.1.1.254\n"));
        assert!(env.contains("UE_IP_ADDRESS_POOL_2=192.168.21.2 - 192.168.21.254\n"));
        assert!(env.contains("PUSH_PROTOCOL_OPTION=false\n"));
        assert!(env.ends_with("REALM=openairinterface.org\n"));
    }

    #[test]
    fn spgwc_script_for_docker_image() {
        let mut config = SpgwcConfig::new("eth0", "eth1");
        config.from_docker_file = true;
        config.push_protocol = true;
        let script = config.render_script();
        assert!(script.starts_with("#!/bin/bash\n\ncd /openair-spgwc\n"));
        assert!(script.contains("PREFIX='/openair-spgwc/etc'\n"));
        assert!(!script.contains("mkdir -p $PREFIX"));
        assert!(script.contains("CONF[@SGW_INTERFACE_NAME_FOR_S11@]='eth0'\n"));
        assert!(script.contains("CONF[@PUSH_PROTOCOL_OPTION@]='yes'\n"));
        assert!(script.contains("CONF[@DEFAULT_APN@]=$MY_APN\n"));
        assert!(script.ends_with("exit 0\n"));
    }

    #[test]
    fn spgwc_script_for_host_install_copies_template() {
        let script = SpgwcConfig::new("ens3", "ens4").render_script();
        assert!(script.contains("cd /home\n"));
        assert!(script.contains("mkdir -p $PREFIX\ncp etc/spgw_c.conf  $PREFIX\n"));
    }

    #[test]
    fn spgwu_sgi_defaults_to_s1u() {
        let config = SpgwuConfig::new("eth0", "eth1", Ipv4Addr::new(192, 168, 29, 2));
        let env = config.render_env_list();
        assert!(env.contains("SGW_INTERFACE_NAME_FOR_S1U_S12_S4_UP=eth0\n"));
        assert!(env.contains("PGW_INTERFACE_NAME_FOR_SGI=eth0\n"));
        assert!(env.contains("SPGWC0_IP_ADDRESS=192.168.29.2\n"));
        assert!(env.contains("NETWORK_UE_IP=12.1.1.0/24\n"));
        assert!(env.contains("NETWORK_UE_NAT_OPTION=no\n"));
    }

    fn args(kind: Kind) -> GenerateConfigArgs {
        GenerateConfigArgs {
            kind,
            s11c: None,
            sxc: None,
            sxu: None,
            s1u: None,
            sgi: None,
            sxc_ip_addr: None,
            apn: DEFAULT_APN1.to_string(),
            dns1_ip: DEFAULT_DNS1.parse().unwrap(),
            dns2_ip: DEFAULT_DNS2.parse().unwrap(),
            network_ue_ip: None,
            network_ue_nat_option: "no".to_string(),
            push_protocol_option: "no".to_string(),
            from_docker_file: false,
            env_for_entrypoint: false,
            output_dir: PathBuf::from("."),
        }
    }

    #[test]
    fn validate_requires_interfaces() {
        let mut a = args(Kind::SpgwC);
        assert!(a.validate().unwrap_err().contains("S11"));
        a.s11c = Some("eth0".into());
        assert!(a.validate().unwrap_err().contains("SX"));
        a.sxc = Some("eth1".into());
        assert!(a.validate().is_ok());

        let mut u = args(Kind::SpgwU);
        u.sxu = Some("eth1".into());
        u.s1u = Some("eth0".into());
        assert!(u.validate().unwrap_err().contains("sxc-ip-addr"));
    }

    #[test]
    fn network_ue_ip_overrides_pool_one_only() {
        let mut a = args(Kind::SpgwC);
        a.s11c = Some("eth0".into());
        a.sxc = Some("eth1".into());
        a.network_ue_ip = Some(net("12.0.0.0/8"));
        a.push_protocol_option = "YES".into();
        let GatewayConfig::Spgwc(config) = a.into_config().unwrap() else {
            panic!("expected SPGW-C config");
        };
        assert_eq!(config.ue_pool1_range, "12.0.0.2 - 12.255.255.255");
        assert_eq!(config.ue_pool2_range, DEFAULT_UE_POOL2);
        assert!(config.push_protocol);
    }

    #[tokio::test]
    async fn write_overwrites_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = GatewayConfig::Spgwc(SpgwcConfig::new("eth0", "eth1"));
        let path = dir.path().join("spgwc-env.list");
        tokio::fs::write(&path, "stale").await.unwrap();

        let written = config.write(OutputFormat::EnvList, dir.path()).await.unwrap();
        assert_eq!(written, path);
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(!content.contains("stale"));
        assert!(content.contains("APN_NI_1=apn1.oai.svc.cluster.local"));
    }
}
