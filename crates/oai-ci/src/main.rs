mod config;
mod config_gen;
mod deploy;
mod error;
mod flatten;
mod report;
mod verify;

use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "oai-ci", version, about = "CI helpers for the OAI SPGW-C / SPGW-U containers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a SPGW-C / SPGW-U configurer script or entrypoint env list
    GenerateConfigFiles(config_gen::GenerateConfigArgs),
    /// Squash an image into a single layer, keeping its entrypoint metadata
    FlattenImage(flatten::FlattenArgs),
    /// Run one step of the sanity-check deployment
    SanityCheckDeploy(deploy::DeployArgs),
    /// Check the archived run logs for heartbeat exchanges
    VerifySanityCheck(verify::VerifyArgs),
    /// Render the HTML build / deployment report
    GenerateHtmlReport(Box<report::ReportArgs>),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::GenerateConfigFiles(_) => "generate-config-files",
            Self::FlattenImage(_) => "flatten-image",
            Self::SanityCheckDeploy(_) => "sanity-check-deploy",
            Self::VerifySanityCheck(_) => "verify-sanity-check",
            Self::GenerateHtmlReport(_) => "generate-html-report",
        }
    }

    /// Cross-flag checks clap cannot express declaratively.
    fn validate(&self) -> Result<(), String> {
        match self {
            Self::GenerateConfigFiles(args) => args.validate(),
            Self::SanityCheckDeploy(args) => args.validate(),
            Self::GenerateHtmlReport(args) => args.validate(),
            Self::FlattenImage(_) | Self::VerifySanityCheck(_) => Ok(()),
        }
    }
}

/// A usage error for `subcommand`, printed with that subcommand's usage line.
fn usage_error(subcommand: &str, message: String) -> clap::Error {
    let mut cli = Cli::command();
    cli.build();
    if let Some(sub) = cli.find_subcommand_mut(subcommand) {
        return sub.error(ErrorKind::MissingRequiredArgument, message);
    }
    cli.error(ErrorKind::MissingRequiredArgument, message)
}

#[tokio::main]
async fn main() -> ExitCode {
    ci_common::log::init();

    let cli = Cli::parse();
    if let Err(message) = cli.command.validate() {
        usage_error(cli.command.name(), message).exit();
    }

    let result = match cli.command {
        Command::GenerateConfigFiles(args) => config_gen::run_generate_config(args).await,
        Command::FlattenImage(args) => flatten::run_flatten(args).await,
        Command::SanityCheckDeploy(args) => deploy::run_deploy(args).await,
        Command::VerifySanityCheck(args) => verify::run_verify(args).await,
        Command::GenerateHtmlReport(args) => report::run_report(*args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn subcommand_names_match_clap() {
        let cli = Cli::try_parse_from(["oai-ci", "flatten-image", "--tag", "oai-spgwc:x"]).unwrap();
        assert!(Cli::command().find_subcommand(cli.command.name()).is_some());
    }

    #[test]
    fn underscore_aliases_are_accepted() {
        let cli = Cli::try_parse_from([
            "oai-ci",
            "generate-config-files",
            "--kind=SPGW-C",
            "--s11c=eth0",
            "--sxc=eth1",
            "--from_docker_file",
            "--env_for_entrypoint",
            "--network_ue_ip=12.1.1.0/24",
        ])
        .unwrap();
        assert!(cli.command.validate().is_ok());
    }

    #[test]
    fn kind_is_case_insensitive() {
        let cli = Cli::try_parse_from([
            "oai-ci",
            "generate-config-files",
            "--kind",
            "spgw-u",
            "--sxu",
            "eth1",
            "--s1u",
            "eth0",
            "--sxc-ip-addr",
            "192.168.29.2",
        ])
        .unwrap();
        assert!(cli.command.validate().is_ok());
    }

    #[test]
    fn invalid_action_is_a_parse_error() {
        let err = Cli::try_parse_from(["oai-ci", "sanity-check-deploy", "--action=Bogus"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }
}
