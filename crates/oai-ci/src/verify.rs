use std::path::PathBuf;

use ci_common::paths::DEFAULT_ARCHIVES_DIR;
use ci_common::scan::{self, HeartbeatCounts};
use ci_common::{ArchivePaths, NetworkFunction};
use clap::Args;
use clap::builder::NonEmptyStringValueParser;
use tracing::{info, warn};

use crate::error::{CiError, CiResult};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// CI job name.
    #[arg(
        long,
        alias = "job_name",
        env = "JOB_NAME",
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub job_name: String,
    /// CI build id.
    #[arg(
        long,
        alias = "job_id",
        env = "BUILD_ID",
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub job_id: String,
    #[arg(long, default_value = DEFAULT_ARCHIVES_DIR)]
    pub archives_dir: PathBuf,
}

/// Outcome of one function's check-run log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionVerdict {
    pub nf: NetworkFunction,
    /// `None` when the log is missing or unreadable.
    pub counts: Option<HeartbeatCounts>,
}

impl FunctionVerdict {
    pub fn passed(&self) -> bool {
        self.counts.is_some_and(|c| c.satisfies(self.nf))
    }
}

/// An unreadable or missing log is a failed verdict, never an error.
pub fn verify_function(archives: &ArchivePaths, nf: NetworkFunction) -> FunctionVerdict {
    let path = archives.check_run_log(nf);
    let counts = scan::read_log_or_warn(&path).map(|text| HeartbeatCounts::from_text(&text));
    match counts {
        Some(c) => info!(
            "{nf}: {} PFCP heartbeat procedures, {} SX requests, {} SX responses",
            c.pfcp_procedures, c.sx_requests, c.sx_responses
        ),
        None => warn!(path = %path.display(), "{nf}: check-run log missing"),
    }
    FunctionVerdict { nf, counts }
}

pub fn verify(archives: &ArchivePaths) -> Vec<FunctionVerdict> {
    NetworkFunction::ALL
        .into_iter()
        .map(|nf| verify_function(archives, nf))
        .collect()
}

pub async fn run_verify(args: VerifyArgs) -> CiResult<()> {
    info!(job = %args.job_name, build = %args.job_id, "verifying sanity check deployment");
    let verdicts = verify(&ArchivePaths::new(args.archives_dir));
    for verdict in verdicts.iter().filter(|v| !v.passed()) {
        println!("{} did not deploy properly", verdict.nf);
    }
    if verdicts.iter().all(FunctionVerdict::passed) {
        println!("Sanity Check Deployment is OK");
        Ok(())
    } else {
        Err(CiError::Verification(
            "Sanity Check Deployment went wrong".to_string(),
        ))
    }
}
