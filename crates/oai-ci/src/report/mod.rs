//! HTML build report.
//!
//! `Build` mode writes a fresh `test_results_oai_cn.html`; `TestDeploy` mode
//! splices a sanity-check table into that report just before its footer.

mod analysis;
mod html;

use std::fmt::Write as _;
use std::path::PathBuf;

use ci_common::paths::DEFAULT_ARCHIVES_DIR;
use ci_common::{ArchivePaths, NetworkFunction};
use clap::builder::NonEmptyStringValueParser;
use clap::{Args, ValueEnum};
use tracing::{info, warn};

use crate::error::{CiError, CiResult};
use analysis::{CPPCHECK_CATEGORIES, Cell, CppcheckSummary, StyleCheck};
use html::{Status, alert, cell, escape, row_label, summary_table_close, summary_table_open};

pub const DEFAULT_REPORT: &str = "test_results_oai_cn.html";

/// Footer text; deployment results are inserted before the line carrying it.
pub const REPORT_ANCHOR: &str = "End of Build Report";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    #[value(name = "Build")]
    Build,
    #[value(name = "TestDeploy")]
    TestDeploy,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    #[arg(
        long,
        alias = "job_name",
        env = "JOB_NAME",
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub job_name: String,
    #[arg(
        long,
        alias = "job_id",
        env = "BUILD_ID",
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub job_id: String,
    #[arg(long, alias = "job_url", env = "BUILD_URL")]
    pub job_url: String,
    #[arg(long, alias = "git_url", env = "GIT_URL")]
    pub git_url: String,
    #[arg(long, alias = "git_src_branch")]
    pub git_src_branch: String,
    #[arg(long, alias = "git_src_commit")]
    pub git_src_commit: String,
    #[arg(long, alias = "git_src_commit_msg")]
    pub git_src_commit_msg: Option<String>,
    /// `true` / `True` marks a pull request; anything else is a push event.
    #[arg(long, alias = "git_pull_request", default_value = "false")]
    pub git_pull_request: String,
    #[arg(long, alias = "git_target_branch")]
    pub git_target_branch: Option<String>,
    #[arg(long, alias = "git_target_commit")]
    pub git_target_commit: Option<String>,
    #[arg(long, value_enum, ignore_case = true, default_value = "Build")]
    pub mode: Mode,
    #[arg(long, default_value = DEFAULT_ARCHIVES_DIR)]
    pub archives_dir: PathBuf,
    #[arg(long, default_value = DEFAULT_REPORT)]
    pub output: PathBuf,
}

impl ReportArgs {
    pub fn pull_request(&self) -> bool {
        matches!(self.git_pull_request.as_str(), "true" | "True")
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.pull_request() {
            return Ok(());
        }
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        if present(&self.git_target_branch) && present(&self.git_target_commit) {
            Ok(())
        } else {
            Err(
                "Missing Parameter in Git Pull Request Repository description \
                 (--git-target-branch, --git-target-commit)"
                    .to_string(),
            )
        }
    }

    fn header(&self) -> ReportHeader {
        ReportHeader {
            job_name: self.job_name.clone(),
            job_id: self.job_id.clone(),
            job_url: self.job_url.clone(),
            start_time: ci_common::log::timestamp(),
            git_url: self.git_url.clone(),
            src_branch: self.git_src_branch.clone(),
            src_commit: self.git_src_commit.clone(),
            commit_message: self.git_src_commit_msg.clone(),
            pull_request: self.pull_request().then(|| PullRequest {
                target_branch: self.git_target_branch.clone().unwrap_or_default(),
                target_commit: self.git_target_commit.clone().unwrap_or_default(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub target_branch: String,
    pub target_commit: String,
}

/// Job and repository description shown at the top of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportHeader {
    pub job_name: String,
    pub job_id: String,
    pub job_url: String,
    pub start_time: String,
    pub git_url: String,
    pub src_branch: String,
    pub src_commit: String,
    pub commit_message: Option<String>,
    /// `None` for push events.
    pub pull_request: Option<PullRequest>,
}

fn info_row(out: &mut String, glyph: &str, label: &str, value_html: &str) {
    let _ = write!(
        out,
        "     <tr>\n       <td bgcolor=\"lightcyan\" > <span class=\"glyphicon {glyph}\"></span> {label}</td>\n       <td>{value_html}</td>\n     </tr>\n"
    );
}

fn render_header(out: &mut String, header: &ReportHeader) {
    let job_name = escape(&header.job_name);
    let job_id = escape(&header.job_id);
    let _ = write!(
        out,
        "<!DOCTYPE html>\n\
         <html class=\"no-js\" lang=\"en-US\">\n\
         <head>\n\
         \x20 <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         \x20 <link rel=\"stylesheet\" href=\"https://maxcdn.bootstrapcdn.com/bootstrap/3.3.7/css/bootstrap.min.css\">\n\
         \x20 <script src=\"https://ajax.googleapis.com/ajax/libs/jquery/3.3.1/jquery.min.js\"></script>\n\
         \x20 <script src=\"https://maxcdn.bootstrapcdn.com/bootstrap/3.3.7/js/bootstrap.min.js\"></script>\n\
         \x20 <title>OAI Core Network Test Results for {job_name} job build #{job_id}</title>\n\
         </head>\n\
         <body><div class=\"container\">\n\
         \x20 <table width = \"100%\" style=\"border-collapse: collapse; border: none;\">\n\
         \x20   <tr style=\"border-collapse: collapse; border: none;\">\n\
         \x20     <td style=\"border-collapse: collapse; border: none;\">\n\
         \x20       <a href=\"http://www.openairinterface.org/\">\n\
         \x20          <img src=\"http://www.openairinterface.org/wp-content/uploads/2016/03/cropped-oai_final_logo2.png\" alt=\"\" border=\"none\" height=50 width=150>\n\
         \x20          </img>\n\
         \x20       </a>\n\
         \x20     </td>\n\
         \x20     <td style=\"border-collapse: collapse; border: none; vertical-align: center;\">\n\
         \x20       <b><font size = \"6\">Job Summary -- Job: {job_name} -- Build-ID: <a href=\"{}\">{job_id}</a></font></b>\n\
         \x20     </td>\n\
         \x20   </tr>\n\
         \x20 </table>\n\
         \x20 <br>\n",
        escape(&header.job_url)
    );

    out.push_str(
        "  <table class=\"table-bordered\" width = \"80%\" align = \"center\" border = \"1\">\n",
    );
    info_row(out, "glyphicon-time", "Build Start Time", &escape(&header.start_time));
    let trigger = if header.pull_request.is_some() {
        "Pull Request"
    } else {
        "Push Event"
    };
    info_row(out, "glyphicon-wrench", "Build Trigger", trigger);
    let git_url = escape(&header.git_url);
    info_row(
        out,
        "glyphicon-cloud-upload",
        "GIT Repository",
        &format!("<a href=\"{git_url}\">{git_url}</a>"),
    );
    match &header.pull_request {
        Some(pr) => {
            info_row(out, "glyphicon-log-out", "Source Branch", &escape(&header.src_branch));
            info_row(out, "glyphicon-tag", "Source Commit ID", &escape(&header.src_commit));
            if let Some(msg) = &header.commit_message {
                info_row(out, "glyphicon-comment", "Source Commit Message", &escape(msg));
            }
            info_row(out, "glyphicon-log-in", "Target Branch", &escape(&pr.target_branch));
            info_row(out, "glyphicon-tag", "Target Commit ID", &escape(&pr.target_commit));
        }
        None => {
            info_row(out, "glyphicon-tree-deciduous", "Branch", &escape(&header.src_branch));
            info_row(out, "glyphicon-tag", "Commit ID", &escape(&header.src_commit));
            if let Some(msg) = &header.commit_message {
                info_row(out, "glyphicon-comment", "Commit Message", &escape(msg));
            }
        }
    }
    out.push_str("  </table>\n  <br>\n");
}

fn render_style_check(out: &mut String, check: Option<&StyleCheck>, pull_request: bool) {
    out.push_str("  <h2>OAI Coding / Formatting Guidelines Check</h2>\n");
    let Some(check) = check else {
        alert(out, Status::Failure, "Was NOT performed (with CLANG-FORMAT tool).");
        return;
    };
    let status = check.status(pull_request);
    if check.violations == 0 {
        alert(out, status, "All files follow the OAI formatting rules.");
        return;
    }
    alert(
        out,
        status,
        &format!(
            "{} file(s) do not follow the OAI formatting rules.",
            check.violations
        ),
    );
    if !check.files.is_empty() {
        out.push_str("  <ul>\n");
        for file in &check.files {
            let _ = writeln!(out, "    <li>{}</li>", escape(file));
        }
        out.push_str("  </ul>\n");
    }
}

fn render_cppcheck(out: &mut String, summary: Option<&CppcheckSummary>) {
    out.push_str("  <h2>Static Code Analysis</h2>\n");
    let Some(summary) = summary else {
        alert(out, Status::Failure, "Was NOT performed (with CPPCHECK tool).");
        return;
    };
    let message = match summary.status() {
        Status::Success => "CPPCHECK found NO error and NO warning".to_string(),
        Status::Warning => format!("CPPCHECK found NO error and {} warnings", summary.warnings),
        Status::Failure => format!(
            "CPPCHECK found {} errors and {} warnings",
            summary.errors, summary.warnings
        ),
    };
    alert(out, summary.status(), &message);
    if summary.status() == Status::Success {
        return;
    }

    out.push_str(
        "   <button data-toggle=\"collapse\" data-target=\"#oai-cppcheck-details\">More details on CPPCHECK results</button>\n\
         \x20  <div id=\"oai-cppcheck-details\" class=\"collapse\">\n\
         \x20  <br>\n\
         \x20  <table class=\"table-bordered\" width = \"80%\" align = \"center\" border = \"1\">\n\
         \x20     <tr bgcolor = \"#33CCFF\" >\n\
         \x20       <th>Error / Warning Type</th>\n\
         \x20       <th>Nb Errors</th>\n\
         \x20       <th>Nb Warnings</th>\n\
         \x20     </tr>\n",
    );
    for ((_, label), count) in CPPCHECK_CATEGORIES.iter().zip(summary.categories) {
        let _ = write!(
            out,
            "      <tr>\n        <td>{label}</td>\n        <td>{count}</td>\n        <td>N/A</td>\n      </tr>\n"
        );
    }
    let _ = write!(
        out,
        "      <tr>\n        <td>Others</td>\n        <td>{}</td>\n        <td>{}</td>\n      </tr>\n\
         \x20     <tr bgcolor = \"#33CCFF\" >\n        <th>Total</th>\n        <th>{}</th>\n        <th>{}</th>\n      </tr>\n\
         \x20  </table>\n\
         \x20  <br>\n\
         \x20  <p>Full details in artifact (cppcheck.xml) </p>\n\
         \x20  <p style=\"margin-left: 30px\">Graphical Interface tool : <strong><code>cppcheck-gui -l cppcheck.xml</code></strong></p>\n\
         \x20  <br>\n\
         \x20  </div>\n",
        summary.others(),
        summary.warnings,
        summary.errors,
        summary.warnings
    );
}

type CellFn = fn(&ArchivePaths, NetworkFunction) -> std::io::Result<Cell>;

fn render_row(out: &mut String, archives: &ArchivePaths, cell_fn: CellFn) -> CiResult<()> {
    for nf in NetworkFunction::ALL {
        let c = cell_fn(archives, nf)?;
        cell(out, c.status, &c.text);
    }
    Ok(())
}

fn render_labelled_row(
    out: &mut String,
    archives: &ArchivePaths,
    label: &str,
    cell_fn: CellFn,
) -> CiResult<()> {
    out.push_str("     <tr>\n");
    row_label(out, label, 1);
    render_row(out, archives, cell_fn)?;
    out.push_str("     </tr>\n");
    Ok(())
}

fn function_columns() -> Vec<String> {
    NetworkFunction::ALL
        .iter()
        .map(|nf| format!("OAI {nf} cNF"))
        .collect()
}

fn render_build_summary(out: &mut String, archives: &ArchivePaths) -> CiResult<()> {
    let columns = function_columns();
    let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
    summary_table_open(out, "Build Summary", &columns);
    render_labelled_row(
        out,
        archives,
        "Starting Docker Containers",
        analysis::docker_start_cell,
    )?;
    render_labelled_row(
        out,
        archives,
        "SW libs and packages Installation",
        analysis::install_cell,
    )?;

    out.push_str("     <tr>\n");
    row_label(out, "cNF Compile / Build", 2);
    render_row(out, archives, analysis::build_cell)?;
    out.push_str("     </tr>\n     <tr>\n");
    render_row(out, archives, analysis::compile_cell)?;
    out.push_str("     </tr>\n");

    render_labelled_row(out, archives, "cNF Configuration", analysis::config_cell)?;
    render_labelled_row(
        out,
        archives,
        "cNF Check Start / Stop",
        analysis::check_run_cell,
    )?;
    summary_table_close(out);
    Ok(())
}

fn render_footer(out: &mut String) {
    let _ = write!(
        out,
        "  <div class=\"well well-lg\">{REPORT_ANCHOR} -- Copyright <span class=\"glyphicon glyphicon-copyright-mark\"></span> 2020 <a href=\"http://www.openairinterface.org/\">OpenAirInterface</a>. All Rights Reserved.</div>\n\
         </div></body>\n\
         </html>\n"
    );
}

/// A complete build report.
pub fn render_build_report(header: &ReportHeader, archives: &ArchivePaths) -> CiResult<String> {
    let mut out = String::new();
    render_header(&mut out, header);
    let style = analysis::read_style_check(archives)?;
    render_style_check(&mut out, style.as_ref(), header.pull_request.is_some());
    let cppcheck = analysis::read_cppcheck(archives)?;
    render_cppcheck(&mut out, cppcheck.as_ref());
    render_build_summary(&mut out, archives)?;

    out.push_str("  <h2>Test Summary</h2>\n");
    alert(&mut out, Status::Warning, "Not performed yet.");
    out.push_str("  <br>\n");

    render_footer(&mut out);
    Ok(out)
}

/// The sanity-check deployment table inserted by `TestDeploy` mode.
pub fn render_deploy_section(archives: &ArchivePaths) -> CiResult<String> {
    let mut out = String::new();
    let columns = function_columns();
    let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
    summary_table_open(&mut out, "Sanity Check Deployment Summary", &columns);
    render_labelled_row(&mut out, archives, "cNF Configuration", analysis::config_cell)?;
    render_labelled_row(
        &mut out,
        archives,
        "cNF Check Start / Stop",
        analysis::check_run_cell,
    )?;
    summary_table_close(&mut out);
    Ok(out)
}

/// Insert `section` before the first line containing [`REPORT_ANCHOR`];
/// appended at the end when the anchor is absent.
pub fn splice(report: &str, section: &str) -> String {
    let mut out = String::with_capacity(report.len() + section.len());
    let mut inserted = false;
    for line in report.split_inclusive('\n') {
        if !inserted && line.contains(REPORT_ANCHOR) {
            out.push_str(section);
            inserted = true;
        }
        out.push_str(line);
    }
    if !inserted {
        warn!("report has no \"{REPORT_ANCHOR}\" line, appending deployment summary");
        out.push_str(section);
    }
    out
}

pub async fn run_report(args: ReportArgs) -> CiResult<()> {
    let archives = ArchivePaths::new(args.archives_dir.clone());
    let html = match args.mode {
        Mode::Build => render_build_report(&args.header(), &archives)?,
        Mode::TestDeploy => {
            let existing = match tokio::fs::read(&args.output).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(CiError::Report(format!(
                        "{} not found; generate the Build report first",
                        args.output.display()
                    )));
                }
                Err(e) => return Err(e.into()),
            };
            splice(&existing, &render_deploy_section(&archives)?)
        }
    };
    tokio::fs::write(&args.output, html).await?;
    info!(path = %args.output.display(), mode = ?args.mode, "report written");
    Ok(())
}
