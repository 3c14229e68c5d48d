//! Turns archived build artifacts into report cells.
//!
//! A missing artifact is a failure cell, not an error; only unreadable
//! files surface as `Err`.

use std::io;
use std::path::Path;

use ci_common::scan::{self, HeartbeatCounts};
use ci_common::{ArchivePaths, NetworkFunction};

use super::html::Status;

/// Compile logs with fewer warnings than this (and no error) only warn.
pub const COMPILE_WARNING_THRESHOLD: usize = 20;

/// Status and text of one summary table cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub status: Status,
    pub text: String,
}

impl Cell {
    fn missing(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            status: Status::Failure,
            text: format!("KO: logfile ({name}) not found"),
        }
    }

    fn ok_or_ko(ok: bool, detail: &str) -> Self {
        let (status, prefix) = if ok {
            (Status::Success, "OK:")
        } else {
            (Status::Failure, "KO:")
        };
        Self {
            status,
            text: format!("{prefix}\n{detail}"),
        }
    }
}

/// `OK` when some line carries `OAI-<NF> <stage>:` and `OK`.
fn stage_cell(
    path: &Path,
    nf: NetworkFunction,
    stage: &str,
    detail: &str,
) -> io::Result<Cell> {
    let Some(text) = scan::read_log(path)? else {
        return Ok(Cell::missing(path));
    };
    let ok = scan::stage_succeeded(&text, &nf.stage_marker(stage));
    Ok(Cell::ok_or_ko(ok, detail))
}

pub fn docker_start_cell(archives: &ArchivePaths, nf: NetworkFunction) -> io::Result<Cell> {
    let path = archives.docker_start_log(nf);
    let Some(text) = scan::read_log(&path)? else {
        return Ok(Cell::missing(&path));
    };
    let container = format!("ci-oai-{}", nf.slug());
    let cell = if scan::stage_succeeded(&text, &nf.stage_marker("START")) {
        Cell {
            status: Status::Success,
            text: format!("OK: {container}:\n -- started successfully"),
        }
    } else {
        Cell {
            status: Status::Failure,
            text: format!("KO: {container}:\n -- did not start properly?"),
        }
    };
    Ok(cell)
}

pub fn install_cell(archives: &ArchivePaths, nf: NetworkFunction) -> io::Result<Cell> {
    let detail = format!(" -- build_{} --install-deps --force", nf.slug());
    stage_cell(&archives.install_log(nf), nf, "SW INSTALL", &detail)
}

pub fn build_cell(archives: &ArchivePaths, nf: NetworkFunction) -> io::Result<Cell> {
    let detail = format!(" -- build_{} --clean --build-type Release --jobs", nf.slug());
    stage_cell(&archives.build_log(nf), nf, "BUILD", &detail)
}

pub fn config_cell(archives: &ArchivePaths, nf: NetworkFunction) -> io::Result<Cell> {
    stage_cell(&archives.config_log(nf), nf, "CONFIG", "")
}

/// Compiler diagnostics found in a compile log.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CompileCounts {
    pub errors: usize,
    pub warnings: usize,
}

impl CompileCounts {
    pub fn from_text(text: &str) -> Self {
        Self {
            errors: scan::count_lines(text, "error:"),
            warnings: scan::count_lines(text, "warning:"),
        }
    }

    pub fn status(self) -> Status {
        if self.errors == 0 && self.warnings == 0 {
            Status::Success
        } else if self.errors == 0 && self.warnings < COMPILE_WARNING_THRESHOLD {
            Status::Warning
        } else {
            Status::Failure
        }
    }
}

pub fn compile_cell(archives: &ArchivePaths, nf: NetworkFunction) -> io::Result<Cell> {
    let path = archives.compile_log(nf);
    let Some(text) = scan::read_log(&path)? else {
        return Ok(Cell::missing(&path));
    };
    let counts = CompileCounts::from_text(&text);
    let mut body = String::new();
    if counts.errors > 0 {
        body.push_str(&format!("{} errors found in compile log\n", counts.errors));
    }
    body.push_str(&format!("{} warnings found in compile log", counts.warnings));
    Ok(Cell {
        status: counts.status(),
        text: body,
    })
}

pub fn check_run_cell(archives: &ArchivePaths, nf: NetworkFunction) -> io::Result<Cell> {
    let path = archives.check_run_log(nf);
    let Some(text) = scan::read_log(&path)? else {
        return Ok(Cell::missing(&path));
    };
    let counts = HeartbeatCounts::from_text(&text);
    let mut detail = format!(
        "  -- started {} PFCP HEARTBEAT PROCEDURE(s)\n",
        counts.pfcp_procedures
    );
    if nf == NetworkFunction::SpgwU {
        detail.push_str(&format!(
            "  -- received {} SX HEARTBEAT REQUEST(s)\n  -- received {} SX HEARTBEAT RESPONSE(s)\n",
            counts.sx_requests, counts.sx_responses
        ));
    }
    Ok(Cell::ok_or_ko(counts.satisfies(nf), &detail))
}

/// cppcheck error categories broken out in the report, by id.
pub const CPPCHECK_CATEGORIES: [(&str, &str); 9] = [
    ("uninitvar", "Uninitialized variable"),
    ("uninitStructMember", "Uninitialized struct member"),
    ("memleak", "Memory leak"),
    ("doubleFree", "Memory is freed twice"),
    ("resourceLeak", "Resource leak"),
    ("nullPointer", "Possible null pointer dereference"),
    ("arrayIndexOutOfBounds", "Array access  out of bounds"),
    ("bufferAccessOutOfBounds", "Buffer is accessed out of bounds"),
    (
        "unknownEvaluationOrder",
        "Expression depends on order of evaluation of side effects",
    ),
];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CppcheckSummary {
    pub errors: usize,
    pub warnings: usize,
    /// Error counts, parallel to [`CPPCHECK_CATEGORIES`].
    pub categories: [usize; 9],
}

impl CppcheckSummary {
    pub fn from_xml(xml: &str) -> Self {
        let mut summary = Self::default();
        for line in xml.lines() {
            if line.contains("severity=\"warning\"") {
                summary.warnings += 1;
            }
            if line.contains("severity=\"error\"") {
                summary.errors += 1;
                for (count, (id, _)) in summary.categories.iter_mut().zip(CPPCHECK_CATEGORIES) {
                    if line.contains(id) {
                        *count += 1;
                    }
                }
            }
        }
        summary
    }

    /// Errors outside every listed category.
    pub fn others(&self) -> usize {
        self.errors
            .saturating_sub(self.categories.iter().sum::<usize>())
    }

    pub fn status(&self) -> Status {
        match (self.errors, self.warnings) {
            (0, 0) => Status::Success,
            (0, _) => Status::Warning,
            _ => Status::Failure,
        }
    }
}

pub fn read_cppcheck(archives: &ArchivePaths) -> io::Result<Option<CppcheckSummary>> {
    Ok(scan::read_log(&archives.cppcheck_xml())?.map(|xml| CppcheckSummary::from_xml(&xml)))
}

/// Result of the formatting-rules check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleCheck {
    /// Number of files violating the rules.
    pub violations: usize,
    pub files: Vec<String>,
}

impl StyleCheck {
    /// Violations fail pull requests; on push events they only warn.
    pub fn status(&self, pull_request: bool) -> Status {
        match (self.violations, pull_request) {
            (0, _) => Status::Success,
            (_, true) => Status::Failure,
            (_, false) => Status::Warning,
        }
    }
}

/// `None` when the check did not run or its count is unreadable.
pub fn read_style_check(archives: &ArchivePaths) -> io::Result<Option<StyleCheck>> {
    let Some(result) = scan::read_log(&archives.rules_result())? else {
        return Ok(None);
    };
    let Some(violations) = result
        .lines()
        .next()
        .and_then(|line| line.trim().parse::<usize>().ok())
    else {
        return Ok(None);
    };
    let files = scan::read_log(&archives.rules_result_list())?
        .map(|list| {
            list.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Ok(Some(StyleCheck { violations, files }))
}
