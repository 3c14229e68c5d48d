//! Log-marker scanning.
//!
//! Every status in the pipeline is derived the same way: read a log produced
//! by some other stage, count the lines carrying a fixed marker substring.
//! Missing logs are not errors here; callers get `None` and decide.

use std::io;
use std::path::Path;

use tracing::warn;

use crate::nf::NetworkFunction;

pub const PFCP_HEARTBEAT_PROCEDURE: &str = "PFCP HEARTBEAT PROCEDURE";
pub const SX_HEARTBEAT_REQUEST: &str = "SX HEARTBEAT REQUEST";
pub const SX_HEARTBEAT_RESPONSE: &str = "SX HEARTBEAT RESPONSE";

/// Line separating the entrypoint's configuration output from the run output.
pub const OPTIONS_PARSED: &str = "Options parsed";

/// Read a log, decoding invalid UTF-8 lossily. `Ok(None)` when the file is absent.
pub fn read_log(path: &Path) -> io::Result<Option<String>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Like [`read_log`], but a log that exists and cannot be read is treated as absent.
pub fn read_log_or_warn(path: &Path) -> Option<String> {
    match read_log(path) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable log treated as missing");
            None
        }
    }
}

/// Number of lines containing `needle`.
pub fn count_lines(text: &str, needle: &str) -> usize {
    text.lines().filter(|line| line.contains(needle)).count()
}

/// `true` if some line carries `marker` followed anywhere by `OK`
/// (e.g. `OAI-SPGW-C BUILD: OK`).
pub fn stage_succeeded(text: &str, marker: &str) -> bool {
    text.lines()
        .any(|line| line.contains(marker) && line.contains("OK"))
}

/// Heartbeat markers found in a check-run log.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatCounts {
    pub pfcp_procedures: usize,
    pub sx_requests: usize,
    pub sx_responses: usize,
}

impl HeartbeatCounts {
    pub fn from_text(text: &str) -> Self {
        let mut counts = Self::default();
        for line in text.lines() {
            if line.contains(PFCP_HEARTBEAT_PROCEDURE) {
                counts.pfcp_procedures += 1;
            }
            if line.contains(SX_HEARTBEAT_REQUEST) {
                counts.sx_requests += 1;
            }
            if line.contains(SX_HEARTBEAT_RESPONSE) {
                counts.sx_responses += 1;
            }
        }
        counts
    }

    /// The control plane only has to start the procedure; the user plane must
    /// show the whole handshake (initiate, request, response).
    pub fn satisfies(&self, nf: NetworkFunction) -> bool {
        match nf {
            NetworkFunction::SpgwC => self.pfcp_procedures > 0,
            NetworkFunction::SpgwU => {
                self.pfcp_procedures > 0 && self.sx_requests > 0 && self.sx_responses > 0
            }
        }
    }
}

/// Split a container log at the first `Options parsed` line.
///
/// Returns `(config_part, run_part)`; the marker line opens the run part.
/// Without a marker everything is configuration output.
pub fn split_at_options_parsed(log: &str) -> (String, String) {
    let mut config = String::new();
    let mut run = String::new();
    let mut in_run = false;
    for line in log.lines() {
        if !in_run && line.contains(OPTIONS_PARSED) {
            in_run = true;
        }
        let target = if in_run { &mut run } else { &mut config };
        target.push_str(line);
        target.push('\n');
    }
    (config, run)
}
