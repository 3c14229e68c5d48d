//! Layout of the `archives/` directory shared by the pipeline stages.

use std::path::{Path, PathBuf};

use crate::nf::NetworkFunction;

pub const DEFAULT_ARCHIVES_DIR: &str = "archives";

/// Paths of every artifact the CI stages drop into the archives directory.
#[derive(Debug, Clone)]
pub struct ArchivePaths {
    dir: PathBuf,
}

impl ArchivePaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Heartbeat log captured from a running function.
    pub fn check_run_log(&self, nf: NetworkFunction) -> PathBuf {
        self.dir.join(format!("{}_check_run.log", nf.slug()))
    }

    /// Output of the configuration step (entrypoint or config script).
    pub fn config_log(&self, nf: NetworkFunction) -> PathBuf {
        self.dir.join(format!("{}_config.log", nf.slug()))
    }

    pub fn build_log(&self, nf: NetworkFunction) -> PathBuf {
        self.dir.join(format!("{}_build.log", nf.slug()))
    }

    pub fn compile_log(&self, nf: NetworkFunction) -> PathBuf {
        self.dir.join(format!("{}_compile.log", nf.slug()))
    }

    pub fn install_log(&self, nf: NetworkFunction) -> PathBuf {
        self.dir.join(format!("{}_install.log", nf.slug()))
    }

    pub fn docker_start_log(&self, nf: NetworkFunction) -> PathBuf {
        self.dir.join(format!("{}-docker-start.log", nf.slug()))
    }

    pub fn cppcheck_xml(&self) -> PathBuf {
        self.dir.join("cppcheck.xml")
    }

    /// First line holds the number of files violating the formatting rules.
    pub fn rules_result(&self) -> PathBuf {
        self.dir.join("oai_rules_result.txt")
    }

    /// One offending file per line.
    pub fn rules_result_list(&self) -> PathBuf {
        self.dir.join("oai_rules_result_list.txt")
    }
}

impl Default for ArchivePaths {
    fn default() -> Self {
        Self::new(DEFAULT_ARCHIVES_DIR)
    }
}
