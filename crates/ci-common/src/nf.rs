use std::fmt;

/// The two halves of the gateway under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkFunction {
    SpgwC,
    SpgwU,
}

impl NetworkFunction {
    pub const ALL: [NetworkFunction; 2] = [NetworkFunction::SpgwC, NetworkFunction::SpgwU];

    /// Display label, as printed by the build scripts (`SPGW-C`).
    pub fn label(self) -> &'static str {
        match self {
            Self::SpgwC => "SPGW-C",
            Self::SpgwU => "SPGW-U",
        }
    }

    /// Lower-case label without the dash, used in every file name (`spgwc`).
    pub fn slug(self) -> &'static str {
        match self {
            Self::SpgwC => "spgwc",
            Self::SpgwU => "spgwu",
        }
    }

    /// Prefix of the stage markers written by the build scripts,
    /// e.g. `OAI-SPGW-C BUILD:`.
    pub fn stage_marker(self, stage: &str) -> String {
        format!("OAI-{} {stage}:", self.label())
    }
}

impl fmt::Display for NetworkFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
