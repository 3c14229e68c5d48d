use container_cli::{CommandError, ContainerError};

#[derive(Debug, thiserror::Error)]
pub enum CiError {
    #[error("config error: {0}")]
    Config(String),

    #[error("No docker / podman installed: quitting")]
    NoRuntime,

    #[error("inspect failed: {0}")]
    Inspect(String),

    #[error(transparent)]
    Container(ContainerError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("{0}")]
    Verification(String),

    #[error("report error: {0}")]
    Report(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ContainerError> for CiError {
    fn from(e: ContainerError) -> Self {
        match e {
            ContainerError::NoRuntime => Self::NoRuntime,
            ContainerError::Inspect { target, detail } => {
                Self::Inspect(format!("{target}: {detail}"))
            }
            other => Self::Container(other),
        }
    }
}

impl CiError {
    /// Process exit status. Runtime detection and inspect failures keep the
    /// historical `-1` (255) so pipeline steps can tell them apart.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NoRuntime | Self::Inspect(_) => 255,
            _ => 1,
        }
    }
}

pub type CiResult<T> = Result<T, CiError>;
