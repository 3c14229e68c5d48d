use crate::command::CommandError;

#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("no docker / podman installed")]
    NoRuntime,

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("inspect {target}: {detail}")]
    Inspect { target: String, detail: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ContainerResult<T> = Result<T, ContainerError>;
