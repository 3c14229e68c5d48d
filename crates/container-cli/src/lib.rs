//! Thin async wrapper over the `docker` / `podman` command-line clients.
//!
//! Nothing here talks to a daemon API: every operation is one CLI invocation,
//! echoed through `tracing` and checked for its exit status.

mod cli;
mod command;
mod error;
mod inspect;
mod runtime;

pub use cli::{ContainerCli, RunSpec};
pub use command::{CommandError, Privilege, exec, exec_to_file, pipe};
pub use error::{ContainerError, ContainerResult};
pub use inspect::{InspectConfig, InspectDocument};
pub use runtime::Runtime;
