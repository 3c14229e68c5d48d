use std::fmt;

use tracing::info;

use crate::command::Privilege;
use crate::error::{ContainerError, ContainerResult};

const DEFAULT_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Container runtime CLI flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
    Docker,
    /// Rootful podman behind `sudo`; locally built images live under `localhost/`.
    Podman,
}

impl Runtime {
    /// Detect an installed runtime from `PATH`, preferring podman.
    pub fn detect() -> ContainerResult<Self> {
        Self::detect_with(|name| which::which(name).is_ok())
    }

    /// Detection with an injectable lookup (`true` = binary found).
    pub fn detect_with(is_installed: impl Fn(&str) -> bool) -> ContainerResult<Self> {
        let runtime = if is_installed("podman") {
            Self::Podman
        } else if is_installed("docker") {
            Self::Docker
        } else {
            return Err(ContainerError::NoRuntime);
        };
        info!("[OK] container runtime: {runtime}");
        Ok(runtime)
    }

    pub fn program(self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }

    pub fn privilege(self) -> Privilege {
        match self {
            Self::Docker => Privilege::User,
            Self::Podman => Privilege::Sudo,
        }
    }

    /// Registry prefix under which the runtime stores locally imported images.
    pub fn image_prefix(self) -> &'static str {
        match self {
            Self::Docker => "",
            Self::Podman => "localhost/",
        }
    }

    /// Fully qualified local image name for `tag`.
    pub fn local_image(self, tag: &str) -> String {
        format!("{}{tag}", self.image_prefix())
    }

    /// `ENV PATH` instruction for `import --change`; podman only accepts the `=` form.
    pub fn path_env_change(self) -> String {
        match self {
            Self::Docker => format!("ENV PATH {DEFAULT_PATH}"),
            Self::Podman => format!("ENV PATH={DEFAULT_PATH}"),
        }
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.privilege() {
            Privilege::Sudo => write!(f, "sudo {}", self.program()),
            Privilege::User => f.write_str(self.program()),
        }
    }
}
