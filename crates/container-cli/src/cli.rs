use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::command::{self, CommandError, format_command_display};
use crate::error::ContainerResult;
use crate::inspect::InspectDocument;
use crate::runtime::Runtime;

/// Parameters shared by `create` and `run`.
#[derive(Debug, Clone, Default)]
pub struct RunSpec {
    pub name: String,
    pub image: String,
    pub network: Option<String>,
    pub ip: Option<String>,
    pub privileged: bool,
    pub env_file: Option<PathBuf>,
    pub entrypoint: Option<String>,
    pub detach: bool,
    /// Command and arguments passed after the image.
    pub command: Vec<String>,
}

impl RunSpec {
    /// Full argument list for `verb` (`create` or `run`).
    pub fn args(&self, verb: &str) -> Vec<String> {
        let mut args = vec![verb.to_string()];
        if self.privileged {
            args.push("--privileged".into());
        }
        args.push("--name".into());
        args.push(self.name.clone());
        if let Some(network) = &self.network {
            args.push("--network".into());
            args.push(network.clone());
        }
        if let Some(ip) = &self.ip {
            args.push("--ip".into());
            args.push(ip.clone());
        }
        if let Some(env_file) = &self.env_file {
            args.push("--env-file".into());
            args.push(env_file.display().to_string());
        }
        if let Some(entrypoint) = &self.entrypoint {
            args.push("--entrypoint".into());
            args.push(entrypoint.clone());
        }
        if self.detach {
            args.push("-d".into());
        }
        args.push(self.image.clone());
        args.extend(self.command.iter().cloned());
        args
    }
}

/// A container runtime client. Every call echoes the command line at `info`.
#[derive(Debug, Clone, Copy)]
pub struct ContainerCli {
    runtime: Runtime,
}

impl ContainerCli {
    pub fn new(runtime: Runtime) -> Self {
        Self { runtime }
    }

    pub fn docker() -> Self {
        Self::new(Runtime::Docker)
    }

    pub fn runtime(&self) -> Runtime {
        self.runtime
    }

    fn echo(&self, args: &[&str]) {
        let shown = format_command_display(self.runtime.program(), args, self.runtime.privilege());
        info!("{shown}");
    }

    /// Run a runtime subcommand, returning trimmed stdout.
    pub async fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<String, CommandError> {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        self.echo(&args);
        command::exec(self.runtime.program(), &args, self.runtime.privilege()).await
    }

    /// Run a runtime subcommand whose failure is expected and harmless.
    pub async fn run_tolerant<S: AsRef<str>>(&self, args: &[S]) {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        self.echo(&args);
        if let Err(e) = command::exec(self.runtime.program(), &args, self.runtime.privilege()).await
        {
            warn!(command = %e.command, detail = %e.detail, "ignored failure");
        }
    }

    /// Run a runtime subcommand with stdout+stderr written to `path`.
    pub async fn run_to_file<S: AsRef<str>>(
        &self,
        args: &[S],
        path: &Path,
        append: bool,
    ) -> Result<(), CommandError> {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        self.echo(&args);
        command::exec_to_file(
            self.runtime.program(),
            &args,
            self.runtime.privilege(),
            path,
            append,
        )
        .await
    }

    // -- images -------------------------------------------------------------

    pub async fn image_inspect(&self, image: &str) -> ContainerResult<InspectDocument> {
        let raw = self.run(&["image", "inspect", image]).await?;
        InspectDocument::parse(image, &raw)
    }

    /// `export <container> | import --change ... - <image>`; returns the new image id.
    pub async fn export_import(
        &self,
        container: &str,
        changes: &[String],
        image: &str,
    ) -> Result<String, CommandError> {
        let source = ["export", container];
        let mut sink: Vec<&str> = vec!["import"];
        for change in changes {
            sink.push("--change");
            sink.push(change);
        }
        sink.push("-");
        sink.push(image);

        let shown = format!(
            "{} | {}",
            format_command_display(self.runtime.program(), &source, self.runtime.privilege()),
            format_command_display(self.runtime.program(), &sink, self.runtime.privilege())
        );
        info!("{shown}");
        command::pipe(
            self.runtime.program(),
            &source,
            &sink,
            self.runtime.privilege(),
        )
        .await
    }

    // -- containers ---------------------------------------------------------

    pub async fn create(&self, spec: &RunSpec) -> Result<String, CommandError> {
        self.run(&spec.args("create")).await
    }

    pub async fn run_container(&self, spec: &RunSpec) -> Result<String, CommandError> {
        self.run(&spec.args("run")).await
    }

    pub async fn start(&self, container: &str) -> Result<String, CommandError> {
        self.run(&["start", container]).await
    }

    pub async fn inspect(&self, container: &str) -> ContainerResult<InspectDocument> {
        let raw = self.run(&["inspect", container]).await?;
        InspectDocument::parse(container, &raw)
    }

    /// Force-remove containers, tolerating ones that do not exist.
    pub async fn remove_containers(&self, containers: &[&str]) {
        let mut args = vec!["rm", "-f"];
        args.extend_from_slice(containers);
        self.run_tolerant(&args).await;
    }

    /// `cp <src> <dest>`; either side may be `container:path`.
    pub async fn copy(&self, src: &str, dest: &str) -> Result<String, CommandError> {
        self.run(&["cp", src, dest]).await
    }

    /// Run `bash -c <script>` inside a container.
    pub async fn exec_bash(&self, container: &str, script: &str) -> Result<String, CommandError> {
        self.run(&["exec", container, "/bin/bash", "-c", script])
            .await
    }

    /// Like [`exec_bash`](Self::exec_bash) but detached (`exec -d`).
    pub async fn exec_bash_detached(
        &self,
        container: &str,
        script: &str,
    ) -> Result<String, CommandError> {
        self.run(&["exec", "-d", container, "/bin/bash", "-c", script])
            .await
    }

    /// Container logs with stdout and stderr merged in emission order.
    pub async fn logs(&self, container: &str) -> ContainerResult<String> {
        let tmp = tempfile::NamedTempFile::new()?;
        self.run_to_file(&["logs", container], tmp.path(), false)
            .await?;
        let bytes = tokio::fs::read(tmp.path()).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    // -- networks -----------------------------------------------------------

    /// Names of every network known to the runtime.
    pub async fn network_names(&self) -> ContainerResult<Vec<String>> {
        let raw = self
            .run(&["network", "ls", "--format", "{{.Name}}"])
            .await?;
        Ok(parse_names(&raw))
    }

    pub async fn network_create(&self, name: &str, subnet: &str) -> Result<String, CommandError> {
        self.run(&[
            "network",
            "create",
            "--attachable",
            "--subnet",
            subnet,
            "--ip-range",
            subnet,
            name,
        ])
        .await
    }

    /// Remove networks, tolerating ones that do not exist.
    pub async fn network_remove(&self, names: &[&str]) {
        let mut args = vec!["network", "rm"];
        args.extend_from_slice(names);
        self.run_tolerant(&args).await;
    }

    pub async fn network_connect(
        &self,
        network: &str,
        container: &str,
        ip: &str,
    ) -> Result<String, CommandError> {
        self.run(&["network", "connect", "--ip", ip, network, container])
            .await
    }
}

fn parse_names(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
