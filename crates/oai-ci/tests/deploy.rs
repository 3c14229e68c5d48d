//! Sanity-check deployment steps driven against a scripted `docker` stand-in.

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing
)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

const FAKE_DOCKER: &str = r#"#!/bin/sh
echo "$*" >> "$FAKE_DOCKER_LOG"
case "$1" in
  image)
    if [ -n "$FAKE_DOCKER_INSPECT" ] && [ -f "$FAKE_DOCKER_INSPECT" ]; then
      cat "$FAKE_DOCKER_INSPECT"
      exit 0
    fi
    echo "Error: No such image: $3" >&2
    exit 1
    ;;
  inspect)
    if [ -n "$FAKE_DOCKER_CONTAINER" ] && [ -f "$FAKE_DOCKER_CONTAINER" ]; then
      cat "$FAKE_DOCKER_CONTAINER"
      exit 0
    fi
    echo "Error: No such object: $2" >&2
    exit 1
    ;;
  network)
    case "$2" in
      ls) printf 'bridge\nci-s11\n' ;;
      rm) echo "Error: network $3 not found" >&2; exit 1 ;;
    esac
    ;;
  rm)
    echo "Error: No such container: $3" >&2
    exit 1
    ;;
  exec)
    echo "exec output"
    ;;
  logs)
    printf 'config line\nOptions parsed\nrun line\n'
    ;;
esac
exit 0
"#;

const ENTRYPOINT_IMAGE: &str = r#"[{"Id":"sha256:01","Config":{"Entrypoint":["/bin/bash","/openair-spgwc/bin/entrypoint.sh"],"Labels":{}}}]"#;

const LEGACY_IMAGE: &str = r#"[{"Id":"sha256:02","Config":{"Entrypoint":null,"Cmd":["/bin/bash"]}}]"#;

const PLAIN_SPGWC_CONTAINER: &str = r#"[{"Id":"c0ffee","Config":{"Labels":{}}}]"#;

const MULTI_SGWU_CONTAINER: &str = r#"[{"Id":"c0ffee","Config":{"Labels":{"support-multi-sgwu-instances":"true"}}}]"#;

struct Harness {
    dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir(&bin).unwrap();
        let docker = bin.join("docker");
        std::fs::write(&docker, FAKE_DOCKER).unwrap();
        std::fs::set_permissions(&docker, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(
            dir.path().join("deploy.yaml"),
            "archives_dir: archives\nwork_dir: work\nstartup_wait_secs: 0\nlog_wait_secs: 0\n",
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn with_image(self, inspect: &str) -> Self {
        std::fs::write(self.path("image.json"), inspect).unwrap();
        self
    }

    fn with_container(self, inspect: &str) -> Self {
        std::fs::write(self.path("container.json"), inspect).unwrap();
        self
    }

    fn cmd(&self, action: &str) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("oai-ci");
        cmd.env("PATH", format!("{}:/usr/bin:/bin", self.path("bin").display()))
            .env("FAKE_DOCKER_LOG", self.path("docker.log"))
            .env("FAKE_DOCKER_INSPECT", self.path("image.json"))
            .env("FAKE_DOCKER_CONTAINER", self.path("container.json"))
            .args(["sanity-check-deploy", "--action", action])
            .arg("--config")
            .arg(self.path("deploy.yaml"));
        cmd
    }

    fn docker_calls(&self) -> Vec<String> {
        read(&self.path("docker.log")).lines().map(str::to_string).collect()
    }
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

#[test]
fn create_networks_removes_stale_ones_first() {
    let h = Harness::new();
    h.cmd("CreateNetworks").assert().success();

    let calls = h.docker_calls();
    assert_eq!(calls[0], "network ls --format {{.Name}}");
    assert_eq!(calls[1], "network rm ci-sx ci-s11 ci-s1u");
    let creates: Vec<_> = calls.iter().filter(|c| c.starts_with("network create")).collect();
    assert_eq!(creates.len(), 3);
    assert!(creates[0].ends_with("192.168.28.0/24 ci-s11"));
    assert!(creates[2].contains("--subnet 192.168.30.0/24"));
}

#[test]
fn deploy_spgwc_with_entrypoint_archives_config_log() {
    let h = Harness::new().with_image(ENTRYPOINT_IMAGE);
    h.cmd("DeploySPGWC").args(["--tag", "develop"]).assert().success();

    let calls = h.docker_calls();
    assert_eq!(calls[0], "image inspect oai-spgwc:develop");
    assert!(calls.iter().any(|c| c.starts_with("create ") && c.contains("oai-spgwc:develop")));
    assert!(calls.contains(&"network connect --ip 192.168.29.2 ci-sx ci-oai-spgwc".to_string()));
    assert!(calls.contains(&"start ci-oai-spgwc".to_string()));

    assert_eq!(read(&h.path("archives/spgwc_config.log")), "config line\n");
    let env = read(&h.path("work/spgwc-env.list"));
    assert!(env.contains("SGW_INTERFACE_NAME_FOR_S11=eth0"));
}

#[test]
fn retrieve_logs_with_entrypoint_keeps_run_part() {
    let h = Harness::new().with_image(ENTRYPOINT_IMAGE);
    h.cmd("RetrieveLogsSPGWU").args(["--tag", "develop"]).assert().success();

    assert_eq!(
        read(&h.path("archives/spgwu_check_run.log")),
        "Options parsed\nrun line\n"
    );
}

#[test]
fn entrypoint_image_needs_no_manual_start_or_stop() {
    let h = Harness::new().with_image(ENTRYPOINT_IMAGE);
    h.cmd("StartSPGWC").args(["--tag", "develop"]).assert().success();
    h.cmd("StopSPGWC").args(["--tag", "develop"]).assert().success();

    assert_eq!(
        h.docker_calls(),
        ["image inspect oai-spgwc:develop", "image inspect oai-spgwc:develop"]
    );
}

#[test]
fn deploy_spgwc_legacy_runs_config_script() {
    let h = Harness::new().with_image(LEGACY_IMAGE);
    h.cmd("DeploySPGWC").args(["--tag", "v1.0"]).assert().success();

    let script = h.path("work/spgwc-cfg.sh");
    assert_eq!(
        h.docker_calls(),
        [
            "image inspect oai-spgwc:v1.0".to_string(),
            "run --privileged --name ci-oai-spgwc --network ci-s11 --ip 192.168.28.2 -d oai-spgwc:v1.0 /bin/bash -c sleep infinity".to_string(),
            "network connect --ip 192.168.29.2 ci-sx ci-oai-spgwc".to_string(),
            format!("cp {} ci-oai-spgwc:/openair-spgwc", script.display()),
            "exec ci-oai-spgwc /bin/bash -c cd /openair-spgwc && chmod 777 spgwc-cfg.sh && ./spgwc-cfg.sh".to_string(),
        ]
    );
    assert!(read(&script).starts_with("#!/bin/bash"));
    assert_eq!(read(&h.path("archives/spgwc_config.log")), "exec output\n");
}

#[test]
fn deploy_spgwu_legacy_runs_config_script() {
    let h = Harness::new()
        .with_image(LEGACY_IMAGE)
        .with_container(PLAIN_SPGWC_CONTAINER);
    std::fs::create_dir(h.path("archives")).unwrap();
    std::fs::write(h.path("archives/spgwu_config.log"), "earlier run\n").unwrap();
    h.cmd("DeploySPGWU").args(["--tag", "v1.0"]).assert().success();

    let script = h.path("work/spgwu-cfg.sh");
    assert_eq!(
        h.docker_calls(),
        [
            "inspect ci-oai-spgwc".to_string(),
            "image inspect oai-spgwu-tiny:v1.0".to_string(),
            "run --privileged --name ci-oai-spgwu --network ci-s1u --ip 192.168.30.3 -d oai-spgwu-tiny:v1.0 /bin/bash -c sleep infinity".to_string(),
            "network connect --ip 192.168.29.3 ci-sx ci-oai-spgwu".to_string(),
            format!("cp {} ci-oai-spgwu:/openair-spgwu-tiny", script.display()),
            "exec ci-oai-spgwu /bin/bash -c cd /openair-spgwu-tiny && chmod 777 spgwu-cfg.sh && ./spgwu-cfg.sh".to_string(),
        ]
    );
    assert!(read(&script).contains("192.168.29.2"));
    assert_eq!(
        read(&h.path("archives/spgwu_config.log")),
        "earlier run\nexec output\n"
    );
}

#[test]
fn legacy_stop_kills_the_daemon() {
    let h = Harness::new().with_image(LEGACY_IMAGE);
    h.cmd("StopSPGWC").args(["--tag", "v1.0"]).assert().success();

    assert_eq!(
        h.docker_calls(),
        [
            "image inspect oai-spgwc:v1.0",
            "exec ci-oai-spgwc /bin/bash -c killall oai_spgwc",
        ]
    );
}

#[test]
fn legacy_image_is_started_by_hand() {
    let h = Harness::new().with_image(LEGACY_IMAGE);
    h.cmd("StartSPGWC").args(["--tag", "v1.0"]).assert().success();

    let calls = h.docker_calls();
    let daemon = calls.iter().find(|c| c.starts_with("exec -d ci-oai-spgwc")).unwrap();
    assert!(daemon.contains("nohup ./bin/oai_spgwc -o -c ./etc/spgw_c.conf > spgwc_check_run.log 2>&1"));
}

#[test]
fn legacy_logs_are_copied_out_of_the_container() {
    let h = Harness::new().with_image(LEGACY_IMAGE);
    h.cmd("RetrieveLogsSPGWC").args(["--tag", "v1.0"]).assert().success();

    let archives = h.path("archives");
    let expected = format!(
        "cp ci-oai-spgwc:/openair-spgwc/spgwc_check_run.log {}",
        archives.display()
    );
    assert!(h.docker_calls().contains(&expected));
}

#[test]
fn spgwu_falls_back_to_multi_spgwu_build() {
    let h = Harness::new()
        .with_image(ENTRYPOINT_IMAGE)
        .with_container(MULTI_SGWU_CONTAINER);
    h.cmd("DeploySPGWU").args(["--tag", "develop"]).assert().success();

    let calls = h.docker_calls();
    assert_eq!(calls[0], "inspect ci-oai-spgwc");
    assert!(calls.contains(&"image inspect oai-spgwu-tiny:multi-spgwu".to_string()));
    assert!(calls.iter().any(|c| c.starts_with("create ") && c.contains("oai-spgwu-tiny:multi-spgwu")));
}

#[test]
fn inspect_failure_exits_255() {
    let h = Harness::new();
    h.cmd("StopSPGWC")
        .args(["--tag", "develop"])
        .assert()
        .code(255)
        .stderr(predicate::str::contains("oai-spgwc:develop"));
}

#[test]
fn per_function_action_without_tag_is_a_usage_error() {
    let h = Harness::new();
    h.cmd("DeploySPGWC")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Missing OAI-SPGWC image tag"));
    assert!(h.docker_calls().is_empty());
}

#[test]
fn remove_networks_tolerates_missing_ones() {
    let h = Harness::new();
    h.cmd("RemoveNetworks").assert().success();
    assert_eq!(h.docker_calls(), ["network rm ci-sx ci-s11 ci-s1u"]);
}

#[test]
fn remove_all_containers_tolerates_missing_ones() {
    let h = Harness::new();
    h.cmd("removeallcontainers").assert().success();
    assert_eq!(h.docker_calls(), ["rm -f ci-oai-spgwc ci-oai-spgwu"]);
}
