use clap::Args;
use container_cli::{ContainerCli, RunSpec, Runtime};
use tracing::info;

use crate::error::CiResult;

/// Throwaway container the image filesystem is exported from.
const FLATTEN_CONTAINER: &str = "test-flatten";

#[derive(Args, Debug)]
pub struct FlattenArgs {
    /// Image to flatten, in `name:tag` form.
    #[arg(long, short = 't')]
    pub tag: String,
}

/// Image metadata lost by `export` and re-applied on `import`.
pub fn image_changes(runtime: Runtime) -> Vec<String> {
    vec![
        runtime.path_env_change(),
        "WORKDIR /openair-spgwc".to_string(),
        "EXPOSE 2123/udp".to_string(),
        "EXPOSE 8805/udp".to_string(),
        r#"LABEL use-json-file="true""#.to_string(),
        r#"LABEL support-multi-sgwu-instances="true""#.to_string(),
        r#"CMD ["/openair-spgwc/bin/oai_spgwc", "-c", "/openair-spgwc/etc/spgw_c.json", "-o"]"#
            .to_string(),
        r#"ENTRYPOINT ["/bin/bash", "/openair-spgwc/bin/entrypoint.sh"]"#.to_string(),
    ]
}

/// Squash `tag` into a single layer. The original image is left dangling.
pub async fn flatten(cli: ContainerCli, tag: &str) -> CiResult<String> {
    let runtime = cli.runtime();
    info!("Flattening {tag}");

    let spec = RunSpec {
        name: FLATTEN_CONTAINER.to_string(),
        image: tag.to_string(),
        entrypoint: Some("/bin/true".to_string()),
        detach: true,
        ..RunSpec::default()
    };
    cli.run_container(&spec).await?;

    let target = runtime.local_image(tag);
    let imported = cli
        .export_import(FLATTEN_CONTAINER, &image_changes(runtime), &target)
        .await;
    cli.remove_containers(&[FLATTEN_CONTAINER]).await;
    let id = imported?;

    info!(image = %target, id = %id, "flattened");
    Ok(target)
}

pub async fn run_flatten(args: FlattenArgs) -> CiResult<()> {
    let runtime = Runtime::detect()?;
    flatten(ContainerCli::new(runtime), &args.tag).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docker_changes_use_space_path_syntax() {
        let changes = image_changes(Runtime::Docker);
        assert_eq!(changes.len(), 8);
        assert!(changes[0].starts_with("ENV PATH /usr/local/sbin"));
        assert_eq!(changes[1], "WORKDIR /openair-spgwc");
        assert!(changes.contains(&r#"LABEL support-multi-sgwu-instances="true""#.to_string()));
        assert_eq!(
            changes[7],
            r#"ENTRYPOINT ["/bin/bash", "/openair-spgwc/bin/entrypoint.sh"]"#
        );
    }

    #[test]
    fn podman_changes_use_equals_path_syntax() {
        let changes = image_changes(Runtime::Podman);
        assert!(changes[0].starts_with("ENV PATH=/usr/local/sbin"));
    }
}
