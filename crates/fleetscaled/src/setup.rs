//! Startup: options, cluster connection, and context assembly.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use fleetscale_autoscaler::{
    AutoscalingContext, EventRecorder, InMemoryCluster, LogEventRecorder, ResourceFitChecker,
    TracingEventRecorder, new_autoscaling_context,
};
use fleetscale_core::AutoscalingOptions;

/// Load and validate the options file.
pub fn load_options(path: &Path) -> anyhow::Result<AutoscalingOptions> {
    let options = AutoscalingOptions::from_file(path)
        .with_context(|| format!("loading options from {}", path.display()))?;
    info!(
        path = %path.display(),
        provider = %options.cloud_provider_name,
        expander = %options.expander_name,
        node_groups = options.node_groups.len(),
        "options loaded"
    );
    Ok(options)
}

/// Connect to the cluster. Without a snapshot the cluster is empty.
pub fn connect(snapshot: Option<&Path>) -> anyhow::Result<Arc<InMemoryCluster>> {
    let cluster = match snapshot {
        Some(path) => {
            let cluster = InMemoryCluster::from_json_file(path)?;
            info!(path = %path.display(), "cluster snapshot loaded");
            cluster
        }
        None => InMemoryCluster::default(),
    };
    Ok(Arc::new(cluster))
}

/// Assemble the autoscaling context against `cluster`.
///
/// Assembly errors are returned unwrapped so callers can downcast to
/// [`fleetscale_autoscaler::AutoscalerError`].
pub fn assemble(
    options: AutoscalingOptions,
    cluster: Arc<InMemoryCluster>,
) -> anyhow::Result<Arc<AutoscalingContext>> {
    let recorder: Arc<dyn EventRecorder> = Arc::new(TracingEventRecorder);
    let log_recorder = Arc::new(LogEventRecorder::for_status(
        Arc::clone(&recorder),
        &options.config_namespace,
        options.write_status_config_map,
    ));
    let listers = cluster.lister_registry();

    let context = new_autoscaling_context(
        options,
        Arc::new(ResourceFitChecker::new()),
        cluster,
        recorder,
        log_recorder,
        &listers,
    )?;
    Ok(Arc::new(context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetscale_autoscaler::{AutoscalerError, ClusterClient};
    use std::io::Write;

    fn write_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn load_options_reports_path() {
        let err = load_options(Path::new("/nonexistent/options.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/options.toml"));
    }

    #[test]
    fn connect_without_snapshot_is_empty() {
        let cluster = connect(None).unwrap();
        assert!(cluster.list_nodes().unwrap().is_empty());
    }

    #[test]
    fn connect_reads_snapshot() {
        let file = write_file(
            r#"{ "nodes": [{ "name": "n1", "provider_id": "static://pool-a/0" }] }"#,
        );
        let cluster = connect(Some(file.path())).unwrap();
        assert_eq!(cluster.list_nodes().unwrap().len(), 1);
    }

    #[test]
    fn assemble_from_options_file() {
        let file = write_file(
            r#"
[autoscaling]
expander_name = "most-pods"
node_groups = ["1:4:pool-a"]
config_namespace = "fleetscale"
"#,
        );
        let options = load_options(file.path()).unwrap();
        let ctx = assemble(options, connect(None).unwrap()).unwrap();

        assert_eq!(ctx.expander_strategy.name(), "most-pods");
        assert_eq!(ctx.log_recorder.status_object().namespace, "fleetscale");
    }

    #[test]
    fn assembly_error_can_be_downcast() {
        let options = AutoscalingOptions {
            expander_name: "unknown-strategy".to_string(),
            ..AutoscalingOptions::default()
        };
        let err = assemble(options, connect(None).unwrap()).unwrap_err();
        let err = err.downcast_ref::<AutoscalerError>().unwrap();
        assert!(!err.is_fatal());
    }
}
