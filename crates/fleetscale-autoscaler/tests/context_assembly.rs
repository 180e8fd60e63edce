//! Context assembly tests.
//!
//! Builds full autoscaling contexts from options the way the daemon does
//! and checks what ends up wired into them.

use std::io::Write;
use std::sync::{Arc, Mutex};

use fleetscale_autoscaler::*;
use fleetscale_cloudprovider::{
    CloudProvider, CloudProviderError, CloudProviderResult, NodeGroupDiscoveryOptions,
    ProviderBuildContext, ProviderRegistry, StaticCloudProvider,
};
use fleetscale_core::{AutoscalingOptions, NodeTemplate, Pod};

struct Harness {
    cluster: Arc<InMemoryCluster>,
    events: Arc<MemoryEventRecorder>,
    log_recorder: Arc<LogEventRecorder>,
    listers: StaticListerRegistry,
}

fn harness() -> Harness {
    let cluster = Arc::new(InMemoryCluster::default());
    let events = Arc::new(MemoryEventRecorder::new());
    let log_recorder = Arc::new(LogEventRecorder::for_status(
        events.clone(),
        "kube-system",
        true,
    ));
    let listers = cluster.lister_registry();
    Harness {
        cluster,
        events,
        log_recorder,
        listers,
    }
}

fn assemble_with(
    providers: &ProviderRegistry,
    options: AutoscalingOptions,
    h: &Harness,
) -> Result<AutoscalingContext, AutoscalerError> {
    new_autoscaling_context_with_providers(
        providers,
        options,
        Arc::new(ResourceFitChecker::new()),
        h.cluster.clone(),
        h.events.clone(),
        h.log_recorder.clone(),
        &h.listers,
    )
}

fn assemble(
    options: AutoscalingOptions,
    h: &Harness,
) -> Result<AutoscalingContext, AutoscalerError> {
    new_autoscaling_context(
        options,
        Arc::new(ResourceFitChecker::new()),
        h.cluster.clone(),
        h.events.clone(),
        h.log_recorder.clone(),
        &h.listers,
    )
}

fn static_options(groups: &[&str]) -> AutoscalingOptions {
    AutoscalingOptions {
        node_groups: groups.iter().map(|g| g.to_string()).collect(),
        ..AutoscalingOptions::default()
    }
}

/// A registry whose "recording" provider captures the discovery options
/// it was built with.
fn recording_registry() -> (ProviderRegistry, Arc<Mutex<Vec<NodeGroupDiscoveryOptions>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_by_ctor = Arc::clone(&seen);
    let registry = ProviderRegistry::with_defaults().with_provider(
        "recording",
        Arc::new(
            move |ctx: &ProviderBuildContext<'_>| -> CloudProviderResult<Arc<dyn CloudProvider>> {
                seen_by_ctor.lock().unwrap().push(ctx.discovery.clone());
                let provider =
                    StaticCloudProvider::build("", &NodeGroupDiscoveryOptions::default())?;
                Ok(Arc::new(provider))
            },
        ),
    );
    (registry, seen)
}

#[test]
fn valid_options_produce_complete_context() {
    let h = harness();
    let options = static_options(&["1:5:pool-a", "0:10:pool-b"]);
    let ctx = assemble(options, &h).unwrap();

    assert_eq!(ctx.cloud_provider.name(), "static");
    assert_eq!(ctx.cloud_provider.node_groups().len(), 2);
    assert_eq!(ctx.expander_strategy.name(), "random");
    assert!(ctx.cluster_state_registry.is_cluster_healthy());
    assert!(ctx.predicate_checker.fits(
        &Pod::new("default", "web", 100, 0),
        &NodeTemplate {
            cpu_millis: 1000,
            ..Default::default()
        },
    ));
    assert!(ctx.log_recorder.is_active());
}

#[test]
fn caller_collaborators_are_stored_as_given() {
    let h = harness();
    let ctx = assemble(static_options(&["1:3:pool-a"]), &h).unwrap();

    let client: Arc<dyn ClusterClient> = h.cluster.clone();
    let recorder: Arc<dyn EventRecorder> = h.events.clone();
    assert!(Arc::ptr_eq(&ctx.client, &client));
    assert!(Arc::ptr_eq(&ctx.recorder, &recorder));
    assert!(Arc::ptr_eq(&ctx.log_recorder, &h.log_recorder));
}

#[test]
fn options_are_stored_unchanged() {
    let h = harness();
    let mut options = static_options(&["1:3:pool-a"]);
    options.expander_name = "least-waste".to_string();
    options.max_nodes_total = 42;
    options.write_status_config_map = false;

    let ctx = assemble(options.clone(), &h).unwrap();
    assert_eq!(ctx.options, options);
}

#[test]
fn provider_is_shared_with_the_registry() {
    let h = harness();
    let ctx = assemble(static_options(&["1:3:pool-a"]), &h).unwrap();
    assert!(Arc::ptr_eq(
        &ctx.cloud_provider,
        ctx.cluster_state_registry.cloud_provider()
    ));
}

#[test]
fn registry_config_comes_from_options() {
    let h = harness();
    let mut options = static_options(&[]);
    options.max_total_unready_percentage = 0.45;
    options.ok_total_unready_count = 3;

    let ctx = assemble(options, &h).unwrap();
    let config = ctx.cluster_state_registry.config();
    assert_eq!(config.max_total_unready_percentage, 0.45);
    assert_eq!(config.ok_total_unready_count, 3);
}

#[test]
fn discovery_options_reach_the_provider() {
    let h = harness();
    let (registry, seen) = recording_registry();
    let mut options = static_options(&["group-a", "group-b"]);
    options.cloud_provider_name = "recording".to_string();

    assemble_with(&registry, options, &h).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1, "provider must be built exactly once");
    assert_eq!(seen[0].node_group_specs, vec!["group-a", "group-b"]);
    assert_eq!(seen[0].node_group_auto_discovery_spec, "");
}

#[test]
fn unknown_expander_fails_with_its_name() {
    let h = harness();
    let mut options = static_options(&["1:3:pool-a"]);
    options.expander_name = "unknown-strategy".to_string();

    let err = assemble(options, &h).unwrap_err();
    assert!(matches!(err, AutoscalerError::Expander { .. }));
    assert_eq!(err.error_type(), ErrorType::Configuration);
    assert!(!err.is_fatal());
    assert!(err.to_string().contains("unknown-strategy"));
}

#[test]
fn price_expander_without_pricing_is_rejected() {
    let h = harness();
    let mut options = static_options(&["1:3:pool-a"]);
    options.expander_name = "price".to_string();

    let err = assemble(options, &h).unwrap_err();
    assert!(matches!(err, AutoscalerError::Expander { .. }));
}

#[test]
fn price_expander_with_pricing_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[pricing]
cpu_core_hour = 0.03
memory_gib_hour = 0.004

[[node_group]]
id = "pool-a"
min_size = 1
max_size = 3
cpu_millis = 2000
memory_bytes = 8589934592
"#
    )
    .unwrap();

    let h = harness();
    let mut options = static_options(&["1:3:pool-a"]);
    options.expander_name = "price".to_string();
    options.cloud_config = file.path().display().to_string();

    let ctx = assemble(options, &h).unwrap();
    assert_eq!(ctx.expander_strategy.name(), "price");
    assert!(ctx.cloud_provider.pricing().is_some());
}

#[test]
fn unknown_provider_is_fatal() {
    let h = harness();
    let mut options = static_options(&["1:3:pool-a"]);
    options.cloud_provider_name = "nonexistent".to_string();

    let err = assemble(options, &h).unwrap_err();
    assert!(matches!(
        err,
        AutoscalerError::CloudProvider {
            source: CloudProviderError::UnknownProvider(_),
            ..
        }
    ));
    assert!(err.is_fatal());
}

#[test]
fn malformed_node_group_spec_is_fatal() {
    let h = harness();
    let err = assemble(static_options(&["pool-a"]), &h).unwrap_err();
    assert_eq!(err.error_type(), ErrorType::CloudProvider);
}

#[test]
fn missing_cloud_config_is_fatal() {
    let h = harness();
    let mut options = static_options(&["1:3:pool-a"]);
    options.cloud_config = "/nonexistent/cloud.toml".to_string();

    let err = assemble(options, &h).unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("/nonexistent/cloud.toml"));
}

#[test]
fn provider_failure_skips_later_steps() {
    let h = harness();
    let (registry, _) = recording_registry();
    let registry = registry.with_provider(
        "broken",
        Arc::new(
            |_: &ProviderBuildContext<'_>| -> CloudProviderResult<Arc<dyn CloudProvider>> {
                Err(CloudProviderError::Config {
                    path: "cloud.toml".to_string(),
                    reason: "credentials rejected".to_string(),
                })
            },
        ),
    );
    let mut options = static_options(&[]);
    options.cloud_provider_name = "broken".to_string();
    // Would fail too, but provider failure is reported first.
    options.expander_name = "unknown-strategy".to_string();

    let err = assemble_with(&registry, options, &h).unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("credentials rejected"));
}

#[test]
fn repeated_assembly_builds_independent_contexts() {
    let h = harness();
    let options = static_options(&["1:3:pool-a"]);

    let a = assemble(options.clone(), &h).unwrap();
    let b = assemble(options, &h).unwrap();

    assert!(!Arc::ptr_eq(&a.cloud_provider, &b.cloud_provider));
    assert!(!Arc::ptr_eq(&a.cluster_state_registry, &b.cluster_state_registry));
    assert!(!Arc::ptr_eq(&a.expander_strategy, &b.expander_strategy));

    // Growing a group through one context leaves the other untouched.
    a.cloud_provider.node_groups()[0].increase_size(1).unwrap();
    assert_eq!(a.cloud_provider.node_groups()[0].target_size().unwrap(), 2);
    assert_eq!(b.cloud_provider.node_groups()[0].target_size().unwrap(), 1);
}

#[test]
fn log_recorder_writes_to_status_object() {
    let h = harness();
    let ctx = assemble(static_options(&["1:3:pool-a"]), &h).unwrap();

    ctx.log_recorder.info("ScaleUp", "pool-a 1 -> 2");
    assert_eq!(ctx.log_recorder.flush(), 1);

    let events = h.events.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].object, ObjectReference::status("kube-system"));
    assert_eq!(events[0].reason, "ScaleUp");
}
