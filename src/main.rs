// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use elasticop::constants::{ERROR_REQUEUE_DURATION_SECS, TOKIO_WORKER_THREADS};
use elasticop::context::Context;
use elasticop::crd::Kibana;
use elasticop::metrics;
use elasticop::names::NamespacedName;
use elasticop::reconcilers::reconcile_kibana;
use elasticop::roles::{validate_roles, Parameters, Role};
use elasticop::watches::{EventMeta, Handler, WatchEvent, WatchRegistry, WatchedKind};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, Secret, Service};
use kube::api::ObjectMeta;
use kube::runtime::controller::Action;
use kube::runtime::events::{Recorder, Reporter};
use kube::runtime::reflector::ObjectRef;
use kube::runtime::{watcher, Controller};
use kube::{Api, Client, Resource, ResourceExt};
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

/// Elastic Stack Operator for Kubernetes.
#[derive(Parser, Debug)]
#[command(name = "elasticop", version)]
struct Cli {
    /// Roles this process assumes: namespace, global, webhook, all.
    #[arg(long, value_delimiter = ',', default_value = "all")]
    roles: Vec<String>,

    /// Restrict reconciliation to a single namespace (all namespaces when unset).
    #[arg(long)]
    namespace: Option<String>,

    /// Image of the running operator, recorded for telemetry.
    #[arg(long, default_value = "")]
    operator_image: String,

    /// Port of the Prometheus metrics endpoint.
    #[arg(long, default_value_t = elasticop::constants::METRICS_SERVER_PORT)]
    metrics_port: u16,

    /// Seconds before HTTP CA expiry at which a rotation is triggered.
    #[arg(long, default_value_t = elasticop::constants::CA_ROTATE_BEFORE_SECS)]
    ca_rotate_before_secs: u64,
}

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("elasticop-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    // Respects RUST_LOG environment variable if set, otherwise defaults to INFO level
    // Respects RUST_LOG_FORMAT=json for structured output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    let cli = Cli::parse();
    let roles = validate_roles(&cli.roles)?;
    info!(?roles, "Starting Elastic Stack Operator");

    let client = Client::try_default().await?;
    let reporter = Reporter {
        controller: "elasticop".into(),
        instance: std::env::var("HOSTNAME").ok(),
    };
    let recorder = Recorder::new(client.clone(), reporter);

    let parameters = Parameters {
        operator_image: cli.operator_image.clone(),
        metrics_port: cli.metrics_port,
        ca_rotate_before: Duration::from_secs(cli.ca_rotate_before_secs),
        dialer: None,
    };
    let operator_version = semver::Version::parse(env!("CARGO_PKG_VERSION"))?;
    let ctx = Arc::new(Context::new(client.clone(), recorder, parameters, operator_version));

    // metrics are served in every role
    let metrics_task = tokio::spawn(metrics::serve(ctx.metrics.clone(), cli.metrics_port));

    let reconciling = roles
        .iter()
        .any(|r| matches!(r, Role::Namespace | Role::Global | Role::All))
        || roles.is_empty();
    if !reconciling {
        // webhook-only process: admission serving lives outside this crate,
        // keep the process alive for the metrics endpoint
        info!("No reconciling role selected, idling");
        metrics_task.await??;
        return Ok(());
    }

    run_kibana_controller(client, ctx, cli.namespace).await
}

/// Run the Kibana controller until shutdown.
async fn run_kibana_controller(
    client: Client,
    ctx: Arc<Context>,
    namespace: Option<String>,
) -> Result<()> {
    info!("Starting Kibana controller");

    let kibanas: Api<Kibana> = match &namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };
    let deployments: Api<Deployment> = Api::all(client.clone());
    let services: Api<Service> = Api::all(client.clone());
    let secrets: Api<Secret> = Api::all(client.clone());

    // create/delete events of Kibana-owned pods and deployments feed the
    // expectation tracker, keeping the work queue in step with the apiserver
    for kind in [WatchedKind::Pod, WatchedKind::Deployment] {
        ctx.watches.add_handler(
            kind,
            "expectations",
            Handler::ExpectationObserver {
                owner_kind: elasticop::constants::KIND_KIBANA.to_string(),
                expectations: Arc::clone(&ctx.expectations),
            },
        );
    }
    tokio::spawn(observe_owned_events::<Pod>(
        Api::all(client.clone()),
        WatchedKind::Pod,
        Arc::clone(&ctx.watches),
    ));
    tokio::spawn(observe_owned_events::<Deployment>(
        Api::all(client.clone()),
        WatchedKind::Deployment,
        Arc::clone(&ctx.watches),
    ));

    // dynamically registered secret watches (secure settings, CA certs,
    // credentials) resolve through the registry
    let registry = Arc::clone(&ctx.watches);
    let secret_mapper = move |secret: Secret| {
        let event = WatchEvent::Generic(event_meta(secret.meta()));
        registry
            .dispatch(WatchedKind::Secret, &event)
            .into_iter()
            .map(request_to_object_ref)
            .collect::<Vec<_>>()
    };

    Controller::new(kibanas, watcher::Config::default())
        .owns(deployments, watcher::Config::default())
        .owns(services, watcher::Config::default())
        .watches(secrets, watcher::Config::default(), secret_mapper)
        .shutdown_on_signal()
        .run(reconcile_wrapper, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, _)) => debug!(object = %obj, "Reconciled"),
                Err(e) => warn!(error = %e, "Reconcile failed"),
            }
        })
        .await;

    info!("Kibana controller stopped");
    Ok(())
}

/// Reconcile wrapper for `Kibana`
async fn reconcile_wrapper(
    kb: Arc<Kibana>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    match reconcile_kibana(Arc::clone(&kb), ctx).await {
        Ok(action) => Ok(action),
        Err(e) => {
            error!(kibana = %kb.name_any(), error = %e, "Failed to reconcile Kibana");
            Err(e.into())
        }
    }
}

/// Error policy for the controller
fn error_policy(_resource: Arc<Kibana>, _err: &ReconcileError, _ctx: Arc<Context>) -> Action {
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

fn request_to_object_ref(request: NamespacedName) -> ObjectRef<Kibana> {
    ObjectRef::new(&request.name).within(&request.namespace)
}

/// Extract the registry event metadata from an object.
fn event_meta(meta: &ObjectMeta) -> EventMeta {
    let mut event = EventMeta::new(
        meta.namespace.as_deref().unwrap_or_default(),
        meta.name.as_deref().unwrap_or_default(),
    );
    if let Some(owner) = meta
        .owner_references
        .iter()
        .flatten()
        .find(|o| o.controller == Some(true))
    {
        event = event.with_owner(&owner.kind, &owner.name);
    }
    event
}

/// Feed create/delete events of one owned kind to the expectation observer.
///
/// The raw watcher does not distinguish creations from updates, so first
/// sight of an object id counts as its creation and ids are tracked until
/// their deletion is observed.
async fn observe_owned_events<K>(api: Api<K>, kind: WatchedKind, registry: Arc<WatchRegistry>)
where
    K: Resource<DynamicType = ()>
        + Clone
        + std::fmt::Debug
        + Send
        + serde::de::DeserializeOwned
        + 'static,
{
    let mut seen: std::collections::HashSet<NamespacedName> = std::collections::HashSet::new();
    let mut stream = std::pin::pin!(watcher(api, watcher::Config::default()));

    while let Some(event) = stream.next().await {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                warn!(?kind, error = %e, "Watch stream error, backing off");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        let registry_event = match event {
            watcher::Event::Apply(obj) | watcher::Event::InitApply(obj) => {
                let meta = event_meta(obj.meta());
                if !seen.insert(meta.id.clone()) {
                    continue; // update, not a creation
                }
                WatchEvent::Created(meta)
            }
            watcher::Event::Delete(obj) => {
                let meta = event_meta(obj.meta());
                seen.remove(&meta.id);
                WatchEvent::Deleted(meta)
            }
            watcher::Event::Init | watcher::Event::InitDone => continue,
        };

        // expectation observation only; these handlers enqueue nothing
        let _ = registry.dispatch(kind, &registry_event);
    }
}
