use std::fmt::Debug;
use std::sync::Arc;

use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::{
    Api, Client, Resource,
    config::KubeConfigOptions,
    runtime::controller,
};
use serde::de::DeserializeOwned;
use tracing::info;

pub mod config;
pub mod controllers;
pub mod credentials;
pub mod crds;
pub mod error;
pub mod merge;
pub mod meta;
pub mod ownership;
pub mod store;
pub mod telemetry;

use config::Settings;
use controllers::{CertificateReconciler, InstanceReconciler, UserReconciler};
use crds::{SqlInstance, SqlSslCert, SqlUser};
use store::KubeStore;
use telemetry::RequeueCounters;

/// Field manager recorded on every write.
pub const FIELD_MANAGER: &str = "sqeletor";

/// Runs the certificate, instance and user controllers until a shutdown
/// signal is received.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let options = KubeConfigOptions::default();

    // Load kubeconfig if it's present otherwise fall back to cluster config
    let config = kube::Config::from_kubeconfig(&options)
        .await
        .or_else(|_| kube::Config::incluster())?;
    let client = Client::try_from(config)?;

    let requeues = RequeueCounters::register();
    let certs = Arc::new(KubeStore::<SqlSslCert>::new(client.clone(), FIELD_MANAGER));
    let instances = Arc::new(KubeStore::<SqlInstance>::new(client.clone(), FIELD_MANAGER));
    let users = Arc::new(KubeStore::<SqlUser>::new(client.clone(), FIELD_MANAGER));
    let secrets = Arc::new(KubeStore::<Secret>::new(client.clone(), FIELD_MANAGER));
    let policies = Arc::new(KubeStore::<NetworkPolicy>::new(client.clone(), FIELD_MANAGER));

    let certificate = Arc::new(CertificateReconciler::new(
        certs,
        secrets.clone(),
        settings.cert_key_layout(),
        requeues.certificate,
    ));
    let instance = Arc::new(InstanceReconciler::new(
        instances.clone(),
        policies,
        requeues.instance,
    ));
    let user = Arc::new(UserReconciler::new(
        users,
        instances,
        secrets,
        settings.cert_paths(),
        requeues.user,
    ));

    let namespace = settings.watch_namespace();
    let controller_config = controller::Config::default().concurrency(settings.concurrency);
    info!(
        namespace = namespace.unwrap_or("<all>"),
        concurrency = settings.concurrency,
        "starting controllers"
    );

    tokio::join!(
        controllers::run(
            certificate,
            api::<SqlSslCert>(&client, namespace),
            api::<Secret>(&client, namespace),
            controller_config.clone(),
        ),
        controllers::run(
            instance,
            api::<SqlInstance>(&client, namespace),
            api::<NetworkPolicy>(&client, namespace),
            controller_config.clone(),
        ),
        controllers::run(
            user,
            api::<SqlUser>(&client, namespace),
            api::<Secret>(&client, namespace),
            controller_config,
        ),
    );

    info!("controllers stopped");
    Ok(())
}

fn api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
    K::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}
