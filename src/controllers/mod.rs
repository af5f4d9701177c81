//! The three reconcilers and the controller loop that drives them.
//!
//! Each reconciler receives the namespaced name of its source object,
//! re-reads it and upserts one secondary resource. The returned [`Action`]
//! follows the failure taxonomy in [`crate::error`]:
//!
//! - success and ignorable outcomes wait for the next change,
//! - temporary failures requeue after [`TEMPORARY_FAILURE_REQUEUE`],
//! - permanent failures are returned as errors and are not requeued.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use kube::runtime::controller::{self, Action, Controller};
use kube::runtime::watcher;
use kube::{Api, Resource};
use metrics::Counter;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::error::{Error, ErrorKind, Result};
use crate::merge::Operation;
use crate::store::ObjectKey;

pub mod certificate;
pub mod instance;
pub mod user;

#[cfg(test)]
mod fixtures;

pub use certificate::CertificateReconciler;
pub use instance::InstanceReconciler;
pub use user::UserReconciler;

pub const TEMPORARY_FAILURE_REQUEUE: Duration = Duration::from_secs(60);

#[async_trait]
pub trait Reconcile: Send + Sync {
    /// The watched kind.
    type Source: Resource<DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug
        + Send
        + Sync
        + 'static;

    async fn reconcile(&self, key: &ObjectKey) -> Result<Action>;
}

/// Maps the result of one reconcile to what the controller should do next.
pub(crate) fn outcome(
    result: Result<Operation>,
    requeues: &Counter,
    resource: &str,
) -> Result<Action> {
    match result {
        Ok(operation) => {
            debug!(%operation, resource, "reconciled");
            Ok(Action::await_change())
        }
        Err(err) => match err.kind() {
            ErrorKind::Ignorable => {
                debug!(reason = %err.cause(), "nothing to reconcile");
                Ok(Action::await_change())
            }
            ErrorKind::Temporary => {
                requeues.increment(1);
                warn!(error = %err, "requeueing after temporary failure");
                Ok(Action::requeue(TEMPORARY_FAILURE_REQUEUE))
            }
            ErrorKind::Permanent => {
                error!(error = %err, "reconcile failed");
                Err(err)
            }
        },
    }
}

/// Permanent failures wait for the source (or target) to change.
fn error_policy<K, R>(_obj: Arc<K>, _error: &Error, _reconciler: Arc<R>) -> Action {
    Action::await_change()
}

/// Runs `reconciler` for every object of its source kind, and again whenever
/// a secondary resource it owns changes. Returns on SIGINT/SIGTERM.
pub async fn run<R, T>(
    reconciler: Arc<R>,
    sources: Api<R::Source>,
    owned: Api<T>,
    config: controller::Config,
) where
    R: Reconcile + 'static,
    T: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    let kind = R::Source::kind(&()).into_owned();

    Controller::new(sources, watcher::Config::default())
        .owns(owned, watcher::Config::default())
        .with_config(config)
        .shutdown_on_signal()
        .run(
            |obj, reconciler: Arc<R>| async move {
                reconciler.reconcile(&ObjectKey::of(obj.as_ref())).await
            },
            error_policy,
            reconciler,
        )
        .for_each(|res| {
            let kind = kind.clone();
            async move {
                match res {
                    Ok((obj, action)) => debug!(
                        %kind,
                        name = obj.name,
                        namespace = obj.namespace,
                        ?action,
                        "reconcile finished"
                    ),
                    Err(e) => warn!(%kind, error = %e, "controller error"),
                }
            }
        })
        .await;
}
