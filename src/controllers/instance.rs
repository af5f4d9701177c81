//! Opens egress from an application's pods to its SQL instance.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::networking::v1::{
    IPBlock, NetworkPolicy, NetworkPolicyEgressRule, NetworkPolicyPeer, NetworkPolicySpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::ResourceExt;
use kube::runtime::controller::Action;
use metrics::Counter;
use tracing::{info, instrument};

use super::{Reconcile, outcome};
use crate::crds::SqlInstance;
use crate::error::{Error, Result};
use crate::merge::{Operation, Presence, create_or_update};
use crate::meta::{APP_KEY, claim, copy_source_metadata, owner_reference};
use crate::store::{ObjectKey, Store};

/// Address types that get an egress rule.
const IP_TYPES: [&str; 2] = ["PRIMARY", "PRIVATE"];

pub struct InstanceReconciler {
    instances: Arc<dyn Store<SqlInstance>>,
    policies: Arc<dyn Store<NetworkPolicy>>,
    requeues: Counter,
}

impl InstanceReconciler {
    pub fn new(
        instances: Arc<dyn Store<SqlInstance>>,
        policies: Arc<dyn Store<NetworkPolicy>>,
        requeues: Counter,
    ) -> Self {
        Self {
            instances,
            policies,
            requeues,
        }
    }

    async fn reconcile_instance(&self, key: &ObjectKey) -> Result<Operation> {
        let instance = self
            .instances
            .get(key)
            .await
            .map_err(Error::temporary)?
            .ok_or_else(|| Error::ignorable("SQLInstance not found"))?;

        let resource_id = instance
            .spec
            .resource_id
            .as_deref()
            .ok_or_else(|| Error::temporary("SQLInstance has no resource ID"))?;

        let ips = egress_ips(&instance);
        if ips.is_empty() {
            return Err(Error::temporary("SQLInstance has no IP address"));
        }

        let target = ObjectKey::new(
            &key.namespace,
            format!("sql-{}-{}", instance.name_any(), resource_id),
        );
        info!(policy = %target, ips = ?ips, "reconciling SQLInstance");

        let owner = owner_reference(&instance);
        let app = instance.labels().get(APP_KEY).cloned().unwrap_or_default();
        create_or_update(
            self.policies.as_ref(),
            &target,
            |policy: &mut NetworkPolicy, presence: Presence| {
                claim(&mut policy.metadata, presence, &owner)?;
                copy_source_metadata(&mut policy.metadata, &instance.metadata);

                policy.spec = Some(NetworkPolicySpec {
                    pod_selector: LabelSelector {
                        match_labels: Some(BTreeMap::from([(APP_KEY.to_owned(), app)])),
                        ..LabelSelector::default()
                    },
                    policy_types: Some(vec!["Egress".to_owned()]),
                    egress: Some(ips.iter().map(|ip| egress_rule(ip)).collect()),
                    ..NetworkPolicySpec::default()
                });

                Ok(())
            },
        )
        .await
    }
}

/// Primary and private addresses of the instance, sorted.
fn egress_ips(instance: &SqlInstance) -> Vec<String> {
    let mut ips: Vec<String> = instance
        .status
        .iter()
        .flat_map(|s| s.ip_address.iter())
        .filter(|ip| ip.type_.as_deref().is_some_and(|t| IP_TYPES.contains(&t)))
        .filter_map(|ip| ip.ip_address.clone())
        .collect();
    ips.sort();
    ips
}

fn egress_rule(ip: &str) -> NetworkPolicyEgressRule {
    NetworkPolicyEgressRule {
        to: Some(vec![NetworkPolicyPeer {
            ip_block: Some(IPBlock {
                cidr: format!("{ip}/32"),
                except: None,
            }),
            ..NetworkPolicyPeer::default()
        }]),
        ..NetworkPolicyEgressRule::default()
    }
}

#[async_trait]
impl Reconcile for InstanceReconciler {
    type Source = SqlInstance;

    #[instrument(skip(self, key), fields(namespace = %key.namespace, name = %key.name))]
    async fn reconcile(&self, key: &ObjectKey) -> Result<Action> {
        outcome(
            self.reconcile_instance(key).await,
            &self.requeues,
            "NetworkPolicy",
        )
    }
}
