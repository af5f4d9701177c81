//! Shared helpers for reconciler tests.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use metrics::Counter;

use crate::meta::{MANAGED_BY_KEY, SQELETOR_FQDN_ID};

pub const NAMESPACE: &str = "default";

pub fn counter() -> (Counter, Arc<AtomicU64>) {
    let hits = Arc::new(AtomicU64::new(0));
    (Counter::from_arc(hits.clone()), hits)
}

/// Plain-text value of a secret entry.
pub fn text(secret: &Secret, key: &str) -> String {
    let data = secret.data.as_ref().expect("secret has data");
    let value = data.get(key).unwrap_or_else(|| panic!("secret has no {key}"));
    String::from_utf8(value.0.clone()).expect("utf-8 value")
}

pub fn owned_by(kind: &str, name: &str) -> OwnerReference {
    OwnerReference {
        api_version: "sql.cnrm.cloud.google.com/v1beta1".into(),
        kind: kind.into(),
        name: name.into(),
        uid: format!("uid-{name}"),
        ..OwnerReference::default()
    }
}

/// Metadata of a target that sqeletor created for `owner`.
pub fn managed_meta(name: &str, owner: OwnerReference) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.into()),
        namespace: Some(NAMESPACE.into()),
        labels: Some(BTreeMap::from([(
            MANAGED_BY_KEY.to_owned(),
            SQELETOR_FQDN_ID.to_owned(),
        )])),
        owner_references: Some(vec![owner]),
        ..ObjectMeta::default()
    }
}

pub fn unmanaged_meta(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.into()),
        namespace: Some(NAMESPACE.into()),
        ..ObjectMeta::default()
    }
}
