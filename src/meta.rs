//! Well-known labels and annotations, and the metadata every target carries.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};

use crate::merge::Presence;
use crate::ownership::{OwnershipError, validate_ownership};

pub const SQELETOR_FQDN_ID: &str = "sqeletor.nais.io";

pub const MANAGED_BY_KEY: &str = "app.kubernetes.io/managed-by";
pub const TYPE_KEY: &str = "type";
pub const APP_KEY: &str = "app";
pub const TEAM_KEY: &str = "team";

pub const DEPLOYMENT_CORRELATION_ID_KEY: &str = "nais.io/deploymentCorrelationID";
pub const LAST_UPDATED_KEY: &str = "sqeletor.nais.io/last-updated";

pub const SECRET_NAME_ANNOTATION: &str = "sqeletor.nais.io/secret-name";
pub const ENV_VAR_PREFIX_ANNOTATION: &str = "sqeletor.nais.io/env-var-prefix";
pub const DATABASE_NAME_ANNOTATION: &str = "sqeletor.nais.io/database-name";

/// A plain (non-controller) owner reference pointing at `owner`.
pub fn owner_reference<K>(owner: &K) -> OwnerReference
where
    K: Resource<DynamicType = ()>,
{
    OwnerReference {
        api_version: K::api_version(&()).into_owned(),
        kind: K::kind(&()).into_owned(),
        name: owner.name_any(),
        uid: owner.uid().unwrap_or_default(),
        ..OwnerReference::default()
    }
}

/// Takes ownership of a new target, or checks that an existing one is ours.
pub fn claim(
    target: &mut ObjectMeta,
    presence: Presence,
    owner: &OwnerReference,
) -> Result<(), OwnershipError> {
    match presence {
        Presence::New => {
            target.owner_references = Some(vec![owner.clone()]);
            target
                .labels
                .get_or_insert_with(BTreeMap::new)
                .insert(MANAGED_BY_KEY.to_owned(), SQELETOR_FQDN_ID.to_owned());
            Ok(())
        }
        Presence::Existing => validate_ownership(owner, target),
    }
}

/// Sets the `type` label and copies `app`, `team` and the deployment
/// correlation id from the source. Values the source no longer has are
/// removed from the target.
pub fn copy_source_metadata(target: &mut ObjectMeta, source: &ObjectMeta) {
    let labels = target.labels.get_or_insert_with(BTreeMap::new);
    labels.insert(TYPE_KEY.to_owned(), SQELETOR_FQDN_ID.to_owned());
    for key in [APP_KEY, TEAM_KEY] {
        copy_entry(labels, source.labels.as_ref(), key);
    }

    let annotations = target.annotations.get_or_insert_with(BTreeMap::new);
    copy_entry(
        annotations,
        source.annotations.as_ref(),
        DEPLOYMENT_CORRELATION_ID_KEY,
    );
}

fn copy_entry(
    target: &mut BTreeMap<String, String>,
    source: Option<&BTreeMap<String, String>>,
    key: &str,
) {
    match source.and_then(|s| s.get(key)) {
        Some(value) => {
            target.insert(key.to_owned(), value.clone());
        }
        None => {
            target.remove(key);
        }
    }
}

/// Reads an annotation from any object.
pub fn annotation<'a>(meta: &'a ObjectMeta, key: &str) -> Option<&'a str> {
    meta.annotations
        .as_ref()
        .and_then(|a| a.get(key))
        .map(String::as_str)
}
