use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use thiserror::Error;

use crate::meta::{MANAGED_BY_KEY, SQELETOR_FQDN_ID};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OwnershipError {
    #[error("{0} is not managed by sqeletor")]
    NotManaged(String),

    #[error("{0} has no owner references")]
    NoOwner(String),

    #[error("{0} has multiple owner references")]
    MultipleOwners(String),

    #[error("{target} is owned by {kind}/{name}")]
    OwnedByOther {
        target: String,
        kind: String,
        name: String,
    },
}

/// Checks that an existing target is ours to mutate: it carries the
/// managed-by label and exactly one owner reference, matching `expected` on
/// apiVersion, kind and name. The uid is not compared so that a recreated
/// source can adopt its previous target.
pub fn validate_ownership(
    expected: &OwnerReference,
    target: &ObjectMeta,
) -> Result<(), OwnershipError> {
    let describe = || {
        format!(
            "{}/{}",
            target.namespace.as_deref().unwrap_or_default(),
            target.name.as_deref().unwrap_or_default()
        )
    };

    let managed_by = target.labels.as_ref().and_then(|l| l.get(MANAGED_BY_KEY));
    if managed_by.map(String::as_str) != Some(SQELETOR_FQDN_ID) {
        return Err(OwnershipError::NotManaged(describe()));
    }

    let owners = target.owner_references.as_deref().unwrap_or_default();
    let owner = match owners {
        [] => return Err(OwnershipError::NoOwner(describe())),
        [owner] => owner,
        _ => return Err(OwnershipError::MultipleOwners(describe())),
    };

    if owner.api_version != expected.api_version
        || owner.kind != expected.kind
        || owner.name != expected.name
    {
        return Err(OwnershipError::OwnedByOther {
            target: describe(),
            kind: owner.kind.clone(),
            name: owner.name.clone(),
        });
    }

    Ok(())
}
