//! Idempotent create-or-update of secondary resources.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{SecondsFormat, Utc};
use kube::Resource;

use crate::error::{Error, Result};
use crate::meta::LAST_UPDATED_KEY;
use crate::store::{ObjectKey, Store};

/// Whether the target existed before this reconcile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    Existing,
    New,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Created,
    Updated,
    Unchanged,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Created => "created",
            Operation::Updated => "updated",
            Operation::Unchanged => "unchanged",
        })
    }
}

/// Fetches the target at `key` (or starts from an empty one), lets `mutate`
/// shape it, and writes it back only when something changed.
///
/// Errors from `mutate` abort before any write and are returned as-is.
/// Read and write failures are temporary; a stale resource version on
/// replace surfaces as a conflict and is retried on the next reconcile.
pub async fn create_or_update<K, S, F>(
    store: &S,
    key: &ObjectKey,
    mutate: F,
) -> Result<Operation>
where
    K: Resource + Clone + Default + PartialEq,
    S: Store<K> + ?Sized,
    F: FnOnce(&mut K, Presence) -> Result<()>,
{
    let fetched = store.get(key).await.map_err(Error::temporary)?;

    let (current, presence) = match fetched {
        Some(existing) => (existing, Presence::Existing),
        None => {
            let mut empty = K::default();
            empty.meta_mut().name = Some(key.name.clone());
            empty.meta_mut().namespace = Some(key.namespace.clone());
            (empty, Presence::New)
        }
    };

    let mut desired = current.clone();
    mutate(&mut desired, presence)?;

    match presence {
        Presence::New => {
            stamp_last_updated(&mut desired);
            store.create(&desired).await.map_err(Error::temporary)?;
            Ok(Operation::Created)
        }
        Presence::Existing if desired == current => Ok(Operation::Unchanged),
        Presence::Existing => {
            stamp_last_updated(&mut desired);
            store.replace(&desired).await.map_err(Error::temporary)?;
            Ok(Operation::Updated)
        }
    }
}

fn stamp_last_updated<K: Resource>(obj: &mut K) {
    obj.meta_mut()
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(
            LAST_UPDATED_KEY.to_owned(),
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        );
}
