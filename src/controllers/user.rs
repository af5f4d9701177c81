//! Materializes database credentials and connection settings for an
//! `SQLUser` into the secret its password reference points at.

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use kube::runtime::controller::Action;
use metrics::Counter;
use tracing::{info, instrument};

use super::{Reconcile, outcome};
use crate::credentials::{CertPaths, ConnectionParams, POSTGRES_PORT, generate_password};
use crate::crds::{SqlInstance, SqlUser};
use crate::error::{Error, Result};
use crate::merge::{Operation, Presence, create_or_update};
use crate::meta::{
    DATABASE_NAME_ANNOTATION, ENV_VAR_PREFIX_ANNOTATION, annotation, claim, copy_source_metadata,
    owner_reference,
};
use crate::store::{ObjectKey, Store};

pub struct UserReconciler {
    users: Arc<dyn Store<SqlUser>>,
    instances: Arc<dyn Store<SqlInstance>>,
    secrets: Arc<dyn Store<Secret>>,
    paths: CertPaths,
    requeues: Counter,
}

impl UserReconciler {
    pub fn new(
        users: Arc<dyn Store<SqlUser>>,
        instances: Arc<dyn Store<SqlInstance>>,
        secrets: Arc<dyn Store<Secret>>,
        paths: CertPaths,
        requeues: Counter,
    ) -> Self {
        Self {
            users,
            instances,
            secrets,
            paths,
            requeues,
        }
    }

    async fn instance_private_ip(&self, key: &ObjectKey) -> Result<String> {
        let instance = self
            .instances
            .get(key)
            .await
            .map_err(Error::temporary)?
            .ok_or_else(|| Error::temporary(format!("referenced sql instance {key} not found")))?;

        if instance.private_network_ref().is_none() {
            return Err(Error::permanent(
                "referenced sql instance is not configured for private ip",
            ));
        }
        instance
            .private_ip()
            .map(str::to_owned)
            .ok_or_else(|| Error::temporary("referenced sql instance does not have a private ip"))
    }

    async fn reconcile_user(&self, key: &ObjectKey) -> Result<Operation> {
        let user = self
            .users
            .get(key)
            .await
            .map_err(Error::temporary)?
            .ok_or_else(|| Error::ignorable("SQLUser not found"))?;

        let prefix = annotation(&user.metadata, ENV_VAR_PREFIX_ANNOTATION)
            .ok_or_else(|| Error::ignorable("env var prefix annotation not found"))?;
        let database = annotation(&user.metadata, DATABASE_NAME_ANNOTATION)
            .ok_or_else(|| Error::ignorable("database name annotation not found"))?;

        let secret_ref = user
            .password_secret_ref()
            .ok_or_else(|| Error::permanent("password secret ref not properly set"))?;

        let instance_ref = &user.spec.instance_ref;
        let instance_namespace = if instance_ref.namespace.is_empty() {
            &key.namespace
        } else {
            &instance_ref.namespace
        };
        let host = self
            .instance_private_ip(&ObjectKey::new(instance_namespace, &instance_ref.name))
            .await?;

        let password_key = format!("{prefix}_PASSWORD");
        if secret_ref.key != password_key {
            return Err(Error::permanent(format!(
                "secret key {} does not match expected key {password_key}",
                secret_ref.key
            )));
        }

        let username = user.spec.resource_id.clone().unwrap_or_else(|| user.name_any());
        let target = ObjectKey::new(&key.namespace, &secret_ref.name);
        info!(secret = %target, prefix, database, "reconciling SQLUser");

        let owner = owner_reference(&user);
        create_or_update(
            self.secrets.as_ref(),
            &target,
            |secret: &mut Secret, presence: Presence| {
                claim(&mut secret.metadata, presence, &owner)?;
                copy_source_metadata(&mut secret.metadata, &user.metadata);

                let password =
                    existing_password(secret, &password_key).unwrap_or_else(generate_password);
                let params = ConnectionParams {
                    prefix,
                    host: &host,
                    port: POSTGRES_PORT,
                    database,
                    username: &username,
                    password: &password,
                    paths: &self.paths,
                };
                let env = params.env().map_err(Error::permanent)?;

                secret.data = Some(
                    env.into_iter()
                        .map(|(k, v)| (k, ByteString(v.into_bytes())))
                        .collect(),
                );
                secret.string_data = None;

                Ok(())
            },
        )
        .await
    }
}

/// The password already handed out to workloads, if the secret has one.
fn existing_password(secret: &Secret, password_key: &str) -> Option<String> {
    let data = secret.data.as_ref()?;
    [password_key, "PGPASSWORD"]
        .into_iter()
        .filter_map(|key| data.get(key))
        .find_map(|value| String::from_utf8(value.0.clone()).ok())
        .filter(|password| !password.is_empty())
}

#[async_trait]
impl Reconcile for UserReconciler {
    type Source = SqlUser;

    #[instrument(skip(self, key), fields(namespace = %key.namespace, name = %key.name))]
    async fn reconcile(&self, key: &ObjectKey) -> Result<Action> {
        outcome(self.reconcile_user(key).await, &self.requeues, "Secret")
    }
}
