//! Projects `SQLSSLCert` status into a Secret holding the client
//! certificate, its private key (PEM and PKCS#8 DER) and the server CA.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use kube::runtime::controller::Action;
use metrics::Counter;
use tracing::{info, instrument, warn};

use super::{Reconcile, outcome};
use crate::credentials::{CertKeyLayout, PK8_DER_KEY_KEY, pem_to_pkcs8_der};
use crate::crds::SqlSslCert;
use crate::error::{Error, Result};
use crate::merge::{Operation, Presence, create_or_update};
use crate::meta::{
    SECRET_NAME_ANNOTATION, annotation, claim, copy_source_metadata, owner_reference,
};
use crate::store::{ObjectKey, Store};

pub struct CertificateReconciler {
    certs: Arc<dyn Store<SqlSslCert>>,
    secrets: Arc<dyn Store<Secret>>,
    layout: CertKeyLayout,
    requeues: Counter,
}

impl CertificateReconciler {
    pub fn new(
        certs: Arc<dyn Store<SqlSslCert>>,
        secrets: Arc<dyn Store<Secret>>,
        layout: CertKeyLayout,
        requeues: Counter,
    ) -> Self {
        Self {
            certs,
            secrets,
            layout,
            requeues,
        }
    }

    async fn reconcile_cert(&self, key: &ObjectKey) -> Result<Operation> {
        let cert = self
            .certs
            .get(key)
            .await
            .map_err(Error::temporary)?
            .ok_or_else(|| Error::ignorable("SQLSSLCert not found"))?;

        let secret_name = annotation(&cert.metadata, SECRET_NAME_ANNOTATION)
            .ok_or_else(|| Error::ignorable("secret name annotation not found"))?;

        let status = cert.status.clone().unwrap_or_default();
        let (Some(client_cert), Some(private_key), Some(server_ca_cert)) =
            (status.cert, status.private_key, status.server_ca_cert)
        else {
            let status = cert.status.as_ref();
            return Err(Error::temporary(format!(
                "cert not ready: status.cert: {}, status.privateKey: {}, status.serverCaCert: {}",
                status.is_some_and(|s| s.cert.is_some()),
                status.is_some_and(|s| s.private_key.is_some()),
                status.is_some_and(|s| s.server_ca_cert.is_some()),
            )));
        };

        let der_key = pem_to_pkcs8_der(&private_key)
            .inspect_err(|e| warn!(error = %e, "failed to convert private key to PKCS#8 DER"))
            .ok();

        let target = ObjectKey::new(&key.namespace, secret_name);
        info!(secret = %target, "reconciling SQLSSLCert");

        let owner = owner_reference(&cert);
        let layout = self.layout;
        create_or_update(
            self.secrets.as_ref(),
            &target,
            |secret: &mut Secret, presence: Presence| {
                claim(&mut secret.metadata, presence, &owner)?;
                copy_source_metadata(&mut secret.metadata, &cert.metadata);

                let mut data = BTreeMap::from([
                    (layout.cert().to_owned(), bytes(client_cert)),
                    (layout.private_key().to_owned(), bytes(private_key)),
                    (layout.root_cert().to_owned(), bytes(server_ca_cert)),
                ]);
                if let Some(der) = der_key {
                    data.insert(PK8_DER_KEY_KEY.to_owned(), ByteString(der));
                }
                secret.data = Some(data);
                secret.string_data = None;

                Ok(())
            },
        )
        .await
    }
}

fn bytes(value: String) -> ByteString {
    ByteString(value.into_bytes())
}

#[async_trait]
impl Reconcile for CertificateReconciler {
    type Source = SqlSslCert;

    #[instrument(skip(self, key), fields(namespace = %key.namespace, name = %key.name))]
    async fn reconcile(&self, key: &ObjectKey) -> Result<Action> {
        outcome(self.reconcile_cert(key).await, &self.requeues, "Secret")
    }
}
