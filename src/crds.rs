//! The config-connector SQL resources watched by the operator.
//!
//! The schemas are owned by config-connector; only the fields the
//! reconcilers read are modeled here. Unknown fields are ignored on decode.

use kube_derive::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const API_GROUP: &str = "sql.cnrm.cloud.google.com";

/// Reference to another config-connector resource.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct SecretKeyRef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub key: String,
}

#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "sql.cnrm.cloud.google.com",
    version = "v1beta1",
    kind = "SQLSSLCert",
    root = "SqlSslCert",
    namespaced,
    status = "SqlSslCertStatus"
)]
pub struct SqlSslCertSpec {
    pub common_name: String,
    pub instance_ref: ResourceRef,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SqlSslCertStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_ca_cert: Option<String>,
}

#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "sql.cnrm.cloud.google.com",
    version = "v1beta1",
    kind = "SQLInstance",
    root = "SqlInstance",
    namespaced,
    status = "SqlInstanceStatus"
)]
pub struct SqlInstanceSpec {
    #[serde(rename = "resourceID", default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub settings: InstanceSettings,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_configuration: Option<InstanceIpConfiguration>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstanceIpConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_network_ref: Option<ResourceRef>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SqlInstanceStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_address: Vec<InstanceIpAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_ip_address: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstanceIpAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
}

impl SqlInstance {
    /// The private network reference, when the instance is set up for private ip.
    pub fn private_network_ref(&self) -> Option<&ResourceRef> {
        self.spec
            .settings
            .ip_configuration
            .as_ref()
            .and_then(|c| c.private_network_ref.as_ref())
    }

    /// The assigned private ip address, if any. Empty strings count as unassigned.
    pub fn private_ip(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.private_ip_address.as_deref())
            .filter(|ip| !ip.is_empty())
    }
}

#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "sql.cnrm.cloud.google.com",
    version = "v1beta1",
    kind = "SQLUser",
    root = "SqlUser",
    namespaced
)]
pub struct SqlUserSpec {
    pub instance_ref: ResourceRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<UserPassword>,
    #[serde(rename = "resourceID", default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPassword {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<UserValueFrom>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserValueFrom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<SecretKeyRef>,
}

impl SqlUser {
    /// The password secret reference, only when both name and key are set.
    pub fn password_secret_ref(&self) -> Option<&SecretKeyRef> {
        self.spec
            .password
            .as_ref()
            .and_then(|p| p.value_from.as_ref())
            .and_then(|v| v.secret_key_ref.as_ref())
            .filter(|r| !r.name.is_empty() && !r.key.is_empty())
    }
}
