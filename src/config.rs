use std::net::SocketAddr;

use clap::Args;

use crate::credentials::{CertKeyLayout, CertPaths, DEFAULT_MOUNT_PATH};

/// Settings for the `run` command.
#[derive(Args, Clone, Debug)]
pub struct Settings {
    /// Namespace to watch (empty for cluster-wide)
    #[arg(long, env = "WATCH_NAMESPACE", default_value = "")]
    pub namespace: String,

    /// Maximum concurrent reconciles per controller
    #[arg(long, env = "RECONCILE_CONCURRENCY", default_value_t = 4)]
    pub concurrency: u16,

    /// Prometheus metrics listen address
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8080")]
    pub metrics_addr: SocketAddr,

    /// Path workloads mount the certificate secret at
    #[arg(long, env = "SQELETOR_MOUNT_PATH", default_value = DEFAULT_MOUNT_PATH)]
    pub mount_path: String,

    /// Write `private-key.pem` and `server-ca-cert.pem` instead of `key.pem` and `root-cert.pem`
    #[arg(long, env = "LEGACY_CERT_KEYS")]
    pub legacy_cert_keys: bool,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log as JSON
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl Settings {
    pub fn watch_namespace(&self) -> Option<&str> {
        Some(self.namespace.as_str()).filter(|ns| !ns.is_empty())
    }

    pub fn cert_key_layout(&self) -> CertKeyLayout {
        if self.legacy_cert_keys {
            CertKeyLayout::Legacy
        } else {
            CertKeyLayout::Current
        }
    }

    pub fn cert_paths(&self) -> CertPaths {
        CertPaths::new(&self.mount_path, self.cert_key_layout())
    }
}
