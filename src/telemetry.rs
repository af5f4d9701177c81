use metrics::{Counter, counter, describe_counter};

pub const SQLSSLCERT_REQUEUES: &str = "sqlsslcert_requeues";
pub const SQLINSTANCE_REQUEUES: &str = "sqlinstance_requeues";
pub const SQLUSER_REQUEUES: &str = "sqluser_requeues";

/// One requeue counter per reconciler.
#[derive(Clone)]
pub struct RequeueCounters {
    pub certificate: Counter,
    pub instance: Counter,
    pub user: Counter,
}

impl RequeueCounters {
    /// Resolves the counters against the installed global recorder, so call
    /// this after the exporter is set up.
    pub fn register() -> Self {
        describe_counter!(SQLSSLCERT_REQUEUES, "Number of requeues for SQLSSLCert");
        describe_counter!(SQLINSTANCE_REQUEUES, "Number of requeues for SQLInstance");
        describe_counter!(SQLUSER_REQUEUES, "Number of requeues for SQLUser");

        Self {
            certificate: counter!(SQLSSLCERT_REQUEUES),
            instance: counter!(SQLINSTANCE_REQUEUES),
            user: counter!(SQLUSER_REQUEUES),
        }
    }
}
