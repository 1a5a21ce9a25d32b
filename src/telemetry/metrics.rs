//! Metrics
//!
//! Session lifecycle metric hooks and implementations.

use std::collections::HashMap;
use std::sync::Mutex;

/// Metric labels.
pub type MetricLabels = HashMap<String, String>;

pub const LOGINS_TOTAL: &str = "auth_logins_total";
pub const AUTHENTICATIONS_TOTAL: &str = "auth_authentications_total";
pub const REFRESHES_TOTAL: &str = "auth_token_refreshes_total";
pub const REFRESH_TOKEN_REUSE_TOTAL: &str = "auth_refresh_token_reuse_total";
pub const REMOTE_LOGOUTS_TOTAL: &str = "auth_remote_logouts_total";
pub const LOGOUTS_TOTAL: &str = "auth_logouts_total";
pub const PURGED_RECORDS_TOTAL: &str = "auth_purged_records_total";
pub const ERRORS_TOTAL: &str = "auth_errors_total";
pub const PROVIDER_DURATION_MS: &str = "auth_provider_request_duration_ms";

/// Session lifecycle metrics interface.
pub trait AuthMetrics: Send + Sync {
    /// Record a login attempt.
    fn record_login(&self, provider: &str, success: bool);

    /// Record an access token check with its outcome (`ok` or an error kind).
    fn record_authentication(&self, outcome: &str);

    /// Record a refresh attempt.
    fn record_token_refresh(&self, provider: &str, success: bool);

    /// Record presentation of a revoked refresh token.
    fn record_refresh_token_reuse(&self, provider: &str);

    /// Record a remote logout call.
    fn record_remote_logout(&self, provider: &str, success: bool);

    /// Record a completed logout.
    fn record_logout(&self, already_revoked: bool);

    /// Record purged token records.
    fn record_purge(&self, count: u64);

    /// Record error.
    fn record_error(&self, error_kind: &str, operation: &str);

    /// Record provider request duration.
    fn record_provider_duration(&self, operation: &str, duration_ms: f64);
}

/// No-op metrics implementation.
pub struct NoOpMetrics;

impl AuthMetrics for NoOpMetrics {
    fn record_login(&self, _provider: &str, _success: bool) {}
    fn record_authentication(&self, _outcome: &str) {}
    fn record_token_refresh(&self, _provider: &str, _success: bool) {}
    fn record_refresh_token_reuse(&self, _provider: &str) {}
    fn record_remote_logout(&self, _provider: &str, _success: bool) {}
    fn record_logout(&self, _already_revoked: bool) {}
    fn record_purge(&self, _count: u64) {}
    fn record_error(&self, _error_kind: &str, _operation: &str) {}
    fn record_provider_duration(&self, _operation: &str, _duration_ms: f64) {}
}

/// Metric entry for in-memory storage.
#[derive(Debug, Clone)]
pub struct MetricEntry {
    pub name: String,
    pub value: f64,
    pub labels: MetricLabels,
}

/// In-memory metrics for testing.
#[derive(Default)]
pub struct InMemoryMetrics {
    entries: Mutex<Vec<MetricEntry>>,
}

impl InMemoryMetrics {
    /// Create new in-memory metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded entries.
    pub fn get_entries(&self) -> Vec<MetricEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Get entries by name.
    pub fn get_entries_by_name(&self, name: &str) -> Vec<MetricEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    /// Sum of values recorded under a name.
    pub fn total(&self, name: &str) -> f64 {
        self.get_entries_by_name(name).iter().map(|e| e.value).sum()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    fn record(&self, name: &str, value: f64, labels: &[(&str, String)]) {
        let labels = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();

        self.entries.lock().unwrap().push(MetricEntry {
            name: name.to_string(),
            value,
            labels,
        });
    }
}

impl AuthMetrics for InMemoryMetrics {
    fn record_login(&self, provider: &str, success: bool) {
        self.record(
            LOGINS_TOTAL,
            1.0,
            &[("provider", provider.to_string()), ("success", success.to_string())],
        );
    }

    fn record_authentication(&self, outcome: &str) {
        self.record(AUTHENTICATIONS_TOTAL, 1.0, &[("outcome", outcome.to_string())]);
    }

    fn record_token_refresh(&self, provider: &str, success: bool) {
        self.record(
            REFRESHES_TOTAL,
            1.0,
            &[("provider", provider.to_string()), ("success", success.to_string())],
        );
    }

    fn record_refresh_token_reuse(&self, provider: &str) {
        self.record(REFRESH_TOKEN_REUSE_TOTAL, 1.0, &[("provider", provider.to_string())]);
    }

    fn record_remote_logout(&self, provider: &str, success: bool) {
        self.record(
            REMOTE_LOGOUTS_TOTAL,
            1.0,
            &[("provider", provider.to_string()), ("success", success.to_string())],
        );
    }

    fn record_logout(&self, already_revoked: bool) {
        self.record(
            LOGOUTS_TOTAL,
            1.0,
            &[("already_revoked", already_revoked.to_string())],
        );
    }

    fn record_purge(&self, count: u64) {
        self.record(PURGED_RECORDS_TOTAL, count as f64, &[]);
    }

    fn record_error(&self, error_kind: &str, operation: &str) {
        self.record(
            ERRORS_TOTAL,
            1.0,
            &[("kind", error_kind.to_string()), ("operation", operation.to_string())],
        );
    }

    fn record_provider_duration(&self, operation: &str, duration_ms: f64) {
        self.record(PROVIDER_DURATION_MS, duration_ms, &[("operation", operation.to_string())]);
    }
}
