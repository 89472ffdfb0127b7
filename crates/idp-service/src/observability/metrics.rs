//! Metrics definitions for the IdP service
//!
//! All metrics follow Prometheus naming conventions:
//! - `idp_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `status`: 5 values (success, denied, malformed, error, unavailable)
//! - `result`: 2 values (granted, denied)
//! - `path`: known routes plus `/other`

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Token endpoint path, shared with the router.
pub const TOKEN_PATH: &str = "/api/oauth2/token";

/// Initialize the Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("idp_token_issuance".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set token issuance buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("idp_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record token endpoint outcome and duration
///
/// Metric: `idp_token_issuance_duration_seconds`, `idp_token_issuance_total`
/// Labels: `status`
pub fn record_token_issuance(status: &str, duration: Duration) {
    histogram!("idp_token_issuance_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("idp_token_issuance_total", "status" => status.to_string()).increment(1);
}

// ============================================================================
// Authenticator Metrics
// ============================================================================

/// Record an authentication verdict
///
/// Metric: `idp_authentications_total`
/// Labels: `result` (granted, denied)
pub fn record_authentication(authenticated: bool) {
    let result = if authenticated { "granted" } else { "denied" };
    counter!("idp_authentications_total", "result" => result).increment(1);
}

/// Number of clients in the registry after startup population
///
/// Metric: `idp_registered_clients`
pub fn set_registered_clients(count: usize) {
    gauge!("idp_registered_clients").set(count as f64);
}

// ============================================================================
// Startup Metrics
// ============================================================================

/// Record signer initialization outcome
///
/// Metric: `idp_signer_initializations_total`
/// Labels: `status`
pub fn record_signer_initialization(status: &str) {
    counter!("idp_signer_initializations_total", "status" => status.to_string()).increment(1);
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `idp_http_requests_total`, `idp_http_request_duration_seconds`
/// Labels: `method`, `path`, `status_code`
pub fn record_http_request(method: &str, path: &str, status_code: u16, duration: Duration) {
    let normalized_path = normalize_path(path);

    histogram!("idp_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => normalized_path,
        "status_code" => status_code.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("idp_http_requests_total",
        "method" => method.to_string(),
        "path" => normalized_path,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Collapse unknown paths into `/other`
fn normalize_path(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/metrics" => "/metrics",
        TOKEN_PATH => TOKEN_PATH,
        _ => "/other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These run against the global no-op recorder; they exercise the
    // recording paths without asserting values.

    #[test]
    fn test_record_token_issuance() {
        record_token_issuance("success", Duration::from_millis(12));
        record_token_issuance("denied", Duration::from_millis(1));
        record_token_issuance("error", Duration::from_millis(3));
    }

    #[test]
    fn test_record_authentication() {
        record_authentication(true);
        record_authentication(false);
        set_registered_clients(3);
        record_signer_initialization("success");
    }

    #[test]
    fn test_record_http_request() {
        record_http_request("POST", TOKEN_PATH, 200, Duration::from_millis(5));
        record_http_request("GET", "/unknown", 404, Duration::from_millis(1));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/metrics"), "/metrics");
        assert_eq!(normalize_path(TOKEN_PATH), TOKEN_PATH);
        assert_eq!(normalize_path("/api/oauth2/token/extra"), "/other");
        assert_eq!(normalize_path("/"), "/other");
    }
}
