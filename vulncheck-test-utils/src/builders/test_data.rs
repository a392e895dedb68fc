//! Canned VulnCheck API payloads for tests.
//!
//! Bodies are built with `serde_json::json!` so tests stay readable and
//! the shapes stay in one place.

use chrono::{Duration, Utc};
use serde_json::{Value, json};
use vulncheck_client_core::AuthToken;

/// Token-exchange response body with an expiry `ttl_secs` from now.
pub fn token_body(ttl_secs: i64) -> String {
    token_body_with("test-access-token", ttl_secs)
}

/// Token-exchange response body with a caller-chosen token value.
pub fn token_body_with(token: &str, ttl_secs: i64) -> String {
    let expiry = Utc::now() + Duration::seconds(ttl_secs);
    json!({
        "access_token": token,
        "expiration_utc": expiry.to_rfc3339(),
    })
    .to_string()
}

/// Ready-made bearer token for tests that bypass the exchange.
pub fn auth_token(ttl_secs: i64) -> AuthToken {
    AuthToken::new("test-access-token", Utc::now() + Duration::seconds(ttl_secs))
}

/// Search response page without a continuation cursor.
pub fn search_page(results: Vec<Value>) -> Value {
    json!({
        "data": {
            "results": results,
            "totalResults": 0,
        }
    })
}

/// Search response page carrying a continuation cursor at `data.next`.
pub fn search_page_with_cursor(results: Vec<Value>, cursor: Value) -> Value {
    json!({
        "data": {
            "results": results,
            "next": cursor,
            "totalResults": 0,
        }
    })
}

/// Vulnerability record as the search index returns it.
pub fn vuln_item(cve: &str, base_score: f64) -> Value {
    json!({
        "id": cve,
        "baseScore": base_score,
    })
}

/// Vulnerability record with vulnerable-CPE attribution.
pub fn vuln_item_with_cpes(cve: &str, base_score: f64, cpes: &[&str]) -> Value {
    json!({
        "id": cve,
        "baseScore": base_score,
        "vcVulnerableCPEs": cpes,
    })
}

/// Device record keyed by IP address.
pub fn device_item(ip: &str, risk_level: f64) -> Value {
    json!({
        "ipAddress": ip,
        "riskLevel": risk_level,
    })
}

/// Exposed-user record keyed by email address.
pub fn user_item(email: &str) -> Value {
    json!({
        "email": email,
    })
}

/// `n` distinct filler records, for page-size sensitive tests.
pub fn placeholder_items(n: usize) -> Vec<Value> {
    (0..n).map(|i| json!({ "id": format!("item-{i}") })).collect()
}
