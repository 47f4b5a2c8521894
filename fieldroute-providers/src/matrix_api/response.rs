//! Response types for the commercial distance-matrix JSON API.
//!
//! The payload carries a top-level status plus one status per element, so
//! a single unroutable pair never poisons the rest of the matrix.

use serde::Deserialize;

/// Top-level status for a successful response.
pub const STATUS_OK: &str = "OK";

/// Top-level statuses that mean the quota or credential is the problem.
pub const QUOTA_STATUSES: [&str; 3] = ["OVER_QUERY_LIMIT", "OVER_DAILY_LIMIT", "REQUEST_DENIED"];

/// Distance-matrix API response.
#[derive(Debug, Deserialize)]
pub struct MatrixResponse {
    /// Top-level request status.
    pub status: String,
    /// Optional error detail when `status` is not `"OK"`.
    pub error_message: Option<String>,
    /// One row per origin, in request order.
    #[serde(default)]
    pub rows: Vec<MatrixRow>,
}

/// One origin row.
#[derive(Debug, Deserialize)]
pub struct MatrixRow {
    /// One element per destination, in request order.
    #[serde(default)]
    pub elements: Vec<MatrixElement>,
}

/// One origin/destination element.
#[derive(Debug, Deserialize)]
pub struct MatrixElement {
    /// Element status: `"OK"`, `"ZERO_RESULTS"`, or `"NOT_FOUND"`.
    pub status: String,
    /// Road distance; present when `status` is `"OK"`.
    pub distance: Option<ValueField>,
    /// Travel time; present when `status` is `"OK"`.
    pub duration: Option<ValueField>,
    /// Traffic-aware travel time; present for traffic-aware requests.
    pub duration_in_traffic: Option<ValueField>,
}

/// A `{ value }` wrapper (metres for distances, seconds for durations).
#[derive(Debug, Deserialize)]
pub struct ValueField {
    /// The numeric value.
    pub value: f64,
}

impl MatrixResponse {
    /// Whether the response indicates success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

impl MatrixElement {
    /// Whether the element resolved.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Whether a top-level status indicates an exhausted quota or rejected
/// credential (never retried, falls through to the next provider).
#[must_use]
pub fn is_quota_status(status: &str) -> bool {
    QUOTA_STATUSES.contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialise_traffic_aware_element() {
        let json = r#"{
            "status": "OK",
            "rows": [{
                "elements": [{
                    "status": "OK",
                    "distance": {"value": 291500.0},
                    "duration": {"value": 10320.0},
                    "duration_in_traffic": {"value": 11460.0}
                }]
            }]
        }"#;

        let response: MatrixResponse = serde_json::from_str(json).expect("should deserialise");

        assert!(response.is_ok());
        let element = response
            .rows
            .first()
            .and_then(|row| row.elements.first())
            .expect("should have an element");
        assert!(element.is_ok());
        assert_eq!(element.duration_in_traffic.as_ref().map(|v| v.value), Some(11460.0));
    }

    #[test]
    fn deserialise_zero_results_element() {
        let json = r#"{
            "status": "OK",
            "rows": [{"elements": [{"status": "ZERO_RESULTS"}]}]
        }"#;

        let response: MatrixResponse = serde_json::from_str(json).expect("should deserialise");

        let element = response
            .rows
            .first()
            .and_then(|row| row.elements.first())
            .expect("should have an element");
        assert!(!element.is_ok());
        assert!(element.distance.is_none());
    }

    #[test]
    fn quota_statuses_are_recognised() {
        assert!(is_quota_status("OVER_QUERY_LIMIT"));
        assert!(is_quota_status("REQUEST_DENIED"));
        assert!(!is_quota_status("INVALID_REQUEST"));
    }
}
