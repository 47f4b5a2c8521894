//! OSRM API response types for the Route and Table services.
//!
//! The Route service resolves one origin/destination pair; the Table
//! service computes all-pairs durations and distances for a coordinate
//! list. Both wrap their payload in a status `code` field.
//!
//! See: <http://project-osrm.org/docs/v5.24.0/api/>

use serde::Deserialize;

/// Status code OSRM uses for a successful response.
pub const CODE_OK: &str = "Ok";

/// Status codes OSRM uses when no route exists between a pair.
pub const NO_ROUTE_CODES: [&str; 3] = ["NoRoute", "NoTable", "NoSegment"];

/// OSRM Route API response.
#[derive(Debug, Deserialize)]
pub struct RouteResponse {
    /// Status code; `"Ok"` on success.
    pub code: String,
    /// Optional error message when `code` is not `"Ok"`.
    pub message: Option<String>,
    /// Candidate routes, best first.
    #[serde(default)]
    pub routes: Vec<RouteSummary>,
}

/// One route alternative from the Route service.
#[derive(Debug, Deserialize)]
pub struct RouteSummary {
    /// Road distance in metres.
    pub distance: f64,
    /// Travel time in seconds.
    pub duration: f64,
}

/// OSRM Table API response.
///
/// `durations[i][j]` / `distances[i][j]` relate the i-th source to the j-th
/// destination. Cells are `None` when no route exists for that pair.
#[derive(Debug, Deserialize)]
pub struct TableResponse {
    /// Status code; `"Ok"` on success.
    pub code: String,
    /// Optional error message when `code` is not `"Ok"`.
    pub message: Option<String>,
    /// Travel times in seconds.
    pub durations: Option<Vec<Vec<Option<f64>>>>,
    /// Road distances in metres (requires the `distance` annotation).
    pub distances: Option<Vec<Vec<Option<f64>>>>,
}

impl RouteResponse {
    /// Whether the response indicates success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }
}

impl TableResponse {
    /// Whether the response indicates success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }
}

/// Whether an OSRM status code means "the pair is unroutable" rather than
/// "the request was malformed".
#[must_use]
pub fn is_no_route_code(code: &str) -> bool {
    NO_ROUTE_CODES.contains(&code)
}
