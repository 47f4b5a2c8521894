//! The normalised result shape returned by every provider.

use serde::{Deserialize, Serialize};

use crate::ProviderId;

/// A resolved distance and travel time for one coordinate pair.
///
/// Every provider returns this shape so callers never branch on the source.
/// `cost_units` is zero for free providers.
///
/// # Examples
/// ```
/// use fieldroute_core::{DistanceResult, ProviderId};
///
/// let result = DistanceResult::new(1500.0, 180.0, ProviderId::OsrmRouting, 0);
/// assert_eq!(result.distance_km(), 1.5);
/// assert_eq!(result.duration_minutes(), 3.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceResult {
    /// Road distance in metres.
    pub distance_meters: f64,
    /// Travel time in seconds without traffic.
    pub duration_seconds: f64,
    /// Traffic-aware travel time in seconds, when the provider supplies one.
    pub duration_in_traffic_seconds: Option<f64>,
    /// Which provider produced the value.
    pub provider: ProviderId,
    /// Billing units consumed by the producing call.
    pub cost_units: u32,
}

impl DistanceResult {
    /// Construct a result without a traffic-aware duration.
    #[must_use]
    pub const fn new(
        distance_meters: f64,
        duration_seconds: f64,
        provider: ProviderId,
        cost_units: u32,
    ) -> Self {
        Self {
            distance_meters,
            duration_seconds,
            duration_in_traffic_seconds: None,
            provider,
            cost_units,
        }
    }

    /// Attach a traffic-aware duration.
    #[must_use]
    pub const fn with_traffic_duration(mut self, seconds: f64) -> Self {
        self.duration_in_traffic_seconds = Some(seconds);
        self
    }

    /// Distance in kilometres.
    #[expect(
        clippy::float_arithmetic,
        reason = "unit conversion is inherently floating point"
    )]
    #[must_use]
    pub fn distance_km(&self) -> f64 {
        self.distance_meters / 1000.0
    }

    /// Duration in minutes, preferring the traffic-aware value when present.
    #[expect(
        clippy::float_arithmetic,
        reason = "unit conversion is inherently floating point"
    )]
    #[must_use]
    pub fn duration_minutes(&self) -> f64 {
        self.effective_duration_seconds() / 60.0
    }

    /// Duration in seconds, preferring the traffic-aware value when present.
    #[must_use]
    pub fn effective_duration_seconds(&self) -> f64 {
        self.duration_in_traffic_seconds
            .unwrap_or(self.duration_seconds)
    }

    /// Human-readable distance, e.g. `"1.5 km"` or `"850 m"`.
    #[must_use]
    pub fn distance_text(&self) -> String {
        format_distance(self.distance_meters)
    }

    /// Human-readable duration, e.g. `"1 h 05 min"`.
    #[must_use]
    pub fn duration_text(&self) -> String {
        format_duration(self.effective_duration_seconds())
    }
}

/// Format metres for humans: metres below one kilometre, otherwise
/// kilometres with one decimal.
///
/// # Examples
/// ```
/// use fieldroute_core::format_distance;
///
/// assert_eq!(format_distance(850.0), "850 m");
/// assert_eq!(format_distance(253_400.0), "253.4 km");
/// ```
#[expect(
    clippy::float_arithmetic,
    clippy::cast_possible_truncation,
    reason = "rounded display values fit comfortably in the integer range"
)]
#[must_use]
pub fn format_distance(meters: f64) -> String {
    if !meters.is_finite() {
        return "unreachable".to_owned();
    }
    if meters < 1000.0 {
        format!("{} m", meters.round() as i64)
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

/// Format seconds for humans: minutes below an hour, otherwise
/// `"H h MM min"`.
///
/// # Examples
/// ```
/// use fieldroute_core::format_duration;
///
/// assert_eq!(format_duration(45.0), "1 min");
/// assert_eq!(format_duration(1500.0), "25 min");
/// assert_eq!(format_duration(3900.0), "1 h 05 min");
/// ```
#[expect(
    clippy::float_arithmetic,
    clippy::cast_possible_truncation,
    clippy::integer_division,
    clippy::integer_division_remainder_used,
    reason = "rounded display values fit comfortably in the integer range"
)]
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "unreachable".to_owned();
    }
    let minutes = (seconds / 60.0).round().max(1.0) as i64;
    if minutes < 60 {
        format!("{minutes} min")
    } else {
        format!("{} h {:02} min", minutes / 60, minutes % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, "0 m")]
    #[case(999.4, "999 m")]
    #[case(1000.0, "1.0 km")]
    #[case(253_400.0, "253.4 km")]
    #[case(f64::INFINITY, "unreachable")]
    fn distance_formatting(#[case] meters: f64, #[case] expected: &str) {
        assert_eq!(format_distance(meters), expected);
    }

    #[rstest]
    #[case(10.0, "1 min")]
    #[case(90.0, "2 min")]
    #[case(3540.0, "59 min")]
    #[case(3600.0, "1 h 00 min")]
    #[case(7530.0, "2 h 06 min")]
    fn duration_formatting(#[case] seconds: f64, #[case] expected: &str) {
        assert_eq!(format_duration(seconds), expected);
    }

    #[test]
    fn traffic_duration_takes_priority() {
        let result = DistanceResult::new(1000.0, 100.0, ProviderId::MatrixApi, 1)
            .with_traffic_duration(160.0);
        assert_eq!(result.effective_duration_seconds(), 160.0);
        assert_eq!(result.duration_seconds, 100.0);
    }
}
