//! Geographic coordinates with validation on construction.

use geo::Point;
use serde::{Deserialize, Serialize};

use crate::DistanceError;

/// Decimal places kept when normalising a coordinate for cache keys.
///
/// Five places is roughly one metre at the equator, which absorbs GPS
/// jitter without conflating genuinely distinct addresses.
pub const KEY_PRECISION: usize = 5;

/// Scale factor matching [`KEY_PRECISION`] decimal places.
const KEY_SCALE: f64 = 100_000.0;

/// Round a component to key precision, collapsing `-0.0` to `0.0` so a
/// micro-degree either side of a meridian shares one key.
#[expect(
    clippy::float_arithmetic,
    reason = "fixed-precision rounding of a key component"
)]
fn key_component(value: f64) -> f64 {
    (value * KEY_SCALE).round() / KEY_SCALE + 0.0
}

/// A WGS84 latitude/longitude pair.
///
/// Construction validates the ranges; out-of-range or non-finite values are
/// rejected with [`DistanceError::InvalidLocation`].
///
/// # Examples
/// ```
/// use fieldroute_core::Coordinate;
///
/// let krakow = Coordinate::new(50.0647, 19.9450)?;
/// assert_eq!(krakow.lat, 50.0647);
/// assert!(Coordinate::new(91.0, 0.0).is_err());
/// # Ok::<(), fieldroute_core::DistanceError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, `[-90, 90]`.
    pub lat: f64,
    /// Longitude in degrees, `[-180, 180]`.
    pub lng: f64,
}

impl Coordinate {
    /// Validate and construct a coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`DistanceError::InvalidLocation`] when either component is
    /// non-finite, `|lat| > 90`, or `|lng| > 180`.
    pub fn new(lat: f64, lng: f64) -> Result<Self, DistanceError> {
        if !lat.is_finite() || !lng.is_finite() || lat.abs() > 90.0 || lng.abs() > 180.0 {
            return Err(DistanceError::InvalidLocation { lat, lng });
        }
        Ok(Self { lat, lng })
    }

    /// Normalised fixed-precision form used for cache and memo keys.
    ///
    /// # Examples
    /// ```
    /// use fieldroute_core::Coordinate;
    ///
    /// let c = Coordinate::new(50.064700001, 19.945)?;
    /// assert_eq!(c.key(), "50.06470,19.94500");
    /// # Ok::<(), fieldroute_core::DistanceError>(())
    /// ```
    #[must_use]
    pub fn key(&self) -> String {
        format!(
            "{:.*},{:.*}",
            KEY_PRECISION,
            key_component(self.lat),
            KEY_PRECISION,
            key_component(self.lng)
        )
    }

    /// Convert to a `geo` point (`x = longitude`, `y = latitude`).
    #[must_use]
    pub fn to_point(self) -> Point<f64> {
        Point::new(self.lng, self.lat)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(90.0, 180.0)]
    #[case(-90.0, -180.0)]
    #[case(52.2297, 21.0122)]
    fn accepts_valid_ranges(#[case] lat: f64, #[case] lng: f64) {
        let coordinate = Coordinate::new(lat, lng).expect("in-range coordinate");
        assert_eq!(coordinate.lat, lat);
        assert_eq!(coordinate.lng, lng);
    }

    #[rstest]
    #[case(90.001, 0.0)]
    #[case(-90.001, 0.0)]
    #[case(0.0, 180.001)]
    #[case(0.0, -180.001)]
    #[case(f64::NAN, 0.0)]
    #[case(0.0, f64::INFINITY)]
    fn rejects_out_of_range(#[case] lat: f64, #[case] lng: f64) {
        assert!(matches!(
            Coordinate::new(lat, lng),
            Err(DistanceError::InvalidLocation { .. })
        ));
    }

    #[rstest]
    fn key_absorbs_sub_metre_jitter() {
        let a = Coordinate::new(50.064701, 19.945001).expect("valid");
        let b = Coordinate::new(50.064699, 19.944999).expect("valid");
        assert_eq!(a.key(), b.key());
    }

    #[rstest]
    fn key_has_no_signed_zero() {
        let west = Coordinate::new(-0.000001, -0.000001).expect("valid");
        let east = Coordinate::new(0.000001, 0.000001).expect("valid");
        assert_eq!(west.key(), "0.00000,0.00000");
        assert_eq!(west.key(), east.key());
    }

    #[rstest]
    fn point_swaps_axes() {
        let c = Coordinate::new(50.0, 19.0).expect("valid");
        let point = c.to_point();
        assert_eq!(point.x(), 19.0);
        assert_eq!(point.y(), 50.0);
    }
}
