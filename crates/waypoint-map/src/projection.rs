//! Spherical Web Mercator projection and view geometry.
//!
//! Map coordinates are meters in EPSG:3857. Resolution (meters per pixel)
//! follows the standard 256-pixel tile pyramid, so pixel distances used by
//! clustering and hit testing convert to meters as `px * resolution(zoom)`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use waypoint_types::LonLat;

use crate::error::MapError;

/// WGS84 semi-major axis, used as the sphere radius.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Largest latitude representable in Web Mercator.
pub const MAX_LAT_DEG: f64 = 85.051_128_78;

/// Resolution at zoom 0: the equator's circumference over one 256 px tile.
pub const ZOOM0_RESOLUTION: f64 = 156_543.033_928_040_97;

/// Deepest zoom level the view accepts.
pub const MAX_ZOOM: f64 = 28.0;

/// A projected position in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MapPoint {
    /// Easting.
    pub x: f64,
    /// Northing.
    pub y: f64,
}

impl MapPoint {
    /// Build a point from raw meters.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other` in meters.
    pub fn distance(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Point at fraction `m` along the segment `self -> other`.
    pub fn lerp(self, other: Self, m: f64) -> Self {
        Self {
            x: self.x + m * (other.x - self.x),
            y: self.y + m * (other.y - self.y),
        }
    }

    /// Midpoint of the segment `self -> other`.
    pub fn midpoint(self, other: Self) -> Self {
        self.lerp(other, 0.5)
    }
}

/// Project a lon/lat position to Web Mercator meters.
///
/// Latitudes beyond [`MAX_LAT_DEG`] are clamped.
pub fn from_lon_lat(position: LonLat) -> MapPoint {
    let lat = position.lat().clamp(-MAX_LAT_DEG, MAX_LAT_DEG).to_radians();
    MapPoint {
        x: EARTH_RADIUS_M * position.lon().to_radians(),
        y: EARTH_RADIUS_M * (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln(),
    }
}

/// Inverse of [`from_lon_lat`].
pub fn to_lon_lat(point: MapPoint) -> LonLat {
    let lon = (point.x / EARTH_RADIUS_M).to_degrees();
    let lat = 2.0f64
        .mul_add((point.y / EARTH_RADIUS_M).exp().atan(), -std::f64::consts::FRAC_PI_2)
        .to_degrees();
    LonLat(lon, lat)
}

/// Meters per pixel at `zoom`.
///
/// # Errors
///
/// Returns [`MapError::ZoomOutOfRange`] for negative, non-finite or too
/// deep zoom levels.
pub fn resolution_for_zoom(zoom: f64) -> Result<f64, MapError> {
    if !zoom.is_finite() || !(0.0..=MAX_ZOOM).contains(&zoom) {
        return Err(MapError::ZoomOutOfRange(zoom.to_string()));
    }
    Ok(ZOOM0_RESOLUTION / zoom.exp2())
}

/// An axis-aligned rectangle in map meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Extent {
    /// Minimum easting.
    pub min_x: f64,
    /// Minimum northing.
    pub min_y: f64,
    /// Maximum easting.
    pub max_x: f64,
    /// Maximum northing.
    pub max_y: f64,
}

impl Extent {
    /// The extent spanned by two opposite corners, in any order.
    pub fn from_corners(a: MapPoint, b: MapPoint) -> Self {
        Self {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }

    /// A square of half-width `radius` around `center`.
    pub fn around(center: MapPoint, radius: f64) -> Self {
        Self {
            min_x: center.x - radius,
            min_y: center.y - radius,
            max_x: center.x + radius,
            max_y: center.y + radius,
        }
    }

    /// Whether `point` lies inside or on the boundary.
    pub fn contains(&self, point: MapPoint) -> bool {
        (self.min_x..=self.max_x).contains(&point.x) && (self.min_y..=self.max_y).contains(&point.y)
    }
}

/// Camera state of the map view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Viewport {
    /// View center.
    pub center: MapPoint,
    /// Fractional zoom level.
    pub zoom: f64,
}

impl Viewport {
    /// A view centered on a lon/lat position.
    pub fn centered_on(center: LonLat, zoom: f64) -> Self {
        Self {
            center: from_lon_lat(center),
            zoom,
        }
    }

    /// Meters per pixel at the current zoom.
    ///
    /// # Errors
    ///
    /// See [`resolution_for_zoom`].
    pub fn resolution(&self) -> Result<f64, MapError> {
        resolution_for_zoom(self.zoom)
    }

    /// The view that fits a single point: centered on `target` at
    /// `max_zoom`, since a point has no extent to fit.
    pub fn fit_point(target: MapPoint, max_zoom: f64) -> Self {
        Self {
            center: target,
            zoom: max_zoom.clamp(0.0, MAX_ZOOM),
        }
    }
}
