//! Minimal well-known-text support: `POINT` and `POLYGON`.
//!
//! `loc` events carry their position as WKT and the spatial filter is a WKT
//! polygon. Anything else (multi-geometries, `EMPTY`, curves) is rejected.

use waypoint_types::LonLat;

use crate::error::MapError;

/// A parsed WKT geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// A single position.
    Point(LonLat),
    /// A polygon with optional holes.
    Polygon(Polygon),
}

impl Geometry {
    /// The WKT keyword of this geometry.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Point(_) => "POINT",
            Self::Polygon(_) => "POLYGON",
        }
    }
}

/// A polygon as an exterior ring plus holes, in lon/lat degrees.
///
/// Rings are stored open (the closing vertex is dropped).
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    exterior: Vec<LonLat>,
    holes: Vec<Vec<LonLat>>,
}

impl Polygon {
    /// Build a polygon from its exterior ring. A closing vertex equal to
    /// the first one is accepted and dropped.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::DegenerateRing`] if fewer than three vertices
    /// remain.
    pub fn from_exterior(ring: Vec<LonLat>) -> Result<Self, MapError> {
        Ok(Self {
            exterior: open_ring(ring)?,
            holes: Vec::new(),
        })
    }

    /// The exterior ring.
    pub fn exterior(&self) -> &[LonLat] {
        &self.exterior
    }

    /// Whether `position` lies inside the exterior ring and outside every
    /// hole (even-odd rule).
    pub fn contains(&self, position: LonLat) -> bool {
        ring_contains(&self.exterior, position)
            && !self.holes.iter().any(|hole| ring_contains(hole, position))
    }

    /// Render as closed-ring WKT.
    pub fn to_wkt(&self) -> String {
        let ring_text = |ring: &[LonLat]| {
            let mut coords: Vec<String> = ring
                .iter()
                .map(|p| format!("{} {}", p.lon(), p.lat()))
                .collect();
            if let Some(first) = ring.first() {
                coords.push(format!("{} {}", first.lon(), first.lat()));
            }
            format!("({})", coords.join(", "))
        };
        let rings: Vec<String> = std::iter::once(self.exterior.as_slice())
            .chain(self.holes.iter().map(Vec::as_slice))
            .map(ring_text)
            .collect();
        format!("POLYGON ({})", rings.join(", "))
    }
}

/// Parse a `POINT` or `POLYGON`.
///
/// # Errors
///
/// Returns [`MapError::InvalidWkt`] for malformed text and
/// [`MapError::UnexpectedGeometry`] for other geometry types.
pub fn parse(wkt: &str) -> Result<Geometry, MapError> {
    let text = wkt.trim();
    let open = text
        .find('(')
        .ok_or_else(|| MapError::InvalidWkt(text.to_owned()))?;
    let (keyword, body) = text.split_at(open);
    let keyword = keyword.trim().to_ascii_uppercase();
    let inner = strip_parens(body).ok_or_else(|| MapError::InvalidWkt(text.to_owned()))?;

    match keyword.as_str() {
        "POINT" => parse_coord(inner).map(Geometry::Point),
        "POLYGON" => {
            let mut rings = split_rings(inner)?
                .into_iter()
                .map(|ring| ring.split(',').map(parse_coord).collect::<Result<Vec<_>, _>>())
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .map(open_ring)
                .collect::<Result<Vec<_>, _>>()?
                .into_iter();
            let exterior = rings
                .next()
                .ok_or_else(|| MapError::InvalidWkt(text.to_owned()))?;
            Ok(Geometry::Polygon(Polygon {
                exterior,
                holes: rings.collect(),
            }))
        }
        other => Err(MapError::UnexpectedGeometry {
            expected: "POINT or POLYGON",
            found: other.to_owned(),
        }),
    }
}

/// Parse WKT that must be a `POINT`.
///
/// # Errors
///
/// As [`parse`], plus [`MapError::UnexpectedGeometry`] for polygons.
pub fn parse_point(wkt: &str) -> Result<LonLat, MapError> {
    match parse(wkt)? {
        Geometry::Point(p) => Ok(p),
        other => Err(MapError::UnexpectedGeometry {
            expected: "POINT",
            found: other.type_name().to_owned(),
        }),
    }
}

/// Parse WKT that must be a `POLYGON`.
///
/// # Errors
///
/// As [`parse`], plus [`MapError::UnexpectedGeometry`] for points.
pub fn parse_polygon(wkt: &str) -> Result<Polygon, MapError> {
    match parse(wkt)? {
        Geometry::Polygon(p) => Ok(p),
        other => Err(MapError::UnexpectedGeometry {
            expected: "POLYGON",
            found: other.type_name().to_owned(),
        }),
    }
}

fn strip_parens(s: &str) -> Option<&str> {
    s.trim().strip_prefix('(')?.strip_suffix(')')
}

fn parse_coord(s: &str) -> Result<LonLat, MapError> {
    let mut parts = s.split_whitespace().map(str::parse::<f64>);
    match (parts.next(), parts.next()) {
        (Some(Ok(lon)), Some(Ok(lat))) if lon.is_finite() && lat.is_finite() => {
            Ok(LonLat(lon, lat))
        }
        _ => Err(MapError::InvalidWkt(s.trim().to_owned())),
    }
}

/// Split `(a b, c d), (e f, ...)` into the ring bodies.
fn split_rings(s: &str) -> Result<Vec<&str>, MapError> {
    let mut rings = Vec::new();
    let mut rest = s.trim();
    while !rest.is_empty() {
        let body = rest
            .strip_prefix('(')
            .ok_or_else(|| MapError::InvalidWkt(rest.to_owned()))?;
        let close = body
            .find(')')
            .ok_or_else(|| MapError::InvalidWkt(rest.to_owned()))?;
        let (ring, tail) = body.split_at(close);
        rings.push(ring);
        let tail = tail.trim_start_matches(')').trim_start();
        rest = tail.strip_prefix(',').unwrap_or(tail).trim_start();
    }
    Ok(rings)
}

fn open_ring(mut ring: Vec<LonLat>) -> Result<Vec<LonLat>, MapError> {
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    if ring.len() < 3 {
        return Err(MapError::DegenerateRing(ring.len()));
    }
    Ok(ring)
}

fn ring_contains(ring: &[LonLat], p: LonLat) -> bool {
    let (x, y) = (p.lon(), p.lat());
    let next = ring.iter().cycle().skip(1);
    ring.iter()
        .zip(next)
        .filter(|(a, b)| {
            let (xi, yi) = (a.lon(), a.lat());
            let (xj, yj) = (b.lon(), b.lat());
            (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi
        })
        .count()
        % 2
        == 1
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SQUARE: &str = "POLYGON ((34 31, 35 31, 35 32, 34 32, 34 31))";

    #[test]
    fn parses_point_case_insensitively() {
        let p = parse_point("point(34.5 31.25)").unwrap();
        assert!((p.lon() - 34.5).abs() < 1e-12);
        assert!((p.lat() - 31.25).abs() < 1e-12);
    }

    #[test]
    fn point_with_extra_dimension_keeps_xy() {
        let p = parse_point("POINT (1 2 3)").unwrap();
        assert!((p.lat() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn polygon_is_not_a_point() {
        let err = parse_point(SQUARE).unwrap_err();
        assert!(matches!(err, MapError::UnexpectedGeometry { .. }));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("POINT").is_err());
        assert!(parse("POINT (a b)").is_err());
        assert!(parse("LINESTRING (0 0, 1 1)").is_err());
        assert!(parse("POLYGON ((0 0, 1 1, 0 0))").is_err());
    }

    #[test]
    fn polygon_contains() {
        let square = parse_polygon(SQUARE).unwrap();
        assert!(square.contains(LonLat(34.5, 31.5)));
        assert!(!square.contains(LonLat(35.5, 31.5)));
    }

    #[test]
    fn holes_are_excluded() {
        let donut = parse_polygon(
            "POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0), (4 4, 6 4, 6 6, 4 6, 4 4))",
        )
        .unwrap();
        assert!(donut.contains(LonLat(2.0, 2.0)));
        assert!(!donut.contains(LonLat(5.0, 5.0)));
    }

    #[test]
    fn to_wkt_closes_ring() {
        let square = parse_polygon(SQUARE).unwrap();
        let again = parse_polygon(&square.to_wkt()).unwrap();
        assert_eq!(again, square);
        assert!(square.to_wkt().starts_with("POLYGON ((34 31"));
    }
}
