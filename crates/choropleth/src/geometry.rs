//! Geometry primitives the preprocessor delegates to.
//!
//! The map core never computes centroids or polygon unions itself. It goes
//! through [`GeometryLibrary`], whose default implementation [`GeoKernel`]
//! uses the `geo` crate (planar algorithms on lon/lat degrees).

use formats::{GeoPoint, Geometry, Ring};
use foundation::Aabb2;
use geo::{BooleanOps, Centroid};

pub trait GeometryLibrary {
    /// Geometric centroid, or `None` for an empty geometry.
    fn centroid(&self, geometry: &Geometry) -> Option<GeoPoint>;

    /// Union of the areal parts of `geometries`, as one outline geometry.
    ///
    /// Returns `None` when no areal input remains.
    fn merge(&self, geometries: &[&Geometry]) -> Option<Geometry>;

    fn bounds(&self, geometry: &Geometry) -> Option<Aabb2> {
        let mut points = geometry.points();
        let first = points.next()?;
        let mut out = Aabb2::from_point(first.lon_deg, first.lat_deg);
        for p in points {
            out.extend_point(p.lon_deg, p.lat_deg);
        }
        Some(out)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GeoKernel;

impl GeometryLibrary for GeoKernel {
    fn centroid(&self, geometry: &Geometry) -> Option<GeoPoint> {
        to_geo(geometry)
            .centroid()
            .map(|p| GeoPoint::new(p.x(), p.y()))
    }

    fn merge(&self, geometries: &[&Geometry]) -> Option<Geometry> {
        let mut areal = geometries.iter().filter_map(|g| to_multi_polygon(g));
        let first = areal.next()?;
        let merged = areal.fold(first, |acc, next| acc.union(&next));
        if merged.0.is_empty() {
            return None;
        }
        Some(from_multi_polygon(&merged))
    }
}

fn to_line_string(points: &[GeoPoint]) -> geo::LineString<f64> {
    points
        .iter()
        .map(|p| (p.lon_deg, p.lat_deg))
        .collect::<Vec<_>>()
        .into()
}

fn to_polygon(rings: &[Ring]) -> Option<geo::Polygon<f64>> {
    let (exterior, interiors) = rings.split_first()?;
    Some(geo::Polygon::new(
        to_line_string(exterior),
        interiors.iter().map(|r| to_line_string(r)).collect(),
    ))
}

fn to_multi_polygon(geometry: &Geometry) -> Option<geo::MultiPolygon<f64>> {
    let polygons: Vec<geo::Polygon<f64>> = match geometry {
        Geometry::Polygon(rings) => to_polygon(rings).into_iter().collect(),
        Geometry::MultiPolygon(polys) => polys.iter().filter_map(|p| to_polygon(p)).collect(),
        _ => return None,
    };
    Some(geo::MultiPolygon::new(polygons))
}

fn to_geo(geometry: &Geometry) -> geo::Geometry<f64> {
    match geometry {
        Geometry::Point(p) => geo::Point::new(p.lon_deg, p.lat_deg).into(),
        Geometry::MultiPoint(ps) => geo::MultiPoint::new(
            ps.iter()
                .map(|p| geo::Point::new(p.lon_deg, p.lat_deg))
                .collect(),
        )
        .into(),
        Geometry::LineString(ps) => to_line_string(ps).into(),
        Geometry::MultiLineString(lines) => {
            geo::MultiLineString::new(lines.iter().map(|l| to_line_string(l)).collect()).into()
        }
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) => to_multi_polygon(geometry)
            .unwrap_or_else(|| geo::MultiPolygon::new(Vec::new()))
            .into(),
    }
}

fn from_line_string(line: &geo::LineString<f64>) -> Ring {
    line.coords().map(|c| GeoPoint::new(c.x, c.y)).collect()
}

fn from_multi_polygon(mp: &geo::MultiPolygon<f64>) -> Geometry {
    Geometry::MultiPolygon(
        mp.iter()
            .map(|poly| {
                std::iter::once(poly.exterior())
                    .chain(poly.interiors())
                    .map(from_line_string)
                    .collect()
            })
            .collect(),
    )
}
