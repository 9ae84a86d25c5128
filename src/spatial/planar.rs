//! Planar geometry service on top of `geo`

use geo::{Centroid, EuclideanDistance, InteriorPoint, Intersects, Relate};
use geo_types::{Point, Polygon};

use super::{GeometryService, Parcel, ParcelPoint, Zone};
use crate::core::error::GeometryError;
use crate::core::types::ZoneId;

/// Euclidean geometry in the feed's projected coordinates
#[derive(Debug, Clone, Copy)]
pub struct PlanarGeometry {
    sentinel: f64,
}

impl PlanarGeometry {
    pub fn new(sentinel: f64) -> Self {
        Self { sentinel }
    }

    /// True when the interiors overlap; shared edges alone do not count
    fn overlaps_interior(parcel: &Polygon<f64>, boundary: &Polygon<f64>) -> bool {
        let matrix = parcel.relate(boundary);
        matrix.is_intersects() && !matrix.is_touches()
    }

    fn overlaps_any(parcel: &Parcel, boundary: &[Polygon<f64>]) -> bool {
        boundary
            .iter()
            .any(|b| Self::overlaps_interior(&parcel.geometry, b))
    }
}

impl Default for PlanarGeometry {
    fn default() -> Self {
        Self::new(999_999.0)
    }
}

impl GeometryService for PlanarGeometry {
    fn select_by_intersection(
        &self,
        parcels: &[Parcel],
        boundary: &[Polygon<f64>],
    ) -> Result<Vec<Parcel>, GeometryError> {
        Ok(parcels
            .iter()
            .filter(|p| Self::overlaps_any(p, boundary))
            .cloned()
            .collect())
    }

    fn select_by_exclusion(
        &self,
        parcels: &[Parcel],
        boundary: &[Polygon<f64>],
    ) -> Result<Vec<Parcel>, GeometryError> {
        Ok(parcels
            .iter()
            .filter(|p| !Self::overlaps_any(p, boundary))
            .cloned()
            .collect())
    }

    fn polygons_to_points(&self, parcels: &[Parcel]) -> Result<Vec<ParcelPoint>, GeometryError> {
        parcels
            .iter()
            .map(|parcel| {
                let location = parcel
                    .geometry
                    .interior_point()
                    .ok_or(GeometryError::DegenerateGeometry(parcel.id))?;
                Ok(ParcelPoint {
                    id: parcel.id,
                    code: parcel.code.clone(),
                    location,
                })
            })
            .collect()
    }

    fn nearest_distance(
        &self,
        points: &[Point<f64>],
        reference: &[Point<f64>],
    ) -> Result<Vec<f64>, GeometryError> {
        Ok(points
            .iter()
            .map(|p| {
                reference
                    .iter()
                    .map(|r| p.euclidean_distance(r))
                    .fold(self.sentinel, f64::min)
            })
            .collect())
    }

    fn spatial_join(
        &self,
        points: Vec<ParcelPoint>,
        zones: &[Zone],
    ) -> Result<Vec<(ParcelPoint, Option<ZoneId>)>, GeometryError> {
        Ok(points
            .into_iter()
            .map(|point| {
                let zone = zones
                    .iter()
                    .find(|z| z.boundary.intersects(&point.location))
                    .map(|z| z.id);
                (point, zone)
            })
            .collect())
    }

    fn zone_centroid(&self, zone: &Zone) -> Result<Point<f64>, GeometryError> {
        zone.boundary
            .centroid()
            .ok_or(GeometryError::NoCentroid(zone.id))
    }

    fn distance_sentinel(&self) -> f64 {
        self.sentinel
    }
}
