//! Geometry collaborators
//!
//! The simulation core never touches polygons directly. Selection, point
//! conversion, distance measurement and zone lookup go through
//! [`GeometryService`]; [`PlanarGeometry`] is the in-process implementation
//! built on `geo`.

mod planar;

pub use planar::PlanarGeometry;

use geo_types::{Point, Polygon};
use serde::{Deserialize, Serialize};

use crate::core::error::GeometryError;
use crate::core::types::{LandCode, UnitId, ZoneId};

/// A land-cover polygon as delivered by the input feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    pub id: UnitId,
    pub code: LandCode,
    pub geometry: Polygon<f64>,
}

/// A parcel reduced to a representative point inside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelPoint {
    pub id: UnitId,
    pub code: LandCode,
    pub location: Point<f64>,
}

/// An island polygon that groups target units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub boundary: Polygon<f64>,
}

/// Spatial operations the simulation consumes
pub trait GeometryService {
    /// Parcels overlapping any of the boundary polygons
    fn select_by_intersection(
        &self,
        parcels: &[Parcel],
        boundary: &[Polygon<f64>],
    ) -> Result<Vec<Parcel>, GeometryError>;

    /// Parcels overlapping none of the boundary polygons
    fn select_by_exclusion(
        &self,
        parcels: &[Parcel],
        boundary: &[Polygon<f64>],
    ) -> Result<Vec<Parcel>, GeometryError>;

    /// One point per parcel, guaranteed to lie inside it
    fn polygons_to_points(&self, parcels: &[Parcel]) -> Result<Vec<ParcelPoint>, GeometryError>;

    /// Distance from each point to the nearest reference point
    ///
    /// Points get the service's sentinel distance when `reference` is empty.
    fn nearest_distance(
        &self,
        points: &[Point<f64>],
        reference: &[Point<f64>],
    ) -> Result<Vec<f64>, GeometryError>;

    /// Attach the first zone containing each point (`None` if outside all)
    fn spatial_join(
        &self,
        points: Vec<ParcelPoint>,
        zones: &[Zone],
    ) -> Result<Vec<(ParcelPoint, Option<ZoneId>)>, GeometryError>;

    /// Centre point of a zone
    fn zone_centroid(&self, zone: &Zone) -> Result<Point<f64>, GeometryError>;

    /// Distance reported when nothing can be measured
    fn distance_sentinel(&self) -> f64;
}
