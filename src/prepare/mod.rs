//! Node preparation: raw land-cover feed to classified, scored unit pools

use std::collections::BTreeMap;
use std::path::Path;

use geo_types::{Point, Polygon};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::error::{GeometryError, Result};
use crate::core::types::{UnitId, ZoneId};
use crate::nodes::{
    classify_sources, classify_target, ClassificationGap, GapReason, SourceClassification,
    TargetUnit,
};
use crate::phase::GrazingRules;
use crate::scoring::{rank_by_suitability, score_units};
use crate::spatial::{GeometryService, Parcel, Zone};

/// The polygon inputs of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandCoverFeed {
    pub parcels: Vec<Parcel>,
    /// Outer boundary of the supply region
    pub greenbelt: Vec<Polygon<f64>>,
    /// Island polygons; each is a zone for scoring
    pub islands: Vec<Zone>,
}

impl LandCoverFeed {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn island_boundaries(&self) -> Vec<Polygon<f64>> {
        self.islands.iter().map(|z| z.boundary.clone()).collect()
    }
}

/// Classify the source pool: greenbelt parcels off the islands with an eligible code
pub fn classify_source_nodes<G, R>(
    feed: &LandCoverFeed,
    geometry: &G,
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<SourceClassification>
where
    G: GeometryService + ?Sized,
    R: Rng + ?Sized,
{
    let in_belt = geometry.select_by_intersection(&feed.parcels, &feed.greenbelt)?;
    let off_islands = geometry.select_by_exclusion(&in_belt, &feed.island_boundaries())?;

    let eligible: Vec<Parcel> = off_islands
        .into_iter()
        .filter(|p| config.codes.source_eligible.contains(&p.code))
        .collect();
    tracing::debug!(
        in_greenbelt = in_belt.len(),
        eligible = eligible.len(),
        "Source region selected"
    );

    let points = geometry.polygons_to_points(&eligible)?;
    Ok(classify_sources(&points, config, rng))
}

/// Prepared target pool
#[derive(Debug, Clone, Default)]
pub struct TargetPreparation {
    pub units: Vec<TargetUnit>,
    /// Scoreable unit ids, best replacement target first
    pub ranked: Vec<UnitId>,
    pub replaceable_count: usize,
    pub gaps: Vec<ClassificationGap>,
}

/// Fill in centroid and industrial distances for the units of one zone
fn measure_zone<G: GeometryService + ?Sized>(
    units: &mut [TargetUnit],
    members: &[usize],
    zone: &Zone,
    geometry: &G,
    config: &SimulationConfig,
) -> std::result::Result<(), GeometryError> {
    let locations: Vec<Point<f64>> = members.iter().map(|&i| units[i].location).collect();

    let centroid = geometry.zone_centroid(zone)?;
    let centroid_distances = geometry.nearest_distance(&locations, &[centroid])?;

    let industrial: Vec<Point<f64>> = members
        .iter()
        .filter(|&&i| config.codes.industrial.contains(&units[i].origin_code))
        .map(|&i| units[i].location)
        .collect();
    if industrial.is_empty() {
        tracing::debug!(zone = %zone.id, "Zone has no industrial units");
    }
    let industrial_distances = geometry.nearest_distance(&locations, &industrial)?;

    for (k, &i) in members.iter().enumerate() {
        units[i].centroid_distance = centroid_distances[k];
        units[i].industrial_distance = industrial_distances[k];
    }
    Ok(())
}

/// Classify, measure and score the island parcels
pub fn classify_and_score_target_nodes<G>(
    parcels: &[Parcel],
    zones: &[Zone],
    geometry: &G,
    config: &SimulationConfig,
) -> Result<TargetPreparation>
where
    G: GeometryService + ?Sized,
{
    let boundaries: Vec<Polygon<f64>> = zones.iter().map(|z| z.boundary.clone()).collect();
    let on_islands = geometry.select_by_intersection(parcels, &boundaries)?;
    let points = geometry.polygons_to_points(&on_islands)?;
    let joined = geometry.spatial_join(points, zones)?;
    let sentinel = geometry.distance_sentinel();

    let mut units = Vec::with_capacity(joined.len());
    let mut gaps = Vec::new();
    for (point, zone) in joined {
        let Some(zone) = zone else {
            gaps.push(ClassificationGap::new(point.id, point.code, GapReason::OutsideZones));
            continue;
        };
        match classify_target(&point, config) {
            Ok((status, node_type)) => units.push(TargetUnit::new(
                point.id,
                point.code,
                status,
                node_type,
                zone,
                point.location,
                sentinel,
            )),
            Err(reason) => gaps.push(ClassificationGap::new(point.id, point.code, reason)),
        }
    }

    let mut members: BTreeMap<ZoneId, Vec<usize>> = BTreeMap::new();
    for (i, unit) in units.iter().enumerate() {
        members.entry(unit.zone).or_default().push(i);
    }
    for zone in zones {
        if let Some(indices) = members.get(&zone.id) {
            measure_zone(&mut units, indices, zone, geometry, config)?;
        }
    }

    let scored_zones = score_units(&mut units, &config.weights, sentinel);
    GrazingRules::new(config).apply(&mut units);

    let ranked = rank_by_suitability(&units);
    let replaceable_count = ranked.len();

    tracing::info!(
        units = units.len(),
        excluded = gaps.len(),
        replaceable = replaceable_count,
        scored_zones,
        "Target nodes classified and scored"
    );

    Ok(TargetPreparation {
        units,
        ranked,
        replaceable_count,
        gaps,
    })
}
