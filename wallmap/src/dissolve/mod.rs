//! Region dissolving: group features by a key, union their polygons and
//! aggregate their attributes.
//!
//! ```ignore
//! let plan = AggregationPlan::parse("name:first, area_sqkm:sum")?;
//! let communities = dissolve(&provinces, "region", &plan)?;
//! ```

mod aggregation;
mod policy;

pub use aggregation::{Aggregation, AggregationPlan};
pub use policy::RegionPolicy;

use std::cmp::Ordering;

use geo::{BooleanOps, Geometry, MultiPolygon};
use thiserror::Error;
use tracing::debug;

use crate::layer::{AttrValue, Feature, Layer};

#[derive(Debug, Error)]
pub enum DissolveError {
    #[error("Unknown aggregation rule '{0}' (expected first, last, sum, min, max or count)")]
    UnknownAggregation(String),

    #[error("Invalid aggregation entry '{0}', expected column:rule")]
    InvalidPlanEntry(String),

    #[error("Feature {index} has no value for the region key")]
    MissingKey { index: usize },

    #[error("Feature {index} is not a polygon and cannot be dissolved")]
    NonPolygonal { index: usize },

    #[error("Column '{column}' has non-numeric value '{value}'")]
    NonNumeric { column: String, value: String },
}

pub type DissolveResult<T> = Result<T, DissolveError>;

/// Dissolves `layer` by the `key` column.
///
/// Returns one feature per distinct key, sorted by key. The key column comes
/// first, followed by the plan's columns in plan order. Plan columns the
/// input does not have are skipped.
///
/// # Errors
///
/// Fails when a feature has a null key, a non-polygonal geometry, or when an
/// aggregation meets values it cannot combine.
pub fn dissolve(layer: &Layer, key: &str, plan: &AggregationPlan) -> DissolveResult<Layer> {
    let mut groups: Vec<(AttrValue, Vec<usize>)> = Vec::new();
    for (index, feature) in layer.iter().enumerate() {
        let value = feature.get(key);
        if value.is_null() {
            return Err(DissolveError::MissingKey { index });
        }
        match groups.iter_mut().find(|(k, _)| k == value) {
            Some((_, members)) => members.push(index),
            None => groups.push((value.clone(), vec![index])),
        }
    }
    groups.sort_by(|(a, _), (b, _)| compare_keys(a, b));

    let columns: Vec<(&str, Aggregation)> = plan
        .iter()
        .filter(|(column, _)| {
            let present = layer.has_column(column);
            if !present {
                debug!(column, "Aggregation column not in input, skipping");
            }
            present && *column != key
        })
        .collect();

    let mut out = Layer::new(layer.crs().clone());
    out.add_column(key);
    for (column, _) in &columns {
        out.add_column(*column);
    }

    let features = layer.features();
    for (value, members) in groups {
        let mut merged: Option<MultiPolygon<f64>> = None;
        for &index in &members {
            let polygons = as_multi_polygon(&features[index].geometry)
                .ok_or(DissolveError::NonPolygonal { index })?;
            merged = Some(match merged {
                Some(acc) => acc.union(&polygons),
                None => polygons,
            });
        }

        let mut feature = Feature::new(merged.unwrap_or_else(|| MultiPolygon::new(Vec::new())));
        feature.set(key, value);
        for (column, rule) in &columns {
            let aggregated = rule.apply(column, members.iter().map(|&i| features[i].get(column)))?;
            feature.set(*column, aggregated);
        }
        out.push(feature);
    }

    debug!(
        key,
        input = layer.len(),
        output = out.len(),
        "Dissolved layer"
    );
    Ok(out)
}

fn as_multi_polygon(geometry: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
        Geometry::MultiPolygon(mp) => Some(mp.clone()),
        Geometry::Rect(r) => Some(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Some(MultiPolygon::new(vec![t.to_polygon()])),
        _ => None,
    }
}

fn compare_keys(a: &AttrValue, b: &AttrValue) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::Crs;
    use geo::{point, polygon, Area};

    fn square(x: f64, y: f64) -> geo::Polygon<f64> {
        polygon![
            (x: x, y: y),
            (x: x + 1.0, y: y),
            (x: x + 1.0, y: y + 1.0),
            (x: x, y: y + 1.0),
        ]
    }

    fn province(region: &str, name: &str, area: f64, x: f64) -> Feature {
        Feature::new(square(x, 0.0))
            .with("region", region)
            .with("name", name)
            .with("area", area)
    }

    #[test]
    fn test_murcia_area_sums() {
        let layer = Layer::from_features(
            Crs::Wgs84,
            [
                province("Murcia", "Murcia", 100.0, 0.0),
                province("Murcia", "Cartagena", 50.0, 1.0),
            ],
        );
        let plan = AggregationPlan::new()
            .with("name", Aggregation::First)
            .with("area", Aggregation::Sum);

        let out = dissolve(&layer, "region", &plan).unwrap();

        assert_eq!(out.len(), 1);
        let f = &out.features()[0];
        assert_eq!(f.get("region"), &AttrValue::from("Murcia"));
        assert_eq!(f.get("name"), &AttrValue::from("Murcia"));
        assert_eq!(f.get("area"), &AttrValue::from(150.0));
        assert!((f.geometry.unsigned_area() - 2.0).abs() < 1e-9);
        assert!(matches!(f.geometry, Geometry::MultiPolygon(_)));
    }

    #[test]
    fn test_one_record_per_key_sorted() {
        let layer = Layer::from_features(
            Crs::Wgs84,
            [
                province("Galicia", "Lugo", 1.0, 0.0),
                province("Asturias", "Asturias", 2.0, 5.0),
                province("Galicia", "Ourense", 3.0, 1.0),
                province("Cantabria", "Cantabria", 4.0, 9.0),
            ],
        );
        let plan = AggregationPlan::parse("area:sum, name:count").unwrap();

        let out = dissolve(&layer, "region", &plan).unwrap();

        let keys: Vec<String> = out.iter().map(|f| f.get("region").to_string()).collect();
        assert_eq!(keys, vec!["Asturias", "Cantabria", "Galicia"]);
        assert_eq!(out.columns(), &["region", "area", "name"]);
        assert_eq!(out.features()[2].get("area"), &AttrValue::from(4.0));
        assert_eq!(out.features()[2].get("name"), &AttrValue::from(2.0));
        assert_eq!(out.features()[0].get("name"), &AttrValue::from(1.0));
    }

    #[test]
    fn test_missing_plan_columns_are_skipped() {
        let layer = Layer::from_features(Crs::Wgs84, [province("Murcia", "Murcia", 1.0, 0.0)]);
        let plan = AggregationPlan::parse("name_es:first, area:sum").unwrap();

        let out = dissolve(&layer, "region", &plan).unwrap();
        assert_eq!(out.columns(), &["region", "area"]);
    }

    #[test]
    fn test_missing_key_names_index() {
        let layer = Layer::from_features(
            Crs::Wgs84,
            [
                province("Murcia", "Murcia", 1.0, 0.0),
                Feature::new(square(3.0, 0.0)).with("name", "Orphan"),
            ],
        );
        let err = dissolve(&layer, "region", &AggregationPlan::new()).unwrap_err();
        assert!(matches!(err, DissolveError::MissingKey { index: 1 }));
    }

    #[test]
    fn test_points_cannot_be_dissolved() {
        let layer = Layer::from_features(
            Crs::Wgs84,
            [Feature::new(point!(x: 0.0, y: 0.0)).with("region", "X")],
        );
        let err = dissolve(&layer, "region", &AggregationPlan::new()).unwrap_err();
        assert!(matches!(err, DissolveError::NonPolygonal { index: 0 }));
    }

    #[test]
    fn test_empty_layer() {
        let out = dissolve(&Layer::new(Crs::WebMercator), "region", &AggregationPlan::new()).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.crs(), &Crs::WebMercator);
    }
}
