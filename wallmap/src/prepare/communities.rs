//! Autonomous communities dissolved from Natural Earth provinces.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use tracing::info;

use super::{read_input, spanish, DataPaths, PrepareResult, ADMIN1_SHAPEFILE};
use crate::bounds::{presets, Partition};
use crate::dissolve::{dissolve, AggregationPlan, Aggregation, RegionPolicy};
use crate::layer::{write_geojson, Crs, Layer};

pub const COMMUNITIES_FILE: &str = "spain_autonomous_communities.geojson";
pub const MAINLAND_COMMUNITIES_FILE: &str = "mainland_spain_autonomous_communities.geojson";

const REGION_KEY: &str = "region";

fn plan() -> AggregationPlan {
    AggregationPlan::new()
        .with("name", Aggregation::First)
        .with("region_cod", Aggregation::First)
        .with("admin", Aggregation::First)
        .with("type_en", Aggregation::First)
        .with("area_sqkm", Aggregation::Sum)
        .with("name_es", Aggregation::First)
}

/// Dissolves the Spanish records of an admin-1 layer into one feature per
/// autonomous community.
pub fn create_communities(admin1: Layer) -> PrepareResult<Layer> {
    let provinces = spanish(admin1)?;
    info!(provinces = provinces.len(), "Found Spanish provinces");

    let mut per_region: BTreeMap<String, usize> = BTreeMap::new();
    for feature in &provinces {
        *per_region.entry(feature.get(REGION_KEY).to_string()).or_default() += 1;
    }
    for (region, count) in &per_region {
        info!(region = %region, provinces = count, "Region to dissolve");
    }

    let dissolved = dissolve(&provinces, REGION_KEY, &plan())?;
    let communities = RegionPolicy::spanish_communities().apply(dissolved, REGION_KEY);
    info!(communities = communities.len(), "Created autonomous communities");
    Ok(communities)
}

/// Splits communities into mainland and excluded by Web Mercator centroid.
///
/// Features keep the layer's own CRS; only the classification is projected.
pub fn split_mainland(layer: Layer) -> PrepareResult<Partition> {
    let filter = presets::mainland_spain();
    let projected = layer.clone().to_crs(&Crs::WebMercator)?;
    let mask: Vec<bool> = projected.iter().map(|f| filter.classify(f)).collect();

    let mut inside = layer.empty_like();
    let mut outside = layer.empty_like();
    for (feature, keep) in layer.into_features().into_iter().zip(mask) {
        if keep {
            inside.push(feature);
        } else {
            outside.push(feature);
        }
    }
    Ok(Partition { inside, outside })
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommunitiesSummary {
    /// Region name and summed area, in output order.
    pub communities: Vec<(String, Option<f64>)>,
    pub output: PathBuf,
    pub mainland_output: Option<PathBuf>,
    pub excluded: Vec<String>,
}

impl fmt::Display for CommunitiesSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Created Autonomous Communities ===")?;
        for (region, area) in &self.communities {
            match area {
                Some(area) => writeln!(f, "{}: {:.0} km²", region, area)?,
                None => writeln!(f, "{}", region)?,
            }
        }
        writeln!(f)?;
        writeln!(f, "Use it in a map config with:")?;
        write!(f, "  file: \"processed/{}\"", COMMUNITIES_FILE)?;
        if self.mainland_output.is_some() {
            writeln!(f)?;
            writeln!(f, "Or for mainland only:")?;
            write!(f, "  file: \"processed/{}\"", MAINLAND_COMMUNITIES_FILE)?;
        }
        Ok(())
    }
}

/// Builds the communities file and, with `mainland_only`, the mainland variant.
pub fn run_communities(paths: &DataPaths, mainland_only: bool) -> PrepareResult<CommunitiesSummary> {
    let input = paths.raw_file(ADMIN1_SHAPEFILE);
    info!(path = %input.display(), "Loading provinces");
    let communities = create_communities(read_input(&input)?)?;

    let output = paths.processed_file(COMMUNITIES_FILE);
    write_geojson(&communities, &output)?;
    info!(path = %output.display(), "Saved autonomous communities");

    let mut summary = CommunitiesSummary {
        communities: communities
            .iter()
            .map(|f| (f.get(REGION_KEY).to_string(), f.get("area_sqkm").as_f64()))
            .collect(),
        output,
        mainland_output: None,
        excluded: Vec::new(),
    };

    if mainland_only {
        let Partition { inside, outside } = split_mainland(communities)?;
        info!(mainland = inside.len(), excluded = outside.len(), "Filtered mainland communities");
        summary.excluded = outside.iter().map(|f| f.get(REGION_KEY).to_string()).collect();
        for region in &summary.excluded {
            info!(region = %region, "Excluded community");
        }

        let path = paths.processed_file(MAINLAND_COMMUNITIES_FILE);
        write_geojson(&inside, &path)?;
        info!(path = %path.display(), "Saved mainland communities");
        summary.mainland_output = Some(path);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::AttrValue;
    use crate::prepare::fixtures;
    use geo::Geometry;

    #[test]
    fn test_create_communities() {
        let communities = create_communities(fixtures::admin1()).unwrap();

        let regions: Vec<String> = communities.iter().map(|f| f.get("region").to_string()).collect();
        assert_eq!(regions, vec!["Canary Islands", "Ceuta", "Murcia"]);
        assert_eq!(
            communities.columns(),
            &["region", "name", "region_cod", "type_en", "admin", "area_sqkm"]
        );

        let murcia = &communities.features()[2];
        assert_eq!(murcia.get("name"), &AttrValue::from("Murcia"));
        assert_eq!(murcia.get("area_sqkm").as_f64(), Some(150.0));
        assert_eq!(murcia.get("type_en").as_str(), Some("Autonomous Community"));
        assert!(matches!(murcia.geometry, Geometry::MultiPolygon(_)));

        let ceuta = &communities.features()[1];
        assert_eq!(ceuta.get("type_en").as_str(), Some("Autonomous City"));
    }

    #[test]
    fn test_split_mainland_keeps_crs() {
        let communities = create_communities(fixtures::admin1()).unwrap();
        let Partition { inside, outside } = split_mainland(communities).unwrap();

        assert_eq!(inside.crs(), &Crs::Wgs84);
        assert_eq!(inside.len(), 2);
        assert_eq!(outside.len(), 1);
        assert_eq!(outside.features()[0].get("region").as_str(), Some("Canary Islands"));
    }

    #[test]
    fn test_summary_display() {
        let summary = CommunitiesSummary {
            communities: vec![("Murcia".into(), Some(150.4)), ("Ceuta".into(), None)],
            output: PathBuf::from("data/processed").join(COMMUNITIES_FILE),
            mainland_output: None,
            excluded: Vec::new(),
        };
        let text = summary.to_string();
        assert!(text.contains("Murcia: 150 km²"));
        assert!(text.contains("\nCeuta\n"));
        assert!(!text.contains("mainland"));
    }
}
