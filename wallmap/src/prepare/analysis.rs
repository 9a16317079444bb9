//! Bounds analysis for Spain, used to pick `bounds` for map configs.

use std::fmt;

use tracing::info;

use super::{read_input, spanish, DataPaths, PrepareResult, ADMIN1_SHAPEFILE, COUNTRIES_SHAPEFILE};
use crate::bounds::{presets, BoundsReport, Extent};
use crate::layer::{Crs, Filter, Layer, LayerError};

/// Reports for each analyzed layer; `None` marks a layer with no data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundsAnalysis {
    pub reports: Vec<(String, Option<BoundsReport>)>,
    /// Provinces dropped by the mainland filter.
    pub excluded: Vec<String>,
    /// Config bounds for mainland Spain, with 3% padding.
    pub recommended: Option<Extent>,
}

impl BoundsAnalysis {
    fn add(&mut self, name: &str, layer: &Layer) -> Option<BoundsReport> {
        let report = BoundsReport::for_layer(name, layer);
        self.reports.push((name.to_string(), report.clone()));
        report
    }
}

impl fmt::Display for BoundsAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, report) in &self.reports {
            match report {
                Some(report) => writeln!(f, "{}\n", report)?,
                None => writeln!(f, "=== {} ===\nNo data found!\n", name)?,
            }
        }
        if !self.excluded.is_empty() {
            writeln!(f, "Excluded regions:")?;
            for name in &self.excluded {
                writeln!(f, "  - {}", name)?;
            }
            writeln!(f)?;
        }
        if let Some(extent) = &self.recommended {
            writeln!(f, "RECOMMENDED CONFIG FOR MAINLAND SPAIN:")?;
            writeln!(f, "{}", BoundsReport::config_snippet(extent))?;
            writeln!(f, "# Excludes the Canary Islands, includes the Balearic Islands")?;
            write!(f, "# Aspect ratio: {:.2}", extent.aspect_ratio())?;
        }
        Ok(())
    }
}

fn mercator(layer: Layer) -> PrepareResult<Layer> {
    Ok(layer.to_crs(&Crs::WebMercator)?)
}

/// Analyzes the Spain country boundary and provinces, optionally restricted
/// to the mainland.
pub fn analyze_spain(paths: &DataPaths, mainland_only: bool) -> PrepareResult<BoundsAnalysis> {
    let countries = read_input(&paths.raw_file(COUNTRIES_SHAPEFILE))?;
    let name_filter = Filter::parse("NAME == 'Spain'").map_err(LayerError::from)?;
    let country = mercator(name_filter.apply(countries))?;
    let provinces = mercator(spanish(read_input(&paths.raw_file(ADMIN1_SHAPEFILE))?)?)?;
    info!(country = country.len(), provinces = provinces.len(), "Loaded Spain geodata");

    Ok(analyze(&country, &provinces, mainland_only))
}

/// Analysis over already projected layers.
pub(crate) fn analyze(country: &Layer, provinces: &Layer, mainland_only: bool) -> BoundsAnalysis {
    let mut analysis = BoundsAnalysis::default();
    analysis.add("Full Spain (all territories)", country);
    analysis.add("All Spanish Provinces/Regions", provinces);

    if mainland_only {
        let filter = presets::mainland_spain_strict();
        let split = filter.partition(provinces.clone());
        analysis.excluded = split
            .outside
            .iter()
            .map(|f| match f.get("name") {
                name if name.is_null() => f.get("NAME").to_string(),
                name => name.to_string(),
            })
            .collect();
        info!(
            total = provinces.len(),
            mainland = split.inside.len(),
            excluded = split.outside.len(),
            "Filtered mainland provinces"
        );

        let mainland = analysis.add("Mainland Spain Provinces (excluding islands)", &split.inside);
        let mainland_country = filter.partition(country.clone()).inside;
        analysis.add("Mainland Spain Country Boundary", &mainland_country);
        analysis.recommended = mainland.map(|r| r.recommended());
    }

    analysis
}
