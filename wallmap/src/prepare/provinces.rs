//! Mainland Spanish provinces extracted from the global admin-1 layer.

use std::fs;
use std::path::PathBuf;

use tracing::info;

use super::{read_input, spanish, DataPaths, PrepareResult, ADMIN1_SHAPEFILE};
use crate::layer::{write_geojson, Layer};

pub const PROVINCES_FILE: &str = "mainland_spain_provinces.geojson";

/// Canary Islands provinces.
const ISLAND_PROVINCES: [&str; 2] = ["Santa Cruz de Tenerife", "Las Palmas"];

const COLUMNS: [&str; 4] = ["name", "admin", "type_en", "region"];

/// Spanish provinces without the Canary Islands, essential columns only,
/// sorted by name.
pub fn mainland_provinces(admin1: Layer) -> PrepareResult<Layer> {
    let provinces = spanish(admin1)?;
    info!(provinces = provinces.len(), "Found Spanish provinces");

    let mainland = provinces
        .retain(|f| {
            f.get("name")
                .as_str()
                .map_or(true, |name| !ISLAND_PROVINCES.contains(&name))
        })
        .select_columns(&COLUMNS)
        .sort_by_column("name");
    info!(provinces = mainland.len(), "Filtered to mainland provinces");
    Ok(mainland)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProvincesSummary {
    pub provinces: Vec<String>,
    pub input: PathBuf,
    pub input_bytes: u64,
    pub output: PathBuf,
    pub output_bytes: u64,
}

pub fn run_provinces(paths: &DataPaths) -> PrepareResult<ProvincesSummary> {
    let input = paths.raw_file(ADMIN1_SHAPEFILE);
    info!(path = %input.display(), "Loading global provinces");
    let world = read_input(&input)?;
    info!(features = world.len(), "Loaded provinces/states worldwide");

    let mainland = mainland_provinces(world)?;
    let output = paths.processed_file(PROVINCES_FILE);
    write_geojson(&mainland, &output)?;

    let size = |p: &PathBuf| fs::metadata(p).map(|m| m.len()).unwrap_or(0);
    let summary = ProvincesSummary {
        provinces: mainland.iter().map(|f| f.get("name").to_string()).collect(),
        input_bytes: size(&input),
        output_bytes: size(&output),
        input,
        output,
    };

    info!(
        input = %summary.input.display(),
        input_mb = %format!("{:.1}", summary.input_bytes as f64 / 1024.0 / 1024.0),
        output = %summary.output.display(),
        output_kb = %format!("{:.1}", summary.output_bytes as f64 / 1024.0),
        provinces = summary.provinces.len(),
        "Created mainland provinces file"
    );
    for name in &summary.provinces {
        info!(province = %name, "Mainland province");
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::read_geojson;
    use crate::prepare::{fixtures, PrepareError};
    use tempfile::TempDir;

    #[test]
    fn test_mainland_provinces() {
        let provinces = mainland_provinces(fixtures::admin1()).unwrap();

        let names: Vec<String> = provinces.iter().map(|f| f.get("name").to_string()).collect();
        assert_eq!(names, vec!["Cartagena", "Ceuta", "Murcia"]);
        assert_eq!(provinces.columns(), &["name", "admin", "type_en", "region"]);
        assert!(provinces.iter().all(|f| f.get("area_sqkm").is_null()));
    }

    #[test]
    fn test_run_provinces_missing_input() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        assert!(matches!(run_provinces(&paths), Err(PrepareError::MissingInput(_))));
    }

    #[test]
    fn test_written_file_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(PROVINCES_FILE);
        let provinces = mainland_provinces(fixtures::admin1()).unwrap();
        write_geojson(&provinces, &path).unwrap();

        let back = read_geojson(&path).unwrap();
        assert_eq!(back.len(), 3);
        assert_eq!(back.features()[0].get("region").as_str(), Some("Murcia"));
    }
}
