//! The `process` step: Spanish regions with local names and the Asturias
//! and Gijón detail layers.

use std::path::PathBuf;

use geo::{Geometry, Rect};
use tracing::{info, warn};

use super::{read_input, spanish, DataPaths, PrepareError, PrepareResult, ADMIN1_SHAPEFILE};
use crate::layer::{write_geojson, Crs, Feature, Layer};

pub const REGIONS_FILE: &str = "spain_regions.geojson";
pub const MUNICIPALITIES_FILE: &str = "asturias_municipalities.geojson";
pub const DISTRICTS_FILE: &str = "gijon_districts.geojson";

const SPANISH_NAMES: [(&str, &str); 17] = [
    ("Galicia", "Galicia"),
    ("Asturias", "Asturias"),
    ("Cantabria", "Cantabria"),
    ("Basque Country", "País Vasco"),
    ("Navarre", "Navarra"),
    ("La Rioja", "La Rioja"),
    ("Aragon", "Aragón"),
    ("Catalonia", "Cataluña"),
    ("Castile and León", "Castilla y León"),
    ("Madrid", "Madrid"),
    ("Castile-La Mancha", "Castilla-La Mancha"),
    ("Valencian Community", "Comunidad Valenciana"),
    ("Extremadura", "Extremadura"),
    ("Andalusia", "Andalucía"),
    ("Murcia", "Murcia"),
    ("Balearic Islands", "Islas Baleares"),
    ("Canary Islands", "Canarias"),
];

/// Spanish name of a region given its English name.
pub fn spanish_name(english: &str) -> Option<&'static str> {
    SPANISH_NAMES
        .iter()
        .find(|(en, _)| *en == english)
        .map(|(_, es)| *es)
}

/// Spanish records with `name_es` set, falling back to `name`.
pub fn spain_regions(admin1: Layer) -> PrepareResult<Layer> {
    let mut regions = spanish(admin1)?;
    regions.add_column("name_es");
    for feature in regions.features_mut() {
        let name = feature.get("name").to_string();
        let name_es = spanish_name(&name).map(str::to_string).unwrap_or(name);
        feature.set("name_es", name_es);
    }
    Ok(regions)
}

fn square(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Geometry<f64> {
    Geometry::Rect(Rect::new((min_lon, min_lat), (max_lon, max_lat)))
}

/// Five main Asturian municipalities as approximate rectangles (WGS84).
pub fn asturias_municipalities() -> Layer {
    let municipalities = [
        ("Gijón", "Xixón", 273_422_i64, square(-5.75, 43.45, -5.55, 43.60)),
        ("Oviedo", "Uviéu", 219_686, square(-5.90, 43.30, -5.80, 43.40)),
        ("Avilés", "Avilés", 77_690, square(-5.95, 43.50, -5.85, 43.60)),
        ("Mieres", "Mieres", 38_278, square(-5.80, 43.20, -5.70, 43.30)),
        ("Langreo", "Langreo", 39_392, square(-5.70, 43.20, -5.60, 43.30)),
    ];

    Layer::from_features(
        Crs::Wgs84,
        municipalities.into_iter().map(|(name, name_ast, population, geometry)| {
            Feature::new(geometry)
                .with("name", name)
                .with("name_es", name)
                .with("name_ast", name_ast)
                .with("population", population)
                .with("type", "municipality")
        }),
    )
}

/// Ten Gijón districts as approximate rectangles (WGS84).
pub fn gijon_districts() -> Layer {
    let districts = [
        ("Centro", square(-5.67, 43.53, -5.65, 43.55)),
        ("Cimadevilla", square(-5.66, 43.54, -5.64, 43.56)),
        ("El Llano", square(-5.68, 43.52, -5.66, 43.54)),
        ("Somió", square(-5.63, 43.55, -5.61, 43.57)),
        ("Tremañes", square(-5.65, 43.51, -5.63, 43.53)),
        ("El Natahoyo", square(-5.70, 43.54, -5.68, 43.56)),
        ("Jove", square(-5.62, 43.54, -5.60, 43.56)),
        ("Montevil", square(-5.72, 43.52, -5.70, 43.54)),
        ("Contrueces", square(-5.72, 43.50, -5.70, 43.52)),
        ("Pumarín", square(-5.74, 43.53, -5.72, 43.55)),
    ];

    Layer::from_features(
        Crs::Wgs84,
        districts.into_iter().map(|(name, geometry)| {
            Feature::new(geometry)
                .with("name", name)
                .with("name_es", name)
                .with("type", "district")
        }),
    )
}

/// Which parts of `process` to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    pub all: bool,
    pub regions: bool,
    pub provinces: bool,
    pub asturias: bool,
    pub gijon: bool,
}

impl ProcessOptions {
    pub fn is_empty(&self) -> bool {
        !(self.all || self.regions || self.provinces || self.asturias || self.gijon)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub written: Vec<PathBuf>,
}

/// Bootstraps the data tree and runs the selected steps.
pub fn run_process(paths: &DataPaths, options: ProcessOptions) -> PrepareResult<ProcessSummary> {
    paths.bootstrap()?;
    let mut summary = ProcessSummary::default();

    if options.is_empty() {
        info!("No processing options given, see --help");
        return Ok(summary);
    }

    if options.all || options.regions {
        let input = paths.raw_file(ADMIN1_SHAPEFILE);
        match read_input(&input) {
            Ok(admin1) => {
                let regions = spain_regions(admin1)?;
                let output = paths.processed_file(REGIONS_FILE);
                write_geojson(&regions, &output)?;
                info!(path = %output.display(), regions = regions.len(), "Processed Spanish regions");
                summary.written.push(output);
            }
            Err(PrepareError::MissingInput(path)) => {
                warn!(path = %path.display(), "Spanish regions file not found, skipping");
            }
            Err(e) => return Err(e),
        }
    }

    if options.all || options.provinces {
        info!("Province processing is handled by the provinces command");
    }

    if options.all || options.asturias {
        let output = paths.processed_file(MUNICIPALITIES_FILE);
        write_geojson(&asturias_municipalities(), &output)?;
        info!(path = %output.display(), "Processed Asturias municipalities");
        summary.written.push(output);
    }

    if options.all || options.gijon {
        let output = paths.processed_file(DISTRICTS_FILE);
        write_geojson(&gijon_districts(), &output)?;
        info!(path = %output.display(), "Processed Gijón districts");
        summary.written.push(output);
    }

    info!("Data processing complete");
    Ok(summary)
}
