//! Dataset catalog and downloader.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use geo::{Geometry, LineString, Polygon, Rect};
use tracing::{info, warn};

use super::{io_error, DataPaths, PrepareError, PrepareResult};
use crate::fsutil::temp_path;
use crate::layer::{write_geojson, Crs, Feature, Layer};
use crate::provider::ReqwestClient;

const NATURAL_EARTH: &str = "https://naciscdn.org/naturalearth";
const IGN: &str = "https://www.ign.es/resources/cartografiaEnsenanza/flash/mi_am_esp_e_4_divisiones_admin";
const GEOFABRIK: &str = "https://download.geofabrik.de";

const CHUNK_SIZE: usize = 8192;

/// Progress callback: `(downloaded, total)`, with `total == 0` when unknown.
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Where a dataset comes from. Failure handling differs per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetSource {
    NaturalEarth,
    Ign,
    Osm,
}

impl DatasetSource {
    /// Whether a failed download aborts the run.
    pub fn is_required(&self) -> bool {
        matches!(self, DatasetSource::NaturalEarth)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub source: DatasetSource,
    pub url: String,
    pub filename: &'static str,
    pub description: &'static str,
}

impl Dataset {
    fn new(source: DatasetSource, url: String, filename: &'static str, description: &'static str) -> Self {
        Self {
            source,
            url,
            filename,
            description,
        }
    }

    pub fn is_archive(&self) -> bool {
        self.filename.ends_with(".zip")
    }
}

/// Every dataset the project knows about.
pub fn catalog() -> Vec<Dataset> {
    let ne = |path: &str, filename, description| {
        Dataset::new(
            DatasetSource::NaturalEarth,
            format!("{}/{}", NATURAL_EARTH, path),
            filename,
            description,
        )
    };
    let osm = |path: &str, filename, description| {
        Dataset::new(
            DatasetSource::Osm,
            format!("{}/{}", GEOFABRIK, path),
            filename,
            description,
        )
    };

    vec![
        ne("10m/physical/ne_10m_coastline.zip", "ne_10m_coastline.zip", "Coastlines"),
        ne("10m/physical/ne_10m_land.zip", "ne_10m_land.zip", "Land polygons"),
        ne("10m/physical/ne_10m_ocean.zip", "ne_10m_ocean.zip", "Ocean polygons"),
        ne("10m/physical/ne_10m_rivers_lake_centerlines.zip", "ne_10m_rivers.zip", "Rivers"),
        ne("10m/physical/ne_10m_lakes.zip", "ne_10m_lakes.zip", "Lakes"),
        ne("10m/cultural/ne_10m_admin_0_countries.zip", "ne_10m_countries.zip", "Countries"),
        ne("10m/cultural/ne_10m_admin_1_states_provinces.zip", "ne_10m_admin1.zip", "States/Provinces"),
        ne("10m/cultural/ne_10m_populated_places.zip", "ne_10m_cities.zip", "Cities"),
        ne("50m/cultural/ne_50m_admin_0_countries.zip", "ne_50m_countries.zip", "Countries (50m)"),
        ne("50m/cultural/ne_50m_admin_1_states_provinces.zip", "ne_50m_admin1.zip", "States/Provinces (50m)"),
        Dataset::new(
            DatasetSource::Ign,
            format!("{}/divisiones_administrativas.zip", IGN),
            "spain_admin.zip",
            "Spanish administrative divisions",
        ),
        osm("europe/spain-latest.osm.pbf", "spain.osm.pbf", "Spain OSM data"),
        osm("europe/spain/asturias-latest.osm.pbf", "asturias.osm.pbf", "Asturias OSM data"),
    ]
}

/// Downloads a URL to a local file.
pub trait Downloader {
    /// Downloads `url` to `dest`, returning the number of bytes written.
    fn download(&self, url: &str, dest: &Path, on_progress: &ProgressCallback) -> PrepareResult<u64>;
}

/// Streams downloads over HTTP into a temp file, then renames it into place.
pub struct HttpDownloader {
    client: ReqwestClient,
}

impl HttpDownloader {
    pub fn new(client: ReqwestClient) -> Self {
        Self { client }
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path, on_progress: &ProgressCallback) -> PrepareResult<u64> {
        let failed = |reason: String| PrepareError::Download {
            url: url.to_string(),
            reason,
        };

        let mut response = self.client.get_response(url).map_err(|e| failed(e.to_string()))?;
        let total = response.content_length().unwrap_or(0);

        let temp = temp_path(dest);
        let result = (|| -> io::Result<u64> {
            let mut file = File::create(&temp)?;
            let mut buffer = [0u8; CHUNK_SIZE];
            let mut written = 0u64;
            loop {
                let n = response.read(&mut buffer)?;
                if n == 0 {
                    break;
                }
                file.write_all(&buffer[..n])?;
                written += n as u64;
                on_progress(written, total);
            }
            file.sync_all()?;
            Ok(written)
        })();

        match result.and_then(|written| fs::rename(&temp, dest).map(|_| written)) {
            Ok(written) => Ok(written),
            Err(e) => {
                let _ = fs::remove_file(&temp);
                Err(failed(e.to_string()))
            }
        }
    }
}

/// Extracts every file of a zip archive into `dest`. Returns the file count.
pub fn extract_zip(archive: &Path, dest: &Path) -> PrepareResult<usize> {
    let archive_error = |reason: String| PrepareError::Archive {
        path: archive.to_path_buf(),
        reason,
    };

    let file = File::open(archive).map_err(|e| io_error(archive, e))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| archive_error(e.to_string()))?;
    let mut extracted = 0;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| archive_error(e.to_string()))?;
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            warn!(archive = %archive.display(), entry = entry.name(), "Skipping unsafe archive entry");
            continue;
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| io_error(&target, e))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        let mut out = File::create(&target).map_err(|e| io_error(&target, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| io_error(&target, e))?;
        extracted += 1;
    }

    info!(archive = %archive.display(), files = extracted, "Extracted archive");
    Ok(extracted)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Skip the large OSM extracts.
    pub skip_osm: bool,
    /// Skip Natural Earth.
    pub spain_only: bool,
}

impl DownloadOptions {
    pub fn includes(&self, source: DatasetSource) -> bool {
        match source {
            DatasetSource::NaturalEarth => !self.spain_only,
            DatasetSource::Ign => true,
            DatasetSource::Osm => !self.skip_osm,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub downloaded: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
    pub placeholders: Vec<PathBuf>,
}

/// Extracts archives into `raw/`. An archive that cannot be read is deleted
/// so the next run downloads it again.
fn unpack(dataset: &Dataset, archive: &Path, paths: &DataPaths) -> PrepareResult<()> {
    if !dataset.is_archive() {
        return Ok(());
    }
    extract_zip(archive, &paths.raw()).map(|_| ()).map_err(|e| {
        if let Err(remove) = fs::remove_file(archive) {
            warn!(path = %archive.display(), error = %remove, "Failed to remove unreadable archive");
        }
        e
    })
}

/// Downloads the selected part of the catalog into `raw/`, extracts
/// archives and writes the boundary placeholders.
///
/// Natural Earth failures abort the run; IGN and OSM failures are logged.
pub fn run_download<D: Downloader>(
    paths: &DataPaths,
    downloader: &D,
    options: DownloadOptions,
    on_progress: &ProgressCallback,
) -> PrepareResult<DownloadSummary> {
    paths.ensure()?;
    let mut summary = DownloadSummary::default();

    for dataset in catalog().into_iter().filter(|d| options.includes(d.source)) {
        let dest = paths.raw_file(dataset.filename);

        let result = if dest.exists() {
            info!(file = dataset.filename, "File already exists, skipping download");
            unpack(&dataset, &dest, paths).map(|_| None)
        } else {
            info!(dataset = dataset.description, url = %dataset.url, "Downloading");
            downloader
                .download(&dataset.url, &dest, on_progress)
                .and_then(|bytes| unpack(&dataset, &dest, paths).map(|_| Some(bytes)))
        };

        match result {
            Ok(None) => summary.skipped.push(dataset.filename.to_string()),
            Ok(Some(bytes)) => {
                info!(file = dataset.filename, bytes, "Downloaded");
                summary.downloaded.push(dataset.filename.to_string());
            }
            Err(e) if dataset.source.is_required() => return Err(e),
            Err(e) => {
                warn!(dataset = dataset.description, error = %e, "Download failed, continuing");
                summary.failed.push(dataset.filename.to_string());
            }
        }
    }

    summary.placeholders = write_boundary_placeholders(paths)?;
    Ok(summary)
}

/// Writes simplified Asturias and Gijón boundaries (WGS84) into `processed/`.
pub fn write_boundary_placeholders(paths: &DataPaths) -> PrepareResult<Vec<PathBuf>> {
    let asturias = Polygon::new(
        LineString::from(vec![
            (-7.2, 43.8),
            (-6.0, 43.8),
            (-4.5, 43.6),
            (-4.0, 43.0),
            (-5.0, 42.8),
            (-6.5, 42.9),
            (-7.2, 43.2),
            (-7.2, 43.8),
        ]),
        vec![],
    );
    let asturias = Layer::from_features(
        Crs::Wgs84,
        [Feature::new(asturias)
            .with("name", "Asturias")
            .with("name_es", "Asturias")
            .with("name_ast", "Asturies")
            .with("type", "autonomous_community")],
    );

    let gijon = Layer::from_features(
        Crs::Wgs84,
        [Feature::new(Geometry::Rect(Rect::new((-5.75, 43.45), (-5.55, 43.60))))
            .with("name", "Gijón")
            .with("name_es", "Gijón")
            .with("name_ast", "Xixón")
            .with("type", "municipality")
            .with("population", 273_422_i64)],
    );

    let mut written = Vec::new();
    for (file, layer) in [
        ("asturias_boundary.geojson", asturias),
        ("gijon_boundary.geojson", gijon),
    ] {
        let path = paths.processed_file(file);
        write_geojson(&layer, &path)?;
        info!(path = %path.display(), "Created boundary file");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::read_geojson;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Writes a fixed body, or fails for URLs containing `fail_on`.
    struct MockDownloader {
        body: Vec<u8>,
        fail_on: Option<&'static str>,
        requested: Mutex<Vec<String>>,
    }

    impl MockDownloader {
        fn new(body: Vec<u8>) -> Self {
            Self {
                body,
                fail_on: None,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn failing(mut self, pattern: &'static str) -> Self {
            self.fail_on = Some(pattern);
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    impl Downloader for MockDownloader {
        fn download(&self, url: &str, dest: &Path, on_progress: &ProgressCallback) -> PrepareResult<u64> {
            self.requested.lock().unwrap().push(url.to_string());
            if self.fail_on.is_some_and(|p| url.contains(p)) {
                return Err(PrepareError::Download {
                    url: url.to_string(),
                    reason: "HTTP 404".into(),
                });
            }
            fs::write(dest, &self.body).unwrap();
            let len = self.body.len() as u64;
            on_progress(len, len);
            Ok(len)
        }
    }

    fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            for (name, data) in files {
                writer
                    .start_file(*name, zip::write::FileOptions::default())
                    .unwrap();
                writer.write_all(data).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    fn no_progress() -> ProgressCallback {
        Box::new(|_, _| {})
    }

    #[test]
    fn test_catalog() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 13);
        assert!(catalog
            .iter()
            .filter(|d| d.source == DatasetSource::NaturalEarth)
            .all(|d| d.is_archive() && d.url.starts_with(NATURAL_EARTH)));
        assert!(catalog
            .iter()
            .filter(|d| d.source == DatasetSource::Osm)
            .all(|d| !d.is_archive()));
    }

    #[test]
    fn test_options_select_sources() {
        let options = DownloadOptions {
            skip_osm: true,
            spain_only: true,
        };
        assert!(!options.includes(DatasetSource::NaturalEarth));
        assert!(options.includes(DatasetSource::Ign));
        assert!(!options.includes(DatasetSource::Osm));
        assert!(DownloadOptions::default().includes(DatasetSource::Osm));
    }

    #[test]
    fn test_extract_zip() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("a.zip");
        fs::write(
            &archive,
            zip_bytes(&[("ne.shp", b"shape"), ("docs/readme.txt", b"hello")]),
        )
        .unwrap();

        let count = extract_zip(&archive, dir.path()).unwrap();

        assert_eq!(count, 2);
        assert_eq!(fs::read(dir.path().join("ne.shp")).unwrap(), b"shape");
        assert_eq!(fs::read(dir.path().join("docs/readme.txt")).unwrap(), b"hello");
    }

    #[test]
    fn test_extract_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("bad.zip");
        fs::write(&archive, b"not a zip").unwrap();
        assert!(matches!(
            extract_zip(&archive, dir.path()),
            Err(PrepareError::Archive { .. })
        ));
    }

    #[test]
    fn test_run_download_spain_only_skips_existing() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        paths.ensure().unwrap();
        fs::write(
            paths.raw_file("spain_admin.zip"),
            zip_bytes(&[("provincias.shp", b"x")]),
        )
        .unwrap();

        let downloader = MockDownloader::new(b"pbf".to_vec());
        let options = DownloadOptions {
            skip_osm: false,
            spain_only: true,
        };
        let summary = run_download(&paths, &downloader, options, &no_progress()).unwrap();

        assert_eq!(summary.skipped, vec!["spain_admin.zip".to_string()]);
        assert_eq!(summary.downloaded, vec!["spain.osm.pbf".to_string(), "asturias.osm.pbf".to_string()]);
        assert!(downloader.requested().iter().all(|u| u.starts_with(GEOFABRIK)));
        assert!(paths.raw_file("provincias.shp").exists());

        assert_eq!(summary.placeholders.len(), 2);
        let gijon = read_geojson(&paths.processed_file("gijon_boundary.geojson")).unwrap();
        assert_eq!(gijon.features()[0].get("name_ast").as_str(), Some("Xixón"));
    }

    #[test]
    fn test_optional_failures_are_tolerated() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        let downloader = MockDownloader::new(Vec::new()).failing("");
        let options = DownloadOptions {
            skip_osm: true,
            spain_only: true,
        };

        let summary = run_download(&paths, &downloader, options, &no_progress()).unwrap();

        assert_eq!(summary.failed, vec!["spain_admin.zip".to_string()]);
        assert!(paths.processed_file("asturias_boundary.geojson").exists());
    }

    #[test]
    fn test_corrupt_optional_archive_is_retried() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        let downloader = MockDownloader::new(b"<html>busy</html>".to_vec());
        let options = DownloadOptions {
            skip_osm: true,
            spain_only: true,
        };

        let first = run_download(&paths, &downloader, options, &no_progress()).unwrap();
        assert_eq!(first.failed, vec!["spain_admin.zip".to_string()]);
        assert!(!paths.raw_file("spain_admin.zip").exists());

        let second = run_download(&paths, &downloader, options, &no_progress()).unwrap();
        assert_eq!(second.failed, vec!["spain_admin.zip".to_string()]);
        assert!(second.skipped.is_empty());
        assert_eq!(downloader.requested().len(), 2);
    }

    #[test]
    fn test_existing_corrupt_archive_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        paths.ensure().unwrap();
        fs::write(paths.raw_file("spain_admin.zip"), b"truncated").unwrap();

        let downloader = MockDownloader::new(Vec::new());
        let options = DownloadOptions {
            skip_osm: true,
            spain_only: true,
        };
        let summary = run_download(&paths, &downloader, options, &no_progress()).unwrap();

        assert_eq!(summary.failed, vec!["spain_admin.zip".to_string()]);
        assert!(downloader.requested().is_empty());
        assert!(!paths.raw_file("spain_admin.zip").exists());
        assert_eq!(summary.placeholders.len(), 2);
    }

    #[test]
    fn test_existing_corrupt_natural_earth_archive_is_fatal() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        paths.ensure().unwrap();
        let first = catalog().remove(0);
        assert_eq!(first.source, DatasetSource::NaturalEarth);
        fs::write(paths.raw_file(first.filename), b"truncated").unwrap();

        let downloader = MockDownloader::new(Vec::new());
        let err = run_download(&paths, &downloader, DownloadOptions::default(), &no_progress())
            .unwrap_err();

        assert!(matches!(err, PrepareError::Archive { .. }));
        assert!(!paths.raw_file(first.filename).exists());
    }

    #[test]
    fn test_natural_earth_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        let downloader =
            MockDownloader::new(zip_bytes(&[("x.shp", b"x")])).failing("ne_10m_lakes");

        let progress = Arc::new(AtomicU64::new(0));
        let seen = progress.clone();
        let callback: ProgressCallback = Box::new(move |done, _| {
            seen.fetch_add(done, Ordering::SeqCst);
        });

        let err = run_download(&paths, &downloader, DownloadOptions::default(), &callback).unwrap_err();

        assert!(matches!(err, PrepareError::Download { ref url, .. } if url.contains("ne_10m_lakes")));
        assert!(progress.load(Ordering::SeqCst) > 0);
        assert!(!paths.processed_file("asturias_boundary.geojson").exists());
    }
}
