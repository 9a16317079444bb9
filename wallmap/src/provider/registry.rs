//! Known basemap providers.
//!
//! Each entry pairs an identifier with an XYZ URL template and, where the
//! service needs one, the environment variable holding its credential. The
//! credential is substituted for `{key}` when the provider is resolved.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tracing::debug;

use super::{ProviderError, TileSource};

/// Static description of a tile service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderSpec {
    pub id: &'static str,
    pub url_template: &'static str,
    /// Environment variable with the API key, if one is required.
    pub credential_env: Option<&'static str>,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl ProviderSpec {
    pub fn requires_api_key(&self) -> bool {
        self.credential_env.is_some()
    }
}

const fn entry(
    id: &'static str,
    url_template: &'static str,
    credential_env: Option<&'static str>,
    max_zoom: u8,
) -> ProviderSpec {
    ProviderSpec {
        id,
        url_template,
        credential_env,
        min_zoom: 0,
        max_zoom,
    }
}

pub static PROVIDERS: &[ProviderSpec] = &[
    entry(
        "OpenStreetMap.Mapnik",
        "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
        None,
        19,
    ),
    entry(
        "OpenTopoMap",
        "https://a.tile.opentopomap.org/{z}/{x}/{y}.png",
        None,
        17,
    ),
    entry(
        "CartoDB.Positron",
        "https://a.basemaps.cartocdn.com/light_all/{z}/{x}/{y}.png",
        None,
        20,
    ),
    entry(
        "CartoDB.DarkMatter",
        "https://a.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}.png",
        None,
        20,
    ),
    entry(
        "CartoDB.Voyager",
        "https://a.basemaps.cartocdn.com/rastertiles/voyager/{z}/{x}/{y}.png",
        None,
        20,
    ),
    entry(
        "Esri.WorldImagery",
        "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
        None,
        18,
    ),
    entry(
        "Esri.WorldTopoMap",
        "https://server.arcgisonline.com/ArcGIS/rest/services/World_Topo_Map/MapServer/tile/{z}/{y}/{x}",
        None,
        20,
    ),
    entry(
        "Stadia.AlidadeSmooth",
        "https://tiles.stadiamaps.com/tiles/alidade_smooth/{z}/{x}/{y}.png?api_key={key}",
        Some("STADIA_API_KEY"),
        20,
    ),
    entry(
        "Stadia.StamenTerrain",
        "https://tiles.stadiamaps.com/tiles/stamen_terrain/{z}/{x}/{y}.png?api_key={key}",
        Some("STADIA_API_KEY"),
        18,
    ),
    entry(
        "Thunderforest.Landscape",
        "https://tile.thunderforest.com/landscape/{z}/{x}/{y}.png?apikey={key}",
        Some("THUNDERFOREST_API_KEY"),
        22,
    ),
    entry(
        "MapBox.Satellite",
        "https://api.mapbox.com/v4/mapbox.satellite/{z}/{x}/{y}.jpg?access_token={key}",
        Some("MAPBOX_ACCESS_TOKEN"),
        22,
    ),
];

/// Case-insensitive lookup by identifier.
pub fn lookup(id: &str) -> Option<&'static ProviderSpec> {
    PROVIDERS.iter().find(|p| p.id.eq_ignore_ascii_case(id.trim()))
}

/// Whether `source` names a registry provider or a usable custom template.
pub fn is_known(source: &str) -> bool {
    is_template(source.trim()) || lookup(source).is_some()
}

/// Resolves a basemap `source` into a ready-to-use tile source.
///
/// `source` is a registry identifier or a raw `http(s)://` template
/// containing `{z}`, `{x}` and `{y}`. Credentials are read through `env`
/// so tests can supply them without touching the process environment.
pub fn resolve_with<F>(source: &str, env: F) -> Result<TileSource, ProviderError>
where
    F: Fn(&str) -> Option<String>,
{
    let source = source.trim();

    if is_template(source) {
        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);
        let slug = format!("custom-{:016x}", hasher.finish());
        debug!(template = source, slug = %slug, "Using custom tile template");
        return Ok(TileSource::new(source, slug, source, 0, 22));
    }

    let entry = lookup(source).ok_or_else(|| ProviderError::UnknownProvider(source.to_string()))?;

    let url_template = match entry.credential_env {
        Some(var) => {
            let key = env(var)
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .ok_or_else(|| ProviderError::MissingCredential {
                    provider: entry.id.to_string(),
                    env_var: var.to_string(),
                })?;
            entry.url_template.replace("{key}", &key)
        }
        None => entry.url_template.to_string(),
    };

    Ok(TileSource::new(
        entry.id,
        slugify(entry.id),
        url_template,
        entry.min_zoom,
        entry.max_zoom,
    ))
}

/// Resolves against the process environment.
pub fn resolve(source: &str) -> Result<TileSource, ProviderError> {
    resolve_with(source, |var| std::env::var(var).ok())
}

fn is_template(source: &str) -> bool {
    (source.starts_with("http://") || source.starts_with("https://"))
        && ["{z}", "{x}", "{y}"].iter().all(|p| source.contains(p))
}

fn slugify(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}
