use super::{HttpClient, ProviderError};
use crate::coord::TileCoord;

/// A resolved XYZ tile service, credentials already substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSource {
    name: String,
    slug: String,
    url_template: String,
    min_zoom: u8,
    max_zoom: u8,
}

impl TileSource {
    pub fn new(
        name: impl Into<String>,
        slug: impl Into<String>,
        url_template: impl Into<String>,
        min_zoom: u8,
        max_zoom: u8,
    ) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            url_template: url_template.into(),
            min_zoom,
            max_zoom,
        }
    }

    /// Provider name for logging.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filesystem-safe name used as the cache subdirectory.
    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    pub fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    pub fn supports_zoom(&self, zoom: u8) -> bool {
        zoom >= self.min_zoom && zoom <= self.max_zoom
    }

    /// File extension for cached tiles.
    pub fn extension(&self) -> &'static str {
        let path = self
            .url_template
            .split('?')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if path.ends_with(".jpg") || path.ends_with(".jpeg") {
            "jpg"
        } else if path.ends_with(".png") {
            "png"
        } else {
            "tile"
        }
    }

    /// Builds the URL for a tile (`{x}` is the column, `{y}` the row).
    pub fn tile_url(&self, tile: &TileCoord) -> String {
        self.url_template
            .replace("{z}", &tile.zoom.to_string())
            .replace("{x}", &tile.col.to_string())
            .replace("{y}", &tile.row.to_string())
    }

    /// Downloads one tile.
    pub fn fetch<C: HttpClient>(&self, client: &C, tile: &TileCoord) -> Result<Vec<u8>, ProviderError> {
        if !self.supports_zoom(tile.zoom) {
            return Err(ProviderError::UnsupportedZoom(tile.zoom));
        }
        let data = client.get(&self.tile_url(tile))?;
        if data.is_empty() {
            return Err(ProviderError::InvalidResponse(format!(
                "empty tile {}/{}/{} from {}",
                tile.zoom, tile.col, tile.row, self.name
            )));
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockHttpClient;

    fn osm() -> TileSource {
        TileSource::new(
            "OpenStreetMap.Mapnik",
            "openstreetmap-mapnik",
            "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
            0,
            19,
        )
    }

    #[test]
    fn test_tile_url() {
        let tile = TileCoord { row: 1520, col: 2000, zoom: 12 };
        assert_eq!(
            osm().tile_url(&tile),
            "https://tile.openstreetmap.org/12/2000/1520.png"
        );
    }

    #[test]
    fn test_extension_from_template() {
        assert_eq!(osm().extension(), "png");
        let mapbox = TileSource::new("m", "m", "https://x/{z}/{x}/{y}.jpg?access_token=t", 0, 22);
        assert_eq!(mapbox.extension(), "jpg");
        let esri = TileSource::new("e", "e", "https://x/tile/{z}/{y}/{x}", 0, 18);
        assert_eq!(esri.extension(), "tile");
    }

    #[test]
    fn test_fetch_checks_zoom_and_body() {
        let client = MockHttpClient::new(Ok(Vec::new()));
        let deep = TileCoord { row: 0, col: 0, zoom: 20 };
        assert_eq!(osm().fetch(&client, &deep), Err(ProviderError::UnsupportedZoom(20)));
        assert_eq!(client.calls(), 0);

        let tile = TileCoord { row: 0, col: 0, zoom: 3 };
        assert!(matches!(
            osm().fetch(&client, &tile),
            Err(ProviderError::InvalidResponse(_))
        ));
    }
}
