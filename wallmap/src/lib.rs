//! Wallmap - static wall and TV map rendering from open geodata
//!
//! The library downloads and reshapes administrative boundaries and renders
//! layered PNG maps from a YAML description.
//!
//! # Rendering a map
//!
//! ```ignore
//! use wallmap::cache::TileCache;
//! use wallmap::config::MapConfig;
//! use wallmap::provider::ReqwestClient;
//! use wallmap::render::MapGenerator;
//!
//! let config = MapConfig::load(Path::new("configs/spain.yaml"))?;
//! let client = ReqwestClient::with_timeout(Duration::from_secs(30))?;
//! let generator = MapGenerator::new(config, "data", "output/spain.png", TileCache::new(cache_dir), client);
//! let report = generator.generate()?;
//! ```

pub mod basemap;
pub mod bounds;
pub mod cache;
pub mod config;
pub mod coord;
pub mod dissolve;
pub mod layer;
pub mod logging;
pub mod prepare;
pub mod provider;
pub mod render;

mod fsutil;

/// Version of the wallmap library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
