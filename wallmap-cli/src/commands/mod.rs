//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`generate`] - Render a map from a YAML configuration
//! - [`cache`] - Tile cache management (info, clear)
//! - [`download`] - Fetch the source datasets into `data/raw`
//! - [`communities`] - Dissolve provinces into autonomous communities
//! - [`provinces`] - Extract mainland Spanish provinces
//! - [`process`] - Regions and the Asturias/Gijón detail layers
//! - [`bounds`] - Print extents and recommended map bounds

pub mod bounds;
pub mod cache;
pub mod communities;
pub mod download;
pub mod generate;
pub mod process;
pub mod provinces;
