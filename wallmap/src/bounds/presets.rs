//! Named Web Mercator extents and filters used by the bundled configs.

use super::{BoundsFilter, Extent};

/// Peninsular Spain plus the Balearic Islands.
pub fn spain() -> Extent {
    Extent::from_wsen(-1_100_000.0, 4_200_000.0, 500_000.0, 5_500_000.0)
}

/// The Principality of Asturias.
pub fn asturias() -> Extent {
    Extent::from_wsen(-800_000.0, 4_800_000.0, -500_000.0, 4_950_000.0)
}

/// The municipality of Gijón.
pub fn gijon() -> Extent {
    Extent::from_wsen(-635_000.0, 4_885_000.0, -580_000.0, 4_910_000.0)
}

/// Looks up a preset extent by name (case-insensitive).
pub fn by_name(name: &str) -> Option<Extent> {
    match name.to_lowercase().as_str() {
        "spain" => Some(spain()),
        "asturias" => Some(asturias()),
        "gijon" | "gijón" => Some(gijon()),
        _ => None,
    }
}

/// Excludes the Canary Islands (far south-west) by centroid.
pub fn mainland_spain() -> BoundsFilter {
    BoundsFilter::new().west(-1_200_000.0).south(4_100_000.0)
}

/// Like [`mainland_spain`] but also bounded on the east.
pub fn mainland_spain_strict() -> BoundsFilter {
    mainland_spain().east(500_000.0)
}
