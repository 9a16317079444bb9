use std::str::FromStr;

use tiny_skia::Color;

use super::{ConfigError, ConfigResult};

/// Parses a CSS color name or hex string (`#rgb`, `#rrggbb`, `#rrggbbaa`).
///
/// `none` and `transparent` both yield a fully transparent color.
pub fn parse_color(text: &str) -> ConfigResult<Color> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("none") {
        return Ok(Color::TRANSPARENT);
    }
    let c = svgtypes::Color::from_str(trimmed)
        .map_err(|_| ConfigError::InvalidColor(text.to_string()))?;
    Ok(Color::from_rgba8(c.red, c.green, c.blue, c.alpha))
}

/// Whether a color reads as light enough to need a dark outline.
pub fn is_light(color: &Color) -> bool {
    let luminance = 0.2126 * color.red() + 0.7152 * color.green() + 0.0722 * color.blue();
    luminance > 0.8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_and_hex_colors() {
        assert_eq!(parse_color("white").unwrap(), Color::WHITE);
        assert_eq!(parse_color("#000").unwrap(), Color::BLACK);
        assert_eq!(
            parse_color("#ff000080").unwrap(),
            Color::from_rgba8(255, 0, 0, 128)
        );
        assert_eq!(
            parse_color("lightblue").unwrap(),
            Color::from_rgba8(173, 216, 230, 255)
        );
        assert_eq!(parse_color("none").unwrap(), Color::TRANSPARENT);
    }

    #[test]
    fn test_invalid_color() {
        assert!(matches!(
            parse_color("not-a-color"),
            Err(ConfigError::InvalidColor(_))
        ));
    }

    #[test]
    fn test_lightness() {
        assert!(is_light(&Color::WHITE));
        assert!(is_light(&parse_color("lightyellow").unwrap()));
        assert!(!is_light(&Color::BLACK));
        assert!(!is_light(&parse_color("darkblue").unwrap()));
    }
}
