//! Era colours for renderers

use crate::graph::era::EraShade;

/// Fill for groups without any era classification
pub const UNDEFINED_FILL: &str = "#EEEEEE";

/// Stroke used when a colour cannot be parsed
pub const FALLBACK_STROKE: &str = "#666666";

/// Darkening applied per channel for strokes
const STROKE_DARKEN: u8 = 0x20;

enum EraColor {
    Flat(&'static str),
    Shaded([&'static str; 3]),
}

const ERA_PALETTE: [EraColor; 9] = [
    EraColor::Flat("#bc86e9ff"),
    EraColor::Shaded(["#6159d1ff", "#5977d1", "#5989d1ff"]),
    EraColor::Shaded(["#7faff8ff", "#7fcaf8", "#7fe6f8ff"]),
    EraColor::Shaded(["#5ecfa4ff", "#5ecf77ff", "#a4cf5eff"]),
    EraColor::Flat("#fcf37bff"),
    EraColor::Flat("#fcd191ff"),
    EraColor::Flat("#f5a78fff"),
    EraColor::Flat("#f09999"),
    EraColor::Flat("#f099ccff"),
];

/// Fill colour for a classification; `None` gets the undefined grey
pub fn fill_for(era: Option<EraShade>) -> &'static str {
    let Some(EraShade { era, shade }) = era else {
        return UNDEFINED_FILL;
    };
    match ERA_PALETTE.get(era as usize) {
        Some(EraColor::Flat(color)) => *color,
        Some(EraColor::Shaded(shades)) => shades[(shade as usize).min(2)],
        None => UNDEFINED_FILL,
    }
}

/// Darken `#rrggbb[aa]` by 0x20 per channel, dropping any alpha
pub fn stroke_for(color: &str) -> String {
    let hex = color.trim_start_matches('#').to_ascii_lowercase();
    if !hex.is_ascii() {
        return FALLBACK_STROKE.to_string();
    }
    let hex = if hex.len() == 8 { &hex[..6] } else { hex.as_str() };
    if hex.len() != 6 {
        return FALLBACK_STROKE.to_string();
    }

    let mut out = String::from("#");
    for i in 0..3 {
        let Ok(channel) = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16) else {
            return FALLBACK_STROKE.to_string();
        };
        out.push_str(&format!("{:02x}", channel.saturating_sub(STROKE_DARKEN)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_by_era_and_shade() {
        assert_eq!(fill_for(Some(EraShade { era: 0, shade: 2 })), "#bc86e9ff");
        assert_eq!(fill_for(Some(EraShade { era: 1, shade: 0 })), "#6159d1ff");
        assert_eq!(fill_for(Some(EraShade { era: 3, shade: 2 })), "#a4cf5eff");
        assert_eq!(fill_for(None), UNDEFINED_FILL);
        assert_eq!(
            fill_for(Some(EraShade { era: crate::graph::era::MODERN_PRINT_ERA, shade: 1 })),
            "#f099ccff"
        );
    }

    #[test]
    fn test_stroke_darkens_and_strips_alpha() {
        assert_eq!(stroke_for("#f09999"), "#d07979");
        assert_eq!(stroke_for("#bc86e9ff"), "#9c66c9");
        assert_eq!(stroke_for("#101010"), "#000000");
        assert_eq!(stroke_for("#EEEEEE"), "#cecece");
    }

    #[test]
    fn test_stroke_fallback() {
        assert_eq!(stroke_for("red"), FALLBACK_STROKE);
        assert_eq!(stroke_for("#zzzzzz"), FALLBACK_STROKE);
        assert_eq!(stroke_for("#日本"), FALLBACK_STROKE);
    }
}
