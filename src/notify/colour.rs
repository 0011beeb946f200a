//! Problem colours as runners read them off a ticket.

use crate::types::non_empty;

/// Hex values the contest system suggests for balloon colours.
const PALETTE: &[(&str, &str)] = &[
    ("#000000", "black"),
    ("#ffffff", "white"),
    ("#ff0000", "red"),
    ("#00ff00", "lime"),
    ("#008000", "green"),
    ("#0000ff", "blue"),
    ("#ffff00", "yellow"),
    ("#00ffff", "cyan"),
    ("#ff00ff", "magenta"),
    ("#ffa500", "orange"),
    ("#800080", "purple"),
    ("#ffc0cb", "pink"),
    ("#a52a2a", "brown"),
    ("#808080", "gray"),
    ("#c0c0c0", "silver"),
    ("#ffd700", "gold"),
    ("#000080", "navy"),
    ("#800000", "maroon"),
    ("#808000", "olive"),
    ("#008080", "teal"),
    ("#add8e6", "lightblue"),
    ("#90ee90", "lightgreen"),
    ("#ee82ee", "violet"),
];

/// Normalize `#RGB` / `RRGGBB` / `#RRGGBB` to lowercase `#rrggbb`.
fn normalize_hex(value: &str) -> Option<String> {
    let hex = value.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let expanded = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect::<String>(),
        6 => hex.to_string(),
        _ => return None,
    };
    Some(format!("#{}", expanded.to_ascii_lowercase()))
}

/// Best human-readable colour from a name and/or an rgb value.
///
/// A non-hex name wins; otherwise a palette hit on either value is translated
/// to its name; otherwise the raw value is kept. Returns `None` when both are
/// empty.
pub fn display_name(name: Option<&str>, rgb: Option<&str>) -> Option<String> {
    let name = non_empty(name);
    let rgb = non_empty(rgb);

    if let Some(name) = name.filter(|n| normalize_hex(n).is_none()) {
        return Some(name.to_string());
    }

    for candidate in [rgb, name].into_iter().flatten() {
        if let Some(hex) = normalize_hex(candidate) {
            if let Some((_, named)) = PALETTE.iter().find(|(h, _)| *h == hex) {
                return Some((*named).to_string());
            }
        }
    }

    rgb.or(name).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_textual_name() {
        assert_eq!(display_name(Some("Red"), Some("#00ff00")), Some("Red".to_string()));
    }

    #[test]
    fn translates_known_hex() {
        assert_eq!(display_name(None, Some("#FF0000")), Some("red".to_string()));
        assert_eq!(display_name(Some("#f00"), None), Some("red".to_string()));
        assert_eq!(display_name(Some("#ffa500"), Some("ffa500")), Some("orange".to_string()));
    }

    #[test]
    fn keeps_unknown_hex() {
        assert_eq!(display_name(None, Some("#123456")), Some("#123456".to_string()));
    }

    #[test]
    fn empty_inputs_mean_no_colour() {
        assert_eq!(display_name(None, None), None);
        assert_eq!(display_name(Some(""), Some("  ")), None);
    }
}
