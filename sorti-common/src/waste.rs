//! Waste category definitions and label normalization

use serde::{Deserialize, Serialize};

/// Material category a deposited item is sorted into.
///
/// The set is closed: user stats and bin fill levels carry exactly one counter
/// per variant, so labels outside this vocabulary are rejected at the edge
/// rather than silently bucketed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WasteCategory {
    Plastic,
    Glass,
    Aluminium,
    Other,
}

impl WasteCategory {
    /// All categories, in display order.
    pub const ALL: [WasteCategory; 4] = [
        WasteCategory::Plastic,
        WasteCategory::Glass,
        WasteCategory::Aluminium,
        WasteCategory::Other,
    ];

    /// Parse a user- or sensor-supplied label.
    ///
    /// Matching is case-insensitive. The US spelling "aluminum" normalizes to
    /// `Aluminium`; every other accepted label passes through unchanged.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "plastic" => Some(WasteCategory::Plastic),
            "glass" => Some(WasteCategory::Glass),
            "aluminium" | "aluminum" => Some(WasteCategory::Aluminium),
            "other" => Some(WasteCategory::Other),
            _ => None,
        }
    }

    /// Canonical lowercase label (British spelling for aluminium).
    pub fn as_str(&self) -> &'static str {
        match self {
            WasteCategory::Plastic => "plastic",
            WasteCategory::Glass => "glass",
            WasteCategory::Aluminium => "aluminium",
            WasteCategory::Other => "other",
        }
    }
}

impl std::fmt::Display for WasteCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WasteCategory {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        WasteCategory::parse(s)
            .ok_or_else(|| crate::Error::InvalidInput(format!("unknown waste category: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_labels() {
        assert_eq!(WasteCategory::parse("plastic"), Some(WasteCategory::Plastic));
        assert_eq!(WasteCategory::parse("glass"), Some(WasteCategory::Glass));
        assert_eq!(
            WasteCategory::parse("aluminium"),
            Some(WasteCategory::Aluminium)
        );
        assert_eq!(WasteCategory::parse("other"), Some(WasteCategory::Other));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(WasteCategory::parse("Plastic"), Some(WasteCategory::Plastic));
        assert_eq!(WasteCategory::parse("GLASS"), Some(WasteCategory::Glass));
    }

    #[test]
    fn test_aluminum_normalizes_to_aluminium() {
        assert_eq!(
            WasteCategory::parse("Aluminum"),
            Some(WasteCategory::Aluminium)
        );
        assert_eq!(
            WasteCategory::parse("aluminum"),
            Some(WasteCategory::Aluminium)
        );
    }

    #[test]
    fn test_unknown_label_rejected() {
        assert_eq!(WasteCategory::parse("cardboard"), None);
        assert_eq!(WasteCategory::parse(""), None);
    }

    #[test]
    fn test_display_uses_british_spelling() {
        assert_eq!(WasteCategory::Aluminium.to_string(), "aluminium");
    }
}
