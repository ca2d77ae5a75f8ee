//! Icon name resolution for services and categories
//!
//! Backend rows carry free-form icon names. These helpers map them onto the
//! icon set the front-ends render, falling back to sensible defaults.

/// Service type tag used for free-form custom requests
pub const CUSTOM_SERVICE_TYPE: &str = "custom";

/// Icon used for custom cart lines
pub const CUSTOM_ITEM_ICON: &str = "camera-outline";

const DEFAULT_ICON: &str = "shirt-outline";

/// Service type to icon; lookup order matters for fuzzy matching
pub const SERVICE_ICONS: &[(&str, &str)] = &[
    ("easybag", "bag-outline"),
    ("washiron", "shirt-outline"),
    ("drycleaning", "shirt-outline"),
    ("repairs", "construct-outline"),
    (CUSTOM_SERVICE_TYPE, CUSTOM_ITEM_ICON),
    ("default", DEFAULT_ICON),
];

/// Category name to icon; lookup order matters for fuzzy matching
pub const CATEGORY_ICONS: &[(&str, &str)] = &[
    ("shirts", "shirt-outline"),
    ("pants", "shirt-outline"),
    ("dresses", "shirt-outline"),
    ("suits", "shirt-outline"),
    ("jackets", "shirt-outline"),
    ("coats", "shirt-outline"),
    ("sweaters", "shirt-outline"),
    ("jeans", "shirt-outline"),
    ("skirts", "shirt-outline"),
    ("blouses", "shirt-outline"),
    ("tshirts", "shirt-outline"),
    ("hoodies", "shirt-outline"),
    ("towels", "shirt-outline"),
    ("bedding", "shirt-outline"),
    ("curtains", "shirt-outline"),
    ("rugs", "shirt-outline"),
    ("shoes", "shirt-outline"),
    ("bags", "bag-outline"),
    ("accessories", "shirt-outline"),
    ("default", DEFAULT_ICON),
];

/// Icon names the front-ends can render
const KNOWN_ICONS: &[&str] = &[
    "bag-outline",
    "bag-handle-outline",
    "basket-outline",
    "bed-outline",
    "brush-outline",
    "camera-outline",
    "color-palette-outline",
    "construct-outline",
    "cut-outline",
    "diamond-outline",
    "flame-outline",
    "flower-outline",
    "footsteps-outline",
    "gift-outline",
    "home-outline",
    "leaf-outline",
    "pricetag-outline",
    "shirt-outline",
    "snow-outline",
    "sparkles-outline",
    "star-outline",
    "sunny-outline",
    "water-outline",
    "woman-outline",
];

/// Which default applies when nothing matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconKind {
    Service,
    Category,
}

/// Whether `name` is an icon the front-ends can render
pub fn is_known_icon(name: &str) -> bool {
    KNOWN_ICONS.contains(&name)
}

fn table_default(table: &[(&str, &'static str)]) -> &'static str {
    table
        .iter()
        .find(|(key, _)| *key == "default")
        .map(|(_, icon)| *icon)
        .unwrap_or(DEFAULT_ICON)
}

fn fuzzy_lookup(table: &[(&str, &'static str)], normalized: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(key, _)| normalized.contains(key) || key.contains(normalized))
        .map(|(_, icon)| *icon)
}

/// Resolve a possibly-invalid icon name
///
/// Known names pass through. Otherwise the name is lowercased, stripped of
/// non-letters and matched against the service table, then the category
/// table. Nothing matching yields `fallback`, or the default icon.
pub fn valid_icon(name: Option<&str>, kind: IconKind, fallback: Option<&str>) -> String {
    let default = || {
        let table = match kind {
            IconKind::Service => SERVICE_ICONS,
            IconKind::Category => CATEGORY_ICONS,
        };
        fallback
            .unwrap_or_else(|| table_default(table))
            .to_string()
    };

    let Some(name) = name.filter(|n| !n.is_empty()) else {
        return default();
    };

    if is_known_icon(name) {
        return name.to_string();
    }

    let normalized: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect();
    if normalized.is_empty() {
        return default();
    }

    fuzzy_lookup(SERVICE_ICONS, &normalized)
        .or_else(|| fuzzy_lookup(CATEGORY_ICONS, &normalized))
        .map(str::to_string)
        .unwrap_or_else(default)
}

/// Icon for an exact service type tag
pub fn service_icon(service_type: &str) -> &'static str {
    SERVICE_ICONS
        .iter()
        .find(|(key, _)| *key == service_type)
        .map(|(_, icon)| *icon)
        .unwrap_or(DEFAULT_ICON)
}

/// Icon for a category name, matched by substring in either direction
pub fn category_icon(category_name: &str) -> &'static str {
    let normalized = category_name.to_lowercase();
    if normalized.is_empty() {
        return DEFAULT_ICON;
    }
    fuzzy_lookup(CATEGORY_ICONS, &normalized).unwrap_or(DEFAULT_ICON)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_icon_exact_lookup() {
        assert_eq!(service_icon("easybag"), "bag-outline");
        assert_eq!(service_icon("repairs"), "construct-outline");
        assert_eq!(service_icon("custom"), "camera-outline");
        assert_eq!(service_icon("laundromat"), "shirt-outline");
    }

    #[test]
    fn test_category_icon_substring_match() {
        assert_eq!(category_icon("Bags"), "bag-outline");
        assert_eq!(category_icon("Winter Coats"), "shirt-outline");
        assert_eq!(category_icon("Handbags & Purses"), "bag-outline");
        assert_eq!(category_icon(""), "shirt-outline");
    }

    #[test]
    fn test_valid_icon_passes_known_names() {
        assert_eq!(
            valid_icon(Some("water-outline"), IconKind::Service, None),
            "water-outline"
        );
    }

    #[test]
    fn test_valid_icon_fuzzy_matches() {
        assert_eq!(
            valid_icon(Some("Easy-Bag"), IconKind::Service, None),
            "bag-outline"
        );
        assert_eq!(
            valid_icon(Some("repair"), IconKind::Service, None),
            "construct-outline"
        );
        assert_eq!(
            valid_icon(Some("bags_large"), IconKind::Category, None),
            "bag-outline"
        );
    }

    #[test]
    fn test_valid_icon_fallbacks() {
        assert_eq!(valid_icon(None, IconKind::Service, None), "shirt-outline");
        assert_eq!(
            valid_icon(Some(""), IconKind::Category, Some("star-outline")),
            "star-outline"
        );
        assert_eq!(
            valid_icon(Some("42"), IconKind::Service, Some("gift-outline")),
            "gift-outline"
        );
        assert_eq!(
            valid_icon(Some("zzzz"), IconKind::Category, None),
            "shirt-outline"
        );
    }
}
