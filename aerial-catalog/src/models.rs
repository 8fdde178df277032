use serde::{Deserialize, Serialize};

/// One wallpaper asset as recorded in `entries.json`.
///
/// Only the fields this tool manages are modeled; everything else in the
/// file is ignored on deserialization. Assets routinely ship with fields
/// missing, so every field defaults and incomplete records are filtered out
/// at resolve time rather than failing the whole load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    #[serde(default)]
    pub id: String,

    /// Key into the localized-strings table for the display name.
    #[serde(rename = "localizedNameKey", default)]
    pub localized_name_key: String,

    /// Source URL of the 4K SDR 240FPS variant, the only encoding managed here.
    #[serde(rename = "url-4K-SDR-240FPS", default)]
    pub url: Option<String>,

    /// Ids of the categories this asset belongs to.
    #[serde(default)]
    pub categories: Vec<String>,
}

/// One wallpaper category as recorded in `entries.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub id: String,

    #[serde(rename = "localizedNameKey", default)]
    pub localized_name_key: String,
}

/// Top-level shape of `entries.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogEntries {
    #[serde(default)]
    pub assets: Vec<Asset>,

    #[serde(default)]
    pub categories: Vec<Category>,
}
