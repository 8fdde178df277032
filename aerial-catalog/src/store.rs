use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use url::Url;

use crate::models::{Asset, CatalogEntries, Category};

/// Filesystem layout of the idleassetsd customer store.
///
/// Everything hangs off one root; the default is the system location that
/// idleassetsd itself maintains.
#[derive(Debug, Clone)]
pub struct StorePaths {
    root: PathBuf,
}

impl StorePaths {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The localized display-name table (a plist keyed by name key).
    pub fn strings_file(&self) -> PathBuf {
        self.root
            .join("Customer/TVIdleScreenStrings.bundle/en.lproj/Localizable.nocache.strings")
    }

    /// The asset and category catalog.
    pub fn entries_file(&self) -> PathBuf {
        self.root.join("Customer/entries.json")
    }

    /// Where downloaded 4K SDR 240FPS videos live.
    pub fn video_dir(&self) -> PathBuf {
        self.root.join("Customer/4KSDR240FPS")
    }
}

impl Default for StorePaths {
    fn default() -> Self {
        Self::new("/Library/Application Support/com.apple.idleassetsd")
    }
}

/// Errors that can occur while loading or querying the catalog store
#[derive(Debug)]
pub enum CatalogError {
    /// A store file could not be opened or read
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// `entries.json` did not parse as the expected schema
    Entries(serde_json::Error),

    /// The localized-strings table did not parse as a plist
    Strings(plist::Error),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Io { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
            CatalogError::Entries(e) => write!(f, "entries.json did not parse: {}", e),
            CatalogError::Strings(e) => write!(f, "localized strings did not parse: {}", e),
        }
    }
}

impl std::error::Error for CatalogError {}

/// An asset resolved to everything the transfer engine needs to know about
/// it: display name, source URL and destination path.
#[derive(Debug, Clone)]
pub struct ResolvedAsset {
    pub name: String,
    pub url: String,
    pub destination: PathBuf,
}

/// In-memory view of the wallpaper catalog.
///
/// Loaded once per run; purely read-only afterwards. The transfer engine
/// never sees this type, only the `ResolvedAsset` triples it produces.
#[derive(Debug)]
pub struct CatalogStore {
    paths: StorePaths,
    strings: HashMap<String, String>,
    entries: CatalogEntries,
}

impl CatalogStore {
    /// Load the strings table and the entries catalog from `paths`.
    ///
    /// Any failure here is fatal to the caller: without the catalog there is
    /// no work list to build.
    pub fn load(paths: StorePaths) -> Result<Self, CatalogError> {
        let strings_path = paths.strings_file();
        let strings_file = File::open(&strings_path).map_err(|source| CatalogError::Io {
            path: strings_path,
            source,
        })?;
        let strings: HashMap<String, String> =
            plist::from_reader(BufReader::new(strings_file)).map_err(CatalogError::Strings)?;

        let entries_path = paths.entries_file();
        let entries_file = File::open(&entries_path).map_err(|source| CatalogError::Io {
            path: entries_path,
            source,
        })?;
        let entries: CatalogEntries =
            serde_json::from_reader(BufReader::new(entries_file)).map_err(CatalogError::Entries)?;

        Ok(Self {
            paths,
            strings,
            entries,
        })
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn categories(&self) -> &[Category] {
        &self.entries.categories
    }

    pub fn assets(&self) -> &[Asset] {
        &self.entries.assets
    }

    /// Localized display name of a category, empty when the key is unknown.
    pub fn category_name(&self, category: &Category) -> &str {
        self.lookup(&category.localized_name_key)
    }

    /// Localized display name of an asset, empty when the key is unknown.
    pub fn asset_name(&self, asset: &Asset) -> &str {
        self.lookup(&asset.localized_name_key)
    }

    fn lookup(&self, key: &str) -> &str {
        self.strings.get(key).map(String::as_str).unwrap_or("")
    }

    /// Assets belonging to `category_id`, or every asset when `None`.
    pub fn assets_in_category(&self, category_id: Option<&str>) -> Vec<&Asset> {
        self.entries
            .assets
            .iter()
            .filter(|asset| match category_id {
                Some(id) => asset.categories.iter().any(|c| c == id),
                None => true,
            })
            .collect()
    }

    /// Find a category by its localized name (case-insensitive) or raw id.
    pub fn find_category(&self, needle: &str) -> Option<&Category> {
        self.entries.categories.iter().find(|category| {
            category.id == needle
                || self
                    .category_name(category)
                    .eq_ignore_ascii_case(needle)
        })
    }

    /// Resolve an asset to its display name, source URL and destination path.
    ///
    /// Assets missing a name, id or URL are not manageable and yield `None`,
    /// matching what idleassetsd itself tolerates in the catalog. The
    /// destination file is named after the asset id with the extension of the
    /// URL path.
    pub fn resolve(&self, asset: &Asset) -> Option<ResolvedAsset> {
        let name = self.asset_name(asset);
        if name.is_empty() || asset.id.is_empty() {
            return None;
        }
        let url = asset.url.as_deref().filter(|u| !u.is_empty())?;

        let extension = Url::parse(url)
            .ok()
            .and_then(|u| Path::new(u.path()).extension().map(|e| e.to_owned()));
        let filename = match extension {
            Some(ext) => format!("{}.{}", asset.id, ext.to_string_lossy()),
            None => asset.id.clone(),
        };

        Some(ResolvedAsset {
            name: name.to_string(),
            url: url.to_string(),
            destination: self.paths.video_dir().join(filename),
        })
    }

    /// Resolve every asset in `category_id` (or all of them), dropping the
    /// incomplete ones.
    pub fn resolve_category(&self, category_id: Option<&str>) -> Vec<ResolvedAsset> {
        self.assets_in_category(category_id)
            .into_iter()
            .filter_map(|asset| self.resolve(asset))
            .collect()
    }
}
