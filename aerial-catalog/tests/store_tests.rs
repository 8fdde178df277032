use std::collections::HashMap;
use std::fs;

use aerial_catalog::{CatalogError, CatalogStore, StorePaths};
use tempfile::TempDir;

/// Build a minimal store on disk: two categories, three assets, one of which
/// is missing its URL and must be skipped at resolve time.
fn write_test_store(dir: &TempDir) -> StorePaths {
    let paths = StorePaths::new(dir.path());

    let strings_dir = paths
        .strings_file()
        .parent()
        .expect("strings file has a parent")
        .to_path_buf();
    fs::create_dir_all(&strings_dir).expect("create strings dir");
    fs::create_dir_all(paths.video_dir()).expect("create video dir");

    let mut strings = HashMap::new();
    strings.insert("cat-landscape".to_string(), "Landscape".to_string());
    strings.insert("cat-underwater".to_string(), "Underwater".to_string());
    strings.insert("asset-sonoma".to_string(), "Sonoma Horizon".to_string());
    strings.insert("asset-kelp".to_string(), "Kelp Forest".to_string());
    strings.insert("asset-broken".to_string(), "Broken".to_string());
    plist::to_file_xml(paths.strings_file(), &strings).expect("write strings plist");

    let entries = serde_json::json!({
        "version": 1,
        "categories": [
            { "id": "landscape", "localizedNameKey": "cat-landscape" },
            { "id": "underwater", "localizedNameKey": "cat-underwater" }
        ],
        "assets": [
            {
                "id": "A1",
                "localizedNameKey": "asset-sonoma",
                "url-4K-SDR-240FPS": "https://cdn.example.com/videos/sonoma.mov?o=token",
                "categories": ["landscape"]
            },
            {
                "id": "A2",
                "localizedNameKey": "asset-kelp",
                "url-4K-SDR-240FPS": "https://cdn.example.com/videos/kelp.mov",
                "categories": ["underwater"]
            },
            {
                "id": "A3",
                "localizedNameKey": "asset-broken",
                "categories": ["landscape"]
            }
        ]
    });
    fs::write(
        paths.entries_file(),
        serde_json::to_vec_pretty(&entries).expect("serialize entries"),
    )
    .expect("write entries.json");

    paths
}

#[test]
fn loads_names_and_categories() {
    let dir = TempDir::new().expect("tempdir");
    let store = CatalogStore::load(write_test_store(&dir)).expect("load store");

    assert_eq!(store.categories().len(), 2);
    assert_eq!(store.assets().len(), 3);

    let landscape = store.find_category("landscape").expect("category by id");
    assert_eq!(store.category_name(landscape), "Landscape");

    // Lookup by localized name is case-insensitive.
    let underwater = store.find_category("underwater").expect("by id");
    assert_eq!(
        store.find_category("UNDERWATER").expect("by name").id,
        underwater.id
    );
}

#[test]
fn filters_assets_by_category() {
    let dir = TempDir::new().expect("tempdir");
    let store = CatalogStore::load(write_test_store(&dir)).expect("load store");

    assert_eq!(store.assets_in_category(Some("landscape")).len(), 2);
    assert_eq!(store.assets_in_category(Some("underwater")).len(), 1);
    assert_eq!(store.assets_in_category(None).len(), 3);
    assert!(store.assets_in_category(Some("missing")).is_empty());
}

#[test]
fn resolves_destination_from_url_extension() {
    let dir = TempDir::new().expect("tempdir");
    let store = CatalogStore::load(write_test_store(&dir)).expect("load store");

    let resolved = store.resolve_category(Some("underwater"));
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].name, "Kelp Forest");
    assert!(resolved[0].destination.ends_with("Customer/4KSDR240FPS/A2.mov"));
}

#[test]
fn resolve_ignores_url_query_string() {
    let dir = TempDir::new().expect("tempdir");
    let store = CatalogStore::load(write_test_store(&dir)).expect("load store");

    // A1's URL carries a query string; the extension still comes from the path.
    let resolved = store.resolve_category(Some("landscape"));
    let sonoma = resolved
        .iter()
        .find(|a| a.name == "Sonoma Horizon")
        .expect("sonoma resolved");
    assert!(sonoma.destination.ends_with("Customer/4KSDR240FPS/A1.mov"));
}

#[test]
fn incomplete_assets_are_skipped() {
    let dir = TempDir::new().expect("tempdir");
    let store = CatalogStore::load(write_test_store(&dir)).expect("load store");

    // A3 has no URL: it never shows up in a resolved work list, but it still
    // counts as a catalog entry.
    let resolved = store.resolve_category(Some("landscape"));
    assert_eq!(resolved.len(), 1);
    assert!(resolved.iter().all(|a| a.name != "Broken"));
}

#[test]
fn error_messages_name_the_offending_file() {
    let dir = TempDir::new().expect("tempdir");
    let err = CatalogStore::load(StorePaths::new(dir.path())).expect_err("load must fail");

    let message = format!("{}", err);
    assert!(message.contains("Localizable.nocache.strings"));

    // It must also behave as a std error.
    fn check_error_trait<T: std::error::Error>(_: T) {}
    check_error_trait(err);
}

#[test]
fn missing_store_files_are_a_load_error() {
    let dir = TempDir::new().expect("tempdir");
    let err = CatalogStore::load(StorePaths::new(dir.path())).expect_err("load must fail");
    match err {
        CatalogError::Io { path, .. } => {
            assert!(path.ends_with("Localizable.nocache.strings"));
        }
        other => panic!("expected Io error, got {other:?}"),
    }
}
