use json_store::{Document, DocumentBackend, DocumentRepository, Error};
use serde_json::{json, Value};
use tempfile::TempDir;

fn doc(v: Value) -> Document {
    match v {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

#[test]
fn resolve_path_appends_extension_once() {
    let db = DocumentRepository::open(".test");
    assert_eq!(db.resolve_path("file"), std::path::Path::new(".test/file.json"));
    assert_eq!(db.resolve_path("file.json"), std::path::Path::new(".test/file.json"));
    assert_eq!(
        db.resolve_path("nested/file"),
        std::path::Path::new(".test/nested/file.json")
    );
}

#[test]
fn blocking_roundtrip() {
    let dir = TempDir::new().unwrap();
    let db = DocumentRepository::open(dir.path());
    let saved = doc(json!({
        "test": "test",
        "nested": { "list": [1, 2.5, null, true], "empty": {} }
    }));

    db.write_blocking("file", &saved).unwrap();
    assert_eq!(db.read_blocking("file").unwrap(), saved);
    assert_eq!(db.read_blocking("file.json").unwrap(), saved);
}

#[tokio::test]
async fn async_roundtrip() {
    let dir = TempDir::new().unwrap();
    let db = DocumentRepository::open(dir.path());
    let saved = doc(json!({ "test": "test" }));

    db.write_async("file", &saved).await.unwrap();
    assert_eq!(db.read_async("file").await.unwrap(), saved);
    // both flavours see the same file
    assert_eq!(db.read_blocking("file").unwrap(), saved);
}

#[test]
fn write_overwrites_whole_document() {
    let dir = TempDir::new().unwrap();
    let db = DocumentRepository::open(dir.path());
    db.write_blocking("file", &doc(json!({ "a": 1, "b": 2 }))).unwrap();
    db.write_blocking("file", &doc(json!({ "c": 3 }))).unwrap();
    assert_eq!(db.read_blocking("file").unwrap(), doc(json!({ "c": 3 })));
}

#[test]
fn write_creates_parent_dirs() {
    let dir = TempDir::new().unwrap();
    let db = DocumentRepository::open(dir.path().join("not/yet/there"));
    db.write_blocking("deep/doc", &doc(json!({ "x": 1 }))).unwrap();
    assert!(dir.path().join("not/yet/there/deep/doc.json").is_file());
}

#[test]
fn write_leaves_no_temp_files() {
    let dir = TempDir::new().unwrap();
    let db = DocumentRepository::open(dir.path());
    for i in 0..5 {
        db.write_blocking("file", &doc(json!({ "i": i }))).unwrap();
    }
    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["file.json".to_string()]);
}

#[test]
fn read_missing_is_not_found() {
    let dir = TempDir::new().unwrap();
    let db = DocumentRepository::open(dir.path());
    let err = db.read_blocking("missing").unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn read_async_missing_is_not_found() {
    let dir = TempDir::new().unwrap();
    let db = DocumentRepository::open(dir.path());
    assert!(db.read_async("missing").await.unwrap_err().is_not_found());
}

#[test]
fn read_garbage_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let db = DocumentRepository::open(dir.path());
    std::fs::write(db.resolve_path("bad"), b"{ not json").unwrap();
    std::fs::write(db.resolve_path("array"), b"[1, 2, 3]").unwrap();

    assert!(matches!(db.read_blocking("bad"), Err(Error::Parse(_))));
    assert!(matches!(db.read_blocking("array"), Err(Error::Parse(_))));
}

#[test]
fn load_or_initialize_creates_empty_document() {
    let dir = TempDir::new().unwrap();
    let db = DocumentRepository::open(dir.path());

    assert!(db.read_blocking("test").is_err());
    let loaded = db.load_or_initialize("test").unwrap();
    assert!(loaded.is_empty());
    assert_eq!(db.read_blocking("test").unwrap(), Document::new());
    assert_eq!(std::fs::read_to_string(db.resolve_path("test")).unwrap(), "{}");
}

#[test]
fn load_or_initialize_keeps_existing_document() {
    let dir = TempDir::new().unwrap();
    let db = DocumentRepository::open(dir.path());
    db.write_blocking("test", &doc(json!({ "a": 1 }))).unwrap();
    assert_eq!(db.load_or_initialize("test").unwrap(), doc(json!({ "a": 1 })));
}

#[test]
fn pretty_repository_indents() {
    let dir = TempDir::new().unwrap();
    let db = DocumentRepository::builder(dir.path()).pretty(true).build();
    db.write_blocking("file", &doc(json!({ "hello": 1 }))).unwrap();

    let raw = std::fs::read_to_string(db.resolve_path("file")).unwrap();
    assert!(raw.contains('\n'));
    assert!(raw.contains("  "));
}

#[test]
fn compact_by_default() {
    let dir = TempDir::new().unwrap();
    let db = DocumentRepository::open(dir.path());
    db.write_blocking("file", &doc(json!({ "hello": 1 }))).unwrap();

    let raw = std::fs::read_to_string(db.resolve_path("file")).unwrap();
    assert!(!raw.contains('\n'));
}

#[test]
fn store_shortcut_uses_repository_root() {
    let dir = TempDir::new().unwrap();
    let db = DocumentRepository::open(dir.path());
    assert_eq!(db.root(), dir.path());

    let store = db.store("users").unwrap();
    assert_eq!(store.name(), "users");
    assert!(dir.path().join("users.json").is_file());
}
