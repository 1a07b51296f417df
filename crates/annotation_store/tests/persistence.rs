use std::fs;

use annokit_common::{BoundingBox, Point, Segment};
use annotation_store::{AnnotationStore, ClassCatalog, ImageSource, StoreError};
use tempfile::TempDir;

#[test]
fn missing_document_loads_empty() {
    let dir = TempDir::new().unwrap();
    let store = AnnotationStore::load_json(&dir.path().join("annotations.json")).unwrap();
    assert!(store.is_empty());
    assert!(!store.is_dirty());
}

#[test]
fn save_then_load_keeps_records() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state").join("annotations.json");

    let mut store = AnnotationStore::new();
    store.set_original_size("a/one.jpg", 800, 600);
    store.add_box("a/one.jpg", BoundingBox::new(1.0, 2.0, 3.0, 4.0, "cat"));
    let segment = Segment::new(
        "dog",
        vec![
            Point::new(0.0, 0.0),
            Point::new(8.0, 0.0),
            Point::new(8.0, 8.0),
        ],
        vec![Point::new(5.0, 2.0)],
        Some(0.7),
    )
    .unwrap();
    store.add_segment("b.png", segment.clone());
    store.persist(&path).unwrap();
    assert!(!store.is_dirty());

    let loaded = AnnotationStore::load_json(&path).unwrap();
    assert_eq!(loaded.records(), store.records());
    assert_eq!(loaded.get("b.png").unwrap().polygons[0], segment);

    let mut catalog = ClassCatalog::new();
    catalog.merge_labels(loaded.labels());
    assert_eq!(catalog.classes().names(), &["object", "cat", "dog"]);
}

#[test]
fn document_is_keyed_by_image_id_in_camel_case() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("annotations.json");

    let mut store = AnnotationStore::new();
    store.set_original_size("x.jpg", 10, 20);
    store.save_json(&path).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["x.jpg"]["originalSize"]["width"], 10);
    assert!(json["x.jpg"]["boxes"].as_array().unwrap().is_empty());
}

#[test]
fn corrupt_document_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("annotations.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(AnnotationStore::load_json(&path), Err(StoreError::Json(_))));
}

#[test]
fn scan_finds_images_recursively_sorted() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("nested/deeper")).unwrap();
    for name in ["b.PNG", "a.jpg", "nested/c.jpeg", "nested/deeper/d.webp", "notes.txt", "nested/e.gif"] {
        fs::write(root.join(name), b"").unwrap();
    }

    let source = ImageSource::open(root).unwrap();
    let images = source.scan().unwrap();
    assert_eq!(images, vec!["a.jpg", "b.PNG", "nested/c.jpeg", "nested/deeper/d.webp"]);
    assert_eq!(source.path_of("nested/c.jpeg"), root.join("nested").join("c.jpeg"));
}

#[test]
fn open_rejects_missing_folder() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("gone");
    assert!(matches!(ImageSource::open(missing), Err(StoreError::NotADirectory(_))));
}
