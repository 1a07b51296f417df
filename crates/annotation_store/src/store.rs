use std::collections::BTreeMap;

use annokit_common::{
    Annotation, AnnotationRef, BoundingBox, ImageAnnotation, ImageSize, Point, Segment,
    polygon_area, polygon_bounds,
};
use tracing::{debug, warn};

use crate::history::{History, Snapshot};

/// Partial update for a box; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoxUpdate {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub label: Option<String>,
}

impl BoxUpdate {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    fn apply(self, bbox: &mut BoundingBox) {
        if let Some(x) = self.x {
            bbox.x = x;
        }
        if let Some(y) = self.y {
            bbox.y = y;
        }
        if let Some(width) = self.width {
            bbox.width = width;
        }
        if let Some(height) = self.height {
            bbox.height = height;
        }
        if let Some(label) = self.label {
            bbox.label = label;
        }
    }
}

/// Partial update for a segment. A new polygon also refreshes bounds and area.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentUpdate {
    pub label: Option<String>,
    pub polygon: Option<Vec<Point>>,
    pub score: Option<f64>,
}

impl SegmentUpdate {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    fn apply(self, segment: &mut Segment) {
        if let Some(label) = self.label {
            segment.label = label;
        }
        if let Some(polygon) = self.polygon {
            segment.bounds = Some(polygon_bounds(&polygon));
            segment.area = Some(polygon_area(&polygon));
            segment.polygon = polygon;
        }
        if let Some(score) = self.score {
            segment.score = Some(score);
        }
    }
}

/// In-memory annotations keyed by image id (the root-relative path).
///
/// Index-based operations ignore out-of-range indices. Every effective
/// mutation snapshots the image for undo and marks the store dirty.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    records: BTreeMap<String, ImageAnnotation>,
    last: Option<Annotation>,
    dirty: bool,
    history: History,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: BTreeMap<String, ImageAnnotation>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn records(&self) -> &BTreeMap<String, ImageAnnotation> {
        &self.records
    }

    pub fn get(&self, image_id: &str) -> Option<&ImageAnnotation> {
        self.records.get(image_id)
    }

    pub fn get_or_create(&mut self, image_id: &str) -> &ImageAnnotation {
        self.record_mut(image_id)
    }

    fn record_mut(&mut self, image_id: &str) -> &mut ImageAnnotation {
        self.records.entry(image_id.to_string()).or_default()
    }

    /// Image ids in lexicographic order.
    pub fn image_ids(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record the decoded size of an image.
    ///
    /// The size is written once; a later call with a different size is
    /// ignored. Returns `true` when the stored size changed.
    pub fn set_original_size(&mut self, image_id: &str, width: u32, height: u32) -> bool {
        let size = ImageSize::new(width, height);
        let record = self.record_mut(image_id);
        if record.original_size == size {
            return false;
        }
        if !record.original_size.is_unset() {
            warn!(
                image_id,
                stored = ?record.original_size,
                ignored = ?size,
                "original size already recorded"
            );
            return false;
        }
        record.original_size = size;
        self.dirty = true;
        true
    }

    /// Apply `change` to one image's record. A `None` result means nothing
    /// changed, so no snapshot is kept.
    fn mutate<R>(
        &mut self,
        image_id: &str,
        change: impl FnOnce(&mut ImageAnnotation) -> Option<R>,
    ) -> Option<R> {
        let record = self.record_mut(image_id);
        let before = record.clone();
        let result = change(record)?;

        self.history.push(Snapshot {
            image_id: image_id.to_string(),
            record: before,
        });
        self.dirty = true;
        Some(result)
    }

    pub fn add_box(&mut self, image_id: &str, bbox: BoundingBox) {
        self.last = Some(Annotation::BoundingBox(bbox.clone()));
        self.mutate(image_id, |record| {
            record.boxes.push(bbox);
            Some(())
        });
    }

    pub fn remove_box(&mut self, image_id: &str, index: usize) -> Option<BoundingBox> {
        self.mutate(image_id, |record| {
            (index < record.boxes.len()).then(|| record.boxes.remove(index))
        })
    }

    pub fn update_box(&mut self, image_id: &str, index: usize, update: BoxUpdate) -> bool {
        self.mutate(image_id, |record| {
            record.boxes.get_mut(index).map(|bbox| update.apply(bbox))
        })
        .is_some()
    }

    pub fn add_segment(&mut self, image_id: &str, segment: Segment) {
        self.last = Some(Annotation::Polygon(segment.clone()));
        self.mutate(image_id, |record| {
            record.polygons.push(segment);
            Some(())
        });
    }

    pub fn remove_segment(&mut self, image_id: &str, index: usize) -> Option<Segment> {
        self.mutate(image_id, |record| {
            (index < record.polygons.len()).then(|| record.polygons.remove(index))
        })
    }

    pub fn update_segment(&mut self, image_id: &str, index: usize, update: SegmentUpdate) -> bool {
        self.mutate(image_id, |record| {
            record.polygons.get_mut(index).map(|segment| update.apply(segment))
        })
        .is_some()
    }

    pub fn add(&mut self, image_id: &str, annotation: Annotation) {
        match annotation {
            Annotation::BoundingBox(bbox) => self.add_box(image_id, bbox),
            Annotation::Polygon(segment) => self.add_segment(image_id, segment),
        }
    }

    /// The most recently added box or segment.
    pub fn last(&self) -> Option<&Annotation> {
        self.last.as_ref()
    }

    /// Append a copy of the last added annotation to `image_id`.
    pub fn repeat_last(&mut self, image_id: &str) -> Option<Annotation> {
        let copy = match self.last.as_ref()? {
            Annotation::BoundingBox(bbox) => Annotation::BoundingBox(bbox.clone()),
            Annotation::Polygon(segment) => Annotation::Polygon(segment.duplicate()),
        };
        debug!(image_id, label = copy.label(), "repeating last annotation");
        self.add(image_id, copy.clone());
        Some(copy)
    }

    /// Restore the image touched by the latest mutation. Returns its id.
    pub fn undo(&mut self) -> Option<String> {
        let records = &self.records;
        let snapshot = self
            .history
            .undo(|id| records.get(id).cloned().unwrap_or_default())?;
        Some(self.restore(snapshot))
    }

    pub fn redo(&mut self) -> Option<String> {
        let records = &self.records;
        let snapshot = self
            .history
            .redo(|id| records.get(id).cloned().unwrap_or_default())?;
        Some(self.restore(snapshot))
    }

    fn restore(&mut self, snapshot: Snapshot) -> String {
        self.records.insert(snapshot.image_id.clone(), snapshot.record);
        self.dirty = true;
        snapshot.image_id
    }

    /// Image the next [`undo`](Self::undo) would restore.
    pub fn undo_target(&self) -> Option<&str> {
        self.history.undo_target()
    }

    pub fn redo_target(&self) -> Option<&str> {
        self.history.redo_target()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Unsaved changes exist.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Every label in use, in image-id order then annotation order, without repeats.
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for record in self.records.values() {
            for annotation in record.iter() {
                let label = annotation.label();
                if !label.is_empty() && !labels.iter().any(|l| l == label) {
                    labels.push(label.to_string());
                }
            }
        }
        labels
    }

    /// Images with at least one annotation satisfying `keep`.
    pub fn select<'a>(
        &'a self,
        keep: impl Fn(AnnotationRef<'_>) -> bool + 'a,
    ) -> impl Iterator<Item = (&'a str, &'a ImageAnnotation)> + 'a {
        self.records
            .iter()
            .filter(move |(_, record)| record.iter().any(&keep))
            .map(|(id, record)| (id.as_str(), record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(label: &str) -> BoundingBox {
        BoundingBox::new(10.0, 20.0, 30.0, 40.0, label)
    }

    fn triangle(label: &str) -> Segment {
        Segment::new(
            label,
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(0.0, 10.0),
            ],
            vec![Point::new(2.0, 2.0)],
            Some(0.8),
        )
        .unwrap()
    }

    #[test]
    fn test_get_or_create_is_empty_record() {
        let mut store = AnnotationStore::new();
        let record = store.get_or_create("a.jpg");
        assert!(record.is_empty());
        assert!(record.original_size.is_unset());
        assert!(!store.is_dirty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_original_size_set_once() {
        let mut store = AnnotationStore::new();
        assert!(store.set_original_size("a.jpg", 640, 480));
        assert!(!store.set_original_size("a.jpg", 640, 480));
        assert!(!store.set_original_size("a.jpg", 100, 100));
        assert_eq!(store.get("a.jpg").unwrap().original_size, ImageSize::new(640, 480));
    }

    #[test]
    fn test_out_of_range_is_noop() {
        let mut store = AnnotationStore::new();
        store.add_box("a.jpg", bbox("cat"));
        store.mark_clean();

        assert_eq!(store.remove_box("a.jpg", 3), None);
        assert!(!store.update_box("a.jpg", 1, BoxUpdate::label("dog")));
        assert_eq!(store.remove_segment("a.jpg", 0), None);
        assert!(!store.update_segment("a.jpg", 0, SegmentUpdate::label("dog")));

        assert!(!store.is_dirty());
        assert_eq!(store.get("a.jpg").unwrap().boxes.len(), 1);
    }

    #[test]
    fn test_update_box_partial() {
        let mut store = AnnotationStore::new();
        store.add_box("a.jpg", bbox("cat"));
        let update = BoxUpdate {
            width: Some(5.0),
            ..BoxUpdate::label("dog")
        };
        assert!(store.update_box("a.jpg", 0, update));

        let updated = &store.get("a.jpg").unwrap().boxes[0];
        assert_eq!(updated.label, "dog");
        assert_eq!(updated.width, 5.0);
        assert_eq!(updated.height, 40.0);
    }

    #[test]
    fn test_polygon_update_refreshes_derived_values() {
        let mut store = AnnotationStore::new();
        store.add_segment("a.jpg", triangle("cat"));
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
        ];
        let update = SegmentUpdate {
            polygon: Some(square),
            ..SegmentUpdate::default()
        };
        assert!(store.update_segment("a.jpg", 0, update));

        let segment = &store.get("a.jpg").unwrap().polygons[0];
        assert_eq!(segment.area, Some(16.0));
        assert_eq!(segment.resolved_bounds().width, 4.0);
    }

    #[test]
    fn test_repeat_last_copies_to_other_image() {
        let mut store = AnnotationStore::new();
        assert!(store.repeat_last("b.jpg").is_none());

        store.add_segment("a.jpg", triangle("cat"));
        let Some(Annotation::Polygon(copy)) = store.repeat_last("b.jpg") else {
            panic!("expected a polygon");
        };

        let original = &store.get("a.jpg").unwrap().polygons[0];
        assert_ne!(copy.id, original.id);
        assert_eq!(copy.polygon, original.polygon);
        assert_eq!(store.get("b.jpg").unwrap().polygons.len(), 1);

        store.add_box("a.jpg", bbox("dog"));
        assert_eq!(store.last().map(Annotation::label), Some("dog"));
    }

    #[test]
    fn test_undo_redo_across_images() {
        let mut store = AnnotationStore::new();
        store.add_box("a.jpg", bbox("cat"));
        store.add_box("b.jpg", bbox("dog"));
        store.remove_box("a.jpg", 0);

        assert_eq!(store.undo().as_deref(), Some("a.jpg"));
        assert_eq!(store.get("a.jpg").unwrap().boxes.len(), 1);

        assert_eq!(store.undo().as_deref(), Some("b.jpg"));
        assert!(store.get("b.jpg").unwrap().boxes.is_empty());

        assert_eq!(store.redo().as_deref(), Some("b.jpg"));
        assert_eq!(store.get("b.jpg").unwrap().boxes.len(), 1);

        store.add_box("c.jpg", bbox("bird"));
        assert!(!store.can_redo());
    }

    #[test]
    fn test_labels_in_first_seen_order() {
        let mut store = AnnotationStore::new();
        store.add_box("b.jpg", bbox("zebra"));
        store.add_box("b.jpg", bbox("dog"));
        store.add_segment("a.jpg", triangle("dog"));
        store.add_box("a.jpg", bbox("cat"));
        store.add_segment("a.jpg", triangle("bird"));

        assert_eq!(store.labels(), vec!["cat", "dog", "bird", "zebra"]);
    }

    #[test]
    fn test_select_by_kind() {
        let mut store = AnnotationStore::new();
        store.add_box("a.jpg", bbox("cat"));
        store.add_segment("b.jpg", triangle("cat"));
        store.get_or_create("c.jpg");

        let with_boxes: Vec<_> = store
            .select(|a| matches!(a, AnnotationRef::BoundingBox(_)))
            .map(|(id, _)| id)
            .collect();
        assert_eq!(with_boxes, vec!["a.jpg"]);
    }
}
