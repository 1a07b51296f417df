use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard},
};

use annokit_common::{Annotation, BoundingBox, ImageAnnotation, Segment};
use tracing::debug;

use crate::{
    error::{Result, StoreError},
    store::{AnnotationStore, BoxUpdate, SegmentUpdate},
};

#[derive(Debug, Default)]
struct State {
    store: AnnotationStore,
    processing: HashSet<String>,
}

impl State {
    fn ensure_idle(&self, image_id: &str) -> Result<()> {
        if self.processing.contains(image_id) {
            return Err(StoreError::ImageBusy(image_id.to_string()));
        }
        Ok(())
    }
}

/// A store shared between a UI binding and slow background work.
///
/// The store and the set of images being processed sit behind one lock, so
/// the busy check and the mutation happen atomically. While an image is
/// processing (an oracle request, an image decode) ordinary edits of it and
/// undo/redo steps that would restore it fail with [`StoreError::ImageBusy`];
/// only the holder of its [`ProcessingGuard`] may write to it.
#[derive(Debug, Clone, Default)]
pub struct SharedAnnotationStore {
    inner: Arc<Mutex<State>>,
}

impl SharedAnnotationStore {
    pub fn new(store: AnnotationStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(State {
                store,
                processing: HashSet::new(),
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    pub fn read<R>(&self, f: impl FnOnce(&AnnotationStore) -> R) -> Result<R> {
        let state = self.lock()?;
        Ok(f(&state.store))
    }

    /// Edit `image_id` unless it is being processed.
    pub fn update<R>(&self, image_id: &str, f: impl FnOnce(&mut ImageEditor<'_>) -> R) -> Result<R> {
        let mut state = self.lock()?;
        state.ensure_idle(image_id)?;
        let mut editor = ImageEditor {
            store: &mut state.store,
            image_id,
        };
        Ok(f(&mut editor))
    }

    /// Undo the latest mutation unless it belongs to an image being processed.
    pub fn undo(&self) -> Result<Option<String>> {
        let mut state = self.lock()?;
        if let Some(id) = state.store.undo_target() {
            state.ensure_idle(id)?;
        }
        Ok(state.store.undo())
    }

    pub fn redo(&self) -> Result<Option<String>> {
        let mut state = self.lock()?;
        if let Some(id) = state.store.redo_target() {
            state.ensure_idle(id)?;
        }
        Ok(state.store.redo())
    }

    pub fn is_processing(&self, image_id: &str) -> Result<bool> {
        Ok(self.lock()?.processing.contains(image_id))
    }

    /// Claim `image_id` for slow work. Fails if it is already claimed.
    pub fn begin_processing(&self, image_id: &str) -> Result<ProcessingGuard> {
        let mut state = self.lock()?;
        if !state.processing.insert(image_id.to_string()) {
            return Err(StoreError::ImageBusy(image_id.to_string()));
        }
        debug!(image_id, "processing started");
        Ok(ProcessingGuard {
            image_id: image_id.to_string(),
            store: self.clone(),
        })
    }

    /// Take the store back out, if this is the last handle.
    pub fn into_inner(self) -> Option<AnnotationStore> {
        Arc::into_inner(self.inner)
            .and_then(|m| m.into_inner().ok())
            .map(|state| state.store)
    }
}

/// Edits bound to a single image of a shared store.
pub struct ImageEditor<'a> {
    store: &'a mut AnnotationStore,
    image_id: &'a str,
}

impl ImageEditor<'_> {
    pub fn image_id(&self) -> &str {
        self.image_id
    }

    pub fn record(&self) -> Option<&ImageAnnotation> {
        self.store.get(self.image_id)
    }

    pub fn set_original_size(&mut self, width: u32, height: u32) -> bool {
        self.store.set_original_size(self.image_id, width, height)
    }

    pub fn add_box(&mut self, bbox: BoundingBox) {
        self.store.add_box(self.image_id, bbox)
    }

    pub fn remove_box(&mut self, index: usize) -> Option<BoundingBox> {
        self.store.remove_box(self.image_id, index)
    }

    pub fn update_box(&mut self, index: usize, update: BoxUpdate) -> bool {
        self.store.update_box(self.image_id, index, update)
    }

    pub fn add_segment(&mut self, segment: Segment) {
        self.store.add_segment(self.image_id, segment)
    }

    pub fn remove_segment(&mut self, index: usize) -> Option<Segment> {
        self.store.remove_segment(self.image_id, index)
    }

    pub fn update_segment(&mut self, index: usize, update: SegmentUpdate) -> bool {
        self.store.update_segment(self.image_id, index, update)
    }

    pub fn add(&mut self, annotation: Annotation) {
        self.store.add(self.image_id, annotation)
    }

    pub fn repeat_last(&mut self) -> Option<Annotation> {
        self.store.repeat_last(self.image_id)
    }
}

/// Exclusive write access to one image; released on drop.
#[derive(Debug)]
pub struct ProcessingGuard {
    image_id: String,
    store: SharedAnnotationStore,
}

impl ProcessingGuard {
    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    /// Apply the result of the work to the claimed image.
    pub fn commit<R>(&self, f: impl FnOnce(&mut ImageEditor<'_>) -> R) -> Result<R> {
        let mut state = self.store.lock()?;
        let mut editor = ImageEditor {
            store: &mut state.store,
            image_id: &self.image_id,
        };
        Ok(f(&mut editor))
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        if let Ok(mut state) = self.store.lock() {
            state.processing.remove(&self.image_id);
        }
        debug!(image_id = %self.image_id, "processing finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 10.0, 10.0, "cat")
    }

    fn box_count(shared: &SharedAnnotationStore, image_id: &str) -> usize {
        shared
            .read(|s| s.get(image_id).map_or(0, |r| r.boxes.len()))
            .unwrap()
    }

    #[test]
    fn test_processing_image_rejects_updates() {
        let shared = SharedAnnotationStore::default();
        let guard = shared.begin_processing("a.jpg").unwrap();

        let err = shared.update("a.jpg", |image| image.add_box(bbox())).unwrap_err();
        assert!(matches!(err, StoreError::ImageBusy(id) if id == "a.jpg"));
        assert!(shared.update("b.jpg", |image| image.add_box(bbox())).is_ok());
        assert!(matches!(
            shared.begin_processing("a.jpg"),
            Err(StoreError::ImageBusy(_))
        ));

        guard.commit(|image| image.add_box(bbox())).unwrap();
        drop(guard);

        assert!(!shared.is_processing("a.jpg").unwrap());
        shared.update("a.jpg", |image| image.add_box(bbox())).unwrap();
        assert_eq!(box_count(&shared, "a.jpg"), 2);
    }

    #[test]
    fn test_update_only_touches_its_own_image() {
        let shared = SharedAnnotationStore::default();
        let _guard = shared.begin_processing("a.jpg").unwrap();

        let touched = shared
            .update("b.jpg", |image| {
                image.add_box(bbox());
                image.image_id().to_string()
            })
            .unwrap();

        assert_eq!(touched, "b.jpg");
        assert_eq!(box_count(&shared, "a.jpg"), 0);
        assert_eq!(box_count(&shared, "b.jpg"), 1);
    }

    #[test]
    fn test_undo_of_busy_image_is_rejected() {
        let shared = SharedAnnotationStore::default();
        shared.update("b.jpg", |image| image.add_box(bbox())).unwrap();
        shared.update("a.jpg", |image| image.add_box(bbox())).unwrap();

        let guard = shared.begin_processing("a.jpg").unwrap();
        let err = shared.undo().unwrap_err();
        assert!(matches!(err, StoreError::ImageBusy(id) if id == "a.jpg"));
        assert_eq!(box_count(&shared, "a.jpg"), 1);
        drop(guard);

        assert_eq!(shared.undo().unwrap().as_deref(), Some("a.jpg"));
        assert_eq!(box_count(&shared, "a.jpg"), 0);

        let _guard = shared.begin_processing("a.jpg").unwrap();
        assert!(matches!(shared.redo(), Err(StoreError::ImageBusy(_))));
        assert_eq!(shared.undo().unwrap().as_deref(), Some("b.jpg"));
    }

    #[test]
    fn test_into_inner_requires_last_handle() {
        let shared = SharedAnnotationStore::default();
        let other = shared.clone();
        assert!(shared.into_inner().is_none());
        assert!(other.into_inner().is_some());
    }
}
