//! Annotation state: the per-image store with undo history, its JSON
//! document, the class catalog and the image folder it describes.

pub mod catalog;
pub mod error;
pub mod history;
pub mod persistence;
pub mod shared;
pub mod source;
pub mod store;

pub use catalog::{ClassCatalog, DEFAULT_CLASS};
pub use error::{Result, StoreError};
pub use history::{HISTORY_CAPACITY, History, Snapshot};
pub use shared::{ImageEditor, ProcessingGuard, SharedAnnotationStore};
pub use source::{IMAGE_EXTENSIONS, ImageSource, is_image_file};
pub use store::{AnnotationStore, BoxUpdate, SegmentUpdate};
