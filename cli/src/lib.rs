use std::fs;
use std::path::{Path, PathBuf};

use annokit_common::{ImageSize, Point};
use annotation_store::{AnnotationStore, ClassCatalog, ImageSource, StoreError};
use dataset_export::{ExportConfig, ExportError};
use mask::{BinaryMask, MaskError, MaskOutline, MaskTransform, Pipeline};
use sam::OracleError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// File the annotation document is kept in when a project does not name one.
pub const DEFAULT_ANNOTATIONS_FILE: &str = "annotations.json";

#[derive(Error, Debug)]
pub enum AnnokitError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Mask(#[from] MaskError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error("Invalid point '{0}', expected X,Y")]
    InvalidPoint(String),
    #[error("Image '{0}' is not in the project folder")]
    UnknownImage(String),
    #[error("Project has no [oracle] section")]
    MissingOracle,
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

pub type Result<T> = std::result::Result<T, AnnokitError>;

/// External segmentation script settings
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct OracleSection {
    pub script: PathBuf,
    /// `uv` executable used to run the script; plain `python` when absent
    pub uv_env_path: Option<String>,
    #[serde(default)]
    pub threshold: f32,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_tolerance() -> f64 {
    mask::DEFAULT_TOLERANCE
}

/// An image folder, its annotation document and how to export it
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Project {
    pub images_dir: PathBuf,
    /// Defaults to `annotations.json` inside `images_dir`
    pub annotations: Option<PathBuf>,
    #[serde(default)]
    pub export: ExportConfig,
    pub oracle: Option<OracleSection>,
}

impl Project {
    pub fn new(images_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
            annotations: None,
            export: ExportConfig::default(),
            oracle: None,
        }
    }

    pub fn annotations_path(&self) -> PathBuf {
        self.annotations
            .clone()
            .unwrap_or_else(|| self.images_dir.join(DEFAULT_ANNOTATIONS_FILE))
    }

    /// Load Project configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load Project configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(AnnokitError::UnsupportedFileFormat),
        }
    }

    /// Save Project configuration to a TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(Project)).unwrap_or_default()
    }
}

/// A project opened for work: folder listing, annotations and classes.
pub struct Workspace {
    pub source: ImageSource,
    pub store: AnnotationStore,
    pub catalog: ClassCatalog,
    pub annotations_path: PathBuf,
}

impl Workspace {
    pub fn open(project: &Project) -> Result<Self> {
        let source = ImageSource::open(&project.images_dir)?;
        let annotations_path = project.annotations_path();
        let store = AnnotationStore::load_json(&annotations_path)?;

        let mut catalog = if project.export.class_list.is_empty() {
            ClassCatalog::new()
        } else {
            ClassCatalog::from_names(&project.export.class_list)
        };
        catalog.merge_labels(store.labels());

        info!(
            images_dir = %project.images_dir.display(),
            annotated = store.len(),
            classes = catalog.classes().len(),
            "opened workspace"
        );
        Ok(Self {
            source,
            store,
            catalog,
            annotations_path,
        })
    }

    /// Path of `image_id`, failing when the folder does not contain it.
    pub fn image_path(&self, image_id: &str) -> Result<PathBuf> {
        let path = self.source.path_of(image_id);
        if !path.is_file() {
            return Err(AnnokitError::UnknownImage(image_id.to_string()));
        }
        Ok(path)
    }

    pub fn save(&mut self) -> Result<()> {
        self.store.persist(&self.annotations_path)?;
        Ok(())
    }
}

/// Parse `X,Y` into a point.
pub fn parse_point(raw: &str) -> Result<Point> {
    let invalid = || AnnokitError::InvalidPoint(raw.to_string());
    let (x, y) = raw.split_once(',').ok_or_else(invalid)?;
    let x: f64 = x.trim().parse().map_err(|_| invalid())?;
    let y: f64 = y.trim().parse().map_err(|_| invalid())?;
    Ok(Point::new(x, y))
}

/// Outline a mask image file, optionally rescaled to an original image size.
pub fn outline_mask_file(
    path: &Path,
    threshold: u8,
    tolerance: f64,
    original: Option<ImageSize>,
) -> Result<MaskOutline> {
    let mask = BinaryMask::open(path, threshold)?;
    let transform = original
        .map(|size| MaskTransform::from_sizes(mask.size(), size))
        .unwrap_or_default();
    let pipeline = Pipeline::builder().with_simplification(tolerance).build();
    Ok(pipeline.extract(&mask, &transform))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("12.5, 40").unwrap(), Point::new(12.5, 40.0));
        assert!(matches!(parse_point("12"), Err(AnnokitError::InvalidPoint(_))));
        assert!(parse_point("a,b").is_err());
    }

    #[test]
    fn test_project_defaults() {
        let project = Project::from_toml(
            r#"
            images_dir = "/data/cats"

            [export]
            format = "segmentation"
            seed = 3
            "#,
        )
        .unwrap();

        assert_eq!(project.annotations_path(), PathBuf::from("/data/cats/annotations.json"));
        assert_eq!(project.export.seed, Some(3));
        assert_eq!(project.export.target_size, 640);
        assert!(project.oracle.is_none());
    }

    #[test]
    fn test_oracle_section_defaults() {
        let project = Project::from_json(
            r#"{"images_dir": "imgs", "oracle": {"script": "sam.py", "uv_env_path": null}}"#,
        )
        .unwrap();
        let oracle = project.oracle.unwrap();
        assert_eq!(oracle.threshold, 0.0);
        assert_eq!(oracle.tolerance, 2.0);
    }

    #[test]
    fn test_workspace_merges_classes() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = AnnotationStore::new();
        store.add_box("a.jpg", annokit_common::BoundingBox::new(0.0, 0.0, 9.0, 9.0, "cat"));
        store.save_json(&dir.path().join(DEFAULT_ANNOTATIONS_FILE)).unwrap();

        let mut project = Project::new(dir.path());
        project.export.class_list = vec!["dog".into()];
        let workspace = Workspace::open(&project).unwrap();

        assert_eq!(workspace.catalog.classes().names(), &["dog", "cat"]);
        assert!(matches!(
            workspace.image_path("a.jpg"),
            Err(AnnokitError::UnknownImage(_))
        ));
    }

    #[test]
    fn test_outline_mask_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("mask.png");
        let mut img = image::GrayImage::new(50, 40);
        for y in 10..30 {
            for x in 5..25 {
                img.put_pixel(x, y, image::Luma([255]));
            }
        }
        img.save(&path).unwrap();

        let outline = outline_mask_file(&path, 127, 2.0, Some(ImageSize::new(100, 80))).unwrap();
        assert_eq!(outline.polygon.len(), 4);
        assert_eq!((outline.mask_width, outline.mask_height), (50, 40));
    }
}
