//! Original-resolution images with per-split polygon documents.

use std::{collections::BTreeMap, fs, path::Path};

use annokit_common::{ClassList, ImageAnnotation, ImageSize, Point, Segment};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::{ExportFormat, SplitName},
    detection::flatten_filename,
    error::{ExportError, Result},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationEntry {
    /// Flattened `[x1, y1, x2, y2, ...]` in original pixels
    pub segmentation: Vec<f64>,
    pub category_id: usize,
    pub category_name: String,
    /// `[x, y, width, height]`
    pub bbox: [f64; 4],
    pub area: f64,
    pub point_prompt: Option<Vec<[f64; 2]>>,
    pub score: f64,
}

impl SegmentationEntry {
    pub fn from_segment(segment: &Segment, classes: &ClassList) -> Self {
        if !classes.contains(&segment.label) {
            debug!(label = %segment.label, "label not in class list, using class 0");
        }
        let point_prompt = (!segment.click_points.is_empty()).then(|| {
            segment
                .click_points
                .iter()
                .map(|p| [p.x, p.y])
                .collect()
        });

        Self {
            segmentation: flatten_points(&segment.polygon),
            category_id: classes.class_id(&segment.label),
            category_name: segment.label.clone(),
            bbox: segment.resolved_bounds().to_array(),
            area: segment.resolved_area(),
            point_prompt,
            score: segment.confidence(),
        }
    }
}

fn flatten_points(points: &[Point]) -> Vec<f64> {
    points.iter().flat_map(|p| [p.x, p.y]).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationImage {
    /// Position within the split document
    pub id: usize,
    pub image_id: String,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub annotations: Vec<SegmentationEntry>,
}

/// Contents of `{split}_annotations.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitDocument {
    pub split: SplitName,
    pub images: Vec<SegmentationImage>,
}

impl SplitDocument {
    pub fn new(split: SplitName, mut images: Vec<SegmentationImage>) -> Self {
        for (id, image) in images.iter_mut().enumerate() {
            image.id = id;
        }
        Self { split, images }
    }

    pub fn file_name(&self) -> String {
        format!("{}_annotations.json", self.split)
    }

    pub fn annotation_count(&self) -> usize {
        self.images.iter().map(|image| image.annotations.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: usize,
    pub name: String,
}

/// Contents of `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub format: ExportFormat,
    pub created_at: DateTime<Utc>,
    pub categories: Vec<Category>,
    pub splits: BTreeMap<SplitName, usize>,
    pub total_annotations: usize,
}

impl Metadata {
    pub fn new(classes: &ClassList, documents: &[SplitDocument], created_at: DateTime<Utc>) -> Self {
        Self {
            format: ExportFormat::Segmentation,
            created_at,
            categories: classes
                .iter()
                .enumerate()
                .map(|(id, name)| Category {
                    id,
                    name: name.to_string(),
                })
                .collect(),
            splits: documents
                .iter()
                .map(|doc| (doc.split, doc.images.len()))
                .collect(),
            total_annotations: documents.iter().map(SplitDocument::annotation_count).sum(),
        }
    }
}

/// Copy one image byte-for-byte and describe its polygons.
pub(crate) fn export_image(
    source: &Path,
    output_dir: &Path,
    split: SplitName,
    image_id: &str,
    record: &ImageAnnotation,
    classes: &ClassList,
) -> Result<SegmentationImage> {
    if !source.is_file() {
        return Err(ExportError::SourceImageMissing(image_id.to_string()));
    }

    let size = if record.original_size.is_unset() {
        let (width, height) = image::image_dimensions(source)?;
        ImageSize::new(width, height)
    } else {
        record.original_size
    };

    let file_name = flatten_filename(image_id);
    fs::copy(
        source,
        output_dir.join("images").join(split.to_string()).join(&file_name),
    )?;

    debug!(image_id, split = %split, polygons = record.polygons.len(), "exported segmentation image");
    Ok(SegmentationImage {
        id: 0,
        image_id: image_id.to_string(),
        file_name,
        width: size.width,
        height: size.height,
        annotations: record
            .polygons
            .iter()
            .map(|segment| SegmentationEntry::from_segment(segment, classes))
            .collect(),
    })
}
