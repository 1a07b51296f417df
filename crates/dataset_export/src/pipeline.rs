//! The export run: select, split, write, package.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use annokit_common::{ClassList, ImageAnnotation};
use chrono::{DateTime, Utc};
use rand::Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    archive::zip_directory,
    config::{ExportConfig, ExportFormat, SplitName},
    detection,
    error::{ExportError, Result},
    segmentation::{self, Metadata, SplitDocument},
    split::{DatasetSplit, seeded_split, split_dataset},
};

/// What an export produced, besides the archive itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportReport {
    pub format: ExportFormat,
    pub target_size: u32,
    /// Images written per split
    pub splits: BTreeMap<SplitName, usize>,
    /// Annotated images that were missing on disk
    pub skipped: Vec<String>,
    pub total_annotations: usize,
}

impl ExportReport {
    pub fn exported_images(&self) -> usize {
        self.splits.values().sum()
    }

    pub fn log_summary(&self) {
        info!("=== Export Summary ===");
        info!("Format: {} at {}px", self.format, self.target_size);
        for (split, count) in &self.splits {
            info!("{split}: {count} images");
        }
        info!("Annotations: {}", self.total_annotations);
        if !self.skipped.is_empty() {
            warn!(
                "Skipped {} missing images: {}",
                self.skipped.len(),
                self.skipped.join(", ")
            );
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub archive: Vec<u8>,
    pub report: ExportReport,
}

/// Runs exports inside a staging directory it owns for the duration of a run.
#[derive(Debug, Clone)]
pub struct Exporter {
    staging_dir: PathBuf,
    created_at: Option<DateTime<Utc>>,
}

impl Exporter {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            created_at: None,
        }
    }

    /// Fix the metadata timestamp instead of using the current time.
    pub fn with_timestamp(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Export with the split order fixed by `config.seed`, random otherwise.
    pub fn export(
        &self,
        records: &BTreeMap<String, ImageAnnotation>,
        source_root: &Path,
        config: &ExportConfig,
    ) -> Result<ExportOutcome> {
        self.run(records, source_root, config, |ids| {
            seeded_split(ids, &config.ratios, config.seed)
        })
    }

    /// Export with a caller-supplied random source for the split shuffle.
    pub fn export_with_rng<R: Rng + ?Sized>(
        &self,
        records: &BTreeMap<String, ImageAnnotation>,
        source_root: &Path,
        config: &ExportConfig,
        rng: &mut R,
    ) -> Result<ExportOutcome> {
        self.run(records, source_root, config, |ids| {
            split_dataset(ids, &config.ratios, rng)
        })
    }

    fn run(
        &self,
        records: &BTreeMap<String, ImageAnnotation>,
        source_root: &Path,
        config: &ExportConfig,
        split_ids: impl FnOnce(Vec<String>) -> DatasetSplit,
    ) -> Result<ExportOutcome> {
        config.validate()?;

        let selected = select_images(records, config.format);
        if selected.is_empty() {
            return Err(ExportError::NoAnnotatedImages {
                format: config.format,
            });
        }

        let split = split_ids(selected);
        info!(
            format = %config.format,
            train = split.train.len(),
            val = split.val.len(),
            test = split.test.len(),
            "starting export"
        );

        prepare_output_dir(&self.staging_dir)?;
        let classes = ClassList::from_names(&config.class_list);

        let report = match config.format {
            ExportFormat::Detection => {
                self.write_detection(records, source_root, config, &classes, &split)?
            }
            ExportFormat::Segmentation => {
                self.write_segmentation(records, source_root, config, &classes, &split)?
            }
        };

        let archive = zip_directory(&self.staging_dir)?;
        report.log_summary();
        Ok(ExportOutcome { archive, report })
    }

    fn write_detection(
        &self,
        records: &BTreeMap<String, ImageAnnotation>,
        source_root: &Path,
        config: &ExportConfig,
        classes: &ClassList,
        split: &DatasetSplit,
    ) -> Result<ExportReport> {
        let mut report = ExportReport {
            format: ExportFormat::Detection,
            target_size: config.resolved_target_size(),
            ..ExportReport::default()
        };

        for (name, ids) in split.iter() {
            if name == SplitName::Test && ids.is_empty() && config.ratios.test <= 0.0 {
                continue;
            }
            fs::create_dir_all(self.staging_dir.join("images").join(name.to_string()))?;
            fs::create_dir_all(self.staging_dir.join("labels").join(name.to_string()))?;

            let results: Vec<(&String, Result<usize>)> = ids
                .par_iter()
                .map(|id| {
                    let record = &records[id];
                    let result = detection::export_image(
                        &source_path(source_root, id),
                        &self.staging_dir,
                        name,
                        id,
                        record,
                        classes,
                        config,
                    )
                    .map(|()| record.boxes.len());
                    (id, result)
                })
                .collect();

            let mut written = 0;
            for (id, result) in results {
                match result {
                    Ok(boxes) => {
                        written += 1;
                        report.total_annotations += boxes;
                    }
                    Err(ExportError::SourceImageMissing(_)) => {
                        warn!(image_id = %id, "source image missing, skipping");
                        report.skipped.push(id.clone());
                    }
                    Err(err) => return Err(err),
                }
            }
            report.splits.insert(name, written);
        }

        fs::write(
            self.staging_dir.join("data.yaml"),
            detection::dataset_yaml(classes, split, config),
        )?;
        Ok(report)
    }

    fn write_segmentation(
        &self,
        records: &BTreeMap<String, ImageAnnotation>,
        source_root: &Path,
        config: &ExportConfig,
        classes: &ClassList,
        split: &DatasetSplit,
    ) -> Result<ExportReport> {
        let mut report = ExportReport {
            format: ExportFormat::Segmentation,
            target_size: config.resolved_target_size(),
            ..ExportReport::default()
        };
        let mut documents = Vec::new();

        for (name, ids) in split.iter() {
            if ids.is_empty() {
                continue;
            }
            fs::create_dir_all(self.staging_dir.join("images").join(name.to_string()))?;

            let results: Vec<_> = ids
                .par_iter()
                .map(|id| {
                    let result = segmentation::export_image(
                        &source_path(source_root, id),
                        &self.staging_dir,
                        name,
                        id,
                        &records[id],
                        classes,
                    );
                    (id, result)
                })
                .collect();

            let mut images = Vec::new();
            for (id, result) in results {
                match result {
                    Ok(image) => images.push(image),
                    Err(ExportError::SourceImageMissing(_)) => {
                        warn!(image_id = %id, "source image missing, skipping");
                        report.skipped.push(id.clone());
                    }
                    Err(err) => return Err(err),
                }
            }
            if images.is_empty() {
                continue;
            }

            let document = SplitDocument::new(name, images);
            fs::write(
                self.staging_dir.join(document.file_name()),
                serde_json::to_string_pretty(&document)?,
            )?;
            report.splits.insert(name, document.images.len());
            report.total_annotations += document.annotation_count();
            documents.push(document);
        }

        let metadata = Metadata::new(
            classes,
            &documents,
            self.created_at.unwrap_or_else(Utc::now),
        );
        fs::write(
            self.staging_dir.join("metadata.json"),
            serde_json::to_string_pretty(&metadata)?,
        )?;
        Ok(report)
    }
}

/// Ids of images with at least one annotation of the kind `format` exports.
pub fn select_images(records: &BTreeMap<String, ImageAnnotation>, format: ExportFormat) -> Vec<String> {
    records
        .iter()
        .filter(|(_, record)| match format {
            ExportFormat::Detection => !record.boxes.is_empty(),
            ExportFormat::Segmentation => !record.polygons.is_empty(),
        })
        .map(|(id, _)| id.clone())
        .collect()
}

/// Empty the staging directory, creating it if needed.
fn prepare_output_dir(path: &Path) -> Result<()> {
    if path.exists() {
        warn!(path = %path.display(), "staging directory exists, clearing it");
        fs::remove_dir_all(path)?;
    }
    fs::create_dir_all(path)?;
    Ok(())
}

fn source_path(root: &Path, image_id: &str) -> PathBuf {
    image_id.split('/').fold(root.to_path_buf(), |path, part| path.join(part))
}

#[cfg(test)]
mod tests {
    use annokit_common::{BoundingBox, Point, Segment};

    use super::*;

    fn records() -> BTreeMap<String, ImageAnnotation> {
        let mut records = BTreeMap::new();
        records.insert(
            "boxes.jpg".to_string(),
            ImageAnnotation {
                boxes: vec![BoundingBox::new(0.0, 0.0, 5.0, 5.0, "cat")],
                ..ImageAnnotation::default()
            },
        );
        records.insert(
            "poly.jpg".to_string(),
            ImageAnnotation {
                polygons: vec![
                    Segment::new(
                        "cat",
                        vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0), Point::new(0.0, 3.0)],
                        vec![],
                        None,
                    )
                    .unwrap(),
                ],
                ..ImageAnnotation::default()
            },
        );
        records.insert("empty.jpg".to_string(), ImageAnnotation::default());
        records
    }

    #[test]
    fn test_selection_by_format() {
        let records = records();
        assert_eq!(select_images(&records, ExportFormat::Detection), vec!["boxes.jpg"]);
        assert_eq!(select_images(&records, ExportFormat::Segmentation), vec!["poly.jpg"]);
    }

    #[test]
    fn test_nested_source_path() {
        assert_eq!(
            source_path(Path::new("/data"), "a/b/c.png"),
            Path::new("/data").join("a").join("b").join("c.png")
        );
    }

    #[test]
    fn test_report_totals() {
        let mut report = ExportReport::default();
        report.splits.insert(SplitName::Train, 3);
        report.splits.insert(SplitName::Val, 1);
        assert_eq!(report.exported_images(), 4);
    }
}
