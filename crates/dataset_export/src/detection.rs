//! Letterboxed images with normalized-box label files.

use std::{
    fs,
    path::{Path, PathBuf},
};

use annokit_common::{ClassList, ImageAnnotation, ImageSize, to_normalized_box};
use tracing::debug;

use crate::{
    config::{ExportConfig, SplitName},
    error::{ExportError, Result},
    filters::prepare_image,
    split::DatasetSplit,
};

/// Replace path separators so nested ids become flat file names.
///
/// Lossy: `a/x.jpg` and `a_x.jpg` map to the same name.
pub fn flatten_filename(image_id: &str) -> String {
    image_id.replace(['/', '\\'], "_")
}

/// `("a_x", ".jpg")` for `"a_x.jpg"`; the extension keeps its dot.
pub fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(0) | None => (file_name, ""),
        Some(dot) => file_name.split_at(dot),
    }
}

/// Label file body: one line per box, joined without a trailing newline.
pub fn label_file_contents(
    record: &ImageAnnotation,
    original_size: ImageSize,
    classes: &ClassList,
    target_size: u32,
) -> String {
    record
        .boxes
        .iter()
        .map(|bbox| {
            if !classes.contains(&bbox.label) {
                debug!(label = %bbox.label, "label not in class list, using class 0");
            }
            to_normalized_box(bbox, original_size, target_size, classes.class_id(&bbox.label))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write one letterboxed image and its label file.
pub(crate) fn export_image(
    source: &Path,
    output_dir: &Path,
    split: SplitName,
    image_id: &str,
    record: &ImageAnnotation,
    classes: &ClassList,
    config: &ExportConfig,
) -> Result<()> {
    if !source.is_file() {
        return Err(ExportError::SourceImageMissing(image_id.to_string()));
    }

    let target_size = config.resolved_target_size();
    let image = image::open(source)?;
    let original_size = if record.original_size.is_unset() {
        ImageSize::new(image.width(), image.height())
    } else {
        record.original_size
    };

    let (canvas, _) = prepare_image(&image, &config.filters, target_size);

    let file_name = flatten_filename(image_id);
    let (stem, _) = split_extension(&file_name);
    let image_path = output_dir.join("images").join(split.to_string()).join(&file_name);
    let label_path: PathBuf = output_dir
        .join("labels")
        .join(split.to_string())
        .join(format!("{stem}.txt"));

    canvas.save(&image_path)?;
    fs::write(
        &label_path,
        label_file_contents(record, original_size, classes, target_size),
    )?;

    debug!(image_id, split = %split, boxes = record.boxes.len(), "exported detection image");
    Ok(())
}

fn yaml_scalar(raw: &str) -> String {
    let plain = !raw.is_empty()
        && raw.trim() == raw
        && raw
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-' | '.' | '/'))
        && !raw.starts_with(['-', '.'])
        && raw.parse::<f64>().is_err()
        && !matches!(
            raw.to_ascii_lowercase().as_str(),
            "true" | "false" | "yes" | "no" | "on" | "off" | "null" | "~"
        );
    if plain {
        raw.to_string()
    } else {
        format!("'{}'", raw.replace('\'', "''"))
    }
}

/// `data.yaml` for detection training frameworks.
pub fn dataset_yaml(classes: &ClassList, split: &DatasetSplit, config: &ExportConfig) -> String {
    let mut yaml = String::from("path: .\ntrain: images/train\nval: images/val\n");
    if config.ratios.test > 0.0 || !split.test.is_empty() {
        yaml.push_str("test: images/test\n");
    }
    yaml.push_str(&format!("nc: {}\n", classes.len()));
    if classes.is_empty() {
        yaml.push_str("names: []\n");
    } else {
        yaml.push_str("names:\n");
        for name in classes.iter() {
            yaml.push_str(&format!("  - {}\n", yaml_scalar(name)));
        }
    }
    yaml
}
