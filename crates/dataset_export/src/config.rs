use std::{fs, path::Path};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::error::{ExportError, Result};

pub const DEFAULT_TARGET_SIZE: u32 = 640;

#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq, Hash,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExportFormat {
    /// Letterboxed images plus one normalized-box label file per image
    #[default]
    Detection,
    /// Untouched images plus per-split polygon documents
    Segmentation,
}

#[derive(
    Debug, Clone, Copy,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SplitName {
    Train,
    Val,
    Test,
}

/// Named detector configurations that fix the export resolution.
#[derive(
    Debug, Clone, Copy,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelPreset {
    Yolov5s,
    Yolov5m,
    #[serde(rename = "yolov5_416")]
    #[strum(serialize = "yolov5_416")]
    Yolov5At416,
    Yolov8n,
    Yolov8s,
    Yolov8m,
    #[serde(rename = "yolov8_1280")]
    #[strum(serialize = "yolov8_1280")]
    Yolov8At1280,
    Yolov11n,
    Yolov11s,
}

impl ModelPreset {
    pub fn target_size(self) -> u32 {
        match self {
            ModelPreset::Yolov5At416 => 416,
            ModelPreset::Yolov8At1280 => 1280,
            _ => DEFAULT_TARGET_SIZE,
        }
    }
}

/// Pixel adjustments applied before resampling. Identity by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ImageFilters {
    /// Luminance multiplier
    pub brightness: f32,
    /// Chroma multiplier; 0 removes colour
    pub saturation: f32,
    /// Linear gain applied to every channel
    pub exposure: f32,
    /// Gaussian sigma in pixels; 0 disables
    pub blur: f32,
    pub grayscale: bool,
}

impl ImageFilters {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

impl Default for ImageFilters {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            saturation: 1.0,
            exposure: 1.0,
            blur: 0.0,
            grayscale: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SplitRatios {
    pub train: f64,
    pub val: f64,
    pub test: f64,
}

impl SplitRatios {
    pub fn new(train: f64, val: f64, test: f64) -> Self {
        Self { train, val, test }
    }

}

impl Default for SplitRatios {
    fn default() -> Self {
        Self::new(0.8, 0.2, 0.0)
    }
}

/// Everything an export run needs besides the store and the image folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ExportConfig {
    pub format: ExportFormat,
    /// Side of the square output canvas; ignored when `model_preset` is set
    pub target_size: u32,
    pub model_preset: Option<ModelPreset>,
    pub filters: ImageFilters,
    /// Class names in id order
    pub class_list: Vec<String>,
    pub ratios: SplitRatios,
    /// Fixes split membership; a fresh random order is used when absent
    pub seed: Option<u64>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::default(),
            target_size: DEFAULT_TARGET_SIZE,
            model_preset: None,
            filters: ImageFilters::default(),
            class_list: Vec::new(),
            ratios: SplitRatios::default(),
            seed: None,
        }
    }
}

impl ExportConfig {
    /// Canvas size actually used, after applying the model preset.
    pub fn resolved_target_size(&self) -> u32 {
        self.model_preset
            .map(ModelPreset::target_size)
            .unwrap_or(self.target_size)
    }

    pub fn validate(&self) -> Result<()> {
        let ratios = [
            ("train", self.ratios.train),
            ("val", self.ratios.val),
            ("test", self.ratios.test),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(ExportError::InvalidConfig(format!(
                    "{name} ratio {value} is outside [0, 1]"
                )));
            }
        }
        let sum = self.ratios.train + self.ratios.val + self.ratios.test;
        if sum > 1.0 + 1e-9 {
            return Err(ExportError::InvalidConfig(format!(
                "split ratios sum to {sum}, more than 1"
            )));
        }
        if self.resolved_target_size() == 0 {
            return Err(ExportError::InvalidConfig("target size must be positive".into()));
        }
        // Class ids are list positions, so entries must not be dropped or merged.
        for (index, name) in self.class_list.iter().enumerate() {
            let name = name.trim();
            if name.is_empty() {
                return Err(ExportError::InvalidConfig(format!("class {index} has a blank name")));
            }
            if self.class_list[..index].iter().any(|earlier| earlier.trim() == name) {
                return Err(ExportError::InvalidConfig(format!("class '{name}' is listed twice")));
            }
        }
        let filters = &self.filters;
        if filters.brightness < 0.0 || filters.saturation < 0.0 || filters.exposure < 0.0 || filters.blur < 0.0 {
            return Err(ExportError::InvalidConfig("filter values must not be negative".into()));
        }
        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a JSON file
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
            _ => Err(ExportError::UnsupportedFileFormat),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// JSON schema of the configuration document
    pub fn schema() -> serde_json::Value {
        let schema = schemars::schema_for!(ExportConfig);
        serde_json::to_value(schema).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExportConfig::default();
        assert_eq!(config.format, ExportFormat::Detection);
        assert_eq!(config.resolved_target_size(), 640);
        assert!(config.filters.is_identity());
        assert_eq!(config.ratios, SplitRatios::new(0.8, 0.2, 0.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = ExportConfig::from_toml(
            r#"
            format = "segmentation"
            class_list = ["cat", "dog"]

            [ratios]
            train = 0.7
            val = 0.2
            test = 0.1

            [filters]
            grayscale = true
            "#,
        )
        .unwrap();

        assert_eq!(config.format, ExportFormat::Segmentation);
        assert_eq!(config.target_size, 640);
        assert_eq!(config.ratios.test, 0.1);
        assert!(config.filters.grayscale);
        assert_eq!(config.filters.brightness, 1.0);
    }

    #[test]
    fn test_preset_overrides_target_size() {
        let config: ExportConfig =
            ExportConfig::from_json(r#"{"target_size": 320, "model_preset": "yolov8_1280"}"#).unwrap();
        assert_eq!(config.resolved_target_size(), 1280);
        assert_eq!(ModelPreset::from_str("yolov5_416").unwrap().target_size(), 416);
        assert_eq!(ModelPreset::Yolov11s.to_string(), "yolov11s");
    }

    #[test]
    fn test_every_preset_parses_from_its_name() {
        for preset in ModelPreset::iter() {
            assert_eq!(ModelPreset::from_str(&preset.to_string()).unwrap(), preset);
        }
        assert_eq!(ModelPreset::VARIANTS.len(), 9);
    }

    #[test]
    fn test_validate_rejects_bad_ratios() {
        let mut config = ExportConfig::default();
        config.ratios = SplitRatios::new(0.8, 0.3, 0.0);
        assert!(matches!(config.validate(), Err(ExportError::InvalidConfig(_))));

        config.ratios = SplitRatios::new(-0.1, 0.3, 0.0);
        assert!(config.validate().is_err());

        config.ratios = SplitRatios::new(0.7, 0.2, 0.1);
        assert!(config.validate().is_ok());

        config.target_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_and_repeated_classes() {
        let mut config = ExportConfig {
            class_list: vec!["".into(), "cat".into()],
            ..ExportConfig::default()
        };
        assert!(matches!(config.validate(), Err(ExportError::InvalidConfig(msg)) if msg.contains("blank")));

        config.class_list = vec!["cat".into(), "dog".into(), " cat".into()];
        assert!(matches!(config.validate(), Err(ExportError::InvalidConfig(msg)) if msg.contains("twice")));

        config.class_list = vec!["cat".into(), "dog".into()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_extension_rejected() {
        assert!(matches!(
            ExportConfig::from_file("config.yaml"),
            Err(ExportError::UnsupportedFileFormat)
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExportConfig {
            seed: Some(7),
            class_list: vec!["a".into()],
            ..ExportConfig::default()
        };
        assert_eq!(ExportConfig::from_toml(&config.to_toml().unwrap()).unwrap(), config);
    }

    #[test]
    fn test_split_names() {
        let names: Vec<String> = SplitName::iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["train", "val", "test"]);
    }
}
