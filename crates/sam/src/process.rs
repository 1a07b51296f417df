//! Oracle backed by an external model script.
//!
//! The script is called once per operation with `embed` or `predict` as its
//! first argument and `--input <json file>`. It answers on stdout:
//!
//! - `embed`: `{"embedding": "<path of the cached embedding>"}`
//! - `predict`: `{"width": w, "height": h, "mask": [f32; w*h], "score": s}`

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use annokit_common::Point;
use mask::ProbabilityMask;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::{
    error::{OracleError, Result},
    oracle::{MaskPrediction, SegmentationOracle},
};

pub struct ProcessOracle {
    script_path: PathBuf,
    uv_env_path: Option<String>,
}

/// Handle to an embedding the script has written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingFile {
    pub embedding: PathBuf,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    width: u32,
    height: u32,
    mask: Vec<f32>,
    score: f64,
}

impl ProcessOracle {
    pub fn new(script_path: impl Into<PathBuf>, uv_env_path: Option<String>) -> Self {
        Self {
            script_path: script_path.into(),
            uv_env_path,
        }
    }

    fn command(&self) -> Command {
        if let Some(uv_path) = &self.uv_env_path {
            let mut c = Command::new(uv_path);
            c.arg("run").arg("python").arg(&self.script_path);
            c
        } else {
            let mut c = Command::new("python");
            c.arg(&self.script_path);
            c
        }
    }

    fn run(&self, operation: &str, input: serde_json::Value) -> Result<Vec<u8>> {
        let temp_input = tempfile::NamedTempFile::new()?;
        serde_json::to_writer(&temp_input, &input)?;

        debug!(operation, script = %self.script_path.display(), "running segmentation script");
        let output = self
            .command()
            .arg(operation)
            .arg("--input")
            .arg(temp_input.path())
            .output()?;

        if !output.status.success() {
            return Err(OracleError::Backend(format!(
                "{operation} failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(output.stdout)
    }
}

impl SegmentationOracle for ProcessOracle {
    type Embedding = EmbeddingFile;

    fn embed(&self, image_path: &Path) -> Result<Self::Embedding> {
        let stdout = self.run("embed", json!({ "image_path": image_path }))?;
        Ok(serde_json::from_slice(&stdout)?)
    }

    fn predict(&self, embedding: &Self::Embedding, points: &[Point]) -> Result<MaskPrediction> {
        let coords: Vec<[f64; 2]> = points.iter().map(|p| [p.x, p.y]).collect();
        let stdout = self.run(
            "predict",
            json!({ "embedding": embedding.embedding, "points": coords }),
        )?;

        let response: PredictResponse = serde_json::from_slice(&stdout)?;
        Ok(MaskPrediction {
            mask: ProbabilityMask::new(response.width, response.height, response.mask)?,
            score: response.score.clamp(0.0, 1.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_response_parses() {
        let json = r#"{"width":2,"height":1,"mask":[-1.0,3.0],"score":0.87}"#;
        let response: PredictResponse = serde_json::from_str(json).unwrap();
        let mask = ProbabilityMask::new(response.width, response.height, response.mask).unwrap();
        assert_eq!(mask.values(), &[-1.0, 3.0]);
    }

    #[test]
    fn test_missing_script_is_an_error() {
        let oracle = ProcessOracle::new("/nonexistent/segment.py", Some("/nonexistent/uv".into()));
        assert!(oracle.embed(Path::new("image.jpg")).is_err());
    }
}
