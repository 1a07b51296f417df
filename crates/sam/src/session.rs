use std::{path::PathBuf, sync::Arc};

use annokit_common::{ImageSize, Point, Segment};
use mask::{MaskTransform, Pipeline};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::{
    error::{OracleError, Result},
    oracle::{MaskPrediction, SegmentationOracle},
};

struct CachedEmbedding<E> {
    image_id: String,
    image_size: ImageSize,
    embedding: Arc<E>,
}

/// Front door to a segmentation oracle.
///
/// Holds the embedding of the active image and allows at most one request
/// (embed or predict) in flight. A request made while another is running
/// fails with [`OracleError::Busy`] instead of queueing.
pub struct OracleSession<O: SegmentationOracle> {
    oracle: Option<Arc<O>>,
    in_flight: Mutex<()>,
    current: RwLock<Option<CachedEmbedding<O::Embedding>>>,
}

impl<O: SegmentationOracle> OracleSession<O> {
    pub fn new(oracle: O) -> Self {
        Self {
            oracle: Some(Arc::new(oracle)),
            in_flight: Mutex::new(()),
            current: RwLock::new(None),
        }
    }

    /// A session with no model; every request fails with [`OracleError::Unavailable`].
    pub fn unavailable() -> Self {
        Self {
            oracle: None,
            in_flight: Mutex::new(()),
            current: RwLock::new(None),
        }
    }

    pub fn is_available(&self) -> bool {
        self.oracle.is_some()
    }

    /// `true` while a request holds the session.
    pub fn is_busy(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    fn oracle(&self) -> Result<Arc<O>> {
        self.oracle.clone().ok_or(OracleError::Unavailable)
    }

    /// Whether `image_id` differs from the image the cached embedding belongs to.
    pub async fn needs_embedding(&self, image_id: &str) -> bool {
        self.current
            .read()
            .await
            .as_ref()
            .is_none_or(|cached| cached.image_id != image_id)
    }

    /// Image id of the cached embedding, if any.
    pub async fn embedded_image(&self) -> Option<String> {
        self.current.read().await.as_ref().map(|c| c.image_id.clone())
    }

    /// Compute and cache the embedding for a newly active image.
    ///
    /// Does nothing when `image_id` is already embedded.
    pub async fn embed(&self, image_id: &str, image_path: PathBuf, image_size: ImageSize) -> Result<()> {
        let oracle = self.oracle()?;
        let _guard = self.in_flight.try_lock().map_err(|_| OracleError::Busy)?;

        if !self.needs_embedding(image_id).await {
            debug!(image_id, "embedding already cached");
            return Ok(());
        }

        info!(image_id, "computing image embedding");
        let embedding = tokio::task::spawn_blocking(move || oracle.embed(&image_path)).await??;

        *self.current.write().await = Some(CachedEmbedding {
            image_id: image_id.to_string(),
            image_size,
            embedding: Arc::new(embedding),
        });
        Ok(())
    }

    /// Drop the cached embedding, e.g. when the image set changes.
    pub async fn clear(&self) {
        *self.current.write().await = None;
    }

    /// Run the oracle for point prompts on the embedded image.
    pub async fn predict(&self, image_id: &str, points: &[Point]) -> Result<MaskPrediction> {
        self.predict_sized(image_id, points).await.map(|(prediction, _)| prediction)
    }

    async fn predict_sized(&self, image_id: &str, points: &[Point]) -> Result<(MaskPrediction, ImageSize)> {
        let oracle = self.oracle()?;
        if points.is_empty() {
            return Err(OracleError::NoPoints);
        }
        let _guard = self.in_flight.try_lock().map_err(|_| OracleError::Busy)?;

        let (embedding, image_size) = {
            let current = self.current.read().await;
            match current.as_ref() {
                Some(cached) if cached.image_id == image_id => {
                    (Arc::clone(&cached.embedding), cached.image_size)
                }
                _ => return Err(OracleError::NotEmbedded(image_id.to_string())),
            }
        };

        let points = points.to_vec();
        let prediction =
            tokio::task::spawn_blocking(move || oracle.predict(&embedding, &points)).await??;
        Ok((prediction, image_size))
    }

    /// Prompt the oracle and outline the mask as a labelled segment.
    ///
    /// Returns `Ok(None)` when the mask outlines to fewer than 3 vertices.
    pub async fn segment(
        &self,
        image_id: &str,
        points: &[Point],
        label: &str,
        pipeline: &Pipeline,
    ) -> Result<Option<Segment>> {
        let (prediction, image_size) = self.predict_sized(image_id, points).await?;

        let transform = MaskTransform::from_sizes(prediction.mask.size(), image_size);
        let outline = pipeline.extract_from_probabilities(&prediction.mask, &transform);

        let segment = Segment::new(label, outline.polygon, points.to_vec(), Some(prediction.score));
        if segment.is_none() {
            warn!(image_id, "mask produced no usable polygon");
        }
        Ok(segment)
    }
}
