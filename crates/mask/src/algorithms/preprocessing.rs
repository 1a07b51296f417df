use crate::{
    traits::MaskBinarizer,
    types::{BinaryMask, ProbabilityMask},
};

/// Foreground where the score is strictly above `threshold`.
///
/// Oracle masks are logits, so the default cut is 0.0 rather than 0.5.
#[derive(Debug, Clone)]
pub struct ThresholdBinarizer {
    pub threshold: f32,
}

impl Default for ThresholdBinarizer {
    fn default() -> Self {
        Self { threshold: 0.0 }
    }
}

impl MaskBinarizer for ThresholdBinarizer {
    fn binarize(&self, mask: &ProbabilityMask) -> BinaryMask {
        let mut binary = BinaryMask::new(mask.width(), mask.height());
        let width = mask.width().max(1) as usize;
        for (i, &value) in mask.values().iter().enumerate() {
            if value > self.threshold {
                binary.set((i % width) as u32, (i / width) as u32, true);
            }
        }
        binary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold_splits_logits_at_zero() {
        let scores = ProbabilityMask::new(2, 2, vec![-3.5, 0.0, 0.01, 7.0]).unwrap();
        let binary = ThresholdBinarizer::default().binarize(&scores);

        assert!(!binary.is_foreground(0, 0));
        assert!(!binary.is_foreground(1, 0));
        assert!(binary.is_foreground(0, 1));
        assert!(binary.is_foreground(1, 1));
    }

    #[test]
    fn test_custom_threshold() {
        let scores = ProbabilityMask::new(3, 1, vec![0.2, 0.5, 0.9]).unwrap();
        let binary = ThresholdBinarizer { threshold: 0.5 }.binarize(&scores);
        assert_eq!(binary.foreground_count(), 1);
    }
}
