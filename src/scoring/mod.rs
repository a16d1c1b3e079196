// Scoring module
// Vision-model evaluation of candidate images

pub mod backend;
pub mod prompt;
pub mod thumbnail;

use std::path::PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::{CuratorError, Result};

/// Structured evaluation of a single image from the vision model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageScore {
    /// Visual appeal (0-10)
    pub wow_factor: u8,
    /// Potential to stop scrolling (0-10)
    pub engagement: u8,
    /// Suitability for the target platform (0-10)
    pub platform_fit: u8,
    /// True if NSFW/banned content
    pub is_explicit: bool,
    /// Brief explanation of the score
    pub reasoning: String,
    /// Vertical position of a detected watermark, percent from top (0-100)
    #[serde(default)]
    pub watermark_offset_pct: Option<f64>,
}

impl ImageScore {
    /// Mean of the three sub-scores. Explicit content is forced to 0.0
    /// regardless of sub-scores so it can never qualify for selection.
    pub fn combined(&self) -> f64 {
        if self.is_explicit {
            return 0.0;
        }
        (self.wow_factor as f64 + self.engagement as f64 + self.platform_fit as f64) / 3.0
    }

    /// Backend responses are untrusted input: reject out-of-range values.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("wow_factor", self.wow_factor),
            ("engagement", self.engagement),
            ("platform_fit", self.platform_fit),
        ] {
            if value > 10 {
                return Err(CuratorError::InvalidScore(format!(
                    "{} out of range: {}", name, value
                )));
            }
        }
        if let Some(pct) = self.watermark_offset_pct {
            if !(0.0..=100.0).contains(&pct) {
                return Err(CuratorError::InvalidScore(format!(
                    "watermark_offset_pct out of range: {}", pct
                )));
            }
        }
        Ok(())
    }
}

/// Narrow interface to the scoring backend: score a batch of images,
/// returning one score per image in the same order, or fail as a unit.
pub trait ScoreSource {
    fn score_batch(&self, images: &[PathBuf]) -> Result<Vec<ImageScore>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(wow: u8, engagement: u8, fit: u8, explicit: bool) -> ImageScore {
        ImageScore {
            wow_factor: wow,
            engagement,
            platform_fit: fit,
            is_explicit: explicit,
            reasoning: "test".to_string(),
            watermark_offset_pct: None,
        }
    }

    #[test]
    fn test_combined_is_mean_of_subscores() {
        assert!((score(9, 8, 7, false).combined() - 8.0).abs() < 1e-9);
        assert!((score(0, 0, 0, false).combined()).abs() < 1e-9);
    }

    #[test]
    fn test_explicit_forces_combined_to_zero() {
        // Even perfect sub-scores collapse to 0.0 when explicit
        assert_eq!(score(10, 10, 10, true).combined(), 0.0);
    }

    #[test]
    fn test_validate_rejects_out_of_range_subscores() {
        assert!(score(10, 10, 10, false).validate().is_ok());
        assert!(score(11, 5, 5, false).validate().is_err());
    }

    #[test]
    fn test_validate_watermark_offset_bounds() {
        let mut s = score(5, 5, 5, false);
        s.watermark_offset_pct = Some(0.0);
        assert!(s.validate().is_ok());
        s.watermark_offset_pct = Some(100.0);
        assert!(s.validate().is_ok());
        s.watermark_offset_pct = Some(100.1);
        assert!(s.validate().is_err());
        s.watermark_offset_pct = Some(-1.0);
        assert!(s.validate().is_err());
    }
}
