// Scoring prompt and response shape for the vision backend

use serde::Deserialize;

use super::ImageScore;

/// System prompt sent ahead of every image batch. The model must answer
/// with strict JSON matching BatchScores, one entry per image, in order.
pub const SCORING_PROMPT: &str = r#"You are a content curator for short-form vertical video.
Evaluate EVERY attached image independently, in the order attached.

For each image, score:
- wow_factor (0-10): visual appeal and production quality
- engagement (0-10): potential to stop a viewer from scrolling
- platform_fit (0-10): suitability for short-form vertical video
- is_explicit (boolean): true if the image contains nudity, sexual content,
  or anything that would be banned on a mainstream platform
- reasoning: one short sentence explaining the scores
- watermark_offset_pct: if a watermark or username overlay is visible, its
  vertical position as a percent from the top (0-100); otherwise null

Respond with ONLY a JSON object, no prose and no markdown fences:
{"scores": [{"wow_factor": 8, "engagement": 7, "platform_fit": 9, "is_explicit": false, "reasoning": "...", "watermark_offset_pct": null}, ...]}

The "scores" array MUST contain exactly one entry per attached image, in the
same order the images were attached."#;

/// Expected response payload
#[derive(Debug, Deserialize)]
pub struct BatchScores {
    pub scores: Vec<ImageScore>,
}
