// Groq vision backend
// Scores image batches through the OpenAI-compatible chat completions API.
// One request per batch; the whole batch fails as a unit.

use std::path::PathBuf;

use serde_json::{json, Value};

use crate::constants::{API_KEY_ENV, DEFAULT_VISION_MODEL, GROQ_API_URL};
use crate::error::{CuratorError, Result};

use super::prompt::{BatchScores, SCORING_PROMPT};
use super::thumbnail;
use super::{ImageScore, ScoreSource};

pub struct GroqScorer {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl GroqScorer {
    /// Build a scorer from an explicit key, falling back to the GROQ_API_KEY
    /// environment variable. A missing key is a construction error so the
    /// CLI can exit before any folder work starts.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let api_key = match api_key.or_else(|| std::env::var(API_KEY_ENV).ok()) {
            Some(key) if !key.is_empty() => key,
            _ => return Err(CuratorError::MissingCredential(API_KEY_ENV.to_string())),
        };

        Ok(Self {
            client: reqwest::blocking::Client::new(),
            api_key,
            model: DEFAULT_VISION_MODEL.to_string(),
            api_url: GROQ_API_URL.to_string(),
        })
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    fn build_request(&self, images: &[PathBuf]) -> Result<Value> {
        let mut content = vec![json!({ "type": "text", "text": SCORING_PROMPT })];

        for path in images {
            let encoded = thumbnail::to_base64(path)?;
            content.push(json!({
                "type": "image_url",
                "image_url": { "url": format!("data:image/jpeg;base64,{}", encoded) }
            }));
        }

        Ok(json!({
            "model": self.model,
            "temperature": 0,
            "messages": [{ "role": "user", "content": content }],
        }))
    }
}

impl ScoreSource for GroqScorer {
    fn score_batch(&self, images: &[PathBuf]) -> Result<Vec<ImageScore>> {
        if images.is_empty() {
            return Ok(Vec::new());
        }

        let body = self.build_request(images)?;

        let response = self.client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(CuratorError::Scoring(format!(
                "backend returned {}: {}", status, detail
            )));
        }

        let payload: Value = response.json()?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| CuratorError::Scoring("no message content in response".to_string()))?;

        parse_batch_response(content, images.len())
    }
}

/// Parse the model's JSON answer and enforce the batch contract:
/// exactly one valid score per requested image, in order.
pub fn parse_batch_response(content: &str, expected: usize) -> Result<Vec<ImageScore>> {
    let raw = extract_json(content);
    let batch: BatchScores = serde_json::from_str(raw)
        .map_err(|e| CuratorError::Scoring(format!("unparseable response: {}", e)))?;

    if batch.scores.len() != expected {
        return Err(CuratorError::Scoring(format!(
            "batch mismatch: sent {}, got {}", expected, batch.scores.len()
        )));
    }

    for score in &batch.scores {
        score.validate()?;
    }

    Ok(batch.scores)
}

/// Models occasionally wrap the JSON in markdown fences or prose despite
/// the prompt. Take the outermost object.
fn extract_json(content: &str) -> &str {
    let start = content.find('{');
    let end = content.rfind('}');
    match (start, end) {
        (Some(s), Some(e)) if e >= s => &content[s..=e],
        _ => content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"scores": [
        {"wow_factor": 8, "engagement": 7, "platform_fit": 9, "is_explicit": false, "reasoning": "Strong composition", "watermark_offset_pct": 85.5},
        {"wow_factor": 3, "engagement": 2, "platform_fit": 4, "is_explicit": false, "reasoning": "Blurry"}
    ]}"#;

    #[test]
    fn test_parse_valid_batch() {
        let scores = parse_batch_response(VALID, 2).unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].wow_factor, 8);
        assert_eq!(scores[0].watermark_offset_pct, Some(85.5));
        assert_eq!(scores[1].watermark_offset_pct, None);
    }

    #[test]
    fn test_count_mismatch_fails_the_batch() {
        let err = parse_batch_response(VALID, 3).unwrap_err();
        assert!(err.to_string().contains("batch mismatch"));
    }

    #[test]
    fn test_fenced_response_is_tolerated() {
        let fenced = format!("```json\n{}\n```", VALID);
        let scores = parse_batch_response(&fenced, 2).unwrap();
        assert_eq!(scores.len(), 2);
    }

    #[test]
    fn test_out_of_range_score_is_rejected() {
        let bad = r#"{"scores": [{"wow_factor": 15, "engagement": 7, "platform_fit": 9, "is_explicit": false, "reasoning": "x"}]}"#;
        assert!(parse_batch_response(bad, 1).is_err());
    }

    #[test]
    fn test_prose_response_is_an_error() {
        assert!(parse_batch_response("I cannot score these images.", 1).is_err());
    }

    #[test]
    fn test_empty_key_fails_construction() {
        assert!(GroqScorer::new(Some(String::new())).is_err());
    }
}
