//! Vibe classification over aggregated review text.
//!
//! One LLM call per cell is a hard cost-control constraint, not an
//! optimization. The model is asked for bare JSON, but the parser
//! tolerates prose and code fences around it; malformed output degrades
//! to a null score set and never aborts the cell.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::warn;

use llm_client::LlmClient;
use vibemap_common::VIBE_DIMENSIONS;

use crate::limiter::RateLimiter;
use crate::retry::RetryPolicy;
use crate::traits::{DimensionScores, VibeScorer};

const SYSTEM_PROMPT: &str = r#"You score the "vibe" of a small city block from visitor reviews of its venues.

Score each dimension from 0.0 (not at all) to 1.0 (strongly), based only on the review text:

- lively: energy, bustle, crowds, nightlife
- social: conversation, groups, meeting people
- cozy: intimate, warm, comfortable, quiet charm
- classy: upscale, refined, polished service
- artsy: creative, indie, cultural, design-forward
- family_friendly: welcoming to children and families

Respond with a single JSON object mapping each dimension name to a number, nothing else:
{"lively": 0.0, "social": 0.0, "cozy": 0.0, "classy": 0.0, "artsy": 0.0, "family_friendly": 0.0}

If the reviews carry no signal for a dimension, omit that key."#;

/// How much raw output to log when no JSON object can be found.
const RAW_LOG_PREFIX: usize = 200;

pub struct VibeClassifier {
    llm: LlmClient,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl VibeClassifier {
    pub fn new(llm: LlmClient, rate_per_sec: f64, retry: RetryPolicy) -> Self {
        Self {
            llm,
            limiter: RateLimiter::new(rate_per_sec),
            retry,
        }
    }
}

#[async_trait]
impl VibeScorer for VibeClassifier {
    async fn score_vibes(&self, text: &str) -> Result<DimensionScores> {
        let raw = self
            .retry
            .run(
                || async {
                    self.limiter.acquire().await;
                    self.llm.complete(SYSTEM_PROMPT, text).await
                },
                llm_client::LlmError::is_retryable,
                |attempt, err| warn!(attempt, error = %err, "Classifier call failed, retrying"),
            )
            .await
            .context("vibe classification call")?;

        Ok(parse_scores(&raw))
    }

    fn model(&self) -> &str {
        self.llm.model()
    }
}

/// Parse classifier output into per-dimension scores. Never fails:
/// anything unusable leaves the affected dimensions null.
pub fn parse_scores(raw: &str) -> DimensionScores {
    let mut scores: DimensionScores = VIBE_DIMENSIONS
        .iter()
        .map(|d| (d.to_string(), None))
        .collect();

    let Some(object) = first_json_object(raw) else {
        let prefix: String = raw.chars().take(RAW_LOG_PREFIX).collect();
        warn!(raw_prefix = %prefix, "No JSON object in classifier output");
        return scores;
    };

    let parsed: serde_json::Value = match serde_json::from_str(object) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "Classifier JSON failed to parse");
            return scores;
        }
    };

    let Some(map) = parsed.as_object() else {
        return scores;
    };

    for dim in VIBE_DIMENSIONS {
        // Accept only numeric values inside [0,1]; everything else
        // (missing, out of range, strings) stays null.
        let value = map
            .get(*dim)
            .and_then(|v| v.as_f64())
            .filter(|v| (0.0..=1.0).contains(v))
            .map(round2);
        scores.insert(dim.to_string(), value);
    }

    scores
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// First balanced `{...}` substring, respecting JSON strings and
/// escapes. The model sometimes wraps its answer in prose or fences.
fn first_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
