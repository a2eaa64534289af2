use crate::styles::CoachingStyle;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Classified failure of a single synthesis request.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("network error: {0}")]
    Network(String),
    #[error("synthesis service returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("no voice configured for the requested style")]
    InvalidStyle,
    #[error("synthesis service returned an empty audio body")]
    EmptyResponse,
}

impl SynthesisError {
    /// Configuration errors are not worth retrying; transient
    /// network/service errors are.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SynthesisError::InvalidStyle)
    }
}

/// One network call: text + style in, raw audio bytes out. No retry logic
/// lives here; the orchestrator owns the retry policy so this stays a
/// single-shot primitive that can be swapped for a fake in tests.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, style: CoachingStyle)
        -> Result<Vec<u8>, SynthesisError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSettingsBody {
    stability: f32,
    similarity_boost: f32,
    style: f32,
    speaker_boost: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeBody<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettingsBody,
}

/// HTTP client for the remote voice service.
pub struct RemoteSynthesizer {
    client: reqwest::Client,
    base_url: String,
    model_id: String,
    api_key: String,
}

impl RemoteSynthesizer {
    pub fn new(base_url: &str, model_id: &str, api_key: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model_id: model_id.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl Synthesizer for RemoteSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        style: CoachingStyle,
    ) -> Result<Vec<u8>, SynthesisError> {
        let profile = style.profile();
        if profile.voice_id.is_empty() {
            return Err(SynthesisError::InvalidStyle);
        }

        let body = SynthesizeBody {
            text,
            model_id: &self.model_id,
            voice_settings: VoiceSettingsBody {
                stability: profile.stability,
                similarity_boost: profile.similarity,
                style: profile.expressiveness,
                speaker_boost: profile.speaker_boost,
            },
        };

        let url = format!("{}/synthesize/{}", self.base_url, profile.voice_id);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SynthesisError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Network(e.to_string()))?;

        if bytes.is_empty() {
            return Err(SynthesisError::EmptyResponse);
        }

        Ok(bytes.to_vec())
    }
}
