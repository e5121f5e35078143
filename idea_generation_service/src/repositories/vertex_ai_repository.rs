use common::helper::error_chain_fmt;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use crate::configuration::VertexAiSettings;

/// Calls the Vertex AI `generateContent` endpoint with a bearer token.
#[derive(Clone)]
pub struct VertexAiRepository {
    http_client: reqwest::Client,
    settings: VertexAiSettings,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_p: f64,
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl VertexAiRepository {
    pub fn new(http_client: reqwest::Client, settings: VertexAiSettings) -> Self {
        Self {
            http_client,
            settings,
        }
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn endpoint(&self, project_id: &str) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            self.settings.api_base(),
            project_id,
            self.settings.region,
            self.settings.model
        )
    }

    /// Sends the prompt and returns the text of the first candidate.
    ///
    /// Generation parameters are fixed: `temperature=0.8`, `topP=0.95`, JSON
    /// output requested. A safety block is reported as its own error carrying
    /// the upstream reason.
    #[tracing::instrument(name = "Call Vertex AI generateContent", skip(self, access_token, prompt))]
    pub async fn generate_content(
        &self,
        project_id: &str,
        access_token: &Secret<String>,
        prompt: &str,
    ) -> Result<String, VertexAiRepositoryError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.8,
                top_p: 0.95,
                response_mime_type: "application/json",
            },
        };

        let response = self
            .http_client
            .post(self.endpoint(project_id))
            .bearer_auth(access_token.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unavailable>".to_string());
            return Err(VertexAiRepositoryError::ApiError { status, body });
        }

        let payload = response.json::<GenerateContentResponse>().await?;

        // A blocked prompt comes back with no candidates and a block reason.
        if let Some(reason) = payload
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.clone())
        {
            return Err(VertexAiRepositoryError::SafetyBlocked(reason));
        }

        let candidate = payload
            .candidates
            .into_iter()
            .next()
            .ok_or(VertexAiRepositoryError::NoCandidates)?;

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(VertexAiRepositoryError::SafetyBlocked("SAFETY".to_string()));
        }

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(VertexAiRepositoryError::MissingContent);
        }

        Ok(text)
    }
}

#[derive(thiserror::Error)]
pub enum VertexAiRepositoryError {
    #[error("Vertex AI request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Vertex AI returned {status}: {body}")]
    ApiError {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Vertex AI blocked the request for safety reasons: {0}")]
    SafetyBlocked(String),
    #[error("Vertex AI returned no candidates")]
    NoCandidates,
    #[error("Vertex AI candidate contained no text")]
    MissingContent,
}

impl std::fmt::Debug for VertexAiRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
