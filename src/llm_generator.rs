use crate::environment::Session;
use crate::http_client::{HttpClient, HttpResponse};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1/models/gemini-1.5-flash:generateContent";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const TEMPERATURE: f64 = 0.1;
const MAX_OUTPUT_TOKENS: u32 = 100;

/// Why a generation attempt produced no candidate text.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error: {status} - {body}")]
    Service { status: u16, body: String },
    #[error("The service returned no usable candidate")]
    EmptyResponse,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[async_trait]
pub trait CommandGenerator: Send + Sync {
    /// Sends `prompt` to the service and returns the raw candidate text.
    async fn generate(&self, session: &Session, prompt: &str) -> Result<String, GenerationError>;
}

/// Generator backed by the Gemini `generateContent` endpoint.
pub struct GeminiGenerator {
    client: Box<dyn HttpClient>,
    endpoint: String,
    timeout: Duration,
}

impl GeminiGenerator {
    pub fn new(client: Box<dyn HttpClient>) -> Self {
        Self {
            client,
            endpoint: GEMINI_ENDPOINT.to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request_body(prompt: &str) -> serde_json::Value {
        json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "maxOutputTokens": MAX_OUTPUT_TOKENS
            }
        })
    }

    fn extract_text(response: HttpResponse) -> Result<String, GenerationError> {
        if !response.is_success() {
            warn!("Generation service returned status {}", response.status);
            return Err(GenerationError::Service {
                status: response.status,
                body: response.body,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&response.body).map_err(|e| {
            warn!("Failed to parse generation response: {}", e);
            GenerationError::EmptyResponse
        })?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or(GenerationError::EmptyResponse)
    }
}

#[async_trait]
impl CommandGenerator for GeminiGenerator {
    async fn generate(&self, session: &Session, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}?key={}", self.endpoint, session.credential().expose());
        let body = Self::request_body(prompt);
        let headers = [("Content-Type", "application/json")];

        info!("Requesting command from {}", self.endpoint);
        let call = self.client.post_json(&url, &headers, &body);
        let response = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(GenerationError::Network(session.credential().redact(&e.to_string())));
            }
            Err(_) => {
                return Err(GenerationError::Network(format!(
                    "request timed out after {}s",
                    self.timeout.as_secs_f32()
                )));
            }
        };
        debug!("Generation service answered with status {}", response.status);

        Self::extract_text(response)
    }
}

/// Offline generator for demos and tests (`use_mock` / `NLSH_USE_MOCK`).
///
/// Matches a few keywords in the user request and answers the way the real
/// service usually does, backticks included.
pub struct MockGenerator;

impl MockGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn mock_reply(&self, session: &Session, prompt: &str) -> String {
        let request = prompt
            .rsplit_once("User request: ")
            .map(|(_, query)| query)
            .unwrap_or(prompt)
            .trim();
        let lower = request.to_lowercase();
        let windows = session.os_family().is_windows();

        match lower.as_str() {
            q if q.contains("list") && q.contains("file") => {
                let command = if windows { "Get-ChildItem" } else { "ls -la" };
                command.to_string()
            }
            q if q.contains("current directory") => {
                let command = if windows { "Get-Location" } else { "pwd" };
                command.to_string()
            }
            q if q.contains("marker") => {
                if windows {
                    "`New-Item -ItemType File nlsh-marker`".to_string()
                } else {
                    "`touch nlsh-marker`".to_string()
                }
            }
            q if q.contains("fail") => "exit 3".to_string(),
            q if q.contains("nothing") => "```\n```".to_string(),
            _ => format!("`echo '{}'`", request.replace('\'', "")),
        }
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandGenerator for MockGenerator {
    async fn generate(&self, session: &Session, prompt: &str) -> Result<String, GenerationError> {
        info!("Using mock generator");
        Ok(self.mock_reply(session, prompt))
    }
}
