use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::{Client, Response};
use reqwest::header::ACCEPT;
use serde::Serialize;

use crate::catalog::VoiceCatalog;
use crate::error::AppError;

const VOICES_PATH: &str = "/available-voices";
const GENERATE_PATH: &str = "/generate-audio";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Body of `POST /generate-audio`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateRequest {
    pub text_prompt: String,
    pub language: String,
    pub voice_name: String,
}

/// The remote side of the form: voice catalog and speech synthesis.
pub trait SpeechBackend: Send + Sync {
    fn available_voices(&self) -> Result<VoiceCatalog, AppError>;

    /// Returns the raw audio payload exactly as the server sent it.
    fn generate_audio(&self, request: &GenerateRequest) -> Result<Vec<u8>, AppError>;
}

#[derive(Clone)]
pub struct VoiceApiClient {
    http: Client,
    base_url: String,
}

impl VoiceApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(AppError::MissingApiBase);
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to initialise HTTP client")
            .map_err(AppError::from)?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl SpeechBackend for VoiceApiClient {
    fn available_voices(&self) -> Result<VoiceCatalog, AppError> {
        let url = self.endpoint(VOICES_PATH);
        log::debug!("GET {url}");
        let response = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .context("Failed sending voice catalog request")
            .map_err(AppError::from)?;
        let response = ensure_success(response)?;
        response
            .json::<VoiceCatalog>()
            .context("Failed decoding voice catalog")
            .map_err(AppError::from)
    }

    fn generate_audio(&self, request: &GenerateRequest) -> Result<Vec<u8>, AppError> {
        let url = self.endpoint(GENERATE_PATH);
        log::debug!(
            "POST {url} (language={}, voice={}, {} chars)",
            request.language,
            request.voice_name,
            request.text_prompt.chars().count()
        );
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .context("Failed sending audio generation request")
            .map_err(AppError::from)?;
        let response = ensure_success(response)?;
        response
            .bytes()
            .map(|b| b.to_vec())
            .context("Failed reading audio payload")
            .map_err(AppError::from)
    }
}

fn ensure_success(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let body = if body.trim().is_empty() {
        "<empty body>".to_string()
    } else {
        body
    };
    Err(AppError::Status { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // The blocking client owns its own runtime, so it has to live off the test runtime.
    async fn call<T, F>(base: String, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&VoiceApiClient) -> Result<T, AppError> + Send + 'static,
    {
        tokio::task::spawn_blocking(move || {
            let client = VoiceApiClient::new(base, Duration::from_secs(5))?;
            f(&client)
        })
        .await
        .unwrap()
    }

    #[test]
    fn normalises_base_url() {
        let client = VoiceApiClient::new(" http://tts.local:8000/ ", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.base_url(), "http://tts.local:8000");
        assert_eq!(
            client.endpoint(GENERATE_PATH),
            "http://tts.local:8000/generate-audio"
        );
    }

    #[test]
    fn empty_base_url_is_rejected() {
        assert!(matches!(
            VoiceApiClient::new("  ", DEFAULT_TIMEOUT),
            Err(AppError::MissingApiBase)
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fetches_catalog() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/available-voices"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(
                    r#"{"en": ["v1", "v2"], "fr": ["v3"]}"#,
                    "application/json",
                ),
            )
            .expect(1)
            .mount(&server)
            .await;

        let catalog = call(server.uri(), |c| c.available_voices()).await.unwrap();
        assert_eq!(catalog.first_language(), Some("en"));
        assert_eq!(catalog.voices("en"), ["v1", "v2"]);
        assert_eq!(catalog.voices("fr"), ["v3"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_catalog_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/available-voices"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let result = call(server.uri(), |c| c.available_voices()).await;
        assert!(matches!(result, Err(AppError::Message(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn posts_selection_and_returns_raw_bytes() {
        let server = MockServer::start().await;
        let payload = b"RIFF\x00\x00\x00\x00WAVEdata".to_vec();
        Mock::given(method("POST"))
            .and(path("/generate-audio"))
            .and(body_json(json!({
                "text_prompt": "hello there",
                "language": "en",
                "voice_name": "v2",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(payload.clone(), "audio/wav"))
            .expect(1)
            .mount(&server)
            .await;

        let request = GenerateRequest {
            text_prompt: "hello there".into(),
            language: "en".into(),
            voice_name: "v2".into(),
        };
        let audio = call(server.uri(), move |c| c.generate_audio(&request))
            .await
            .unwrap();
        assert_eq!(audio, payload);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate-audio"))
            .respond_with(ResponseTemplate::new(422).set_body_string("unknown voice"))
            .mount(&server)
            .await;

        let request = GenerateRequest {
            text_prompt: "x".into(),
            language: "en".into(),
            voice_name: "nope".into(),
        };
        match call(server.uri(), move |c| c.generate_audio(&request)).await {
            Err(AppError::Status { status, body }) => {
                assert_eq!(status.as_u16(), 422);
                assert_eq!(body, "unknown voice");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }
}
