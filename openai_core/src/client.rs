use async_trait::async_trait;
use base64::Engine;
use futures::StreamExt;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use tts_core::{BackendError, RequestShape, SpeechBackend, SpeechPayload, SpeechRequest};

use crate::credentials::ApiKey;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Error envelope returned by the API on non-2xx responses
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    param: Option<String>,
}

/// JSON body some deployments return instead of raw audio
#[derive(Deserialize)]
struct AudioEnvelope {
    #[serde(default, alias = "audio")]
    data: Option<String>,
}

/// Speech backend for `POST /audio/speech`.
#[derive(Clone)]
pub struct OpenAiSpeechClient {
    api_key: ApiKey,
    client: Client,
    base_url: String,
}

impl OpenAiSpeechClient {
    pub fn new(api_key: ApiKey) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: ApiKey, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/audio/speech", self.base_url)
    }
}

impl std::fmt::Debug for OpenAiSpeechClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiSpeechClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key)
            .finish()
    }
}

/// JSON body for one request shape.
pub fn request_body(request: &SpeechRequest, shape: RequestShape) -> Value {
    let mut body = json!({
        "model": request.model,
        "voice": request.voice.as_str(),
        "input": request.input,
    });
    body[shape.field_name()] = Value::String(request.encoding().to_string());
    body
}

/// Map a non-success response onto a [`BackendError`].
///
/// A 400/422 that names the encoding parameter, or complains about an
/// argument it does not recognize, is a shape rejection.
pub fn classify_error(status: StatusCode, body: &str, shape: RequestShape) -> BackendError {
    let (message, param) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => (env.error.message, env.error.param),
        Err(_) => (body.trim().to_string(), None),
    };
    let field = shape.field_name();

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY
            if param.as_deref() == Some(field) || mentions_unknown_argument(&message, field) =>
        {
            BackendError::ShapeRejected { field, message }
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => BackendError::Quota(message),
        _ => BackendError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

fn mentions_unknown_argument(message: &str, field: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    let unknown = lower.contains("unrecognized request argument")
        || lower.contains("unexpected keyword")
        || lower.contains("extra inputs are not permitted")
        || lower.contains("unknown parameter");
    unknown && lower.contains(field)
}

fn decode_envelope(body: &[u8]) -> Result<Vec<u8>, BackendError> {
    let envelope: AudioEnvelope =
        serde_json::from_slice(body).map_err(|e| BackendError::Decode(e.to_string()))?;
    match envelope.data {
        Some(data) => base64::engine::general_purpose::STANDARD
            .decode(data.trim())
            .map_err(|e| BackendError::Decode(format!("audio is not valid base64: {e}"))),
        None => Ok(Vec::new()),
    }
}

fn is_json(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false)
}

#[async_trait]
impl SpeechBackend for OpenAiSpeechClient {
    async fn speak(
        &self,
        request: &SpeechRequest,
        shape: RequestShape,
    ) -> Result<SpeechPayload, BackendError> {
        debug!(
            "POST {} voice={} model={} chars={} shape={}",
            self.endpoint(),
            request.voice,
            request.model,
            request.input.chars().count(),
            shape.field_name()
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.api_key.expose())
            .json(&request_body(request, shape))
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &body, shape));
        }

        if is_json(&response) {
            let body = response
                .bytes()
                .await
                .map_err(|e| BackendError::Transport(e.to_string()))?;
            return decode_envelope(&body).map(SpeechPayload::Bytes);
        }

        let stream = response
            .bytes_stream()
            .map(|part| part.map_err(|e| BackendError::Transport(e.to_string())));
        Ok(SpeechPayload::Stream(stream.boxed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tts_core::Voice;

    fn request() -> SpeechRequest {
        SpeechRequest::new("gpt-4o-mini-tts", Voice::Verse, "Hello")
    }

    #[test]
    fn test_request_body_per_shape() {
        let body = request_body(&request(), RequestShape::ResponseFormat);
        assert_eq!(body["response_format"], "mp3");
        assert!(body.get("format").is_none());
        assert_eq!(body["voice"], "verse");
        assert_eq!(body["model"], "gpt-4o-mini-tts");
        assert_eq!(body["input"], "Hello");

        let body = request_body(&request(), RequestShape::Format);
        assert_eq!(body["format"], "mp3");
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_classify_shape_rejection_by_param() {
        let body = r#"{"error":{"message":"Invalid value","type":"invalid_request_error","param":"format"}}"#;
        let err = classify_error(StatusCode::BAD_REQUEST, body, RequestShape::Format);
        assert!(err.is_shape_rejection());
    }

    #[test]
    fn test_classify_shape_rejection_by_message() {
        let body = r#"{"error":{"message":"Unrecognized request argument supplied: format"}}"#;
        let err = classify_error(StatusCode::BAD_REQUEST, body, RequestShape::Format);
        assert_eq!(
            err,
            BackendError::ShapeRejected {
                field: "format",
                message: "Unrecognized request argument supplied: format".into()
            }
        );
    }

    #[test]
    fn test_other_bad_request_is_not_shape_rejection() {
        let body = r#"{"error":{"message":"Input too long","param":"input"}}"#;
        let err = classify_error(StatusCode::BAD_REQUEST, body, RequestShape::ResponseFormat);
        assert_eq!(
            err,
            BackendError::Api {
                status: 400,
                message: "Input too long".into()
            }
        );
    }

    #[test]
    fn test_classify_auth_quota_and_plain_text() {
        let auth = classify_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"Incorrect API key"}}"#,
            RequestShape::ResponseFormat,
        );
        assert_eq!(auth, BackendError::Auth("Incorrect API key".into()));

        let quota = classify_error(StatusCode::TOO_MANY_REQUESTS, "slow down", RequestShape::Format);
        assert_eq!(quota, BackendError::Quota("slow down".into()));

        let other = classify_error(StatusCode::BAD_GATEWAY, "<html>", RequestShape::Format);
        assert!(matches!(other, BackendError::Api { status: 502, .. }));
    }

    #[test]
    fn test_decode_envelope() {
        assert_eq!(decode_envelope(br#"{"data":"SUQz"}"#).unwrap(), b"ID3");
        assert_eq!(decode_envelope(br#"{"audio":"SUQz"}"#).unwrap(), b"ID3");
        assert!(decode_envelope(br#"{}"#).unwrap().is_empty());
        assert!(matches!(
            decode_envelope(br#"{"data":"***"}"#),
            Err(BackendError::Decode(_))
        ));
        assert!(matches!(decode_envelope(b"not json"), Err(BackendError::Decode(_))));
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let key = ApiKey::new("k", crate::credentials::KeySource::Environment);
        let client = OpenAiSpeechClient::with_base_url(key, "http://localhost:9000/v1/");
        assert_eq!(client.endpoint(), "http://localhost:9000/v1/audio/speech");
    }
}
