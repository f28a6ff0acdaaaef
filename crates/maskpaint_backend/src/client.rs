//! Backend trait and its blocking HTTP implementation.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::api::{
    CheckModelResponse, GenerateRequest, GenerateResponse, LoadModelsRequest,
    LoadModelsResponse, MaskInfoRequest, MaskInfoResponse, ModelSource,
};
use crate::error::{BackendError, Result};
use crate::multipart::MultipartBody;

/// The operations the generation backend offers.
///
/// Implementations return `Err(BackendError::Rejected)` when the backend
/// answers with `success: false`, so an `Ok` always carries a successful
/// response.
pub trait Backend {
    fn load_models(&self, request: &LoadModelsRequest) -> Result<LoadModelsResponse>;
    fn check_model(&self) -> Result<CheckModelResponse>;
    fn calculate_mask_info(&self, request: &MaskInfoRequest) -> Result<MaskInfoResponse>;
    fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse>;
}

/// Error body shape shared by all endpoints.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Blocking HTTP client for the backend.
pub struct HttpBackend {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpBackend {
    /// Generation can take minutes, so reads get a generous timeout.
    const READ_TIMEOUT: Duration = Duration::from_secs(30 * 60);
    const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(base_url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Self::CONNECT_TIMEOUT)
            .timeout_read(Self::READ_TIMEOUT)
            .build();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/api/{}", self.base_url, endpoint)
    }

    fn post_json<B: serde::Serialize, T: DeserializeOwned>(&self, endpoint: &str, body: &B) -> Result<T> {
        let url = self.url(endpoint);
        log::debug!("POST {}", url);
        read_response(self.agent.post(&url).send_json(body))
    }
}

impl Backend for HttpBackend {
    fn load_models(&self, request: &LoadModelsRequest) -> Result<LoadModelsResponse> {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let mut form = MultipartBody::new(format!("maskpaint-{:x}", nanos));

        for (prefix, source) in request.fields() {
            match source {
                Some(ModelSource::Path(path)) => form.text(&format!("{}_path", prefix), path),
                Some(ModelSource::File(path)) => {
                    let contents = std::fs::read(path)?;
                    log::info!("Uploading {:?} ({} bytes) as {}_file", path, contents.len(), prefix);
                    form.file(&format!("{}_file", prefix), path, &contents);
                }
                None => {}
            }
        }

        let url = self.url("load_models");
        log::debug!("POST {} (multipart)", url);
        let content_type = form.content_type();
        let response: LoadModelsResponse = read_response(
            self.agent
                .post(&url)
                .set("Content-Type", &content_type)
                .send_bytes(&form.finish()),
        )?;
        ensure_success(response.success, &response.message)?;
        Ok(response)
    }

    fn check_model(&self) -> Result<CheckModelResponse> {
        let url = self.url("check_model");
        log::debug!("GET {}", url);
        read_response(self.agent.get(&url).call())
    }

    fn calculate_mask_info(&self, request: &MaskInfoRequest) -> Result<MaskInfoResponse> {
        let response: MaskInfoResponse = self.post_json("calculate_mask_info", request)?;
        ensure_success(response.success, &response.message)?;
        Ok(response)
    }

    fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let response: GenerateResponse = self.post_json("generate", request)?;
        ensure_success(response.success, &response.message)?;
        log::info!(
            "Backend generated {} image(s) into {}",
            response.images.len(),
            response.output_dir
        );
        Ok(response)
    }
}

fn ensure_success(success: bool, message: &str) -> Result<()> {
    if success {
        Ok(())
    } else {
        Err(BackendError::Rejected(message.to_string()))
    }
}

fn read_response<T: DeserializeOwned>(
    result: std::result::Result<ureq::Response, ureq::Error>,
) -> Result<T> {
    match result {
        Ok(response) => {
            let text = response.into_string()?;
            Ok(serde_json::from_str(&text)?)
        }
        // Error statuses still carry the JSON `{success, message}` body.
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            match serde_json::from_str::<ErrorBody>(&body) {
                Ok(err) if !err.message.is_empty() => Err(BackendError::Rejected(err.message)),
                _ => Err(BackendError::Status { status, body }),
            }
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let backend = HttpBackend::new("http://localhost:5000/");
        assert_eq!(backend.base_url(), "http://localhost:5000");
        assert_eq!(backend.url("generate"), "http://localhost:5000/api/generate");
    }

    #[test]
    fn test_ensure_success() {
        assert!(ensure_success(true, "").is_ok());
        match ensure_success(false, "no model") {
            Err(BackendError::Rejected(msg)) => assert_eq!(msg, "no model"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
