//! reqwest implementation of [`Backend`]

use std::time::Duration;

use log::debug;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;

use super::{
    Backend, BackendError, MeasureRequest, MeasurementResult, OutlineEntry, PageDimensions,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_DETAIL_CHARS: usize = 200;

/// Talks to the estimator backend over plain HTTP/JSON
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .user_agent(concat!("estimator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Backend for HttpBackend {
    fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<(), BackendError> {
        debug!("Uploading {file_name} ({} bytes)", bytes.len());
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = Form::new().part("file", part);

        let response = self.client.post(self.url("/upload")).multipart(form).send()?;
        check_status(response)?;
        Ok(())
    }

    fn table_of_contents(&self) -> Result<Vec<OutlineEntry>, BackendError> {
        let response = self.client.get(self.url("/table-of-contents")).send()?;
        decode(check_status(response)?)
    }

    fn measure(&self, request: &MeasureRequest) -> Result<MeasurementResult, BackendError> {
        debug!("Measuring {request:?}");
        let response = self
            .client
            .post(self.url("/measure"))
            .json(request)
            .send()?;
        decode(check_status(response)?)
    }

    fn page_dimensions(&self, page_num: u32) -> Result<PageDimensions, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("/dimensions/{page_num}")))
            .send()?;
        decode(check_status(response)?)
    }
}

fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        detail: error_detail(&body),
    })
}

fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let body = response.text()?;
    Ok(serde_json::from_str(&body)?)
}

/// Pulls the human readable part out of an error body.
///
/// FastAPI reports errors as `{"detail": ...}`; anything else is passed
/// through, shortened.
pub(crate) fn error_detail(body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        match map.get("detail") {
            Some(serde_json::Value::String(detail)) => return detail.clone(),
            Some(other) => return other.to_string(),
            None => {}
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    let mut detail: String = trimmed.chars().take(MAX_DETAIL_CHARS).collect();
    if trimmed.chars().count() > MAX_DETAIL_CHARS {
        detail.push('…');
    }
    detail
}
