//! Estimator backend collaborator
//!
//! The backend owns every piece of document logic: it parses uploaded PDFs,
//! extracts the outline and converts page coordinates into measurements.
//! This module defines the wire types, the [`Backend`] seam and the worker
//! service that keeps HTTP off the UI thread.

mod http;
mod request;
mod service;

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

pub use http::HttpBackend;
pub use request::{BackendRequest, BackendResponse, RequestId, RequestKind};
pub use service::{BackendService, DEFAULT_BACKEND_WORKERS};

/// Default backend location used when no configuration overrides it
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Body of `POST /measure`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasureRequest {
    pub page_num: u32,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Response of `POST /measure`, in backend-defined units
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementResult {
    pub width: f64,
    pub height: f64,
    pub diagonal: f64,
}

/// Response of `GET /dimensions/{page_num}`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageDimensions {
    pub width: f64,
    pub height: f64,
}

/// One row of the table of contents returned by the backend.
///
/// Nesting is expressed only through `level`; there is no parent/child model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub title: String,
    #[serde(deserialize_with = "lenient_u32")]
    pub page: u32,
    #[serde(deserialize_with = "lenient_u32")]
    pub level: u32,
}

/// Accepts `1` as well as `"1"`: the reference backend serialises outline
/// numbers as strings.
fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u32),
        Text(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s.trim().parse::<u32>().map_err(|_| {
            serde::de::Error::custom(format!("expected a non-negative integer, got {s:?}"))
        }),
    }
}

/// Failure of a single backend call
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("malformed backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Operations the client needs from the estimator backend.
///
/// Implementations are called from worker threads and may block.
pub trait Backend: Send + Sync {
    /// `POST /upload` with the document as multipart field `file`
    fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<(), BackendError>;

    /// `GET /table-of-contents`
    fn table_of_contents(&self) -> Result<Vec<OutlineEntry>, BackendError>;

    /// `POST /measure`
    fn measure(&self, request: &MeasureRequest) -> Result<MeasurementResult, BackendError>;

    /// `GET /dimensions/{page_num}`
    fn page_dimensions(&self, page_num: u32) -> Result<PageDimensions, BackendError>;
}
