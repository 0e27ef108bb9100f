//! Backend request and response types

use std::path::PathBuf;

use super::{BackendError, MeasureRequest, MeasurementResult, OutlineEntry, PageDimensions};

/// Unique, monotonically increasing identifier for backend requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// The four backend operations, used to group requests for ordering checks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Upload,
    TableOfContents,
    Measure,
    Dimensions,
}

/// Request sent to backend workers
#[derive(Debug)]
pub enum BackendRequest {
    /// Read the file and upload it
    Upload { id: RequestId, path: PathBuf },

    /// Fetch the outline
    TableOfContents { id: RequestId },

    /// Measure between two points
    Measure {
        id: RequestId,
        request: MeasureRequest,
    },

    /// Fetch page dimensions
    Dimensions { id: RequestId, page_num: u32 },

    /// Shutdown the worker
    Shutdown,
}

/// Response from backend workers
#[derive(Debug)]
pub enum BackendResponse {
    Uploaded {
        id: RequestId,
        path: PathBuf,
        result: Result<(), BackendError>,
    },

    TableOfContents {
        id: RequestId,
        result: Result<Vec<OutlineEntry>, BackendError>,
    },

    Measured {
        id: RequestId,
        result: Result<MeasurementResult, BackendError>,
    },

    Dimensions {
        id: RequestId,
        page_num: u32,
        result: Result<PageDimensions, BackendError>,
    },
}

impl BackendResponse {
    #[must_use]
    pub fn id(&self) -> RequestId {
        match self {
            Self::Uploaded { id, .. }
            | Self::TableOfContents { id, .. }
            | Self::Measured { id, .. }
            | Self::Dimensions { id, .. } => *id,
        }
    }

    #[must_use]
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Uploaded { .. } => RequestKind::Upload,
            Self::TableOfContents { .. } => RequestKind::TableOfContents,
            Self::Measured { .. } => RequestKind::Measure,
            Self::Dimensions { .. } => RequestKind::Dimensions,
        }
    }
}
