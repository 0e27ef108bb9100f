//! Backend service - runs backend calls on worker threads

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use flume::{Receiver, Sender};
use log::{debug, warn};

use super::Backend;
use super::BackendError;
use super::request::{BackendRequest, BackendResponse, RequestId, RequestKind};

pub const DEFAULT_BACKEND_WORKERS: usize = 2;

/// Dispatches backend calls to a worker pool and hands back completed responses.
///
/// Responses are not guaranteed to arrive in request order. By default a late
/// response is still delivered ("last response wins") and only logged;
/// with `discard_stale` it is dropped instead.
pub struct BackendService {
    request_tx: Sender<BackendRequest>,
    response_rx: Receiver<BackendResponse>,
    next_request_id: u64,
    pending_requests: HashMap<RequestId, RequestKind>,
    latest_completed: HashMap<RequestKind, RequestId>,
    num_workers: usize,
    discard_stale: bool,
}

impl BackendService {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, num_workers: usize, discard_stale: bool) -> Self {
        // Workers share one request queue, so the receiver has to be cloneable (MPMC).
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        for _ in 0..num_workers.max(1) {
            let rx = request_rx.clone();
            let tx = response_tx.clone();
            let backend = Arc::clone(&backend);

            std::thread::spawn(move || {
                backend_worker(backend.as_ref(), &rx, &tx);
            });
        }

        Self {
            request_tx,
            response_rx,
            next_request_id: 1,
            pending_requests: HashMap::new(),
            latest_completed: HashMap::new(),
            num_workers: num_workers.max(1),
            discard_stale,
        }
    }

    pub fn upload(&mut self, path: PathBuf) -> RequestId {
        let id = self.next_id();
        self.send(id, RequestKind::Upload, BackendRequest::Upload { id, path });
        id
    }

    pub fn table_of_contents(&mut self) -> RequestId {
        let id = self.next_id();
        self.send(
            id,
            RequestKind::TableOfContents,
            BackendRequest::TableOfContents { id },
        );
        id
    }

    pub fn measure(&mut self, request: super::MeasureRequest) -> RequestId {
        let id = self.next_id();
        self.send(id, RequestKind::Measure, BackendRequest::Measure { id, request });
        id
    }

    pub fn page_dimensions(&mut self, page_num: u32) -> RequestId {
        let id = self.next_id();
        self.send(
            id,
            RequestKind::Dimensions,
            BackendRequest::Dimensions { id, page_num },
        );
        id
    }

    fn send(&mut self, id: RequestId, kind: RequestKind, request: BackendRequest) {
        debug!("Dispatching {kind:?} request {id:?}");
        if self.request_tx.send(request).is_err() {
            warn!("Backend workers are gone, dropping {kind:?} request {id:?}");
            return;
        }
        self.pending_requests.insert(id, kind);
    }

    /// Drain completed responses without blocking
    pub fn poll_responses(&mut self) -> Vec<BackendResponse> {
        let mut responses = vec![];

        while let Ok(response) = self.response_rx.try_recv() {
            let id = response.id();
            let kind = response.kind();
            self.pending_requests.remove(&id);

            let newest = self.latest_completed.entry(kind).or_insert(id);
            if id < *newest {
                if self.discard_stale {
                    warn!("Discarding out-of-order {kind:?} response {id:?} (newer {newest:?} already applied)");
                    continue;
                }
                warn!("Out-of-order {kind:?} response {id:?} overrides newer {newest:?}");
            } else {
                *newest = id;
            }

            responses.push(response);
        }

        responses
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending_requests.is_empty()
    }

    #[must_use]
    pub fn is_pending(&self, kind: RequestKind) -> bool {
        self.pending_requests.values().any(|k| *k == kind)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending_requests.len()
    }

    /// Shutdown all workers
    pub fn shutdown(&self) {
        for _ in 0..self.num_workers {
            let _ = self.request_tx.send(BackendRequest::Shutdown);
        }
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Drop for BackendService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn backend_worker(
    backend: &dyn Backend,
    requests: &Receiver<BackendRequest>,
    responses: &Sender<BackendResponse>,
) {
    for request in requests.iter() {
        let response = match request {
            BackendRequest::Upload { id, path } => {
                let result = upload_file(backend, &path);
                BackendResponse::Uploaded { id, path, result }
            }

            BackendRequest::TableOfContents { id } => BackendResponse::TableOfContents {
                id,
                result: backend.table_of_contents(),
            },

            BackendRequest::Measure { id, request } => BackendResponse::Measured {
                id,
                result: backend.measure(&request),
            },

            BackendRequest::Dimensions { id, page_num } => BackendResponse::Dimensions {
                id,
                page_num,
                result: backend.page_dimensions(page_num),
            },

            BackendRequest::Shutdown => break,
        };

        if responses.send(response).is_err() {
            break;
        }
    }
}

fn upload_file(backend: &dyn Backend, path: &std::path::Path) -> Result<(), BackendError> {
    let bytes = std::fs::read(path).map_err(|source| BackendError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string());

    backend.upload(&file_name, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MeasureRequest, MeasurementResult, OutlineEntry, PageDimensions};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Measures `x1` as the width after sleeping `y1` milliseconds
    struct SlowBackend {
        uploads: Mutex<Vec<(String, usize)>>,
    }

    impl Backend for SlowBackend {
        fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<(), BackendError> {
            self.uploads
                .lock()
                .unwrap()
                .push((file_name.to_string(), bytes.len()));
            Ok(())
        }

        fn table_of_contents(&self) -> Result<Vec<OutlineEntry>, BackendError> {
            Ok(vec![])
        }

        fn measure(&self, request: &MeasureRequest) -> Result<MeasurementResult, BackendError> {
            std::thread::sleep(Duration::from_millis(request.y1 as u64));
            Ok(MeasurementResult {
                width: request.x1,
                height: 0.0,
                diagonal: request.x1,
            })
        }

        fn page_dimensions(&self, _page_num: u32) -> Result<PageDimensions, BackendError> {
            Err(BackendError::Status {
                status: 400,
                detail: "No PDF loaded".to_string(),
            })
        }
    }

    fn slow_backend() -> Arc<SlowBackend> {
        Arc::new(SlowBackend {
            uploads: Mutex::new(vec![]),
        })
    }

    fn drain(service: &mut BackendService) -> Vec<BackendResponse> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut all = vec![];
        while !service.is_idle() && Instant::now() < deadline {
            all.extend(service.poll_responses());
            std::thread::sleep(Duration::from_millis(5));
        }
        all
    }

    fn request(x1: f64, delay_ms: f64) -> MeasureRequest {
        MeasureRequest {
            page_num: 0,
            x1,
            y1: delay_ms,
            x2: 0.0,
            y2: 0.0,
        }
    }

    fn measured_widths(responses: &[BackendResponse]) -> Vec<f64> {
        responses
            .iter()
            .filter_map(|r| match r {
                BackendResponse::Measured { result: Ok(m), .. } => Some(m.width),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn request_ids_increase() {
        let mut service = BackendService::new(slow_backend(), 1, false);
        let a = service.table_of_contents();
        let b = service.measure(request(1.0, 0.0));
        assert!(b > a);
        assert_eq!(service.pending_count(), 2);
        drain(&mut service);
        assert!(service.is_idle());
    }

    #[test]
    fn late_response_is_delivered_by_default() {
        let mut service = BackendService::new(slow_backend(), 2, false);
        service.measure(request(1.0, 300.0));
        service.measure(request(2.0, 0.0));

        let responses = drain(&mut service);
        assert_eq!(measured_widths(&responses), vec![2.0, 1.0]);
    }

    #[test]
    fn late_response_is_dropped_when_discarding_stale() {
        let mut service = BackendService::new(slow_backend(), 2, true);
        service.measure(request(1.0, 300.0));
        service.measure(request(2.0, 0.0));

        let responses = drain(&mut service);
        assert_eq!(measured_widths(&responses), vec![2.0]);
        assert!(service.is_idle());
    }

    #[test]
    fn upload_reads_file_and_reports_missing_file() {
        let backend = slow_backend();
        let mut service = BackendService::new(backend.clone(), 1, false);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.pdf");
        std::fs::write(&path, b"%PDF-1.4 test").unwrap();

        service.upload(path.clone());
        service.upload(dir.path().join("missing.pdf"));
        let responses = drain(&mut service);

        assert_eq!(responses.len(), 2);
        let failures = responses
            .iter()
            .filter(|r| {
                matches!(
                    r,
                    BackendResponse::Uploaded {
                        result: Err(BackendError::Io { .. }),
                        ..
                    }
                )
            })
            .count();
        assert_eq!(failures, 1);
        assert_eq!(
            *backend.uploads.lock().unwrap(),
            vec![("plan.pdf".to_string(), 13)]
        );
    }

    #[test]
    fn errors_are_passed_through() {
        let mut service = BackendService::new(slow_backend(), 1, false);
        service.page_dimensions(0);
        let responses = drain(&mut service);

        assert!(matches!(
            responses.as_slice(),
            [BackendResponse::Dimensions {
                page_num: 0,
                result: Err(BackendError::Status { status: 400, .. }),
                ..
            }]
        ));
    }
}
