//! Render thread - rasterises pages off the UI thread

use flume::{Receiver, Sender};
use log::{debug, warn};

use super::{CacheKey, PageImage, PageRenderer, RendererFactory};
use crate::intake::DocumentHandle;

pub(super) struct RenderJob {
    pub key: CacheKey,
    pub handle: DocumentHandle,
}

enum RenderRequest {
    Page(RenderJob),
    Shutdown,
}

pub(super) struct RenderedPage {
    pub key: CacheKey,
    pub result: Result<PageImage, String>,
}

pub(super) struct RenderWorker {
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderedPage>,
}

impl RenderWorker {
    pub fn spawn(renderers: RendererFactory) -> Self {
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        std::thread::spawn(move || {
            render_worker(renderers.build(), &request_rx, &response_tx);
        });

        Self {
            request_tx,
            response_rx,
        }
    }

    /// Queue a page; false if the render thread is gone
    pub fn request(&self, job: RenderJob) -> bool {
        debug!("Requesting render {:?}", job.key);
        self.request_tx.send(RenderRequest::Page(job)).is_ok()
    }

    pub fn poll(&self) -> Vec<RenderedPage> {
        self.response_rx.try_iter().collect()
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        let _ = self.request_tx.send(RenderRequest::Shutdown);
    }
}

fn render_worker(
    mut renderer: Box<dyn PageRenderer>,
    requests: &Receiver<RenderRequest>,
    responses: &Sender<RenderedPage>,
) {
    let mut opened: Option<u64> = None;

    while let Ok(RenderRequest::Page(mut job)) = requests.recv() {
        // Only the newest queued page is worth drawing
        while let Ok(next) = requests.try_recv() {
            match next {
                RenderRequest::Page(newer) => {
                    debug!("Skipping superseded render {:?}", job.key);
                    job = newer;
                }
                RenderRequest::Shutdown => return,
            }
        }

        let generation = job.key.generation;
        if opened != Some(generation) {
            if let Err(e) = renderer.open(&job.handle) {
                warn!("Render thread cannot open {:?}: {e}", job.handle.path());
                opened = None;
                let _ = responses.send(RenderedPage {
                    key: job.key,
                    result: Err(e.to_string()),
                });
                continue;
            }
            opened = Some(generation);
        }

        let result = renderer
            .render_page(job.key.page, job.key.fit, job.key.zoom)
            .map_err(|e| e.to_string());
        if responses
            .send(RenderedPage {
                key: job.key,
                result,
            })
            .is_err()
        {
            break;
        }
    }
}
