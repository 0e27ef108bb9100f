//! Document viewer
//!
//! Page rasterisation sits behind [`PageRenderer`] so the PDF engine can be
//! swapped; [`PageView`] owns navigation, zoom, panning and the mapping from
//! terminal mouse positions to page-local pixels. Pages are rasterised on a
//! render thread so a slow page never blocks input.

mod blank;
mod halfblock;
#[cfg(feature = "pdf")]
mod mupdf_engine;
mod worker;
mod zoom;

use std::sync::Arc;

use log::{debug, error};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Paragraph, Widget, Wrap},
};

use crate::intake::DocumentHandle;
use crate::measure::Point;
use crate::theme::Base16Palette;

pub use blank::BlankRenderer;
pub use halfblock::{Pan, cell_to_pixel, paint, pixel_to_cell};
#[cfg(feature = "pdf")]
pub use mupdf_engine::MupdfRenderer;
pub use zoom::Zoom;

use worker::{RenderJob, RenderWorker};

/// Largest raster edge we are willing to produce, in pixels
pub const MAX_RASTER_DIMENSION: f32 = 4096.0;

/// Errors from page renderers
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("{detail}")]
    Generic { detail: String },
}

impl RenderError {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Pixel budget the page has to fit into at zoom 1.0
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FitBox {
    pub width_px: u32,
    pub height_px: u32,
}

/// Raw rendered page, RGB with 3 bytes per pixel
#[derive(Clone)]
pub struct PageImage {
    pub pixels: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

impl PageImage {
    #[must_use]
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x >= self.width_px || y >= self.height_px {
            return None;
        }
        let i = ((y as usize) * (self.width_px as usize) + x as usize) * 3;
        let px = self.pixels.get(i..i + 3)?;
        Some((px[0], px[1], px[2]))
    }
}

impl std::fmt::Debug for PageImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageImage")
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .finish_non_exhaustive()
    }
}

/// Rasterises pages of the current document
pub trait PageRenderer {
    /// Load the document behind `handle`, returning its page count
    fn open(&mut self, handle: &DocumentHandle) -> Result<usize, RenderError>;

    /// Render `page` (0-indexed) scaled to fit `fit`, times `zoom`
    fn render_page(
        &mut self,
        page: usize,
        fit: FitBox,
        zoom: f32,
    ) -> Result<PageImage, RenderError>;
}

/// Builds renderers. PDF engines are not thread safe, so the render thread
/// builds its own instance instead of receiving one.
#[derive(Clone)]
pub struct RendererFactory(Arc<dyn Fn() -> Box<dyn PageRenderer> + Send + Sync>);

impl RendererFactory {
    pub fn new<R, F>(make: F) -> Self
    where
        R: PageRenderer + 'static,
        F: Fn() -> R + Send + Sync + 'static,
    {
        Self(Arc::new(move || Box::new(make()) as Box<dyn PageRenderer>))
    }

    #[must_use]
    pub fn build(&self) -> Box<dyn PageRenderer> {
        (self.0)()
    }
}

/// Magnification that fits a `page_width` x `page_height` page into `fit`,
/// times `zoom`, capped at [`MAX_RASTER_DIMENSION`]
#[must_use]
pub fn raster_scale(page_width: f32, page_height: f32, fit: FitBox, zoom: f32) -> f32 {
    if page_width <= 0.0 || page_height <= 0.0 {
        return 0.0;
    }
    let base = (fit.width_px as f32 / page_width).min(fit.height_px as f32 / page_height);
    let mut mag = base * zoom;

    let max_dim = (page_width * mag).max(page_height * mag);
    if max_dim > MAX_RASTER_DIMENSION {
        mag *= MAX_RASTER_DIMENSION / max_dim;
    }
    mag
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct CacheKey {
    generation: u64,
    page: usize,
    zoom: f32,
    fit: FitBox,
}

/// Viewer state for the mounted document
pub struct PageView {
    opener: Box<dyn PageRenderer>,
    worker: RenderWorker,
    handle: Option<DocumentHandle>,
    page_count: usize,
    current_page: usize,
    zoom: Zoom,
    cached: Option<(CacheKey, Result<Arc<PageImage>, String>)>,
    requested: Option<CacheKey>,
    open_error: Option<String>,
    page_rect: Option<Rect>,
    pan: Pan,
    pan_limit: Pan,
}

impl PageView {
    #[must_use]
    pub fn new(renderers: RendererFactory, initial_zoom: f32) -> Self {
        Self {
            opener: renderers.build(),
            worker: RenderWorker::spawn(renderers),
            handle: None,
            page_count: 0,
            current_page: 0,
            zoom: Zoom::new(initial_zoom),
            cached: None,
            requested: None,
            open_error: None,
            page_rect: None,
            pan: Pan::default(),
            pan_limit: Pan::default(),
        }
    }

    /// Mount a new document, replacing whatever was shown before
    pub fn mount(&mut self, handle: DocumentHandle) {
        self.cached = None;
        self.requested = None;
        self.page_rect = None;
        self.current_page = 0;
        self.reset_pan();

        match self.opener.open(&handle) {
            Ok(count) => {
                debug!("Mounted {:?} with {count} pages", handle.path());
                self.page_count = count;
                self.open_error = None;
            }
            Err(e) => {
                error!("Failed to open {:?} for rendering: {e}", handle.path());
                self.page_count = 0;
                self.open_error = Some(e.to_string());
            }
        }
        self.handle = Some(handle);
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.handle.is_some()
    }

    #[must_use]
    pub fn handle(&self) -> Option<&DocumentHandle> {
        self.handle.as_ref()
    }

    /// Why the mounted document could not be opened, if it could not
    #[must_use]
    pub fn open_error(&self) -> Option<&str> {
        self.open_error.as_deref()
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    #[must_use]
    pub fn zoom(&self) -> &Zoom {
        &self.zoom
    }

    pub fn next_page(&mut self) {
        if self.current_page + 1 < self.page_count {
            self.current_page += 1;
            self.reset_pan();
        }
    }

    pub fn prev_page(&mut self) {
        if self.current_page > 0 {
            self.current_page -= 1;
            self.reset_pan();
        }
    }

    pub fn zoom_in(&mut self) {
        self.zoom.step_in();
    }

    pub fn zoom_out(&mut self) {
        self.zoom.step_out();
    }

    pub fn zoom_reset(&mut self) {
        self.zoom.reset();
        self.reset_pan();
    }

    #[must_use]
    pub fn pan(&self) -> Pan {
        self.pan
    }

    /// True when the painted page is taller than the viewer
    #[must_use]
    pub fn overflows_vertically(&self) -> bool {
        self.pan_limit.y > 0
    }

    /// Move the visible part of the page by whole cells. One row is two pixels.
    pub fn scroll_by(&mut self, columns: i32, rows: i32) {
        fn shift(value: u32, delta: i64, limit: u32) -> u32 {
            (i64::from(value) + delta).clamp(0, i64::from(limit)) as u32
        }
        self.pan = Pan {
            x: shift(self.pan.x, i64::from(columns), self.pan_limit.x),
            y: shift(self.pan.y, i64::from(rows) * 2, self.pan_limit.y),
        };
    }

    fn reset_pan(&mut self) {
        self.pan = Pan::default();
        self.pan_limit = Pan::default();
    }

    /// Where the page image was painted last frame
    #[must_use]
    pub fn page_rect(&self) -> Option<Rect> {
        self.page_rect
    }

    /// Element-local pixel position of a terminal cell, if it lies on the page
    #[must_use]
    pub fn locate(&self, column: u16, row: u16) -> Option<Point> {
        cell_to_pixel(self.page_rect?, self.pan, column, row)
    }

    /// A page has been requested from the render thread and not yet delivered
    #[must_use]
    pub fn is_rendering(&self) -> bool {
        self.requested.is_some()
    }

    /// Take finished renders for the mounted document.
    /// Returns true if the viewer has something new to show.
    pub fn poll_renders(&mut self) -> bool {
        let generation = self.handle.as_ref().map(DocumentHandle::generation);
        let mut changed = false;

        for page in self.worker.poll() {
            if self.requested == Some(page.key) {
                self.requested = None;
            }
            if Some(page.key.generation) != generation {
                debug!("Dropping render of a replaced document: {:?}", page.key);
                continue;
            }
            let result = page.result.map(Arc::new).map_err(|e| {
                error!("Failed to render page {}: {e}", page.key.page);
                e
            });
            self.cached = Some((page.key, result));
            changed = true;
        }

        changed
    }

    /// Paint the current page into `area` and overlay `markers`
    pub fn render(
        &mut self,
        buf: &mut Buffer,
        area: Rect,
        markers: &[Point],
        palette: &Base16Palette,
    ) {
        self.page_rect = None;
        let Some(handle) = self.handle.clone() else {
            return;
        };

        if let Some(message) = &self.open_error {
            render_message(
                buf,
                area,
                &format!("Unable to render document: {message}"),
                palette.base_08,
            );
            return;
        }
        if area.width == 0 || area.height == 0 {
            return;
        }

        self.poll_renders();
        let key = CacheKey {
            generation: handle.generation(),
            page: self.current_page,
            zoom: self.zoom.factor(),
            fit: FitBox {
                width_px: u32::from(area.width),
                height_px: u32::from(area.height) * 2,
            },
        };

        let ready = self.cached.as_ref().is_some_and(|(cached, _)| *cached == key);
        if !ready && self.requested != Some(key) {
            if self.worker.request(RenderJob { key, handle }) {
                self.requested = Some(key);
            } else {
                self.cached = Some((key, Err("render thread has stopped".to_string())));
            }
        }

        match self.cached.as_ref() {
            Some((cached, Ok(image))) if *cached == key => {
                self.pan_limit = Pan::limit(image, area);
                self.pan = self.pan.clamped(self.pan_limit);
                let rect = paint(image, self.pan, area, buf);
                draw_markers(buf, rect, self.pan, markers, palette);
                self.page_rect = Some(rect);
            }
            Some((cached, Err(message))) if *cached == key => {
                render_message(
                    buf,
                    area,
                    &format!("Unable to render page: {message}"),
                    palette.base_08,
                );
            }
            _ => render_message(
                buf,
                area,
                &format!("Rendering page {}…", key.page + 1),
                palette.base_04,
            ),
        }
    }
}

fn render_message(buf: &mut Buffer, area: Rect, message: &str, color: Color) {
    Paragraph::new(message.to_string())
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: true })
        .render(area, buf);
}

fn draw_markers(buf: &mut Buffer, rect: Rect, pan: Pan, markers: &[Point], palette: &Base16Palette) {
    for point in markers {
        if let Some(position) = pixel_to_cell(rect, pan, *point) {
            if let Some(cell) = buf.cell_mut(position) {
                cell.set_symbol("+").set_style(
                    Style::default()
                        .fg(palette.base_08)
                        .bg(palette.base_00)
                        .add_modifier(Modifier::BOLD),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::intake::FileIntake;
    use crate::theme::OCEANIC_NEXT;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    fn handle() -> DocumentHandle {
        let mut intake = FileIntake::new();
        intake
            .apply_upload(PathBuf::from("plan.pdf"), Ok::<(), BackendError>(()))
            .unwrap()
            .clone()
    }

    fn view(renderer: BlankRenderer) -> PageView {
        PageView::new(RendererFactory::new(move || renderer.clone()), 1.0)
    }

    /// Render until the page arrives from the render thread
    fn render_settled(view: &mut PageView, buf: &mut Buffer, area: Rect) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            view.render(buf, area, &[], &OCEANIC_NEXT);
            if !view.is_rendering() {
                return;
            }
            assert!(Instant::now() < deadline, "page never rendered");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn raster_scale_fits_limiting_edge() {
        let fit = FitBox {
            width_px: 100,
            height_px: 100,
        };
        let mag = raster_scale(200.0, 400.0, fit, 1.0);
        assert!((mag - 0.25).abs() < 1e-6);

        let zoomed = raster_scale(200.0, 400.0, fit, 2.0);
        assert!((zoomed - 0.5).abs() < 1e-6);
    }

    #[test]
    fn raster_scale_caps_huge_output() {
        let fit = FitBox {
            width_px: 10_000,
            height_px: 10_000,
        };
        let mag = raster_scale(100.0, 100.0, fit, 1.0);
        assert!((100.0 * mag - MAX_RASTER_DIMENSION).abs() < 1e-3);
    }

    #[test]
    fn unmounted_view_produces_no_positions() {
        let mut view = view(BlankRenderer::default());
        let area = Rect::new(0, 0, 40, 20);
        let mut buf = Buffer::empty(area);
        view.render(&mut buf, area, &[], &OCEANIC_NEXT);

        assert!(!view.is_mounted());
        assert_eq!(view.page_rect(), None);
        assert_eq!(view.locate(5, 5), None);
    }

    #[test]
    fn mounted_view_maps_clicks_inside_page_only() {
        let mut view = view(BlankRenderer::with_page_size(100.0, 100.0));
        view.mount(handle());

        let area = Rect::new(10, 5, 60, 20);
        let mut buf = Buffer::empty(Rect::new(0, 0, 80, 30));
        render_settled(&mut view, &mut buf, area);

        // Square page in a 60x40 px box renders 40x40 px, centered horizontally
        let rect = view.page_rect().unwrap();
        assert_eq!(rect, Rect::new(20, 5, 40, 20));
        assert_eq!(view.locate(20, 5), Some(Point::new(0.0, 0.0)));
        assert_eq!(view.locate(25, 8), Some(Point::new(5.0, 6.0)));
        assert_eq!(view.locate(19, 8), None);
        assert_eq!(view.locate(60, 8), None);
    }

    #[test]
    fn navigation_stays_in_bounds() {
        let mut view = view(BlankRenderer::with_pages(3));
        view.mount(handle());
        view.prev_page();
        assert_eq!(view.current_page(), 0);
        view.next_page();
        view.next_page();
        view.next_page();
        assert_eq!(view.current_page(), 2);
    }

    #[test]
    fn first_frame_waits_for_the_render_thread() {
        let mut view = view(BlankRenderer::default());
        view.mount(handle());

        let area = Rect::new(0, 0, 40, 20);
        let mut buf = Buffer::empty(area);
        view.render(&mut buf, area, &[], &OCEANIC_NEXT);

        assert!(view.is_rendering());
        assert_eq!(view.page_rect(), None);
        assert_eq!(view.locate(5, 5), None);

        render_settled(&mut view, &mut buf, area);
        assert!(view.page_rect().is_some());
    }

    #[test]
    fn zoomed_page_can_be_panned_to_its_far_corner() {
        let mut view = view(BlankRenderer::with_page_size(100.0, 100.0));
        view.mount(handle());
        let area = Rect::new(0, 0, 40, 20);
        let mut buf = Buffer::empty(area);

        render_settled(&mut view, &mut buf, area);
        assert!(!view.overflows_vertically());
        view.scroll_by(5, 5);
        assert_eq!(view.pan(), Pan::default());

        for _ in 0..8 {
            view.zoom_in();
        }
        render_settled(&mut view, &mut buf, area);
        // 40x40 px fit times 1.1^8 gives an 86x86 px raster
        assert!(view.overflows_vertically());
        assert_eq!(view.locate(39, 19), Some(Point::new(39.0, 38.0)));

        view.scroll_by(1000, 1000);
        assert_eq!(view.pan(), Pan { x: 46, y: 46 });
        render_settled(&mut view, &mut buf, area);
        assert_eq!(view.page_rect(), Some(area));
        assert_eq!(view.locate(0, 0), Some(Point::new(46.0, 46.0)));
        assert_eq!(view.locate(39, 19), Some(Point::new(85.0, 84.0)));

        view.scroll_by(-3, -2);
        assert_eq!(view.pan(), Pan { x: 43, y: 42 });
    }

    #[test]
    fn changing_page_resets_the_pan() {
        let mut view = view(BlankRenderer::with_pages(2));
        view.mount(handle());
        let area = Rect::new(0, 0, 20, 10);
        let mut buf = Buffer::empty(area);
        for _ in 0..10 {
            view.zoom_in();
        }
        render_settled(&mut view, &mut buf, area);

        view.scroll_by(4, 4);
        assert_ne!(view.pan(), Pan::default());
        view.next_page();
        assert_eq!(view.pan(), Pan::default());
    }
}
