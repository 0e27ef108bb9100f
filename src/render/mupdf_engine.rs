//! MuPDF page renderer

use log::debug;
use mupdf::{Colorspace, Document, Matrix, Pixmap};

use super::{FitBox, PageImage, PageRenderer, RenderError, raster_scale};
use crate::intake::DocumentHandle;

/// Renders pages with MuPDF. The document is reopened on every mount.
#[derive(Default)]
pub struct MupdfRenderer {
    doc: Option<Document>,
}

impl MupdfRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PageRenderer for MupdfRenderer {
    fn open(&mut self, handle: &DocumentHandle) -> Result<usize, RenderError> {
        self.doc = None;
        let doc = Document::open(handle.path().to_string_lossy().as_ref())?;
        let page_count = doc.page_count()? as usize;
        if page_count == 0 {
            return Err(RenderError::generic("document has no pages"));
        }

        debug!("Opened {:?}: {page_count} pages", handle.path());
        self.doc = Some(doc);
        Ok(page_count)
    }

    fn render_page(
        &mut self,
        page_num: usize,
        fit: FitBox,
        zoom: f32,
    ) -> Result<PageImage, RenderError> {
        let doc = self
            .doc
            .as_ref()
            .ok_or_else(|| RenderError::generic("no document loaded"))?;
        let page = doc.load_page(page_num as i32)?;

        let bounds = page.bounds()?;
        let mag = raster_scale(bounds.x1 - bounds.x0, bounds.y1 - bounds.y0, fit, zoom);
        if mag <= 0.0 {
            return Err(RenderError::generic(format!("page {page_num} has no area")));
        }

        let rgb = Colorspace::device_rgb();
        let pixmap = page.to_pixmap(&Matrix::new_scale(mag, mag), &rgb, false, false)?;

        Ok(PageImage {
            pixels: pixmap_to_rgb(&pixmap)?,
            width_px: pixmap.width(),
            height_px: pixmap.height(),
        })
    }
}

/// Copy the color channels of a pixmap into a tightly packed RGB buffer
fn pixmap_to_rgb(pixmap: &Pixmap) -> Result<Vec<u8>, RenderError> {
    let channels = pixmap.n() as usize;
    let (width, height) = (pixmap.width() as usize, pixmap.height() as usize);
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();

    if channels < 3 || width * channels > stride || samples.len() < stride * height {
        return Err(RenderError::generic(format!(
            "unexpected pixmap layout: {width}x{height}, {channels} channels, stride {stride}"
        )));
    }

    Ok(samples
        .chunks(stride)
        .take(height)
        .flat_map(|row| row[..width * channels].chunks_exact(channels))
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect())
}
