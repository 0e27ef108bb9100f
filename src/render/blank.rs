use super::{FitBox, PageImage, PageRenderer, RenderError, raster_scale};
use crate::intake::DocumentHandle;

/// US Letter, in PDF points
const LETTER: (f32, f32) = (612.0, 792.0);

/// Renders every page as an empty white sheet.
///
/// Used when the binary is built without the `pdf` feature; measurement still
/// works because the backend only needs page-local coordinates.
#[derive(Clone, Debug)]
pub struct BlankRenderer {
    page_size: (f32, f32),
    pages: usize,
}

impl Default for BlankRenderer {
    fn default() -> Self {
        Self {
            page_size: LETTER,
            pages: 1,
        }
    }
}

impl BlankRenderer {
    #[must_use]
    pub fn with_page_size(width: f32, height: f32) -> Self {
        Self {
            page_size: (width, height),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_pages(pages: usize) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }
}

impl PageRenderer for BlankRenderer {
    fn open(&mut self, _handle: &DocumentHandle) -> Result<usize, RenderError> {
        Ok(self.pages)
    }

    fn render_page(
        &mut self,
        page: usize,
        fit: FitBox,
        zoom: f32,
    ) -> Result<PageImage, RenderError> {
        if page >= self.pages {
            return Err(RenderError::generic(format!(
                "page {page} out of range (document has {})",
                self.pages
            )));
        }

        let (page_width, page_height) = self.page_size;
        let mag = raster_scale(page_width, page_height, fit, zoom);
        let width_px = ((page_width * mag).round() as u32).max(1);
        let height_px = ((page_height * mag).round() as u32).max(1);

        Ok(PageImage {
            pixels: vec![0xFF; (width_px as usize) * (height_px as usize) * 3],
            width_px,
            height_px,
        })
    }
}
