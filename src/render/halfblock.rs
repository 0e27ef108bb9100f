//! Half-block painting: each terminal cell shows two vertically stacked
//! pixels, `▀` in the top pixel's color over the bottom pixel's color.

use ratatui::{
    buffer::Buffer,
    layout::{Position, Rect},
    style::Color,
};

use super::PageImage;
use crate::measure::Point;

const UPPER_HALF_BLOCK: &str = "▀";

/// Page pixel drawn in the top-left cell of the viewer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pan {
    pub x: u32,
    pub y: u32,
}

impl Pan {
    /// Largest offset that still fills `area` with `image`
    #[must_use]
    pub fn limit(image: &PageImage, area: Rect) -> Self {
        Self {
            x: image.width_px.saturating_sub(u32::from(area.width)),
            y: image.height_px.saturating_sub(u32::from(area.height) * 2),
        }
    }

    #[must_use]
    pub fn clamped(self, limit: Pan) -> Self {
        Self {
            x: self.x.min(limit.x),
            y: self.y.min(limit.y),
        }
    }
}

/// Paint `image` into `area` starting at pixel `pan`, horizontally centered
/// and clipped to the area. Returns the rectangle actually covered by the page.
pub fn paint(image: &PageImage, pan: Pan, area: Rect, buf: &mut Buffer) -> Rect {
    let visible_w = image.width_px.saturating_sub(pan.x);
    let visible_h = image.height_px.saturating_sub(pan.y);
    let cols = visible_w.min(u32::from(area.width)) as u16;
    let rows = visible_h.div_ceil(2).min(u32::from(area.height)) as u16;
    let rect = Rect::new(area.x + (area.width - cols) / 2, area.y, cols, rows);

    for cy in 0..rows {
        for cx in 0..cols {
            let x = pan.x + u32::from(cx);
            let top_y = pan.y + u32::from(cy) * 2;
            let Some(top) = image.rgb_at(x, top_y) else {
                continue;
            };
            let bottom = image.rgb_at(x, top_y + 1).unwrap_or(top);

            if let Some(cell) = buf.cell_mut((rect.x + cx, rect.y + cy)) {
                cell.set_symbol(UPPER_HALF_BLOCK)
                    .set_fg(Color::Rgb(top.0, top.1, top.2))
                    .set_bg(Color::Rgb(bottom.0, bottom.1, bottom.2));
            }
        }
    }

    rect
}

/// Page-local pixel under a terminal cell (top pixel of the cell)
#[must_use]
pub fn cell_to_pixel(rect: Rect, pan: Pan, column: u16, row: u16) -> Option<Point> {
    if !rect.contains(Position::new(column, row)) {
        return None;
    }
    Some(Point::new(
        f64::from(u32::from(column - rect.x) + pan.x),
        f64::from(u32::from(row - rect.y) * 2 + pan.y),
    ))
}

/// Terminal cell showing a page-local pixel
#[must_use]
pub fn pixel_to_cell(rect: Rect, pan: Pan, point: Point) -> Option<(u16, u16)> {
    let x = point.x - f64::from(pan.x);
    let y = point.y - f64::from(pan.y);
    if x < 0.0 || y < 0.0 || x >= f64::from(u16::MAX) || y >= f64::from(u16::MAX) {
        return None;
    }
    let column = rect.x.checked_add(x as u16)?;
    let row = rect.y.checked_add((y / 2.0) as u16)?;
    rect.contains(Position::new(column, row))
        .then_some((column, row))
}
