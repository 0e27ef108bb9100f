//! Screen layout and the static parts of the view.
//!
//! [`AppLayout::compute`] is the single source of geometry: the app draws
//! with it and hit-tests mouse clicks against the same rectangles.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};

use crate::notification::Notification;
use crate::theme::Base16Palette;

pub const APP_TITLE: &str = "Estimator Assistant";
pub const DATA_TABLE_COLUMNS: [&str; 4] = ["Column 1", "Column 2", "Column 3", "Column 4"];
const KEY_HINTS: &str =
    "o open  m measure  l learn doc  d dimensions  +/-/0 zoom  arrows pan  n/p page  q quit";

/// Toolbar entries, left to right
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAction {
    OpenFile,
    ToggleMeasure,
    LearnDoc,
    Dimensions,
    Quit,
}

impl ToolbarAction {
    pub const ALL: [ToolbarAction; 5] = [
        ToolbarAction::OpenFile,
        ToolbarAction::ToggleMeasure,
        ToolbarAction::LearnDoc,
        ToolbarAction::Dimensions,
        ToolbarAction::Quit,
    ];

    /// Button caption; the measure toggle's text depends on the mode
    #[must_use]
    pub fn label(self, toggle_label: &str) -> &str {
        match self {
            ToolbarAction::OpenFile => "Open PDF",
            ToolbarAction::ToggleMeasure => toggle_label,
            ToolbarAction::LearnDoc => "Learn Doc",
            ToolbarAction::Dimensions => "Dimensions",
            ToolbarAction::Quit => "Quit",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppLayout {
    pub header: Rect,
    pub toolbar: Rect,
    pub buttons: Vec<(ToolbarAction, Rect)>,
    pub outline: Rect,
    pub data_table: Rect,
    pub readout: Option<Rect>,
    /// Viewer frame, present once a document is mounted
    pub viewer: Option<Rect>,
    pub status: Rect,
}

impl AppLayout {
    /// `readout_lines` counts the text lines of the measurements block,
    /// zero hides it.
    #[must_use]
    pub fn compute(
        area: Rect,
        toggle_label: &str,
        readout_lines: usize,
        has_document: bool,
    ) -> Self {
        let [header, toolbar, body, status] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(area);

        let [left, right] =
            Layout::horizontal([Constraint::Percentage(30), Constraint::Percentage(70)])
                .areas(body);

        let [outline, data_table] =
            Layout::vertical([Constraint::Min(3), Constraint::Length(4)]).areas(left);

        let (readout, viewer) = if readout_lines > 0 {
            let readout_height = u16::try_from(readout_lines + 2).unwrap_or(u16::MAX);
            let [readout, rest] =
                Layout::vertical([Constraint::Length(readout_height), Constraint::Min(0)])
                    .areas(right);
            (Some(readout), rest)
        } else {
            (None, right)
        };

        Self {
            header,
            toolbar,
            buttons: layout_buttons(toolbar, toggle_label),
            outline,
            data_table,
            readout,
            viewer: has_document.then_some(viewer),
            status,
        }
    }

    /// Toolbar button under a terminal cell
    #[must_use]
    pub fn button_at(&self, column: u16, row: u16) -> Option<ToolbarAction> {
        let position = Position::new(column, row);
        self.buttons
            .iter()
            .find(|(_, rect)| rect.contains(position))
            .map(|(action, _)| *action)
    }

    /// Area inside the viewer frame where the page is painted
    #[must_use]
    pub fn viewer_inner(&self) -> Option<Rect> {
        self.viewer.map(|area| Block::bordered().inner(area))
    }
}

fn layout_buttons(toolbar: Rect, toggle_label: &str) -> Vec<(ToolbarAction, Rect)> {
    let mut x = toolbar.x + 1;
    let right_edge = toolbar.right();
    let mut buttons = Vec::with_capacity(ToolbarAction::ALL.len());

    for action in ToolbarAction::ALL {
        // One space of padding on each side of the caption
        let width = action.label(toggle_label).chars().count() as u16 + 2;
        if x >= right_edge {
            break;
        }
        let width = width.min(right_edge - x);
        buttons.push((action, Rect::new(x, toolbar.y, width, 1)));
        x = x.saturating_add(width + 1);
    }
    buttons
}

pub fn render_header(f: &mut Frame, area: Rect, palette: &Base16Palette) {
    let header = Paragraph::new(Line::from(Span::styled(
        APP_TITLE,
        Style::default()
            .fg(palette.base_0d)
            .add_modifier(Modifier::BOLD),
    )))
    .style(Style::default().bg(palette.base_00));
    f.render_widget(header, area);
}

pub fn render_toolbar(
    f: &mut Frame,
    layout: &AppLayout,
    toggle_label: &str,
    measuring: bool,
    palette: &Base16Palette,
) {
    f.render_widget(
        Block::default().style(Style::default().bg(palette.base_00)),
        layout.toolbar,
    );

    for (action, rect) in &layout.buttons {
        let active = *action == ToolbarAction::ToggleMeasure && measuring;
        let (fg, bg) = palette.get_button_colors(active);
        let caption = format!(" {} ", action.label(toggle_label));
        f.render_widget(
            Paragraph::new(caption).style(Style::default().fg(fg).bg(bg)),
            *rect,
        );
    }
}

/// Fixed placeholder grid: four headers and one empty row
pub fn render_data_table(f: &mut Frame, area: Rect, palette: &Base16Palette) {
    let header = Row::new(DATA_TABLE_COLUMNS.map(Cell::from)).style(
        Style::default()
            .fg(palette.base_0a)
            .add_modifier(Modifier::BOLD),
    );
    let empty_row = Row::new(DATA_TABLE_COLUMNS.map(|_| Cell::from("")));

    let table = Table::new([empty_row], [Constraint::Ratio(1, 4); 4])
        .header(header)
        .style(Style::default().fg(palette.base_05))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.base_03))
                .title(Span::styled(
                    " Data Table ",
                    Style::default()
                        .fg(palette.base_0d)
                        .add_modifier(Modifier::BOLD),
                )),
        );
    f.render_widget(table, area);
}

pub fn render_readout(f: &mut Frame, area: Rect, lines: &[String], palette: &Base16Palette) {
    let mut text = vec![Line::from(Span::styled(
        "Measurements:",
        Style::default()
            .fg(palette.base_0d)
            .add_modifier(Modifier::BOLD),
    ))];
    text.extend(
        lines
            .iter()
            .map(|line| Line::from(Span::styled(line.clone(), Style::default().fg(palette.base_05)))),
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.base_03));
    f.render_widget(Paragraph::new(text).block(block), area);
}

/// Frame around the page image
#[must_use]
pub fn viewer_block<'a>(title: String, measuring: bool, palette: &Base16Palette) -> Block<'a> {
    let border = if measuring {
        palette.base_0a
    } else {
        palette.base_03
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(Span::styled(
            title,
            Style::default()
                .fg(palette.base_0d)
                .add_modifier(Modifier::BOLD),
        ))
}

pub fn render_status(
    f: &mut Frame,
    area: Rect,
    notification: Option<&Notification>,
    busy: bool,
    palette: &Base16Palette,
) {
    let line = match notification {
        Some(n) => Line::from(Span::styled(
            n.message.clone(),
            Style::default().fg(palette.base_08),
        )),
        None => {
            let mut spans = vec![Span::styled(KEY_HINTS, Style::default().fg(palette.base_03))];
            if busy {
                spans.push(Span::styled(
                    "  working…",
                    Style::default().fg(palette.base_0a),
                ));
            }
            Line::from(spans)
        }
    };

    f.render_widget(
        Paragraph::new(line).style(Style::default().bg(palette.base_01)),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_only_exists_with_a_document() {
        let area = Rect::new(0, 0, 120, 40);
        assert_eq!(AppLayout::compute(area, "Measure", 0, false).viewer, None);

        let layout = AppLayout::compute(area, "Measure", 0, true);
        let viewer = layout.viewer.unwrap();
        assert_eq!(viewer.y, 2);
        assert_eq!(viewer.bottom(), 39);
        assert_eq!(layout.viewer_inner(), Some(Block::bordered().inner(viewer)));
    }

    #[test]
    fn readout_pushes_viewer_down() {
        let area = Rect::new(0, 0, 120, 40);
        let layout = AppLayout::compute(area, "Measure", 4, true);
        let readout = layout.readout.unwrap();
        assert_eq!(readout.height, 6);
        assert_eq!(layout.viewer.unwrap().y, readout.bottom());
    }

    #[test]
    fn buttons_follow_toggle_label() {
        let area = Rect::new(0, 0, 120, 40);
        let idle = AppLayout::compute(area, "Measure", 0, false);
        let measuring = AppLayout::compute(area, "Cancel Measure", 0, false);

        let toggle = |layout: &AppLayout| {
            layout
                .buttons
                .iter()
                .find(|(action, _)| *action == ToolbarAction::ToggleMeasure)
                .map(|(_, rect)| *rect)
                .unwrap()
        };
        assert_eq!(toggle(&idle).width, "Measure".len() as u16 + 2);
        assert_eq!(toggle(&measuring).width, "Cancel Measure".len() as u16 + 2);

        // "Open PDF" starts at column 1 and is 10 wide
        assert_eq!(idle.button_at(1, 1), Some(ToolbarAction::OpenFile));
        assert_eq!(idle.button_at(11, 1), None);
        assert_eq!(idle.button_at(12, 1), Some(ToolbarAction::ToggleMeasure));
        assert_eq!(idle.button_at(12, 2), None);
    }

    #[test]
    fn narrow_toolbar_drops_trailing_buttons() {
        let layout = AppLayout::compute(Rect::new(0, 0, 20, 10), "Measure", 0, false);
        assert!(layout.buttons.len() < ToolbarAction::ALL.len());
        assert!(
            layout
                .buttons
                .iter()
                .all(|(_, rect)| rect.right() <= 20)
        );
    }
}
