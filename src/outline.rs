use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

use crate::backend::{BackendError, OutlineEntry};
use crate::theme::Base16Palette;

pub const DEFAULT_OUTLINE_INDENT: u16 = 2;
/// Deepest indentation drawn, in columns; wider than any side panel
pub const MAX_INDENT_COLUMNS: usize = 256;
pub const EMPTY_OUTLINE_TEXT: &str =
    "No content available. Click \"Learn Doc\" to analyze the document.";

/// Table of contents as last reported by the backend
#[derive(Debug)]
pub struct OutlineLoader {
    entries: Vec<OutlineEntry>,
    indent: u16,
}

impl Default for OutlineLoader {
    fn default() -> Self {
        Self::new(DEFAULT_OUTLINE_INDENT)
    }
}

impl OutlineLoader {
    #[must_use]
    pub fn new(indent: u16) -> Self {
        Self {
            entries: Vec::new(),
            indent,
        }
    }

    /// Apply a fetch result. Success replaces the whole list; a failure is
    /// handed back and the current list stays.
    pub fn apply(
        &mut self,
        result: Result<Vec<OutlineEntry>, BackendError>,
    ) -> Result<(), BackendError> {
        self.entries = result?;
        Ok(())
    }

    #[must_use]
    pub fn entries(&self) -> &[OutlineEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Leading spaces for an entry. Levels are not validated, so arbitrarily
    /// deep entries stop at [`MAX_INDENT_COLUMNS`].
    #[must_use]
    pub fn indentation(&self, entry: &OutlineEntry) -> usize {
        (entry.level as usize)
            .saturating_mul(usize::from(self.indent))
            .min(MAX_INDENT_COLUMNS)
    }

    #[must_use]
    pub fn entry_text(&self, entry: &OutlineEntry) -> String {
        format!(
            "{}{} (Page {})",
            " ".repeat(self.indentation(entry)),
            entry.title,
            entry.page
        )
    }

    pub fn render(&self, f: &mut Frame, area: Rect, palette: &Base16Palette, loading: bool) {
        let title = if loading {
            " Table of Contents (loading…) "
        } else {
            " Table of Contents "
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.base_03))
            .title(Span::styled(
                title,
                Style::default()
                    .fg(palette.base_0d)
                    .add_modifier(Modifier::BOLD),
            ));

        if self.entries.is_empty() {
            let placeholder = Paragraph::new(EMPTY_OUTLINE_TEXT)
                .style(Style::default().fg(palette.base_04))
                .wrap(Wrap { trim: true })
                .block(block);
            f.render_widget(placeholder, area);
            return;
        }

        let items: Vec<ListItem> = self
            .entries
            .iter()
            .map(|entry| {
                ListItem::new(Line::from(Span::styled(
                    self.entry_text(entry),
                    Style::default().fg(palette.base_05),
                )))
            })
            .collect();

        f.render_widget(List::new(items).block(block), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, page: u32, level: u32) -> OutlineEntry {
        OutlineEntry {
            title: title.to_string(),
            page,
            level,
        }
    }

    #[test]
    fn fetch_replaces_wholesale() {
        let mut outline = OutlineLoader::default();
        outline
            .apply(Ok(vec![entry("A", 1, 0), entry("B", 2, 1)]))
            .unwrap();
        outline.apply(Ok(vec![entry("C", 3, 0)])).unwrap();

        assert_eq!(outline.entries(), &[entry("C", 3, 0)]);
    }

    #[test]
    fn failure_keeps_previous_entries() {
        let mut outline = OutlineLoader::default();
        outline.apply(Ok(vec![entry("A", 1, 0)])).unwrap();

        let err = outline.apply(Err(BackendError::Status {
            status: 400,
            detail: "No PDF loaded".to_string(),
        }));

        assert!(err.is_err());
        assert_eq!(outline.entries(), &[entry("A", 1, 0)]);
    }

    #[test]
    fn indentation_scales_with_level() {
        let outline = OutlineLoader::new(3);
        assert_eq!(outline.entry_text(&entry("Top", 0, 0)), "Top (Page 0)");
        assert_eq!(
            outline.entry_text(&entry("Deep", 7, 2)),
            "      Deep (Page 7)"
        );
    }

    #[test]
    fn absurd_levels_stop_at_the_indent_cap() {
        let outline = OutlineLoader::default();
        let deep = entry("Deep", 1, u32::MAX);

        assert_eq!(outline.indentation(&deep), MAX_INDENT_COLUMNS);
        let text = outline.entry_text(&deep);
        assert_eq!(text.len(), MAX_INDENT_COLUMNS + "Deep (Page 1)".len());
        assert!(text.ends_with(" Deep (Page 1)"));
    }
}
