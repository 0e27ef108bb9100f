//! File intake: picking a PDF, uploading it, and producing the handle the
//! viewer renders from.

use std::path::{Path, PathBuf};

use log::{error, info};
use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::backend::BackendError;
use crate::theme::Base16Palette;

/// Local reference to the document the viewer currently shows.
///
/// Only produced after the backend accepted the upload. Each accepted upload
/// gets a new generation, even when the same path is uploaded twice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentHandle {
    path: PathBuf,
    generation: u64,
}

impl DocumentHandle {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        display_name(&self.path)
    }
}

/// Owns the current [`DocumentHandle`]
#[derive(Debug, Default)]
pub struct FileIntake {
    handle: Option<DocumentHandle>,
    generations: u64,
}

impl FileIntake {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an upload outcome. On success the handle is replaced; on
    /// failure the previous handle (if any) stays active.
    pub fn apply_upload(
        &mut self,
        path: PathBuf,
        result: Result<(), BackendError>,
    ) -> Result<&DocumentHandle, BackendError> {
        result?;
        self.generations += 1;
        info!("Upload of {path:?} accepted (generation {})", self.generations);
        Ok(self.handle.insert(DocumentHandle {
            path,
            generation: self.generations,
        }))
    }

    #[must_use]
    pub fn handle(&self) -> Option<&DocumentHandle> {
        self.handle.as_ref()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PdfFile {
    pub path: PathBuf,
    pub display_name: String,
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Lists `*.pdf` files (any extension case) directly inside `dir`
#[must_use]
pub fn discover_pdfs(dir: &Path) -> Vec<PdfFile> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            error!("Failed to read directory {dir:?}: {e}");
            return Vec::new();
        }
    };

    let mut files: Vec<PdfFile> = entries
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            if !path.is_file() {
                return None;
            }
            let extension = path.extension()?.to_str()?.to_lowercase();
            (extension == "pdf").then(|| PdfFile {
                display_name: display_name(&path),
                path,
            })
        })
        .collect();

    files.sort_by(|a, b| {
        a.display_name
            .to_lowercase()
            .cmp(&b.display_name.to_lowercase())
    });
    files
}

/// Outcome of a key press inside the picker
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PickerAction {
    Selected(PathBuf),
    Cancelled,
}

/// Popup listing the PDFs of the scan directory
#[derive(Debug)]
pub struct FilePicker {
    scan_dir: PathBuf,
    files: Vec<PdfFile>,
    list_state: ListState,
    visible: bool,
}

impl FilePicker {
    #[must_use]
    pub fn new(scan_dir: impl Into<PathBuf>) -> Self {
        Self {
            scan_dir: scan_dir.into(),
            files: Vec::new(),
            list_state: ListState::default(),
            visible: false,
        }
    }

    /// Rescan the directory and show the popup
    pub fn open(&mut self) {
        self.files = discover_pdfs(&self.scan_dir);
        self.list_state
            .select(if self.files.is_empty() { None } else { Some(0) });
        self.visible = true;
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.visible
    }

    #[must_use]
    pub fn files(&self) -> &[PdfFile] {
        &self.files
    }

    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.list_state.selected()
    }

    pub fn move_selection_down(&mut self) {
        if let Some(i) = self.list_state.selected() {
            if i + 1 < self.files.len() {
                self.list_state.select(Some(i + 1));
            }
        }
    }

    pub fn move_selection_up(&mut self) {
        if let Some(i) = self.list_state.selected() {
            self.list_state.select(Some(i.saturating_sub(1)));
        }
    }

    /// Close the popup, returning the highlighted file if there is one
    pub fn confirm(&mut self) -> PickerAction {
        self.visible = false;
        match self.list_state.selected().and_then(|i| self.files.get(i)) {
            Some(file) => PickerAction::Selected(file.path.clone()),
            None => PickerAction::Cancelled,
        }
    }

    pub fn cancel(&mut self) -> PickerAction {
        self.visible = false;
        PickerAction::Cancelled
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, palette: &Base16Palette) {
        if !self.visible {
            return;
        }

        let popup = centered(area, 60, 16);
        f.render_widget(Clear, popup);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.base_0d))
            .title(Span::styled(
                " Open PDF ",
                Style::default()
                    .fg(palette.base_0d)
                    .add_modifier(Modifier::BOLD),
            ))
            .title_bottom(Line::from(" Enter: upload  Esc: cancel ").centered())
            .style(Style::default().bg(palette.base_00));

        if self.files.is_empty() {
            let message = Paragraph::new(format!("No PDF files in {}", self.scan_dir.display()))
                .style(Style::default().fg(palette.base_04))
                .block(block);
            f.render_widget(message, popup);
            return;
        }

        let items: Vec<ListItem> = self
            .files
            .iter()
            .map(|file| ListItem::new(file.display_name.clone()))
            .collect();
        let list = List::new(items)
            .block(block)
            .style(Style::default().fg(palette.base_05))
            .highlight_style(
                Style::default()
                    .bg(palette.base_02)
                    .fg(palette.base_07)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("» ");

        f.render_stateful_widget(list, popup, &mut self.list_state);
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .areas(area);
    let [popup] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(row);
    popup
}
