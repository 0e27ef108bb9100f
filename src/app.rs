use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{KeyEventKind, MouseButton};
use log::{debug, error, info, warn};
use ratatui::{Frame, Terminal};

use crate::backend::{
    Backend, BackendError, BackendResponse, BackendService, PageDimensions, RequestKind,
};
use crate::event_source::{
    Event, EventSource, KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind,
};
use crate::intake::{FileIntake, FilePicker, PickerAction};
use crate::measure::{Command, Effect, MeasurementController, Point};
use crate::notification::NotificationManager;
use crate::outline::OutlineLoader;
use crate::render::{PageView, RendererFactory};
use crate::settings::{ErrorDisplay, Settings};
use crate::theme::current_theme;
use crate::ui::{self, AppLayout, ToolbarAction};

/// Cells moved per arrow key or wheel notch on a zoomed page
const PAN_STEP_COLUMNS: i32 = 6;
const PAN_STEP_ROWS: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Quit,
}

/// Owns every independent piece of UI state and routes events and backend
/// responses between them.
pub struct App {
    backend: BackendService,
    error_display: ErrorDisplay,
    intake: FileIntake,
    picker: FilePicker,
    view: PageView,
    measurement: MeasurementController,
    outline: OutlineLoader,
    dimensions: Option<PageDimensions>,
    pub notifications: NotificationManager,
    layout: Option<AppLayout>,
}

impl App {
    pub fn new(
        settings: &Settings,
        backend: Arc<dyn Backend>,
        renderers: RendererFactory,
        scan_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backend: BackendService::new(
                backend,
                settings.backend_workers,
                settings.discard_stale_responses,
            ),
            error_display: settings.error_display,
            intake: FileIntake::new(),
            picker: FilePicker::new(scan_dir),
            view: PageView::new(renderers, settings.pdf_scale),
            measurement: MeasurementController::new(),
            outline: OutlineLoader::new(settings.outline_indent),
            dimensions: None,
            notifications: NotificationManager::new(),
            layout: None,
        }
    }

    pub fn intake(&self) -> &FileIntake {
        &self.intake
    }

    pub fn picker(&self) -> &FilePicker {
        &self.picker
    }

    pub fn page_view(&self) -> &PageView {
        &self.view
    }

    pub fn measurement(&self) -> &MeasurementController {
        &self.measurement
    }

    pub fn outline(&self) -> &OutlineLoader {
        &self.outline
    }

    pub fn dimensions(&self) -> Option<&PageDimensions> {
        self.dimensions.as_ref()
    }

    /// Geometry of the last drawn frame
    pub fn layout(&self) -> Option<&AppLayout> {
        self.layout.as_ref()
    }

    /// Upload `path`; the viewer switches to it once the backend accepts it
    pub fn select_file(&mut self, path: PathBuf) {
        info!("Uploading {path:?}");
        self.backend.upload(path);
    }

    pub fn open_picker(&mut self) {
        self.picker.open();
    }

    pub fn toggle_measure(&mut self) {
        let effects = self.measurement.apply(Command::ToggleMeasure);
        debug!("Measurement mode is now {:?}", self.measurement.mode());
        self.run_effects(effects);
    }

    /// Ask the backend for the table of contents ("Learn Doc")
    pub fn load_outline(&mut self) {
        self.backend.table_of_contents();
    }

    /// Fetch the size of the page currently shown
    pub fn request_dimensions(&mut self) {
        let page = u32::try_from(self.view.current_page()).unwrap_or(u32::MAX);
        self.backend.page_dimensions(page);
    }

    /// Click on the page at element-local pixel coordinates
    pub fn page_click(&mut self, point: Point) {
        let effects = self.measurement.apply(Command::PageClick(point));
        self.run_effects(effects);
    }

    /// Apply every backend response and finished page render that arrived
    /// since the last call. Returns true if anything changed.
    pub fn poll_backend(&mut self) -> bool {
        let responses = self.backend.poll_responses();
        let mut changed = !responses.is_empty();
        for response in responses {
            self.apply_response(response);
        }
        changed |= self.view.poll_renders();
        changed
    }

    pub fn backend_idle(&self) -> bool {
        self.backend.is_idle()
    }

    fn apply_response(&mut self, response: BackendResponse) {
        match response {
            BackendResponse::Uploaded { path, result, .. } => {
                match self.intake.apply_upload(path, result) {
                    Ok(handle) => {
                        let handle = handle.clone();
                        self.view.mount(handle);
                    }
                    Err(e) => self.report("Upload failed", e),
                }
            }
            BackendResponse::TableOfContents { result, .. } => {
                if let Err(e) = self.outline.apply(result) {
                    self.report("Failed to load table of contents", e);
                } else {
                    info!("Table of contents has {} entries", self.outline.entries().len());
                }
            }
            BackendResponse::Measured { result, .. } => {
                let effects = self.measurement.apply(Command::Completed(result));
                self.run_effects(effects);
            }
            BackendResponse::Dimensions {
                page_num, result, ..
            } => match result {
                Ok(dimensions) => {
                    debug!("Page {page_num} is {} x {}", dimensions.width, dimensions.height);
                    self.dimensions = Some(dimensions);
                }
                Err(e) => self.report(&format!("Failed to fetch size of page {page_num}"), e),
            },
        }
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Measure(request) => {
                    debug!("Requesting measurement {request:?}");
                    self.backend.measure(request);
                }
                Effect::Report(e) => self.report("Measurement failed", e),
            }
        }
    }

    fn report(&mut self, context: &str, e: BackendError) {
        error!("{context}: {e}");
        if self.error_display == ErrorDisplay::Notify {
            self.notifications.error(format!("{context}: {e}"));
        }
    }

    pub fn handle_event(&mut self, event: &Event) -> Option<AppAction> {
        match event {
            Event::Key(key) => self.handle_key_event(*key),
            Event::Mouse(mouse) => self.handle_mouse_event(*mouse),
            _ => None,
        }
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<AppAction> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(AppAction::Quit);
        }

        if self.picker.is_open() {
            self.handle_picker_key(key);
            return None;
        }

        match key.code {
            KeyCode::Char('q') => return Some(AppAction::Quit),
            KeyCode::Char('o') => self.open_picker(),
            KeyCode::Char('m') => self.toggle_measure(),
            KeyCode::Char('l') => self.load_outline(),
            KeyCode::Char('d') => self.request_dimensions(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.view.zoom_in(),
            KeyCode::Char('-') => self.view.zoom_out(),
            KeyCode::Char('0') => self.view.zoom_reset(),
            KeyCode::Char('n') | KeyCode::PageDown => self.view.next_page(),
            KeyCode::Char('p') | KeyCode::PageUp => self.view.prev_page(),
            KeyCode::Up => self.view.scroll_by(0, -PAN_STEP_ROWS),
            KeyCode::Down => self.view.scroll_by(0, PAN_STEP_ROWS),
            KeyCode::Left => self.view.scroll_by(-PAN_STEP_COLUMNS, 0),
            KeyCode::Right => self.view.scroll_by(PAN_STEP_COLUMNS, 0),
            KeyCode::Esc => {
                self.notifications.dismiss_current();
            }
            _ => {}
        }
        None
    }

    fn handle_picker_key(&mut self, key: KeyEvent) {
        let action = match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.picker.move_selection_down();
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.picker.move_selection_up();
                None
            }
            KeyCode::Enter => Some(self.picker.confirm()),
            KeyCode::Esc | KeyCode::Char('q') => Some(self.picker.cancel()),
            _ => None,
        };

        match action {
            Some(PickerAction::Selected(path)) => self.select_file(path),
            Some(PickerAction::Cancelled) => debug!("File selection cancelled"),
            None => {}
        }
    }

    pub fn handle_mouse_event(&mut self, mouse: MouseEvent) -> Option<AppAction> {
        if self.picker.is_open() {
            return None;
        }

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let button = self
                    .layout
                    .as_ref()
                    .and_then(|layout| layout.button_at(mouse.column, mouse.row));
                if let Some(action) = button {
                    return self.trigger(action);
                }
                if let Some(point) = self.view.locate(mouse.column, mouse.row) {
                    self.page_click(point);
                }
            }
            // The wheel scrolls a page taller than the viewer, otherwise it flips pages
            MouseEventKind::ScrollDown if self.over_viewer(mouse) => {
                if self.view.overflows_vertically() {
                    self.view.scroll_by(0, PAN_STEP_ROWS);
                } else {
                    self.view.next_page();
                }
            }
            MouseEventKind::ScrollUp if self.over_viewer(mouse) => {
                if self.view.overflows_vertically() {
                    self.view.scroll_by(0, -PAN_STEP_ROWS);
                } else {
                    self.view.prev_page();
                }
            }
            MouseEventKind::ScrollRight if self.over_viewer(mouse) => {
                self.view.scroll_by(PAN_STEP_COLUMNS, 0);
            }
            MouseEventKind::ScrollLeft if self.over_viewer(mouse) => {
                self.view.scroll_by(-PAN_STEP_COLUMNS, 0);
            }
            _ => {}
        }
        None
    }

    fn over_viewer(&self, mouse: MouseEvent) -> bool {
        self.layout
            .as_ref()
            .and_then(|layout| layout.viewer)
            .is_some_and(|area| area.contains((mouse.column, mouse.row).into()))
    }

    fn trigger(&mut self, action: ToolbarAction) -> Option<AppAction> {
        match action {
            ToolbarAction::OpenFile => self.open_picker(),
            ToolbarAction::ToggleMeasure => self.toggle_measure(),
            ToolbarAction::LearnDoc => self.load_outline(),
            ToolbarAction::Dimensions => self.request_dimensions(),
            ToolbarAction::Quit => return Some(AppAction::Quit),
        }
        None
    }

    fn readout_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .measurement
            .readout()
            .map(Vec::from)
            .unwrap_or_default();
        if let Some(dimensions) = &self.dimensions {
            lines.push(format!(
                "Page size: {:.2} x {:.2}",
                dimensions.width, dimensions.height
            ));
        }
        lines
    }

    fn viewer_title(&self) -> String {
        let name = self
            .view
            .handle()
            .map(|handle| handle.display_name())
            .unwrap_or_default();
        if self.view.open_error().is_some() {
            return format!(" {name} ");
        }
        format!(
            " {name}  page {}/{}  {}% ",
            self.view.current_page() + 1,
            self.view.page_count(),
            self.view.zoom().percent()
        )
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let palette = current_theme();
        let toggle_label = self.measurement.toggle_label();
        let measuring = self.measurement.is_measuring();
        let readout = self.readout_lines();

        let layout = AppLayout::compute(
            f.area(),
            toggle_label,
            if readout.is_empty() { 0 } else { readout.len() + 1 },
            self.view.is_mounted(),
        );

        ui::render_header(f, layout.header, palette);
        ui::render_toolbar(f, &layout, toggle_label, measuring, palette);
        self.outline.render(
            f,
            layout.outline,
            palette,
            self.backend.is_pending(RequestKind::TableOfContents),
        );
        ui::render_data_table(f, layout.data_table, palette);

        if let Some(area) = layout.readout {
            ui::render_readout(f, area, &readout, palette);
        }

        if let (Some(frame), Some(inner)) = (layout.viewer, layout.viewer_inner()) {
            f.render_widget(ui::viewer_block(self.viewer_title(), measuring, palette), frame);
            let markers = self.measurement.points().points();
            self.view.render(f.buffer_mut(), inner, &markers, palette);
        }

        ui::render_status(
            f,
            layout.status,
            self.notifications.current(),
            !self.backend.is_idle(),
            palette,
        );

        let screen = f.area();
        self.picker.render(f, screen, palette);
        self.layout = Some(layout);
    }
}

pub fn run_app_with_event_source<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event_source: &mut dyn EventSource,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let tick_rate = Duration::from_millis(50);
    let mut last_tick = std::time::Instant::now();
    let mut first_render = true;

    loop {
        let mut events_processed = 0;
        let mut should_quit = false;

        while event_source.poll(Duration::from_millis(0))? && events_processed < 50 {
            let event = event_source.read()?;
            events_processed += 1;

            if app.handle_event(&event) == Some(AppAction::Quit) {
                should_quit = true;
                break;
            }
        }

        let mut needs_redraw = events_processed > 0 || first_render;
        first_render = false;

        if app.poll_backend() {
            needs_redraw = true;
        }

        if last_tick.elapsed() >= tick_rate {
            if app.notifications.update() {
                needs_redraw = true;
            }
            last_tick = std::time::Instant::now();
        }

        if needs_redraw {
            terminal.draw(|f| app.draw(f))?;
        }

        if should_quit {
            if !app.backend_idle() {
                warn!("Quitting with backend requests still in flight");
            }
            return Ok(());
        }

        // If no events were processed, wait a bit to avoid busy-waiting
        if events_processed == 0 {
            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_secs(0));
            let _ = event_source.poll(timeout);
        }
    }
}
