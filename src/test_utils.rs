pub mod test_helpers {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use crate::App;
    use crate::backend::{
        Backend, BackendError, MeasureRequest, MeasurementResult, OutlineEntry, PageDimensions,
    };
    use crate::event_source::{Event, KeyCode, KeyModifiers, SimulatedEventSource};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    /// Builder for creating test scenarios with simulated user input
    pub struct TestScenarioBuilder {
        events: Vec<Event>,
    }

    impl Default for TestScenarioBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestScenarioBuilder {
        pub fn new() -> Self {
            Self { events: Vec::new() }
        }

        pub fn press_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::char_key(c));
            self
        }

        pub fn press_enter(mut self) -> Self {
            self.events.push(SimulatedEventSource::key_event(
                KeyCode::Enter,
                KeyModifiers::empty(),
            ));
            self
        }

        pub fn press_esc(mut self) -> Self {
            self.events.push(SimulatedEventSource::key_event(
                KeyCode::Esc,
                KeyModifiers::empty(),
            ));
            self
        }

        /// Move the picker highlight down n times (press 'j' n times)
        pub fn navigate_down(mut self, times: usize) -> Self {
            for _ in 0..times {
                self.events.push(SimulatedEventSource::char_key('j'));
            }
            self
        }

        /// Left click at a terminal cell
        pub fn click(mut self, column: u16, row: u16) -> Self {
            self.events
                .push(SimulatedEventSource::left_click(column, row));
            self
        }

        /// Quit the application (press 'q')
        pub fn quit(mut self) -> Self {
            self.events.push(SimulatedEventSource::char_key('q'));
            self
        }

        pub fn build(self) -> SimulatedEventSource {
            SimulatedEventSource::new(self.events)
        }
    }

    /// Create a test terminal for snapshot testing
    pub fn create_test_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
        let backend = TestBackend::new(width, height);
        Terminal::new(backend).unwrap()
    }

    /// Capture the current terminal buffer as a string
    pub fn capture_terminal_state(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut lines = Vec::new();

        for y in 0..buffer.area.height {
            let mut line = String::new();
            for x in 0..buffer.area.width {
                line.push_str(buffer[(x, y)].symbol());
            }
            lines.push(line.trim_end().to_string());
        }

        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }

        lines.join("\n")
    }

    /// Poll until every backend request has been answered and applied
    pub fn settle(app: &mut App) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !app.backend_idle() {
            assert!(Instant::now() < deadline, "backend did not settle in time");
            app.poll_backend();
            std::thread::sleep(Duration::from_millis(5));
        }
        app.poll_backend();
    }

    /// Draw until the viewer is no longer waiting on the render thread
    pub fn draw_settled(terminal: &mut Terminal<TestBackend>, app: &mut App) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            terminal.draw(|f| app.draw(f)).unwrap();
            if !app.page_view().is_rendering() {
                return;
            }
            assert!(Instant::now() < deadline, "page did not render in time");
            std::thread::sleep(Duration::from_millis(5));
            app.poll_backend();
        }
    }

    /// Scripted outcome: `Err((status, detail))` becomes a `BackendError::Status`
    pub type Outcome<T> = Result<T, (u16, String)>;

    #[derive(Debug, Clone, PartialEq)]
    pub enum BackendCall {
        Upload { file_name: String, len: usize },
        TableOfContents,
        Measure(MeasureRequest),
        Dimensions(u32),
    }

    /// In-memory [`Backend`] that records every call and answers from
    /// per-operation scripts, falling back to a success when a script is empty.
    ///
    /// The fallback measurement reports the absolute x and y distance between
    /// the two points and their euclidean distance.
    #[derive(Default)]
    pub struct RecordingBackend {
        calls: Mutex<Vec<BackendCall>>,
        uploads: Mutex<VecDeque<Outcome<()>>>,
        outlines: Mutex<VecDeque<Outcome<Vec<OutlineEntry>>>>,
        measurements: Mutex<VecDeque<Outcome<MeasurementResult>>>,
        dimensions: Mutex<VecDeque<Outcome<PageDimensions>>>,
    }

    impl RecordingBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<BackendCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn script_upload(&self, outcome: Outcome<()>) {
            self.uploads.lock().unwrap().push_back(outcome);
        }

        pub fn script_outline(&self, outcome: Outcome<Vec<OutlineEntry>>) {
            self.outlines.lock().unwrap().push_back(outcome);
        }

        pub fn script_measure(&self, outcome: Outcome<MeasurementResult>) {
            self.measurements.lock().unwrap().push_back(outcome);
        }

        pub fn script_dimensions(&self, outcome: Outcome<PageDimensions>) {
            self.dimensions.lock().unwrap().push_back(outcome);
        }

        fn record(&self, call: BackendCall) {
            self.calls.lock().unwrap().push(call);
        }

        fn answer<T>(script: &Mutex<VecDeque<Outcome<T>>>, fallback: T) -> Result<T, BackendError> {
            match script.lock().unwrap().pop_front() {
                Some(Ok(value)) => Ok(value),
                Some(Err((status, detail))) => Err(BackendError::Status { status, detail }),
                None => Ok(fallback),
            }
        }
    }

    impl Backend for RecordingBackend {
        fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<(), BackendError> {
            self.record(BackendCall::Upload {
                file_name: file_name.to_string(),
                len: bytes.len(),
            });
            Self::answer(&self.uploads, ())
        }

        fn table_of_contents(&self) -> Result<Vec<OutlineEntry>, BackendError> {
            self.record(BackendCall::TableOfContents);
            Self::answer(&self.outlines, Vec::new())
        }

        fn measure(&self, request: &MeasureRequest) -> Result<MeasurementResult, BackendError> {
            self.record(BackendCall::Measure(*request));
            let width = (request.x2 - request.x1).abs();
            let height = (request.y2 - request.y1).abs();
            Self::answer(
                &self.measurements,
                MeasurementResult {
                    width,
                    height,
                    diagonal: width.hypot(height),
                },
            )
        }

        fn page_dimensions(&self, page_num: u32) -> Result<PageDimensions, BackendError> {
            self.record(BackendCall::Dimensions(page_num));
            Self::answer(
                &self.dimensions,
                PageDimensions {
                    width: 612.0,
                    height: 792.0,
                },
            )
        }
    }
}
