//! Two-click measurement state machine
//!
//! While measuring, each click on the rendered page contributes one point.
//! The second point immediately turns the pair into a backend request and
//! empties the buffer, so a third click always starts a fresh pair.

use crate::backend::{BackendError, MeasureRequest, MeasurementResult};

/// Page sent with every measurement. Multi-page measurement is not supported.
pub const MEASURE_PAGE: u32 = 0;

/// Position in element-local pixels of the rendered page
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MeasurementMode {
    #[default]
    Idle,
    Measuring,
}

/// Points collected toward the next measurement.
///
/// Holding two points is never an observable state: the second point is
/// handed out together with the first and the buffer is left empty.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointBuffer {
    first: Option<Point>,
}

impl PointBuffer {
    /// Add a point; returns the completed pair when this was the second one
    pub fn push(&mut self, point: Point) -> Option<(Point, Point)> {
        match self.first.take() {
            Some(first) => Some((first, point)),
            None => {
                self.first = Some(point);
                None
            }
        }
    }

    pub fn clear(&mut self) {
        self.first = None;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.first.is_some())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    #[must_use]
    pub fn points(&self) -> Vec<Point> {
        self.first.into_iter().collect()
    }
}

/// Inputs to the measurement controller
#[derive(Debug)]
pub enum Command {
    /// Enter or leave measuring mode
    ToggleMeasure,
    /// Click on the rendered page
    PageClick(Point),
    /// Backend answered a measurement request
    Completed(Result<MeasurementResult, BackendError>),
}

/// Work the owner has to carry out after a command
#[derive(Debug)]
pub enum Effect {
    /// Send this request to the backend
    Measure(MeasureRequest),
    /// Hand this failure to the error policy
    Report(BackendError),
}

#[derive(Debug, Default)]
pub struct MeasurementController {
    mode: MeasurementMode,
    points: PointBuffer,
    result: Option<MeasurementResult>,
}

impl MeasurementController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::ToggleMeasure => {
                self.mode = match self.mode {
                    MeasurementMode::Idle => MeasurementMode::Measuring,
                    MeasurementMode::Measuring => MeasurementMode::Idle,
                };
                self.points.clear();
                vec![]
            }

            Command::PageClick(point) => {
                if self.mode == MeasurementMode::Idle {
                    return vec![];
                }
                match self.points.push(point) {
                    Some((a, b)) => vec![Effect::Measure(MeasureRequest {
                        page_num: MEASURE_PAGE,
                        x1: a.x,
                        y1: a.y,
                        x2: b.x,
                        y2: b.y,
                    })],
                    None => vec![],
                }
            }

            Command::Completed(Ok(result)) => {
                self.result = Some(result);
                vec![]
            }

            // Previous result stays on screen
            Command::Completed(Err(error)) => vec![Effect::Report(error)],
        }
    }

    #[must_use]
    pub fn mode(&self) -> MeasurementMode {
        self.mode
    }

    #[must_use]
    pub fn is_measuring(&self) -> bool {
        self.mode == MeasurementMode::Measuring
    }

    #[must_use]
    pub fn points(&self) -> &PointBuffer {
        &self.points
    }

    #[must_use]
    pub fn result(&self) -> Option<&MeasurementResult> {
        self.result.as_ref()
    }

    /// Toolbar label for the toggle
    #[must_use]
    pub fn toggle_label(&self) -> &'static str {
        match self.mode {
            MeasurementMode::Idle => "Measure",
            MeasurementMode::Measuring => "Cancel Measure",
        }
    }

    /// Readout lines, two decimals each
    #[must_use]
    pub fn readout(&self) -> Option<[String; 3]> {
        self.result.map(|m| {
            [
                format!("Width: {:.2}", m.width),
                format!("Height: {:.2}", m.height),
                format!("Diagonal: {:.2}", m.diagonal),
            ]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measuring() -> MeasurementController {
        let mut controller = MeasurementController::new();
        let effects = controller.apply(Command::ToggleMeasure);
        assert!(effects.is_empty());
        controller
    }

    fn sample_result() -> MeasurementResult {
        MeasurementResult {
            width: 40.0,
            height: 40.0,
            diagonal: 56.568_542,
        }
    }

    #[test]
    fn toggle_is_its_own_inverse() {
        let mut controller = MeasurementController::new();
        let _ = controller.apply(Command::ToggleMeasure);
        let _ = controller.apply(Command::PageClick(Point::new(1.0, 2.0)));
        assert_eq!(controller.points().len(), 1);

        let _ = controller.apply(Command::ToggleMeasure);
        assert_eq!(controller.mode(), MeasurementMode::Idle);
        assert!(controller.points().is_empty());

        let _ = controller.apply(Command::ToggleMeasure);
        let _ = controller.apply(Command::ToggleMeasure);
        assert_eq!(controller.mode(), MeasurementMode::Idle);
        assert!(controller.points().is_empty());
    }

    #[test]
    fn clicks_are_ignored_when_idle() {
        let mut controller = MeasurementController::new();
        let effects = controller.apply(Command::PageClick(Point::new(5.0, 5.0)));
        assert!(effects.is_empty());
        assert!(controller.points().is_empty());
    }

    #[test]
    fn second_click_sends_request_and_empties_buffer() {
        let mut controller = measuring();

        let effects = controller.apply(Command::PageClick(Point::new(100.0, 50.0)));
        assert!(effects.is_empty());
        assert_eq!(controller.points().points(), vec![Point::new(100.0, 50.0)]);

        let effects = controller.apply(Command::PageClick(Point::new(140.0, 90.0)));
        match effects.as_slice() {
            [Effect::Measure(request)] => assert_eq!(
                *request,
                MeasureRequest {
                    page_num: 0,
                    x1: 100.0,
                    y1: 50.0,
                    x2: 140.0,
                    y2: 90.0,
                }
            ),
            other => panic!("unexpected effects: {other:?}"),
        }
        assert!(controller.points().is_empty());
        assert!(controller.is_measuring());
    }

    #[test]
    fn buffer_never_exceeds_bound() {
        let mut controller = measuring();
        let mut requests = 0;

        for i in 0..7 {
            let effects = controller.apply(Command::PageClick(Point::new(f64::from(i), 0.0)));
            requests += effects.len();
            assert!(controller.points().len() <= 2);
        }

        assert_eq!(requests, 3);
        assert_eq!(controller.points().len(), 1);
    }

    #[test]
    fn success_replaces_result() {
        let mut controller = measuring();
        let _ = controller.apply(Command::Completed(Ok(sample_result())));
        assert_eq!(
            controller.readout().unwrap(),
            [
                "Width: 40.00".to_string(),
                "Height: 40.00".to_string(),
                "Diagonal: 56.57".to_string(),
            ]
        );

        let newer = MeasurementResult {
            width: 1.0,
            height: 2.0,
            diagonal: 3.0,
        };
        let _ = controller.apply(Command::Completed(Ok(newer)));
        assert_eq!(controller.result(), Some(&newer));
    }

    #[test]
    fn failure_keeps_stale_result_and_reports() {
        let mut controller = measuring();
        let _ = controller.apply(Command::Completed(Ok(sample_result())));

        let effects = controller.apply(Command::Completed(Err(BackendError::Status {
            status: 500,
            detail: "boom".to_string(),
        })));

        assert!(matches!(effects.as_slice(), [Effect::Report(_)]));
        assert_eq!(controller.result(), Some(&sample_result()));
    }

    #[test]
    fn completion_after_leaving_mode_is_still_applied() {
        let mut controller = measuring();
        let _ = controller.apply(Command::PageClick(Point::new(0.0, 0.0)));
        let _ = controller.apply(Command::PageClick(Point::new(3.0, 4.0)));
        let _ = controller.apply(Command::ToggleMeasure);

        let _ = controller.apply(Command::Completed(Ok(sample_result())));
        assert_eq!(controller.mode(), MeasurementMode::Idle);
        assert!(controller.result().is_some());
    }

    #[test]
    fn toggle_label_follows_mode() {
        let mut controller = MeasurementController::new();
        assert_eq!(controller.toggle_label(), "Measure");
        let _ = controller.apply(Command::ToggleMeasure);
        assert_eq!(controller.toggle_label(), "Cancel Measure");
    }
}
