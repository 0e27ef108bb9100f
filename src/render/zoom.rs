//! Zoom state for the page viewer

/// Zoom factor applied on top of fit-to-viewer scaling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zoom {
    /// Current zoom factor (1.0 = page fits the viewer)
    pub factor: f32,
    initial: f32,
}

impl Default for Zoom {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Zoom {
    /// Zoom in rate multiplier per step - 10%
    pub const ZOOM_IN_RATE: f32 = 1.1;
    /// Zoom out rate divisor per step - 10%
    pub const ZOOM_OUT_RATE: f32 = 1.1;
    /// Minimum allowed zoom factor
    pub const MIN_SCALE: f32 = 0.1;
    /// Maximum allowed zoom factor
    pub const MAX_SCALE: f32 = 8.0;

    #[must_use]
    pub fn new(initial: f32) -> Self {
        let initial = Self::clamp_factor(initial);
        Self {
            factor: initial,
            initial,
        }
    }

    /// Returns the current zoom factor
    #[must_use]
    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Zoom in by one step
    pub fn step_in(&mut self) {
        self.factor = Self::clamp_factor(self.factor * Self::ZOOM_IN_RATE);
    }

    /// Zoom out by one step
    pub fn step_out(&mut self) {
        self.factor = Self::clamp_factor(self.factor / Self::ZOOM_OUT_RATE);
    }

    /// Back to the configured starting zoom
    pub fn reset(&mut self) {
        self.factor = self.initial;
    }

    #[must_use]
    pub fn percent(&self) -> u32 {
        (self.factor * 100.0).round() as u32
    }

    fn clamp_factor(factor: f32) -> f32 {
        if factor.is_finite() {
            factor.clamp(Self::MIN_SCALE, Self::MAX_SCALE)
        } else {
            1.0
        }
    }
}
