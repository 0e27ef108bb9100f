// Export modules for use in tests
pub mod app;
pub mod backend;
pub mod event_source;
pub mod intake;
pub mod measure;
pub mod notification;
pub mod outline;
pub mod panic_handler;
pub mod render;
pub mod settings;
pub mod theme;
pub mod ui;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export main app components
pub use app::{App, AppAction, run_app_with_event_source};
