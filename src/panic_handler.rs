//! Panic reporting that leaves the terminal usable

use std::io::{self, Write};
use std::panic;

use crossterm::{
    cursor::Show,
    event::DisableMouseCapture,
    execute,
    terminal::{LeaveAlternateScreen, disable_raw_mode},
};
use log::error;

/// Debug builds report through `better_panic`, release builds write a
/// `human_panic` crash report. Either way the panic is logged and the
/// terminal is restored before the report prints.
pub fn initialize_panic_handler() {
    #[cfg(debug_assertions)]
    better_panic::install();

    #[cfg(not(debug_assertions))]
    human_panic::setup_panic!();

    let report = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        error!("Panic: {info}");
        restore_terminal();
        report(info);
        std::process::exit(1);
    }));
}

/// Leave raw mode, the alternate screen and mouse capture, then show the cursor
pub fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture, Show);
    let _ = writeln!(io::stderr());
}
