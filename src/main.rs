use std::{fs::File, io::stdout, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{error, info};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{Config, LevelFilter, WriteLogger};

use estimator::backend::HttpBackend;
use estimator::event_source::KeyboardEventSource;
use estimator::panic_handler::initialize_panic_handler;
use estimator::render::RendererFactory;
use estimator::{App, run_app_with_event_source, settings};

#[derive(Parser)]
#[command(name = "estimator")]
#[command(about = "Measure distances on PDF drawings through an estimator backend")]
#[command(version)]
struct Args {
    /// PDF to upload on startup
    file: Option<PathBuf>,

    /// Directory the Open PDF picker lists
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Backend base URL, overrides the config file
    #[arg(long)]
    backend_url: Option<String>,

    #[arg(long, default_value = "estimator.log")]
    log_file: PathBuf,

    /// Log at debug level
    #[arg(long)]
    debug: bool,
}

#[cfg(feature = "pdf")]
fn page_renderers() -> RendererFactory {
    RendererFactory::new(estimator::render::MupdfRenderer::new)
}

#[cfg(not(feature = "pdf"))]
fn page_renderers() -> RendererFactory {
    RendererFactory::new(estimator::render::BlankRenderer::default)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    WriteLogger::init(
        level,
        Config::default(),
        File::create(&args.log_file)
            .with_context(|| format!("cannot create log file {:?}", args.log_file))?,
    )?;

    info!("Starting estimator");

    settings::load_settings();
    let mut settings = settings::get_settings();
    if let Some(url) = args.backend_url {
        settings.backend_url = url;
    }
    let backend = HttpBackend::new(
        settings.backend_url.clone(),
        Duration::from_secs(settings.request_timeout_secs),
    )
    .context("cannot build HTTP client")?;
    info!("Using backend at {}", backend.base_url());

    let mut app = App::new(&settings, Arc::new(backend), page_renderers(), args.dir);
    if let Some(file) = args.file {
        app.select_file(file);
    }

    initialize_panic_handler();

    // Terminal initialization
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut event_source = KeyboardEventSource;
    let res = run_app_with_event_source(&mut terminal, &mut app, &mut event_source);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("Application error: {err:?}");
        println!("{err:?}");
    }

    info!("Shutting down estimator");
    Ok(())
}
