use std::sync::Arc;

use estimator::backend::OutlineEntry;
use estimator::event_source::SimulatedEventSource;
use estimator::outline::EMPTY_OUTLINE_TEXT;
use estimator::render::{BlankRenderer, RendererFactory};
use estimator::settings::{ErrorDisplay, Settings};
use estimator::test_utils::test_helpers::{
    BackendCall, RecordingBackend, capture_terminal_state, create_test_terminal, settle,
};
use estimator::ui::ToolbarAction;
use estimator::App;

fn entry(title: &str, page: u32, level: u32) -> OutlineEntry {
    OutlineEntry {
        title: title.to_string(),
        page,
        level,
    }
}

fn new_app(settings: &Settings, backend: &Arc<RecordingBackend>) -> App {
    App::new(
        settings,
        backend.clone(),
        RendererFactory::new(BlankRenderer::default),
        ".",
    )
}

#[test]
fn placeholder_shows_until_the_outline_is_learned() {
    let backend = Arc::new(RecordingBackend::new());
    let mut app = new_app(&Settings::default(), &backend);
    let mut terminal = create_test_terminal(300, 60);

    terminal.draw(|f| app.draw(f)).unwrap();
    assert!(capture_terminal_state(&terminal).contains(EMPTY_OUTLINE_TEXT));

    backend.script_outline(Ok(vec![
        entry("General Notes", 1, 0),
        entry("Foundation Plan", 2, 1),
        entry("Footing Details", 3, 2),
    ]));
    app.handle_event(&SimulatedEventSource::char_key('l'));
    settle(&mut app);
    terminal.draw(|f| app.draw(f)).unwrap();

    let screen = capture_terminal_state(&terminal);
    assert!(!screen.contains(EMPTY_OUTLINE_TEXT));
    assert!(screen.contains("│General Notes (Page 1)"));
    assert!(screen.contains("│  Foundation Plan (Page 2)"));
    assert!(screen.contains("│    Footing Details (Page 3)"));
}

#[test]
fn success_replaces_and_failure_keeps_the_list() {
    let backend = Arc::new(RecordingBackend::new());
    let settings = Settings {
        error_display: ErrorDisplay::Notify,
        ..Settings::default()
    };
    let mut app = new_app(&settings, &backend);

    backend.script_outline(Ok(vec![entry("Old", 1, 0), entry("Stale", 2, 0)]));
    backend.script_outline(Ok(vec![entry("Cover", 1, 0)]));
    backend.script_outline(Err((400, "No PDF loaded".to_string())));

    app.load_outline();
    settle(&mut app);
    assert_eq!(app.outline().entries().len(), 2);

    app.load_outline();
    settle(&mut app);
    assert_eq!(app.outline().entries(), &[entry("Cover", 1, 0)]);

    app.load_outline();
    settle(&mut app);
    assert_eq!(app.outline().entries(), &[entry("Cover", 1, 0)]);
    assert!(
        app.notifications
            .current()
            .is_some_and(|n| n.message.contains("No PDF loaded"))
    );
    assert_eq!(
        backend.calls(),
        vec![BackendCall::TableOfContents; 3]
    );
}

#[test]
fn learn_doc_button_requests_the_outline() {
    let backend = Arc::new(RecordingBackend::new());
    let mut app = new_app(&Settings::default(), &backend);
    let mut terminal = create_test_terminal(120, 40);
    terminal.draw(|f| app.draw(f)).unwrap();

    let button = app
        .layout()
        .unwrap()
        .buttons
        .iter()
        .find(|(action, _)| *action == ToolbarAction::LearnDoc)
        .map(|(_, rect)| *rect)
        .unwrap();
    app.handle_event(&SimulatedEventSource::left_click(button.x + 2, button.y));
    settle(&mut app);

    assert_eq!(backend.calls(), vec![BackendCall::TableOfContents]);
}

#[test]
fn configured_indent_is_applied() {
    let backend = Arc::new(RecordingBackend::new());
    let settings = Settings {
        outline_indent: 4,
        ..Settings::default()
    };
    let mut app = new_app(&settings, &backend);
    backend.script_outline(Ok(vec![entry("Section", 7, 1)]));

    app.load_outline();
    settle(&mut app);

    let outline = app.outline();
    assert_eq!(
        outline.entry_text(&outline.entries()[0]),
        "    Section (Page 7)"
    );
}

#[test]
fn failed_first_fetch_keeps_the_placeholder_on_screen() {
    let backend = Arc::new(RecordingBackend::new());
    let settings = Settings {
        error_display: ErrorDisplay::Notify,
        ..Settings::default()
    };
    let mut app = new_app(&settings, &backend);
    let mut terminal = create_test_terminal(300, 60);
    backend.script_outline(Err((400, "No PDF loaded".to_string())));

    app.handle_event(&SimulatedEventSource::char_key('l'));
    settle(&mut app);
    terminal.draw(|f| app.draw(f)).unwrap();

    assert!(app.outline().is_empty());
    let screen = capture_terminal_state(&terminal);
    assert!(screen.contains(EMPTY_OUTLINE_TEXT));
    assert!(screen.contains("No PDF loaded"));
}

#[test]
fn very_deep_entries_still_draw() {
    let backend = Arc::new(RecordingBackend::new());
    let mut app = new_app(&Settings::default(), &backend);
    let mut terminal = create_test_terminal(120, 40);
    backend.script_outline(Ok(vec![
        entry("Cover", 1, 0),
        entry("Buried", 9, u32::MAX),
    ]));

    app.load_outline();
    settle(&mut app);
    terminal.draw(|f| app.draw(f)).unwrap();

    let screen = capture_terminal_state(&terminal);
    assert!(screen.contains("│Cover (Page 1)"));
    assert!(!screen.contains("Buried"));
}
