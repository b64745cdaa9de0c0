//! Document, build session and navigator working together.

use std::time::Duration;

use natty_engine::{App, BuildEvent, BuildState, Document, Focus, NattyConfig, Severity};

use crate::common::{FAILING_MAKEFILE, project};

const BUILD: &str = r#"
[build]
command = "echo compiling {target}; echo 'src/parser.c:42: error: expected expression' >&2; echo 'src/lexer.c(7): warning: unused variable' >&2; exit 2"

[editor]
command = "true {0} {1}"
"#;

async fn settle(app: &mut App) {
    for _ in 0..500 {
        app.tick();
        if !app.document().state().is_building() && !app.is_opening() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("app never settled");
}

#[tokio::test]
async fn build_events_arrive_in_order() {
    let proj = project(FAILING_MAKEFILE, Some(BUILD));
    let (mut doc, mut events) =
        Document::open_with(proj.path(), Some(&NattyConfig::default())).unwrap();
    doc.build().unwrap();
    while doc.state().is_building() {
        doc.session_mut().process_next().await;
    }

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert_eq!(seen.first(), Some(&BuildEvent::StateChanged(BuildState::Building)));
    assert!(matches!(seen.get(1), Some(BuildEvent::CommandEcho(line)) if line.starts_with("echo compiling all")));
    assert_eq!(seen.last(), Some(&BuildEvent::StateChanged(BuildState::Built(2))));

    let diagnostics: Vec<_> = seen
        .iter()
        .filter_map(|e| match e {
            BuildEvent::Diagnostic(d) => Some(d.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(diagnostics.len(), 2);
    assert_eq!(diagnostics, doc.diagnostics());

    let error = &doc.diagnostics()[0];
    assert_eq!(error.severity(), Severity::Error);
    let opened = doc.navigator().open(error.file(), error.line()).unwrap();
    assert!(opened.ends_with("src/parser.c"));
    assert!(opened.starts_with(doc.path()));
}

#[tokio::test]
async fn app_walks_from_failure_to_editor() {
    let proj = project(FAILING_MAKEFILE, Some(BUILD));
    let (doc, events) = Document::open_with(proj.path(), Some(&NattyConfig::default())).unwrap();
    let mut app = App::new(doc, events);

    app.build();
    settle(&mut app).await;
    assert_eq!(app.document().state(), BuildState::Built(2));
    assert_eq!(app.focus(), Focus::Diagnostics);
    assert_eq!(app.status().text(), "1 errors, 1 warnings");

    app.move_down();
    app.open_selected();
    settle(&mut app).await;
    assert_eq!(app.notice(), None);
    assert!(!app.take_bell());

    // A transcript line with a reference opens too.
    app.toggle_focus();
    let index = app
        .transcript()
        .iter()
        .position(|l| l.text.contains("parser.c:42"))
        .unwrap();
    while app.transcript_cursor() != Some(index) {
        app.move_up();
    }
    app.open_selected();
    settle(&mut app).await;
    assert_eq!(app.notice(), None);
    assert!(!app.take_bell());
}

#[tokio::test]
async fn rebuild_after_cancel_starts_clean() {
    let proj = project(
        FAILING_MAKEFILE,
        Some("[build]\ncommand = \"echo 'src/parser.c:1: error: first' >&2; sleep 30\"\n"),
    );
    let (doc, events) = Document::open_with(proj.path(), Some(&NattyConfig::default())).unwrap();
    let mut app = App::new(doc, events);

    app.build();
    for _ in 0..500 {
        app.tick();
        if !app.diagnostics().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(app.diagnostics().len(), 1);

    app.cancel();
    settle(&mut app).await;
    assert_eq!(app.document().state(), BuildState::Canceled);
    assert!(app.diagnostics().is_empty());

    app.build();
    app.tick();
    assert!(app.document().state().is_building());
    assert!(app.diagnostics().is_empty());
    app.quit();
    assert!(app.should_quit());
}
