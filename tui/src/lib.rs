//! TUI rendering for Natty using ratatui.

mod input;
mod theme;

pub use input::{InputPump, handle_events};
pub use theme::{Glyphs, Palette, UiOptions, glyphs, palette, spinner_frame, styles};

use std::io::{self, Write};

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState},
};
use unicode_width::UnicodeWidthStr;

use natty_engine::{App, BuildState, Focus, LineKind, Severity, StatusTone};

/// Widest file column in the diagnostics table.
const MAX_FILE_COLUMN: usize = 40;
/// Diagnostics rows shown before the table scrolls.
const MAX_DIAGNOSTIC_ROWS: u16 = 8;
const TAB_WIDTH: usize = 4;
const SPINNER_INTERVAL_MS: u128 = 80;

const KEY_HINTS: &str = "b build  c cancel  t target  tab focus  enter open  q quit";

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App, options: UiOptions) {
    let palette = palette(options);
    let glyphs = glyphs(options);
    let bg_block = Block::default().style(Style::default().bg(palette.bg_dark));
    frame.render_widget(bg_block, frame.area());

    let diagnostics_height = diagnostics_height(app);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),                  // Header
            Constraint::Min(3),                     // Transcript
            Constraint::Length(diagnostics_height), // Diagnostics
            Constraint::Length(1),                  // Status bar
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0], &palette, &glyphs, options);
    draw_transcript(frame, app, chunks[1], &palette);
    if diagnostics_height > 0 {
        draw_diagnostics(frame, app, chunks[2], &palette, &glyphs);
    }
    draw_status_bar(frame, app, chunks[3], &palette);
}

/// Ring the terminal bell.
pub fn ring_bell(out: &mut impl Write) -> io::Result<()> {
    out.write_all(b"\x07")?;
    out.flush()
}

/// The diagnostics pane appears once there is something in it, or when focused.
fn diagnostics_height(app: &App) -> u16 {
    let count = app.diagnostics().len();
    if count == 0 && app.focus() != Focus::Diagnostics {
        return 0;
    }
    let rows = u16::try_from(count).unwrap_or(u16::MAX).clamp(1, MAX_DIAGNOSTIC_ROWS);
    rows + 2
}

fn draw_header(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    palette: &Palette,
    glyphs: &Glyphs,
    options: UiOptions,
) {
    let document = app.document();
    let state = document.state();

    let mut spans = vec![
        Span::styled(" natty ", styles::command(palette)),
        Span::styled(document.name(), Style::default().fg(palette.text_primary)),
        Span::raw(" "),
    ];
    match document.target() {
        Some(target) => spans.push(Span::styled(format!(" {target} "), styles::target(palette))),
        None => spans.push(Span::styled("no target", styles::key_hint(palette))),
    }
    spans.push(Span::styled(
        format!(" {} ", glyphs.target_separator),
        styles::key_hint(palette),
    ));

    let state_style = match state {
        BuildState::Built(0) => Style::default().fg(palette.success),
        BuildState::Built(_) => Style::default().fg(palette.error),
        BuildState::Canceled => Style::default().fg(palette.warning),
        BuildState::Idle | BuildState::Building => Style::default().fg(palette.text_secondary),
    };
    spans.push(Span::styled(state.label(), state_style));
    if state.is_building() {
        let elapsed = document.session().elapsed();
        let tick = (elapsed.as_millis() / SPINNER_INTERVAL_MS) as usize;
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            spinner_frame(tick, options),
            Style::default().fg(palette.accent),
        ));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(palette.bg_panel)),
        area,
    );
}

/// First visible line so that `cursor` (or the tail) stays on screen.
fn scroll_offset(total: usize, height: usize, cursor: Option<usize>) -> usize {
    if height == 0 {
        return total;
    }
    match cursor {
        Some(cursor) if cursor >= height => cursor + 1 - height,
        Some(_) => 0,
        None => total.saturating_sub(height),
    }
}

fn draw_transcript(frame: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let focused = app.focus() == Focus::Transcript;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(styles::border(palette, focused))
        .title(" Output ");

    let inner_height = usize::from(area.height.saturating_sub(2));
    let transcript = app.transcript();
    let cursor = app.transcript_cursor();
    let offset = scroll_offset(transcript.len(), inner_height, cursor);

    let lines: Vec<Line> = transcript
        .iter()
        .enumerate()
        .skip(offset)
        .take(inner_height)
        .map(|(index, line)| {
            let mut style = match line.kind {
                LineKind::Command => styles::command(palette),
                LineKind::Stdout => styles::stdout(palette),
                LineKind::Stderr => styles::stderr(palette),
            };
            if cursor == Some(index) {
                style = style.patch(styles::cursor(palette));
            }
            Line::styled(line.text.replace('\t', &" ".repeat(TAB_WIDTH)), style)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_diagnostics(frame: &mut Frame, app: &App, area: Rect, palette: &Palette, glyphs: &Glyphs) {
    let focused = app.focus() == Focus::Diagnostics;
    let diagnostics = app.diagnostics();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(styles::border(palette, focused))
        .title(format!(" Problems ({}) ", diagnostics.len()));

    let file_width = diagnostics
        .iter()
        .map(|d| d.file().width())
        .max()
        .unwrap_or(0)
        .clamp(4, MAX_FILE_COLUMN);

    let rows = diagnostics.iter().map(|d| {
        let (marker, color) = match d.severity() {
            Severity::Error => (glyphs.error, palette.error),
            Severity::Warning => (glyphs.warning, palette.warning),
        };
        Row::new(vec![
            Cell::from(Span::styled(marker, Style::default().fg(color))),
            Cell::from(d.message().to_string()),
            Cell::from(Span::styled(
                d.file().to_string(),
                Style::default().fg(palette.text_secondary),
            )),
            Cell::from(Span::styled(
                d.line().to_string(),
                Style::default().fg(palette.text_muted),
            )),
        ])
        .style(Style::default().fg(palette.text_primary))
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(1),
            Constraint::Min(10),
            Constraint::Length(file_width as u16),
            Constraint::Length(6),
        ],
    )
    .block(block)
    .column_spacing(1)
    .highlight_symbol(glyphs.selected)
    .row_highlight_style(if focused {
        styles::cursor(palette)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    });

    let mut state = TableState::default().with_selected(app.selected_diagnostic());
    frame.render_stateful_widget(table, area, &mut state);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let hints_width = u16::try_from(KEY_HINTS.width()).unwrap_or(u16::MAX);
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(hints_width)])
        .split(area);

    let status = app.status();
    let tone = match status.tone() {
        StatusTone::Normal => Style::default().fg(palette.text_primary),
        StatusTone::Warning => Style::default().fg(palette.warning),
        StatusTone::Error => Style::default()
            .fg(palette.error)
            .add_modifier(Modifier::BOLD),
    };
    let mut spans = vec![Span::raw(" "), Span::styled(status.text().to_string(), tone)];
    if let Some(notice) = app.notice() {
        if !status.text().is_empty() {
            spans.push(Span::styled("  ", tone));
        }
        spans.push(Span::styled(
            notice.to_string(),
            Style::default().fg(palette.warning),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), chunks[0]);
    frame.render_widget(
        Paragraph::new(Span::styled(KEY_HINTS, styles::key_hint(palette))),
        chunks[1],
    );
}
