use crate::{
    markers::{
        Marker,
        TapPosition,
    },
    progress::{
        PROGRESS_CAP,
        Progression,
    },
    session::{
        SessionPhase,
        SessionSnapshot,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEventKind,
        KeyModifiers,
        MouseButton,
        MouseEventKind,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;
use unicode_width::UnicodeWidthStr;

const BUTTON_WIDTH: u16 = 34;
const COIN_ART: [&str; 5] = [
    "  .-''''-.  ",
    " /  $$$$  \\ ",
    "|   TAP    |",
    " \\  $$$$  / ",
    "  '-....-'  ",
];

pub enum UserEvent {
    Quit,
    Tap(TapPosition),
    Redraw,
}

pub type InputEventReceiver = EventStream;

#[derive(Default)]
pub struct UiState {
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
    /// Inner area of the coin button from the last draw, if one was drawn.
    button_area: Option<Rect>,
}

impl UiState {
    pub fn set_button_area(&mut self, area: Option<Rect>) {
        self.button_area = area;
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::event::DisableMouseCapture,
        crossterm::terminal::LeaveAlternateScreen
    )?;
    Ok(())
}

pub fn input_event_stream() -> InputEventReceiver {
    EventStream::new()
}

pub async fn next_raw_event(events: &mut InputEventReceiver) -> Result<Event> {
    events
        .next()
        .await
        .ok_or_else(|| eyre!("terminal input stream closed"))?
        .wrap_err("failed to read terminal event")
}

pub fn draw(state: &mut UiState, snap: &SessionSnapshot) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        let mut button = None;
        let res = term.draw(|f| button = render(f, snap)).map(|_| ());
        state.terminal = Some(term);
        res?;
        state.button_area = button;
    }
    Ok(())
}

/// Maps a raw terminal event onto a game action.
///
/// Mouse clicks only count as taps inside the coin button drawn last;
/// the keyboard tap lands in the middle of the button.
pub fn interpret_event(state: &UiState, event: Event) -> Option<UserEvent> {
    match event {
        Event::Key(k) => {
            if k.kind != KeyEventKind::Press {
                return None;
            }
            match k.code {
                KeyCode::Char('q') | KeyCode::Esc => Some(UserEvent::Quit),
                KeyCode::Char('c') if k.modifiers.contains(KeyModifiers::CONTROL) => {
                    Some(UserEvent::Quit)
                }
                KeyCode::Char(' ') | KeyCode::Enter => {
                    let area = state.button_area?;
                    Some(UserEvent::Tap(TapPosition {
                        x: area.width / 2,
                        y: area.height / 2,
                    }))
                }
                _ => None,
            }
        }
        Event::Mouse(m) => {
            if m.kind != MouseEventKind::Down(MouseButton::Left) {
                return None;
            }
            let area = state.button_area?;
            if !area.contains(Position::new(m.column, m.row)) {
                return None;
            }
            Some(UserEvent::Tap(TapPosition {
                x: m.column - area.x,
                y: m.row - area.y,
            }))
        }
        Event::Resize(_, _) => Some(UserEvent::Redraw),
        _ => None,
    }
}

fn render(f: &mut Frame, snap: &SessionSnapshot) -> Option<Rect> {
    match &snap.phase {
        SessionPhase::Loading => {
            draw_centered_message(f, "Loading...", Style::default());
            None
        }
        SessionPhase::Error(message) => {
            let text = format!("Error loading user data: {message}\n\npress q to quit");
            draw_centered_message(f, &text, Style::default().fg(Color::Red));
            None
        }
        SessionPhase::Ready => Some(draw_game(f, snap)),
    }
}

fn draw_centered_message(f: &mut Frame, text: &str, style: Style) {
    let area = f.area();
    let [_, middle, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(3),
        Constraint::Fill(1),
    ])
    .areas(area);
    let p = Paragraph::new(text.to_string())
        .style(style)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(p, middle);
}

fn draw_game(f: &mut Frame, snap: &SessionSnapshot) -> Rect {
    let area = f.area();
    let column_width = area.width.min(BUTTON_WIDTH + 10);
    let [_, column, _] = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(column_width),
        Constraint::Fill(1),
    ])
    .areas(area);
    let [header, button, progress_info, gauge, status] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(9),
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(2),
    ])
    .areas(column);

    draw_header(f, header, snap);
    let inner = draw_button(f, button, &snap.markers);
    draw_progress(f, progress_info, gauge, snap);
    draw_status(f, status, snap);
    inner
}

fn draw_header(f: &mut Frame, area: Rect, snap: &SessionSnapshot) {
    let block = Block::default().borders(Borders::ALL);
    let inner = block.inner(area);
    let line = header_line(snap.coins, snap.level, inner.width);
    f.render_widget(block, area);
    f.render_widget(
        Paragraph::new(line).style(Style::default().add_modifier(Modifier::BOLD)),
        inner,
    );
}

/// Coin count on the left, level on the right, padded to `width` columns.
pub fn header_line(coins: u64, level: u32, width: u16) -> String {
    let left = format!("🪙 {coins}");
    let right = format!("Level {level}");
    let used = left.width() + right.width();
    let pad = (width as usize).saturating_sub(used).max(1);
    format!("{left}{}{right}", " ".repeat(pad))
}

fn draw_button(f: &mut Frame, area: Rect, markers: &[Marker]) -> Rect {
    let width = area.width.min(BUTTON_WIDTH);
    let [_, button, _] = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(width),
        Constraint::Fill(1),
    ])
    .areas(area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" tap me ");
    let inner = block.inner(button);
    f.render_widget(block, button);

    let art_height = COIN_ART.len() as u16;
    let top = inner.y + inner.height.saturating_sub(art_height) / 2;
    let art_area = Rect::new(inner.x, top, inner.width, art_height.min(inner.height));
    let art = COIN_ART
        .iter()
        .map(|row| Line::from(*row))
        .collect::<Vec<_>>();
    f.render_widget(
        Paragraph::new(art)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Yellow)),
        art_area,
    );

    for marker in markers {
        if let Some(rect) = marker_rect(inner, marker) {
            f.render_widget(
                Paragraph::new("+1").style(
                    Style::default()
                        .fg(Color::LightGreen)
                        .add_modifier(Modifier::BOLD),
                ),
                rect,
            );
        }
    }
    inner
}

/// Cell range for a marker inside the button, clipped away if it no longer fits.
pub fn marker_rect(inner: Rect, marker: &Marker) -> Option<Rect> {
    if marker.y >= inner.height || marker.x >= inner.width {
        return None;
    }
    let width = 2.min(inner.width - marker.x);
    Some(Rect::new(inner.x + marker.x, inner.y + marker.y, width, 1))
}

fn draw_progress(f: &mut Frame, info: Rect, gauge_area: Rect, snap: &SessionSnapshot) {
    let text = Line::from(vec![
        Span::styled("⚡ ", Style::default().fg(Color::Yellow)),
        Span::raw(format!("{}/{}", snap.progress, PROGRESS_CAP)),
    ]);
    f.render_widget(Paragraph::new(text).alignment(Alignment::Center), info);
    let percent = Progression {
        progress: snap.progress,
        level: snap.level,
    }
    .percent();
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Yellow).bg(Color::Black))
        .percent(percent)
        .label("");
    f.render_widget(gauge, gauge_area);
}

fn draw_status(f: &mut Frame, area: Rect, snap: &SessionSnapshot) {
    let mut lines = vec![Line::from(sync_summary(snap))];
    if let Some(last) = snap.errors.last() {
        lines.push(Line::from(Span::styled(
            last.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    f.render_widget(
        Paragraph::new(lines).style(Style::default().fg(Color::Gray)),
        area,
    );
}

pub fn sync_summary(snap: &SessionSnapshot) -> String {
    let who = snap.username.as_deref().unwrap_or("anonymous");
    let synced = match (snap.player_id.as_ref(), snap.last_synced) {
        (None, _) => "offline".to_string(),
        (Some(_), Some(at)) => format!("synced {}", at.format("%H:%M:%S")),
        (Some(_), None) => "not synced yet".to_string(),
    };
    let mut summary = format!("{who} | {synced}");
    if snap.pending_writes > 0 {
        summary.push_str(&format!(" | pending {}", snap.pending_writes));
    }
    if snap.failed_writes > 0 {
        summary.push_str(&format!(" | failed {}", snap.failed_writes));
    }
    summary
}
