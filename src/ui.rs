use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};

use crate::{app::App, engine::TargetSource, session::SessionState};

const HORIZONTAL_MARGIN: u16 = 2;
const VERTICAL_MARGIN: u16 = 1;
const BAR_WIDTH: u16 = 6;
const MIN_WIDTH: u16 = 40;
const MIN_HEIGHT: u16 = 12;

impl<T: TargetSource> Widget for &App<T> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
            Paragraph::new("terminal too small")
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .render(area, buf);
            return;
        }

        match self.engine().state() {
            SessionState::Menu => render_menu(self, area, buf),
            SessionState::Playing => render_playing(self, area, buf),
            SessionState::GameOver => render_game_over(self, area, buf),
        }
    }
}

fn centered_lines(lines: Vec<Line<'_>>, area: Rect, buf: &mut Buffer) {
    let height = lines.len() as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(area.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(chunks[1], buf);
}

fn render_menu<T: TargetSource>(app: &App<T>, area: Rect, buf: &mut Buffer) {
    let title_style = Style::default()
        .fg(Color::Rgb(240, 240, 255))
        .add_modifier(Modifier::BOLD);
    let hint_style = Style::default()
        .fg(Color::Rgb(200, 200, 220))
        .add_modifier(Modifier::BOLD);
    let body_style = Style::default().fg(Color::Rgb(190, 190, 210));
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let lines = vec![
        Line::from(Span::styled("Distance Target Combo", title_style)),
        Line::default(),
        Line::from(Span::styled("Press SPACE to start", hint_style)),
        Line::default(),
        Line::from(Span::styled("Controls:", body_style)),
        Line::from(Span::styled(
            "Move your hand over the IR sensor to move the marker",
            body_style,
        )),
        Line::from(Span::styled(
            "Or hold ↑ and ↓ when playing in keyboard mode",
            body_style,
        )),
        Line::default(),
        Line::from(Span::styled(
            format!("input: {}", app.signal_kind()),
            italic_style,
        )),
        Line::from(Span::styled("(space) start / (q) quit", italic_style)),
    ];

    centered_lines(lines, area, buf);
}

fn render_playing<T: TargetSource>(app: &App<T>, area: Rect, buf: &mut Buffer) {
    let engine = app.engine();
    let hud_style = Style::default()
        .fg(Color::Rgb(240, 240, 255))
        .add_modifier(Modifier::BOLD);
    let dim_style = Style::default().fg(Color::Rgb(210, 210, 230));
    let italic_style = Style::default()
        .fg(Color::Rgb(200, 200, 220))
        .add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // score / time
            Constraint::Length(1), // hits / streak
            Constraint::Length(1), // padding
            Constraint::Min(4),    // bar
            Constraint::Length(1), // padding
            Constraint::Length(1), // hint
        ])
        .split(area);

    Paragraph::new(Span::styled(format!("Score: {}", engine.score()), hud_style))
        .render(chunks[0], buf);
    Paragraph::new(Span::styled(
        format!("Time: {:4.1}s", engine.time_left()),
        hud_style,
    ))
    .alignment(Alignment::Right)
    .render(chunks[0], buf);

    Paragraph::new(Span::styled(
        format!(
            "Hits: {}   Streak: {}",
            engine.hits(),
            engine.current_streak()
        ),
        dim_style,
    ))
    .render(chunks[1], buf);
    Paragraph::new(Span::styled(
        format!("input: {}", app.signal_kind()),
        italic_style,
    ))
    .alignment(Alignment::Right)
    .render(chunks[1], buf);

    render_bar(app, chunks[3], buf);

    Paragraph::new(Span::styled(
        "Adjust your hand to bring the marker onto the target",
        italic_style,
    ))
    .alignment(Alignment::Center)
    .render(chunks[5], buf);
}

/// Maps a normalized value to a row inside `area`, 1.0 at the top.
pub fn row_for(value: f64, area: Rect) -> u16 {
    let span = area.height.saturating_sub(1) as f64;
    let offset = (value.clamp(0.0, 1.0) * span).round() as u16;
    area.y + area.height.saturating_sub(1) - offset
}

fn render_bar<T: TargetSource>(app: &App<T>, area: Rect, buf: &mut Buffer) {
    let engine = app.engine();
    let value = engine.signal_value();
    let target = engine.target();
    let tolerance = engine.config().tolerance;

    let bar_x = area.x + area.width.saturating_sub(BAR_WIDTH) / 2;
    let bar_style = Style::default().fg(Color::Rgb(70, 80, 110));
    let window_style = Style::default().fg(Color::Rgb(150, 150, 170));
    let target_style = Style::default()
        .fg(Color::Rgb(255, 200, 50))
        .add_modifier(Modifier::BOLD);
    let marker_style = if engine.in_tolerance() {
        Style::default()
            .fg(Color::Rgb(20, 230, 20))
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(Color::Rgb(180, 180, 240))
            .add_modifier(Modifier::BOLD)
    };
    let label_style = Style::default().fg(Color::Rgb(220, 220, 235));

    let window_top = row_for(target + tolerance, area);
    let window_bottom = row_for(target - tolerance, area);
    for y in area.top()..area.bottom() {
        let (symbol, style) = if (window_top..=window_bottom).contains(&y) {
            ("▒", window_style)
        } else {
            ("░", bar_style)
        };
        for x in bar_x..bar_x + BAR_WIDTH {
            if let Some(cell) = buf.cell_mut((x, y)) {
                cell.set_symbol(symbol);
                cell.set_style(style);
            }
        }
    }

    let target_row = row_for(target, area);
    let line_start = bar_x.saturating_sub(2).max(area.x);
    let line_end = (bar_x + BAR_WIDTH + 2).min(area.right());
    for x in line_start..line_end {
        if let Some(cell) = buf.cell_mut((x, target_row)) {
            cell.set_symbol("━");
            cell.set_style(target_style);
        }
    }

    let marker_row = row_for(value, area);
    for x in bar_x + 1..bar_x + BAR_WIDTH - 1 {
        if let Some(cell) = buf.cell_mut((x, marker_row)) {
            cell.set_symbol("●");
            cell.set_style(marker_style);
        }
    }

    let target_label = format!("Target: {:.3}", target);
    let label_x = line_start.saturating_sub(target_label.len() as u16 + 1);
    if label_x >= area.x {
        buf.set_string(label_x, target_row, &target_label, label_style);
    }
    buf.set_string(
        line_end + 1,
        marker_row,
        format!("Value: {:.3}", value),
        label_style,
    );

    if let Some(flash) = app.flash() {
        let flash_style = Style::default()
            .fg(Color::Rgb(120, 255, 120))
            .add_modifier(Modifier::BOLD);
        let text = format!("+{}", flash.points);
        let y = marker_row.saturating_sub(1).max(area.y);
        buf.set_string(line_end + 1, y, text, flash_style);
    }
}

fn render_game_over<T: TargetSource>(app: &App<T>, area: Rect, buf: &mut Buffer) {
    let stats = app.engine().stats();
    let title_style = Style::default()
        .fg(Color::Rgb(240, 240, 255))
        .add_modifier(Modifier::BOLD);
    let score_style = Style::default()
        .fg(Color::Rgb(230, 230, 245))
        .add_modifier(Modifier::BOLD);
    let body_style = Style::default().fg(Color::Rgb(210, 210, 230));
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let lines = vec![
        Line::from(Span::styled("Game over", title_style)),
        Line::default(),
        Line::from(Span::styled(
            format!("Final score: {}", stats.score),
            score_style,
        )),
        Line::default(),
        Line::from(Span::styled(format!("Targets hit: {}", stats.hits), body_style)),
        Line::from(Span::styled(
            format!("Targets presented: {}", stats.total_targets_presented),
            body_style,
        )),
        Line::from(Span::styled(
            format!("Best streak: {}", stats.best_streak),
            body_style,
        )),
        Line::default(),
        Line::from(Span::styled("(r) restart / (esc) menu / (q) quit", italic_style)),
    ];

    centered_lines(lines, area, buf);
}
