pub mod screen;

use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Gauge, Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::{
    app::App,
    celebration::Celebration,
    controls::{operation_key, MIX_KEY},
    question::{Difficulty, Mode, Operation},
    round::{Round, StreakHeat, EQUATION_QUESTIONS},
    session::RoundResult,
    util::{format_clock, remaining_ratio},
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;
const LOW_TIME_SECS: u32 = 10;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        screen::current_screen(self.phase()).render(self, area, buf);
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn selected() -> Style {
    bold().fg(Color::Black).bg(Color::Magenta)
}

fn legend(items: &[&str]) -> Paragraph<'static> {
    Paragraph::new(Span::styled(
        items.iter().join(" / "),
        Style::default().add_modifier(Modifier::ITALIC),
    ))
}

pub(crate) fn render_setup(app: &App, area: Rect, buf: &mut Buffer) {
    let selection = &app.session.selection;
    let equations = selection.mode == Mode::Equations;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2), // title
            Constraint::Length(1), // subtitle
            Constraint::Length(1),
            Constraint::Length(1), // operations heading
            Constraint::Length(1), // operations
            Constraint::Length(1),
            Constraint::Length(1), // table heading
            Constraint::Length(1), // tables
            Constraint::Min(1),
            Constraint::Length(1), // start prompt
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled("mathdrill", bold().fg(Color::Magenta)))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);
    Paragraph::new(Span::styled("Ready to train your brain?", dim()))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(Span::styled("1. pick a challenge", bold())).render(chunks[3], buf);
    let operations = Operation::ALL
        .iter()
        .flat_map(|op| {
            let is_selected = selection.operation == Some(*op);
            let style = if is_selected { selected() } else { Style::default() };
            [
                Span::styled(
                    format!("({}) {} {}", operation_key(*op), op.symbol(), op.label()),
                    style,
                ),
                Span::raw("  "),
            ]
        })
        .collect::<Vec<Span>>();
    Paragraph::new(Line::from(operations)).render(chunks[4], buf);

    Paragraph::new(Span::styled("2. pick a table", bold())).render(chunks[6], buf);
    let tables = (0..=Difficulty::MAX_TABLE)
        .map(Difficulty::Table)
        .chain([Difficulty::Mix])
        .flat_map(|d| {
            let label = match d {
                Difficulty::Table(n) => format!(" {n} "),
                Difficulty::Mix => format!(" ({MIX_KEY}) mix "),
            };
            let style = if selection.difficulty == Some(d) {
                selected()
            } else if equations {
                dim()
            } else {
                Style::default()
            };
            [Span::styled(label, style), Span::raw(" ")]
        })
        .collect::<Vec<Span>>();
    Paragraph::new(Line::from(tables)).render(chunks[7], buf);

    let prompt = if app.session.can_start() {
        Span::styled("press enter to start!", bold().fg(Color::Green))
    } else {
        Span::styled("choose a challenge and a table to start", dim())
    };
    Paragraph::new(prompt)
        .alignment(Alignment::Center)
        .render(chunks[9], buf);

    legend(&["(enter) start", "(esc)ape"]).render(chunks[10], buf);
}

fn heat_style(heat: StreakHeat) -> Style {
    let color = match heat {
        StreakHeat::Cold => Color::DarkGray,
        StreakHeat::Warm => Color::LightYellow,
        StreakHeat::Hot => Color::Yellow,
        StreakHeat::Blazing => Color::LightRed,
        StreakHeat::Inferno => Color::Red,
    };
    bold().fg(color)
}

fn status_line(round: &Round) -> Line<'static> {
    let mut spans = vec![
        Span::styled(format!("score {}", round.state.score), bold()),
        Span::raw("   "),
        Span::styled(
            format!("streak {}", round.state.streak),
            heat_style(round.streak_heat()),
        ),
    ];
    if round.is_streak_milestone() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            "CHAIN ⚡",
            bold().fg(Color::White).bg(Color::Magenta),
        ));
    }
    if round.config.mode == Mode::Equations {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            format!(
                "question {}/{}",
                (round.state.questions_answered + 1).min(EQUATION_QUESTIONS),
                EQUATION_QUESTIONS
            ),
            dim(),
        ));
    }
    Line::from(spans)
}

pub(crate) fn render_playing(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(round) = app.session.round.as_ref() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // timer
            Constraint::Length(1),
            Constraint::Length(1), // score / streak
            Constraint::Min(1),
            Constraint::Length(3), // question
            Constraint::Length(3), // answer
            Constraint::Min(1),
            Constraint::Length(1), // legend
        ])
        .split(area);

    let remaining = round.state.time_remaining;
    let low_time = remaining <= LOW_TIME_SECS && remaining > 0;
    let gauge_color = if low_time { Color::Red } else { Color::Green };
    Gauge::default()
        .gauge_style(Style::default().fg(gauge_color))
        .ratio(remaining_ratio(remaining, round.timer_total()))
        .label(Span::styled(format_clock(remaining), bold()))
        .render(chunks[0], buf);

    Paragraph::new(status_line(round))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    let box_width = (round.question.text.width() as u16 + 8).max(16);
    let [question_area] = Layout::horizontal([Constraint::Length(box_width)])
        .flex(Flex::Center)
        .areas(chunks[4]);
    let [answer_area] = Layout::horizontal([Constraint::Length(box_width)])
        .flex(Flex::Center)
        .areas(chunks[5]);

    Paragraph::new(Span::styled(round.question.text.clone(), bold()))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        )
        .render(question_area, buf);

    let answer = match round.revealed_answer() {
        Some(correct) => Span::styled(format!("✗ {correct}"), bold().fg(Color::Red)),
        None if round.state.input.is_empty() => Span::styled("?", dim()),
        None => Span::styled(round.state.input.clone(), bold()),
    };
    Paragraph::new(answer)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL))
        .render(answer_area, buf);

    legend(&["(0-9) answer", "(enter) submit", "(backspace) erase", "(esc) leave round"])
        .render(chunks[7], buf);
}

fn describe(result: &RoundResult) -> String {
    match (result.config.mode, result.config.difficulty) {
        (Mode::Equations, _) => "equations · 5 questions".to_string(),
        (Mode::Normal, Difficulty::Mix) => "mixed operations · random tables".to_string(),
        (Mode::Normal, Difficulty::Table(_)) => format!(
            "{} · table {}",
            result.config.operation.label().to_lowercase(),
            result.config.difficulty
        ),
    }
}

pub(crate) fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(result) = app.session.result.as_ref() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1), // heading
            Constraint::Length(1), // mode
            Constraint::Length(1),
            Constraint::Length(1), // score
            Constraint::Length(1), // best streak
            Constraint::Length(1), // high score
            Constraint::Length(1),
            Constraint::Length(1), // encouragement
            Constraint::Min(1),
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled("Round complete!", bold().fg(Color::Magenta)))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);
    Paragraph::new(Span::styled(describe(result), dim()))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
    Paragraph::new(Span::styled(
        format!("{} correct", result.score),
        bold().fg(Color::Magenta),
    ))
    .alignment(Alignment::Center)
    .render(chunks[4], buf);
    Paragraph::new(format!("best streak {}", result.best_streak))
        .alignment(Alignment::Center)
        .render(chunks[5], buf);

    let mut high_score = vec![Span::raw(format!("high score {}", result.high_score))];
    if result.is_new_record {
        high_score.push(Span::styled("  new record!", bold().fg(Color::Yellow)));
    }
    Paragraph::new(Line::from(high_score))
        .alignment(Alignment::Center)
        .render(chunks[6], buf);

    Paragraph::new(Span::styled("Great effort, keep it up!", dim()))
        .alignment(Alignment::Center)
        .render(chunks[8], buf);

    legend(&["(p)lay again", "(h)ome", "(esc)ape"]).render(chunks[10], buf);

    if app.celebration.is_active {
        render_celebration(&app.celebration, area, buf);
    }
}

/// Draw celebration particles on top of the results screen
fn render_celebration(celebration: &Celebration, area: Rect, buf: &mut Buffer) {
    let colors = [
        Color::Yellow,
        Color::Magenta,
        Color::Cyan,
        Color::Green,
        Color::Red,
        Color::Blue,
        Color::LightYellow,
    ];

    for particle in &celebration.particles {
        if particle.x < 0.0 || particle.y < 0.0 {
            continue;
        }
        let (x, y) = (particle.x as u16, particle.y as u16);
        if x >= area.width || y >= area.height {
            continue;
        }

        let color = colors[particle.color_index % colors.len()];
        let fade = 1.0 - particle.age / particle.max_age;
        let style = if particle.is_text || fade > 0.6 {
            Style::default().fg(color).add_modifier(Modifier::BOLD)
        } else if fade > 0.3 {
            Style::default().fg(color)
        } else {
            Style::default().fg(color).add_modifier(Modifier::DIM)
        };

        if let Some(cell) = buf.cell_mut((area.x + x, area.y + y)) {
            cell.set_symbol(&particle.symbol.to_string());
            cell.set_style(style);
        }
    }
}
