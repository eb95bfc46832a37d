use std::time::SystemTime;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use invigil::exam::Section;
use invigil::session::{ExamSession, Phase};
use invigil::typing::TypingAttempt;
use invigil::util::format_clock;

use crate::{App, Screen};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match &self.screen {
            Screen::Gate { input, error } => render_gate(input, error.as_deref(), area, buf),
            Screen::Exam => match &self.session {
                Some(session) => render_session(session, area, buf),
                None => render_notice("Loading…", area, buf),
            },
        }
    }
}

fn render_session(session: &ExamSession, area: Rect, buf: &mut Buffer) {
    match session.phase() {
        Phase::Loading => render_notice("Loading…", area, buf),
        Phase::Submitting => render_notice("Submitting…", area, buf),
        Phase::Error(message) => render_error(message, area, buf),
        Phase::PostTypingDisplay => render_post_typing(session, area, buf),
        Phase::Completed => render_thank_you(session, area, buf),
        Phase::InSection(_) => {
            let Some(section) = session.current_section() else {
                return;
            };
            if section.is_typing() {
                render_typing(session, section, area, buf);
            } else {
                render_questions(session, section, area, buf);
            }
        }
    }
}

/// Section heading, countdown pill, progress dots and the submission
/// failure banner. Expects the first four layout chunks.
fn render_header(session: &ExamSession, section: &Section, chunks: &[Rect], buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);

    let count = if section.is_typing() {
        format!("{} seconds", section.budget_secs as u64)
    } else {
        format!("{} questions", section.questions().len())
    };
    Paragraph::new(Span::styled(
        format!("{} ({count})", section.category.label()),
        bold_style,
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    let time_style = if session.typing_warning() {
        Style::default()
            .fg(Color::White)
            .bg(Color::Red)
            .add_modifier(Modifier::BOLD)
    } else if session.section_warning() {
        Style::default().patch(bold_style).fg(Color::Red)
    } else {
        Style::default().fg(Color::Red)
    };
    Paragraph::new(Span::styled(
        format!("Time Left: {}", format_clock(session.seconds_remaining())),
        time_style,
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    if let Some(plan) = session.plan() {
        let current = session.current_index().unwrap_or(0);
        let mut dots: Vec<Span> = Vec::new();
        for idx in 0..plan.len() {
            if idx > 0 {
                dots.push(Span::raw(" "));
            }
            dots.push(if idx == current {
                Span::styled("●", bold_style)
            } else if idx < current {
                Span::styled("●", Style::default().fg(Color::Green))
            } else {
                Span::styled("○", Style::default().add_modifier(Modifier::DIM))
            });
        }
        Paragraph::new(Line::from(dots))
            .alignment(Alignment::Center)
            .render(chunks[2], buf);
    }

    if let Some(message) = session.error_banner() {
        Paragraph::new(Span::styled(
            message.to_string(),
            Style::default().patch(bold_style).fg(Color::Red),
        ))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[3], buf);
    }
}

fn render_questions(session: &ExamSession, section: &Section, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // section heading
            Constraint::Length(1), // countdown pill
            Constraint::Length(2), // progress dots
            Constraint::Length(2), // submission failure banner
            Constraint::Min(1),    // focused question
            Constraint::Length(1), // legend
        ])
        .split(area);

    render_header(session, section, &chunks, buf);

    let questions = section.questions();
    let mut lines: Vec<Line> = Vec::new();

    if questions.is_empty() {
        lines.push(Line::from(Span::styled(
            "No questions in this section.",
            dim_style,
        )));
    } else {
        let idx = session.focused_question().min(questions.len() - 1);
        let question = &questions[idx];

        lines.push(Line::from(Span::styled(
            format!("Q{}. {}", idx + 1, question.prompt),
            bold_style,
        )));
        lines.push(Line::default());

        let chosen = session.answers().get(&question.id).copied();
        for (i, option) in question.options.iter().enumerate() {
            let (marker, style) = if chosen == Some(i) {
                ("●", green_bold_style)
            } else {
                ("○", Style::default())
            };
            lines.push(Line::from(Span::styled(
                format!("  {marker} {}) {option}", i + 1),
                style,
            )));
        }

        let answered = questions
            .iter()
            .filter(|q| session.answers().contains_key(&q.id))
            .count();
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            format!(
                "Question {} of {} ({answered} answered)",
                idx + 1,
                questions.len()
            ),
            dim_style,
        )));
    }

    Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .render(chunks[4], buf);

    Paragraph::new(Span::styled(
        "(1-9) answer / (↑/↓) question / (←/→) section / (esc) quit",
        italic_style,
    ))
    .render(chunks[5], buf);
}

fn render_typing(session: &ExamSession, section: &Section, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let attempt = session.attempt();

    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let mut reference_lines =
        ((attempt.reference.width() as f64 / max_chars_per_line as f64).ceil() + 1.0) as u16;
    if attempt.reference.width() <= max_chars_per_line as usize {
        reference_lines = 1;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // section heading
            Constraint::Length(1), // countdown pill
            Constraint::Length(2), // progress dots
            Constraint::Length(2), // submission failure banner
            Constraint::Length(2), // space hint
            Constraint::Length(2), // live stats
            Constraint::Length(reference_lines),
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    render_header(session, section, &chunks, buf);

    Paragraph::new(Span::styled(
        "Space jumps to the next word and cannot be taken back.",
        dim_style,
    ))
    .alignment(Alignment::Center)
    .render(chunks[4], buf);

    if attempt.has_started() {
        Paragraph::new(Span::styled(
            format!(
                "{} wpm   {}% acc",
                attempt.wpm(SystemTime::now()),
                attempt.accuracy()
            ),
            bold_style,
        ))
        .alignment(Alignment::Center)
        .render(chunks[5], buf);
    }

    Paragraph::new(Line::from(attempt_spans(attempt)))
        .alignment(if reference_lines == 1 {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: true })
        .render(chunks[6], buf);

    Paragraph::new(Span::styled(
        "(ctrl+s) submit exam / (←) previous section / (esc) quit",
        italic_style,
    ))
    .render(chunks[8], buf);

    // last-five-seconds countdown rendered over everything else
    if session.section_warning() {
        let secs = session.seconds_remaining();
        if secs > 0 {
            render_final_overlay(secs, area, buf);
        }
    }
}

/// Per-character colouring of the reference text: green for matches, red
/// for mistakes (spaces render as a middle dot), the cursor underlined and
/// the untouched remainder dimmed.
fn attempt_spans(attempt: &TypingAttempt) -> Vec<Span<'static>> {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
    let red_bold_style = Style::default().patch(bold_style).fg(Color::Red);
    let dim_bold_style = Style::default().patch(bold_style).add_modifier(Modifier::DIM);
    let underlined_dim_bold_style = Style::default()
        .patch(dim_bold_style)
        .add_modifier(Modifier::UNDERLINED);

    let reference: Vec<char> = attempt.reference.chars().collect();
    let mut spans = Vec::new();

    for (idx, typed) in attempt.input.chars().enumerate() {
        match reference.get(idx) {
            Some(expected) if *expected == typed => {
                spans.push(Span::styled(expected.to_string(), green_bold_style));
            }
            _ => {
                let shown = match typed {
                    ' ' => "·".to_owned(),
                    c => c.to_string(),
                };
                spans.push(Span::styled(shown, red_bold_style));
            }
        }
    }

    let cursor = attempt.input.chars().count();
    if let Some(expected) = reference.get(cursor) {
        spans.push(Span::styled(
            expected.to_string(),
            underlined_dim_bold_style,
        ));
        let rest: String = reference[cursor + 1..].iter().collect();
        if !rest.is_empty() {
            spans.push(Span::styled(rest, dim_bold_style));
        }
    }

    spans
}

fn render_final_overlay(secs: u64, area: Rect, buf: &mut Buffer) {
    let label = format!("  {secs}  ");
    let width = (label.len() as u16).min(area.width);
    if width == 0 || area.height == 0 {
        return;
    }
    let overlay = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + area.height / 2,
        width,
        height: 1,
    };
    Paragraph::new(Span::styled(
        label,
        Style::default()
            .fg(Color::White)
            .bg(Color::Red)
            .add_modifier(Modifier::BOLD),
    ))
    .render(overlay, buf);
}

fn render_post_typing(session: &ExamSession, area: Rect, buf: &mut Buffer) {
    let attempt = session.attempt();
    let lines = vec![
        Line::from(Span::styled(
            "Typing Complete!",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Words Per Minute",
            Style::default().add_modifier(Modifier::DIM),
        )),
        Line::from(Span::styled(
            attempt.wpm(SystemTime::now()).to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Accuracy",
            Style::default().add_modifier(Modifier::DIM),
        )),
        Line::from(Span::styled(
            format!("{}%", attempt.accuracy()),
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(
            format!(
                "Submitting in {} seconds…",
                session.post_typing_remaining().max(1)
            ),
            Style::default().add_modifier(Modifier::ITALIC),
        )),
    ];
    render_centered(lines, area, buf);
}

fn render_thank_you(session: &ExamSession, area: Rect, buf: &mut Buffer) {
    let lines = vec![
        Line::from(Span::styled(
            "Thank You!",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from("You have successfully completed the assessment."),
        Line::from("Your results have been submitted."),
        Line::default(),
        Line::from(vec![
            Span::raw("Examination ID: "),
            Span::styled(
                session.examination_id().to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::default(),
        Line::from(Span::styled(
            "(esc) exit",
            Style::default().add_modifier(Modifier::ITALIC),
        )),
    ];
    render_centered(lines, area, buf);
}

fn render_error(message: &str, area: Rect, buf: &mut Buffer) {
    let lines = vec![
        Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(
            "(esc) exit",
            Style::default().add_modifier(Modifier::ITALIC),
        )),
    ];
    render_centered(lines, area, buf);
}

fn render_gate(input: &str, error: Option<&str>, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);

    let mut lines = vec![
        Line::from(Span::styled("Invigil Assessment", bold_style)),
        Line::default(),
        Line::from("Enter your Examination ID"),
        Line::default(),
        Line::from(vec![
            Span::styled(input.to_string(), bold_style),
            Span::styled("█", Style::default().add_modifier(Modifier::DIM)),
        ]),
        Line::default(),
    ];
    if let Some(message) = error {
        lines.push(Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::default());
    }
    lines.push(Line::from(Span::styled(
        "(enter) continue / (esc) quit",
        Style::default().add_modifier(Modifier::ITALIC),
    )));

    render_centered(lines, area, buf);
}

fn render_notice(message: &str, area: Rect, buf: &mut Buffer) {
    let lines = vec![Line::from(Span::styled(
        message.to_string(),
        Style::default()
            .add_modifier(Modifier::BOLD)
            .add_modifier(Modifier::DIM),
    ))];
    render_centered(lines, area, buf);
}

fn render_centered(lines: Vec<Line>, area: Rect, buf: &mut Buffer) {
    let height = (lines.len() as u16).min(area.height);
    let top = area.height.saturating_sub(height) / 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(top),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[1], buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use invigil::exam::{Category, ExamPlan, Question};
    use ratatui::{buffer::Buffer, layout::Rect};

    fn question(id: &str, category: Category, answer: usize) -> Question {
        Question {
            id: id.into(),
            prompt: format!("prompt for {id}"),
            options: vec!["alpha".into(), "beta".into(), "gamma".into()],
            answer,
            category,
        }
    }

    fn plan() -> ExamPlan {
        ExamPlan::build(
            vec![
                question("e1", Category::English, 0),
                question("e2", Category::English, 1),
                question("l1", Category::Logical, 2),
            ],
            "go now.".into(),
            300.0,
            30.0,
        )
        .unwrap()
    }

    fn exam_app() -> App {
        let mut session = ExamSession::new("EX-99");
        session.content_loaded(plan());
        App {
            screen: Screen::Exam,
            session: Some(session),
        }
    }

    fn rendered(app: &App, width: u16, height: u16) -> String {
        let area = Rect::new(0, 0, width, height);
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);

        buffer
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_gate_screen_shows_input_and_error() {
        let app = App {
            screen: Screen::Gate {
                input: "EX-1".into(),
                error: Some("Invalid Examination ID".into()),
            },
            session: None,
        };

        let text = rendered(&app, 80, 24);
        assert!(text.contains("Enter your Examination ID"));
        assert!(text.contains("EX-1"));
        assert!(text.contains("Invalid Examination ID"));
    }

    #[test]
    fn test_question_screen_shows_heading_timer_and_options() {
        let app = exam_app();

        let text = rendered(&app, 80, 24);
        assert!(text.contains("English (2 questions)"));
        assert!(text.contains("Time Left: 5:00"));
        assert!(text.contains("Q1. prompt for e1"));
        assert!(text.contains("1) alpha"));
        assert!(text.contains("Question 1 of 2 (0 answered)"));
    }

    #[test]
    fn test_question_screen_marks_the_chosen_option() {
        let mut app = exam_app();
        app.session.as_mut().unwrap().answer_focused(1);

        let text = rendered(&app, 80, 24);
        assert!(text.contains("● 2) beta"));
        assert!(text.contains("(1 answered)"));
    }

    #[test]
    fn test_empty_section_renders_placeholder() {
        let mut app = exam_app();
        {
            let session = app.session.as_mut().unwrap();
            session.next_section();
            session.next_section();
        }

        let text = rendered(&app, 80, 24);
        assert!(text.contains("Computer Skill (0 questions)"));
        assert!(text.contains("No questions in this section."));
    }

    #[test]
    fn test_typing_screen_shows_reference_and_live_stats() {
        let mut app = exam_app();
        {
            let session = app.session.as_mut().unwrap();
            for _ in 0..4 {
                session.next_section();
            }
            session.type_char('g', std::time::SystemTime::now());
        }

        let text = rendered(&app, 80, 24);
        assert!(text.contains("Typing Test (30 seconds)"));
        assert!(text.contains("o now."));
        assert!(text.contains("wpm"));
        assert!(text.contains("% acc"));
        assert!(text.contains("(ctrl+s) submit exam"));
    }

    #[test]
    fn test_banner_appears_after_failed_submission() {
        let mut app = exam_app();
        {
            let session = app.session.as_mut().unwrap();
            for _ in 0..4 {
                session.next_section();
            }
            session.finish(std::time::SystemTime::now());
            session.submission_failed("failed to submit results: database is locked".into());
        }

        let text = rendered(&app, 80, 24);
        assert!(text.contains("failed to submit results"));
    }

    #[test]
    fn test_post_typing_screen_shows_figures_and_delay() {
        let mut app = exam_app();
        {
            let session = app.session.as_mut().unwrap();
            for _ in 0..4 {
                session.next_section();
            }
            // run the typing clock out to reach the result screen
            for _ in 0..400 {
                session.on_tick(std::time::SystemTime::now());
                if *session.phase() == Phase::PostTypingDisplay {
                    break;
                }
            }
            assert_eq!(*session.phase(), Phase::PostTypingDisplay);
        }

        let text = rendered(&app, 80, 24);
        assert!(text.contains("Typing Complete!"));
        assert!(text.contains("Words Per Minute"));
        assert!(text.contains("Accuracy"));
        assert!(text.contains("Submitting in"));
    }

    #[test]
    fn test_thank_you_screen_shows_examination_id() {
        let mut app = exam_app();
        {
            let session = app.session.as_mut().unwrap();
            for _ in 0..4 {
                session.next_section();
            }
            session.finish(std::time::SystemTime::now());
            session.submission_succeeded();
        }

        let text = rendered(&app, 80, 24);
        assert!(text.contains("Thank You!"));
        assert!(text.contains("Examination ID: EX-99"));
    }

    #[test]
    fn test_error_screen_shows_message_verbatim() {
        let mut session = ExamSession::new("EX-99");
        session.content_failed("failed to load questions: paper unreadable".into());
        let app = App {
            screen: Screen::Exam,
            session: Some(session),
        };

        let text = rendered(&app, 80, 24);
        assert!(text.contains("failed to load questions: paper unreadable"));
    }

    #[test]
    fn test_rendering_survives_extreme_sizes() {
        let app = exam_app();

        for (w, h) in [(10, 3), (200, 5), (20, 50), (80, 24)] {
            let area = Rect::new(0, 0, w, h);
            let mut buffer = Buffer::empty(area);
            app.render(area, &mut buffer);
            assert_eq!(*buffer.area(), area);
        }
    }
}
