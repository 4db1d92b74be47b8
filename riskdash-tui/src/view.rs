use crate::form::{FieldId, SubmissionForm};
use crate::present::{self, DetailValue, ServiceHealth};
use crate::styles;
use anyhow::Result;
use ratatui::{
    Frame, Terminal,
    backend::Backend,
    layout::{Constraint, Layout, Position, Rect},
    text::{Line, Span},
    widgets::{Block, Gauge, Paragraph, Wrap},
};
use riskdash_verify::{RiskAssessmentResult, WorkflowState};
use unicode_width::UnicodeWidthStr;

const FORM_WIDTH: u16 = 52;
const LABEL_WIDTH: u16 = 16;

/// Everything one frame needs, borrowed from the actor.
pub struct ViewSnap<'a> {
    pub form: &'a SubmissionForm,
    pub state: &'a WorkflowState,
    pub health: &'a ServiceHealth,
    pub spinner: &'static str,
}

pub fn draw<B: Backend>(term: &mut Terminal<B>, snap: &ViewSnap<'_>) -> Result<()> {
    term.draw(|frame| render(frame, snap))?;
    Ok(())
}

pub fn render(frame: &mut Frame, snap: &ViewSnap<'_>) {
    let banner_h = if snap.state.error_message().is_empty() {
        0
    } else {
        3
    };
    let [header, banner, body, status] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(banner_h),
        Constraint::Min(8),
        Constraint::Length(3),
    ])
    .areas(frame.area());

    let title = Paragraph::new(vec![
        Line::from(Span::styled(" Risk Assessment Dashboard", styles::title())),
        Line::from(Span::styled(
            " Real-time transaction risk analysis",
            styles::dim(),
        )),
    ]);
    frame.render_widget(title, header);

    if banner_h > 0 {
        let alert = Paragraph::new(snap.state.error_message())
            .style(styles::error())
            .wrap(Wrap { trim: true })
            .block(Block::bordered().title(" Error "));
        frame.render_widget(alert, banner);
    }

    let [form_area, results_area] =
        Layout::horizontal([Constraint::Length(FORM_WIDTH), Constraint::Min(20)]).areas(body);
    render_form(frame, form_area, snap);
    match snap.state.result() {
        Some(result) => render_result(frame, results_area, result),
        None => {
            let empty = Paragraph::new(Span::styled(
                "Submit a transaction to see its risk assessment.",
                styles::dim(),
            ))
            .wrap(Wrap { trim: true })
            .block(Block::bordered().title(" Results "));
            frame.render_widget(empty, results_area);
        }
    }

    render_status(frame, status, snap);
}

fn render_form(frame: &mut Frame, area: Rect, snap: &ViewSnap<'_>) {
    let block = Block::bordered().title(" Verify New Transaction ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let form = snap.form;
    let mut lines: Vec<Line> = FieldId::ALL
        .iter()
        .map(|&field| field_line(form, field))
        .collect();

    let submitting = snap.state.is_submitting();
    let caption = if submitting {
        " Verifying... "
    } else {
        " Verify Transaction "
    };
    lines.push(Line::default());
    lines.push(Line::from(vec![
        Span::raw(" ".repeat(LABEL_WIDTH as usize)),
        Span::styled(format!("[{caption}]"), styles::button(!submitting)),
    ]));
    if let Some(notice) = form.notice() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(format!(" {notice}"), styles::error())));
    }
    frame.render_widget(Paragraph::new(lines), inner);

    let focused = form.focused();
    let input = form.input(focused);
    let row = FieldId::ALL
        .iter()
        .position(|&f| f == focused)
        .unwrap_or_default() as u16;
    let col = LABEL_WIDTH + caret_col(input.value(), input.cursor());
    if inner.width > 0 && inner.height > row {
        frame.set_cursor_position(Position {
            x: inner.x + col.min(inner.width - 1),
            y: inner.y + row,
        });
    }
}

fn field_line(form: &SubmissionForm, field: FieldId) -> Line<'_> {
    let is_focused = form.focused() == field;
    let label_style = if is_focused {
        styles::focused()
    } else {
        styles::label()
    };
    let mark = if field.required() { "*" } else { " " };
    let value = form.input(field).value();
    let value_span = if value.is_empty() && !is_focused {
        Span::styled(field.placeholder(), styles::dim())
    } else {
        Span::styled(value, styles::value())
    };
    Line::from(vec![
        Span::styled(format!(" {:<13}", field.label()), label_style),
        Span::styled(mark, styles::required_mark()),
        Span::raw(" "),
        value_span,
    ])
}

fn caret_col(value: &str, cursor: usize) -> u16 {
    UnicodeWidthStr::width(&value[..cursor]) as u16
}

fn render_result(frame: &mut Frame, area: Rect, result: &RiskAssessmentResult) {
    let [gauges, details] =
        Layout::vertical([Constraint::Length(3), Constraint::Min(3)]).areas(area);

    let cells = Layout::horizontal([Constraint::Ratio(1, 4); 4]).split(gauges);
    for (indicator, cell) in present::risk_indicators(result).iter().zip(cells.iter()) {
        let gauge = Gauge::default()
            .block(Block::bordered().title(format!(" {} ", indicator.label)))
            .gauge_style(styles::tier(indicator.tier))
            .ratio(indicator.fill_ratio())
            .label(format!("{} / 100", indicator.display));
        frame.render_widget(gauge, *cell);
    }

    let lines: Vec<Line> = present::detail_view(result)
        .into_iter()
        .map(|row| {
            let value = match row.value {
                DetailValue::Text(text) => Span::styled(text, styles::value()),
                DetailValue::Badge { text, level } => {
                    Span::styled(format!(" {text} "), styles::badge(level))
                }
            };
            Line::from(vec![
                Span::styled(format!(" {:<18}", row.label), styles::label()),
                value,
            ])
        })
        .collect();
    let panel = Paragraph::new(lines).block(Block::bordered().title(" Transaction Details "));
    frame.render_widget(panel, details);
}

fn render_status(frame: &mut Frame, area: Rect, snap: &ViewSnap<'_>) {
    let activity = if snap.state.is_submitting() {
        Span::styled("Verifying…", styles::busy())
    } else {
        Span::styled("Idle", styles::idle())
    };
    let line = Line::from(vec![
        Span::raw(" "),
        Span::styled(snap.spinner, styles::busy()),
        Span::raw(" "),
        activity,
        Span::raw(" • "),
        Span::raw(snap.health.describe()),
        Span::styled(
            " • Enter verify · Tab next · F5 health · Ctrl-Q quit",
            styles::dim(),
        ),
    ]);
    let status = Paragraph::new(line).block(Block::bordered().title(" Status "));
    frame.render_widget(status, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use riskdash_verify::{TransactionSubmission, VerificationController, VerifyError};

    fn terminal() -> Terminal<TestBackend> {
        Terminal::new(TestBackend::new(140, 40)).unwrap()
    }

    fn screen(term: &Terminal<TestBackend>) -> String {
        let buf = term.backend().buffer();
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn result() -> RiskAssessmentResult {
        RiskAssessmentResult {
            transaction_id: None,
            card_id: "card_123".into(),
            merchant_id: "merch_456".into(),
            amount: 100.0,
            location_id: None,
            timestamp: "not a date".into(),
            risk_level: "high".into(),
            fraud_probability: 0.82,
            pattern_risk_score: 0.5,
            location_risk_score: 0.1,
            merchant_risk_score: 0.2,
            amount_risk_score: None,
            user_behavior_risk_score: None,
            status: "fraud".into(),
        }
    }

    fn payload() -> TransactionSubmission {
        TransactionSubmission::new("card_123", "merch_456", 100.0).unwrap()
    }

    fn render_with(state: &WorkflowState, form: &SubmissionForm, spinner: &'static str) -> String {
        let mut term = terminal();
        let health = ServiceHealth::Healthy { model_loaded: true };
        let snap = ViewSnap {
            form,
            state,
            health: &health,
            spinner,
        };
        draw(&mut term, &snap).unwrap();
        screen(&term)
    }

    #[test]
    fn idle_screen_shows_empty_form() {
        let controller = VerificationController::new();
        let text = render_with(controller.state(), &SubmissionForm::new(), " ");
        assert!(text.contains("Risk Assessment Dashboard"));
        assert!(text.contains("Verify Transaction"));
        assert!(text.contains("Enter merchant ID"));
        assert!(text.contains("service: healthy (model loaded)"));
        assert!(!text.contains("Transaction Details"));
        assert!(!text.contains(" Error "));
    }

    #[test]
    fn submitting_swaps_button_caption() {
        let mut controller = VerificationController::new();
        let _pending = controller.begin(payload()).unwrap();
        let text = render_with(controller.state(), &SubmissionForm::new(), "⠋");
        assert!(text.contains("Verifying..."));
        assert!(!text.contains("Verify Transaction"));
    }

    #[test]
    fn settled_result_renders_indicators_and_details() {
        let mut controller = VerificationController::new();
        let pending = controller.begin(payload()).unwrap();
        controller.settle(pending.ticket, Ok(result()));

        let text = render_with(controller.state(), &SubmissionForm::new(), " ");
        assert!(text.contains("82 / 100"));
        assert!(text.contains("50 / 100"));
        assert!(text.contains("Transaction Details"));
        assert!(text.contains("$100.00"));
        assert!(text.contains("N/A"));
        assert!(text.contains("not a date"));
        assert!(text.contains("82.0%"));
    }

    #[test]
    fn error_banner_sits_beside_stale_result() {
        let mut controller = VerificationController::new();
        let first = controller.begin(payload()).unwrap();
        controller.settle(first.ticket, Ok(result()));
        let second = controller.begin(payload()).unwrap();
        controller.settle(
            second.ticket,
            Err(VerifyError::Rejected {
                status: 404,
                message: "card not found".into(),
            }),
        );

        let text = render_with(controller.state(), &SubmissionForm::new(), " ");
        assert!(text.contains("card not found"));
        assert!(text.contains("82 / 100"));
    }

    #[test]
    fn form_notice_is_rendered() {
        let controller = VerificationController::new();
        let mut form = SubmissionForm::new();
        let err = form.to_submission().unwrap_err();
        form.reject(&err);
        let text = render_with(controller.state(), &form, " ");
        assert!(text.contains("Card ID is required"));
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let mut term = Terminal::new(TestBackend::new(10, 4)).unwrap();
        let controller = VerificationController::new();
        let form = SubmissionForm::new();
        let health = ServiceHealth::Unknown;
        let snap = ViewSnap {
            form: &form,
            state: controller.state(),
            health: &health,
            spinner: " ",
        };
        assert!(draw(&mut term, &snap).is_ok());
    }
}
