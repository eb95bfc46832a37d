use std::time::SystemTime;

use crate::error::PortalError;
use crate::exam::{score_categories, AnswerMap, Category, ExamOutcome, ExamPlan, Section};
use crate::timer::Countdown;
use crate::typing::TypingAttempt;

/// Pause between the typing result screen and the automatic submission.
pub const POST_TYPING_DELAY_MS: u64 = 3000;

/// Final stretch of a question section, rendered as a red countdown.
pub const SECTION_WARNING_SECS: f64 = 5.0;
/// The typing test is short, so its warning window starts earlier.
pub const TYPING_WARNING_SECS: f64 = 10.0;

/// Where the applicant currently is. `Error` is absorbing; every other
/// phase moves forward through the section list and out via `Submitting`.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Loading,
    InSection(usize),
    PostTypingDisplay,
    Submitting,
    Completed,
    Error(String),
}

/// Drives one applicant through the section sequence. Owns the answer map,
/// the typing attempt and the countdowns. Time-dependent methods take `now`
/// so tests can fabricate clocks instead of sleeping.
#[derive(Debug)]
pub struct ExamSession {
    examination_id: String,
    phase: Phase,
    plan: Option<ExamPlan>,
    answers: AnswerMap,
    attempt: TypingAttempt,
    countdown: Countdown,
    post_typing: Countdown,
    focused_question: usize,
    error_banner: Option<String>,
}

impl ExamSession {
    pub fn new(examination_id: impl Into<String>) -> Self {
        Self {
            examination_id: examination_id.into(),
            phase: Phase::Loading,
            plan: None,
            answers: AnswerMap::new(),
            attempt: TypingAttempt::new(String::new()),
            countdown: Countdown::new(0.0),
            post_typing: Countdown::new(POST_TYPING_DELAY_MS as f64 / 1000.0),
            focused_question: 0,
            error_banner: None,
        }
    }

    /// The paper has arrived; enter the first section.
    pub fn content_loaded(&mut self, plan: ExamPlan) {
        if !matches!(self.phase, Phase::Loading) {
            return;
        }
        self.attempt = TypingAttempt::new(plan.typing_reference().to_string());
        self.plan = Some(plan);
        self.enter_section(0);
    }

    /// Loading failed; there is nothing to fall back to.
    pub fn content_failed(&mut self, message: String) {
        if matches!(self.phase, Phase::Loading) {
            self.phase = Phase::Error(message);
        }
    }

    /// Advance all clocks by one tick. Returns the submission payload on
    /// the tick that triggers submission, and `None` on every other tick.
    pub fn on_tick(&mut self, now: SystemTime) -> Option<ExamOutcome> {
        match self.phase {
            Phase::InSection(_) => {
                if self.countdown.on_tick() {
                    self.time_up(now)
                } else {
                    None
                }
            }
            Phase::PostTypingDisplay => {
                if self.post_typing.on_tick() {
                    self.begin_submission(now)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// The section clock reached zero. Questions advance (or submit from
    /// the end of the run); the typing test detours through its result
    /// screen first.
    fn time_up(&mut self, now: SystemTime) -> Option<ExamOutcome> {
        let Phase::InSection(idx) = self.phase else {
            return None;
        };
        let (is_typing, last) = match self.plan.as_ref() {
            Some(plan) => (plan.section(idx).is_typing(), plan.last_index()),
            None => return None,
        };

        if is_typing {
            self.attempt.finalize(now);
            self.countdown.stop();
            self.post_typing.start(POST_TYPING_DELAY_MS as f64 / 1000.0);
            self.phase = Phase::PostTypingDisplay;
            None
        } else if idx < last {
            self.enter_section(idx + 1);
            None
        } else {
            self.begin_submission(now)
        }
    }

    /// Move into a section. Entering always rearms the full budget, in
    /// either direction; re-entering the typing test clears the attempt.
    fn enter_section(&mut self, idx: usize) {
        let Some(plan) = self.plan.as_ref() else {
            return;
        };
        let section = plan.section(idx);
        let budget = section.budget_secs;
        let is_typing = section.is_typing();

        self.countdown.start(budget);
        self.focused_question = 0;
        if is_typing {
            self.attempt.reset();
        }
        self.phase = Phase::InSection(idx);
    }

    pub fn next_section(&mut self) {
        let Phase::InSection(idx) = self.phase else {
            return;
        };
        let Some(plan) = self.plan.as_ref() else {
            return;
        };
        if idx < plan.last_index() {
            self.enter_section(idx + 1);
        }
    }

    /// Going back never touches recorded answers.
    pub fn previous_section(&mut self) {
        let Phase::InSection(idx) = self.phase else {
            return;
        };
        if idx > 0 {
            self.enter_section(idx - 1);
        }
    }

    /// Explicit submit, only honoured on the last section. The race
    /// between this and a same-tick expiry is settled by the `Submitting`
    /// guard: whichever runs second yields nothing.
    pub fn finish(&mut self, now: SystemTime) -> Option<ExamOutcome> {
        let Phase::InSection(idx) = self.phase else {
            return None;
        };
        let Some(plan) = self.plan.as_ref() else {
            return None;
        };
        if idx == plan.last_index() {
            self.begin_submission(now)
        } else {
            None
        }
    }

    fn begin_submission(&mut self, now: SystemTime) -> Option<ExamOutcome> {
        if matches!(
            self.phase,
            Phase::Submitting | Phase::Completed | Phase::Error(_)
        ) {
            return None;
        }
        if self.examination_id.is_empty() {
            self.phase = Phase::Error(PortalError::MissingExamId.to_string());
            return None;
        }
        let Some(plan) = self.plan.as_ref() else {
            return None;
        };

        let scores = score_categories(plan, &self.answers);

        self.attempt.finalize(now);
        self.countdown.stop();
        self.error_banner = None;
        self.phase = Phase::Submitting;

        Some(ExamOutcome {
            examination_id: self.examination_id.clone(),
            english: scores[&Category::English],
            logical: scores[&Category::Logical],
            computerskill: scores[&Category::ComputerSkill],
            customerservice: scores[&Category::CustomerService],
            typing_wpm: self.attempt.wpm(now),
            typing_accuracy: self.attempt.accuracy(),
        })
    }

    pub fn submission_succeeded(&mut self) {
        if matches!(self.phase, Phase::Submitting) {
            self.phase = Phase::Completed;
        }
    }

    /// A failed submission is recoverable: return to the last section with
    /// answers and the finalized attempt intact, rearm its clock and show
    /// the failure, so submission can be retriggered.
    pub fn submission_failed(&mut self, message: String) {
        if !matches!(self.phase, Phase::Submitting) {
            return;
        }
        let Some((last, budget)) = self
            .plan
            .as_ref()
            .map(|p| (p.last_index(), p.section(p.last_index()).budget_secs))
        else {
            return;
        };

        self.countdown.start(budget);
        self.error_banner = Some(message);
        self.phase = Phase::InSection(last);
    }

    /// Record the focused question's answer. Only the latest choice per
    /// question is kept; an option index off the end is ignored.
    pub fn answer_focused(&mut self, option_idx: usize) {
        let target = self.current_section().and_then(|section| {
            section
                .questions()
                .get(self.focused_question)
                .filter(|q| option_idx < q.options.len())
                .map(|q| q.id.clone())
        });
        if let Some(id) = target {
            self.answers.insert(id, option_idx);
        }
    }

    pub fn focus_next_question(&mut self) {
        let count = self.current_section().map_or(0, |s| s.questions().len());
        if count > 0 && self.focused_question + 1 < count {
            self.focused_question += 1;
        }
    }

    pub fn focus_prev_question(&mut self) {
        if self.focused_question > 0 {
            self.focused_question -= 1;
        }
    }

    pub fn type_char(&mut self, c: char, now: SystemTime) {
        if self.in_typing_section() {
            self.attempt.write(c, now);
        }
    }

    pub fn type_backspace(&mut self) {
        if self.in_typing_section() {
            self.attempt.backspace();
        }
    }

    fn in_typing_section(&self) -> bool {
        self.current_section().is_some_and(Section::is_typing)
    }

    pub fn examination_id(&self) -> &str {
        &self.examination_id
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn plan(&self) -> Option<&ExamPlan> {
        self.plan.as_ref()
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.phase {
            Phase::InSection(idx) => Some(idx),
            _ => None,
        }
    }

    pub fn current_section(&self) -> Option<&Section> {
        match (&self.phase, self.plan.as_ref()) {
            (Phase::InSection(idx), Some(plan)) => Some(plan.section(*idx)),
            _ => None,
        }
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn attempt(&self) -> &TypingAttempt {
        &self.attempt
    }

    pub fn focused_question(&self) -> usize {
        self.focused_question
    }

    pub fn error_banner(&self) -> Option<&str> {
        self.error_banner.as_deref()
    }

    /// Whole seconds left in the current section, rounded up so the display
    /// never shows zero while time remains.
    pub fn seconds_remaining(&self) -> u64 {
        self.countdown.seconds_remaining().ceil() as u64
    }

    /// Whole seconds left on the result screen before auto-submission.
    pub fn post_typing_remaining(&self) -> u64 {
        self.post_typing.seconds_remaining().ceil() as u64
    }

    pub fn section_warning(&self) -> bool {
        matches!(self.phase, Phase::InSection(_)) && self.countdown.within_final(SECTION_WARNING_SECS)
    }

    pub fn typing_warning(&self) -> bool {
        self.in_typing_section() && self.countdown.within_final(TYPING_WARNING_SECS)
    }
}
