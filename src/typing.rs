use std::time::SystemTime;

/// Gross words per minute: whitespace-delimited tokens over elapsed
/// minutes, rounded to the nearest integer. Zero before the first
/// keystroke and zero when no time has elapsed.
pub fn words_per_minute(input: &str, started_at: Option<SystemTime>, end: SystemTime) -> u32 {
    let Some(start) = started_at else {
        return 0;
    };

    let elapsed_mins = match end.duration_since(start) {
        Ok(d) => d.as_secs_f64() / 60.0,
        Err(_) => return 0,
    };
    if elapsed_mins <= 0.0 {
        return 0;
    }

    let words = input.split_whitespace().count() as f64;
    (words / elapsed_mins).round() as u32
}

/// Positionwise accuracy against the reference, as a percentage of the
/// characters the applicant actually produced. An untouched input counts
/// as fully accurate.
pub fn accuracy(reference: &str, input: &str) -> u32 {
    if input.is_empty() {
        return 100;
    }

    let matching = reference
        .chars()
        .zip(input.chars())
        .filter(|(expected, typed)| expected == typed)
        .count();

    ((matching as f64 / input.chars().count() as f64) * 100.0).round() as u32
}

/// One applicant attempt against the reference text.
///
/// Input only ever grows by appended characters. A space always commits
/// the current word, complete or not, and a committed word can never be
/// reopened: backspace is refused while the input ends in a space.
#[derive(Debug, Clone, PartialEq)]
pub struct TypingAttempt {
    pub reference: String,
    pub input: String,
    pub started_at: Option<SystemTime>,
    pub ended_at: Option<SystemTime>,
}

impl TypingAttempt {
    pub fn new(reference: String) -> Self {
        Self {
            reference,
            input: String::new(),
            started_at: None,
            ended_at: None,
        }
    }

    /// Clear the attempt for a fresh entry into the typing section. The
    /// reference text is kept; it is generated once per session.
    pub fn reset(&mut self) {
        self.input.clear();
        self.started_at = None;
        self.ended_at = None;
    }

    pub fn has_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn is_finalized(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Append one typed character. The first character stamps the start
    /// time; the stamp is never moved afterwards.
    pub fn write(&mut self, c: char, now: SystemTime) {
        if self.is_finalized() {
            return;
        }
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.input.push(c);
    }

    /// Delete the last character, unless that would reopen a committed
    /// word.
    pub fn backspace(&mut self) {
        if self.is_finalized() || self.input.ends_with(' ') {
            return;
        }
        self.input.pop();
    }

    /// Stamp the end of the attempt. Only the first call takes effect.
    pub fn finalize(&mut self, now: SystemTime) {
        if self.ended_at.is_none() {
            self.ended_at = Some(now);
        }
    }

    /// Words per minute as of `now`, or as of the end stamp once the
    /// attempt is finalized.
    pub fn wpm(&self, now: SystemTime) -> u32 {
        words_per_minute(&self.input, self.started_at, self.ended_at.unwrap_or(now))
    }

    pub fn accuracy(&self) -> u32 {
        accuracy(&self.reference, &self.input)
    }
}
