//! Math quiz state machine driving the MathBot2000 questions.

use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Sender name used for engine-posted quiz questions.
pub const QUIZ_BOT_NAME: &str = "MathBot2000";

/// One in-flight multiply-add question and its schedule.
///
/// A round is open while `answered_correctly` is false; the first correct
/// tell closes it. Two consecutive questions never share an answer.
pub struct MathQuiz {
    rng: SmallRng,
    components: [i64; 3],
    question: String,
    answer: String,
    answered_correctly: bool,
    next_question_time: f64,
}

impl MathQuiz {
    /// Create an idle quiz with an entropy-seeded generator.
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    /// Create an idle quiz with the given generator.
    pub fn with_rng(rng: SmallRng) -> Self {
        Self {
            rng,
            components: [0; 3],
            question: String::new(),
            answer: String::new(),
            answered_correctly: true,
            next_question_time: f64::MAX,
        }
    }

    /// Schedule the first question relative to the current time.
    pub fn schedule_first(&mut self, now: f64, min_cooldown: f64, max_cooldown: f64) {
        self.next_question_time = now;
        self.cooldown(min_cooldown, max_cooldown);
    }

    fn cooldown(&mut self, min_cooldown: f64, max_cooldown: f64) {
        self.next_question_time += self.rng.gen_range(min_cooldown..=max_cooldown);
    }

    /// Whether the next question is due.
    pub fn due(&self, now: f64) -> bool {
        now >= self.next_question_time
    }

    /// Generate the next question, guaranteed to have a different answer than
    /// the previous one, open the round, and schedule the question after it.
    /// Returns the question text for broadcasting.
    pub fn next_question(&mut self, min_cooldown: f64, max_cooldown: f64) -> String {
        let last_answer = std::mem::take(&mut self.answer);
        loop {
            let a = self.rng.gen_range(2..=10);
            let b = self.rng.gen_range(2..=10);
            let c = self.rng.gen_range(2..=97);
            self.components = [a, b, c];
            self.question = format!("What is {a} * {b} + {c}?");
            self.answer = (a * b + c).to_string();
            if self.answer != last_answer {
                break;
            }
        }
        self.answered_correctly = false;
        self.cooldown(min_cooldown, max_cooldown);
        self.question.clone()
    }

    /// Whether a question is currently open for answering.
    pub fn is_open(&self) -> bool {
        !self.answered_correctly
    }

    /// Close the current round; later correct answers are plain tells.
    pub fn close(&mut self) {
        self.answered_correctly = true;
    }

    /// Override the expected answer and open the round. Test back door.
    pub fn set_answer(&mut self, answer: String) {
        self.answer = answer;
        self.answered_correctly = false;
    }

    /// The current question text.
    pub fn question(&self) -> &str {
        &self.question
    }

    /// The decimal text of the current answer.
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// The `(a, b, c)` components of the current question.
    pub fn components(&self) -> [i64; 3] {
        self.components
    }

    /// When the next question is due, in clock seconds.
    pub fn next_question_time(&self) -> f64 {
        self.next_question_time
    }
}

impl Default for MathQuiz {
    fn default() -> Self {
        Self::new()
    }
}
