//! Quiz session state machine.
//!
//! `Loading -> AwaitingAnswer -> AnswerShown -> Loading ...` until the
//! configured question count or the quiz-wide time runs out, then
//! `Completed`. The session does no I/O; the runner feeds it questions and
//! clock ticks.

use serde::Serialize;
use tracing::debug;

use crate::models::{Letter, Limit, Question, QuizConfig, TimerScope};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Loading,
    AwaitingAnswer,
    AnswerShown,
    Completed,
}

/// Result of selecting an option.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    Correct,
    Incorrect,
    /// An answer was already recorded for this question.
    AlreadyAnswered,
    /// The countdown reached zero before an answer was chosen.
    TimeUp,
    /// No question is on screen.
    NotReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Idle,
    Counting(u32),
    /// The countdown just reached zero. Reported once per expiry.
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Fetch the next question.
    Load,
    Completed(Summary),
    /// Advancing is only possible once the answer is shown.
    NotReady,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub score: u32,
    pub total_questions: u32,
    pub percentage: u32,
}

impl Summary {
    fn new(score: u32, total_questions: u32) -> Self {
        let percentage = if total_questions == 0 {
            0
        } else {
            ((score as f64 / total_questions as f64) * 100.0).round() as u32
        };
        Self {
            score,
            total_questions,
            percentage,
        }
    }
}

/// How an option should be highlighted.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OptionState {
    Neutral,
    Correct,
    Incorrect,
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    config: QuizConfig,
    phase: Phase,
    question: Option<Question>,
    ordinal: u32,
    score: u32,
    remaining: Option<u32>,
    selected: Option<Letter>,
    timed_out: bool,
    show_explanation: bool,
    outcome: Option<Summary>,
}

impl QuizSession {
    pub fn new(config: QuizConfig) -> Self {
        let remaining = config.time_limit.bound();
        Self {
            config,
            phase: Phase::Loading,
            question: None,
            ordinal: 1,
            score: 0,
            remaining,
            selected: None,
            timed_out: false,
            show_explanation: false,
            outcome: None,
        }
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    pub fn selected(&self) -> Option<Letter> {
        self.selected
    }

    pub fn explanation_visible(&self) -> bool {
        self.show_explanation
    }

    /// Shows a freshly generated question. Only valid while `Loading`.
    pub fn present(&mut self, question: Question) -> bool {
        if self.phase != Phase::Loading {
            return false;
        }
        self.question = Some(question);
        self.selected = None;
        self.timed_out = false;
        self.show_explanation = false;
        if self.config.timer_scope == TimerScope::Question {
            self.remaining = self.config.time_limit.bound();
        }
        self.phase = Phase::AwaitingAnswer;
        debug!(ordinal = self.ordinal, "Question presented");
        true
    }

    pub fn select(&mut self, letter: Letter) -> Selection {
        match self.phase {
            Phase::AwaitingAnswer => {}
            Phase::AnswerShown if self.timed_out => return Selection::TimeUp,
            Phase::AnswerShown => return Selection::AlreadyAnswered,
            Phase::Loading | Phase::Completed => return Selection::NotReady,
        }
        if self.remaining == Some(0) {
            return Selection::TimeUp;
        }
        let Some(question) = &self.question else {
            return Selection::NotReady;
        };

        let correct = question.is_correct(letter);
        self.selected = Some(letter);
        self.phase = Phase::AnswerShown;
        if correct {
            self.score += 1;
        }
        debug!(ordinal = self.ordinal, %letter, correct, score = self.score, "Answer selected");
        if correct {
            Selection::Correct
        } else {
            Selection::Incorrect
        }
    }

    /// One second elapsed. The countdown only runs while awaiting an answer.
    pub fn tick(&mut self) -> Tick {
        if self.phase != Phase::AwaitingAnswer {
            return Tick::Idle;
        }
        match self.remaining {
            Some(remaining) if remaining > 0 => {
                let remaining = remaining - 1;
                self.remaining = Some(remaining);
                if remaining == 0 {
                    self.timed_out = true;
                    self.phase = Phase::AnswerShown;
                    debug!(ordinal = self.ordinal, "Time expired");
                    Tick::Expired
                } else {
                    Tick::Counting(remaining)
                }
            }
            _ => Tick::Idle,
        }
    }

    pub fn advance(&mut self) -> Advance {
        if self.phase != Phase::AnswerShown {
            return Advance::NotReady;
        }

        let count_reached = matches!(self.config.question_count, Limit::Bounded(n) if self.ordinal >= n);
        let quiz_time_spent =
            self.config.timer_scope == TimerScope::Quiz && self.remaining == Some(0);
        if count_reached || quiz_time_spent {
            return Advance::Completed(self.complete());
        }

        self.ordinal += 1;
        self.question = None;
        self.selected = None;
        self.timed_out = false;
        self.show_explanation = false;
        self.phase = Phase::Loading;
        Advance::Load
    }

    /// Ends the session now, e.g. when the user stops an unlimited quiz.
    ///
    /// Returns `None` if the session had already completed.
    pub fn finish(&mut self) -> Option<Summary> {
        if self.phase == Phase::Completed {
            return None;
        }
        Some(self.complete())
    }

    fn complete(&mut self) -> Summary {
        let summary = self.summary();
        self.outcome = Some(summary);
        self.phase = Phase::Completed;
        self.question = None;
        debug!(score = summary.score, total = summary.total_questions, "Quiz completed");
        summary
    }

    pub fn summary(&self) -> Summary {
        if let Some(summary) = self.outcome {
            return summary;
        }
        // A question still loading or unanswered does not count.
        let answered = match self.phase {
            Phase::Loading | Phase::AwaitingAnswer | Phase::Completed => self.ordinal - 1,
            Phase::AnswerShown => self.ordinal,
        };
        Summary::new(self.score, answered)
    }

    pub fn toggle_explanation(&mut self) -> bool {
        if self.phase == Phase::AnswerShown {
            self.show_explanation = !self.show_explanation;
        }
        self.show_explanation
    }

    pub fn option_state(&self, label: Letter) -> OptionState {
        let Some(question) = &self.question else {
            return OptionState::Neutral;
        };
        if self.phase != Phase::AnswerShown {
            return OptionState::Neutral;
        }
        if question.is_correct(label) {
            OptionState::Correct
        } else if self.selected == Some(label) {
            OptionState::Incorrect
        } else {
            OptionState::Neutral
        }
    }

    /// Serializable projection of the session for display.
    pub fn view(&self) -> SessionView {
        let answered = self.phase == Phase::AnswerShown;
        let question = self.question.as_ref().map(|q| QuestionView {
            question: q.question.clone(),
            subject: q.subject.clone(),
            options: q
                .options
                .iter()
                .map(|o| OptionView {
                    label: o.label,
                    text: o.text.clone(),
                    state: self.option_state(o.label),
                })
                .collect(),
            correct_answer: answered.then_some(q.correct_answer),
            explanation: (answered && self.show_explanation).then(|| q.explanation.clone()),
        });

        SessionView {
            phase: self.phase,
            ordinal: self.ordinal,
            question_count: self.config.question_count,
            score: self.score,
            remaining_seconds: self.remaining,
            selected: self.selected,
            timed_out: self.timed_out,
            question,
            summary: (self.phase == Phase::Completed).then(|| self.summary()),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub phase: Phase,
    pub ordinal: u32,
    pub question_count: Limit,
    pub score: u32,
    pub remaining_seconds: Option<u32>,
    pub selected: Option<Letter>,
    pub timed_out: bool,
    pub question: Option<QuestionView>,
    pub summary: Option<Summary>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub question: String,
    pub subject: String,
    pub options: Vec<OptionView>,
    pub correct_answer: Option<Letter>,
    pub explanation: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub label: Letter,
    pub text: String,
    pub state: OptionState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerOption, Difficulty};

    fn question(correct: Letter) -> Question {
        Question {
            question: "Which nerve supplies the deltoid?".to_string(),
            options: Letter::ALL.map(|label| AnswerOption {
                label,
                text: format!("option {label}"),
            }),
            correct_answer: correct,
            explanation: "Axillary nerve.".to_string(),
            subject: "Anatomy".to_string(),
        }
    }

    fn config(count: Limit, time: Limit, scope: TimerScope) -> QuizConfig {
        QuizConfig {
            question_count: count,
            time_limit: time,
            timer_scope: scope,
            ..QuizConfig::new("Anatomy", Difficulty::Easy)
        }
    }

    #[test]
    fn starts_loading_with_first_ordinal() {
        let session = QuizSession::new(config(Limit::Unlimited, Limit::Unlimited, TimerScope::Quiz));
        assert_eq!(session.phase(), Phase::Loading);
        assert_eq!(session.ordinal(), 1);
        assert_eq!(session.score(), 0);
        assert_eq!(session.remaining(), None);
    }

    #[test]
    fn first_selection_wins_and_later_ones_are_ignored() {
        let mut session = QuizSession::new(config(Limit::Unlimited, Limit::Unlimited, TimerScope::Quiz));
        assert_eq!(session.select(Letter::A), Selection::NotReady);
        assert!(session.present(question(Letter::B)));

        assert_eq!(session.select(Letter::B), Selection::Correct);
        assert_eq!(session.phase(), Phase::AnswerShown);
        assert_eq!(session.select(Letter::B), Selection::AlreadyAnswered);
        assert_eq!(session.select(Letter::C), Selection::AlreadyAnswered);
        assert_eq!(session.score(), 1);
        assert_eq!(session.selected(), Some(Letter::B));
    }

    #[test]
    fn wrong_answer_scores_nothing_and_highlights() {
        let mut session = QuizSession::new(config(Limit::Unlimited, Limit::Unlimited, TimerScope::Quiz));
        session.present(question(Letter::D));
        assert_eq!(session.option_state(Letter::D), OptionState::Neutral);

        assert_eq!(session.select(Letter::A), Selection::Incorrect);
        assert_eq!(session.score(), 0);
        assert_eq!(session.option_state(Letter::A), OptionState::Incorrect);
        assert_eq!(session.option_state(Letter::D), OptionState::Correct);
        assert_eq!(session.option_state(Letter::B), OptionState::Neutral);
    }

    #[test]
    fn present_is_ignored_outside_loading() {
        let mut session = QuizSession::new(config(Limit::Unlimited, Limit::Unlimited, TimerScope::Quiz));
        assert!(session.present(question(Letter::A)));
        assert!(!session.present(question(Letter::B)));
        assert_eq!(session.question().map(|q| q.correct_answer), Some(Letter::A));
    }

    #[test]
    fn bounded_count_completes_after_last_question() {
        let mut session = QuizSession::new(config(Limit::Bounded(2), Limit::Unlimited, TimerScope::Quiz));
        session.present(question(Letter::A));
        assert_eq!(session.advance(), Advance::NotReady);
        session.select(Letter::A);
        assert_eq!(session.advance(), Advance::Load);
        assert_eq!(session.ordinal(), 2);
        assert_eq!(session.phase(), Phase::Loading);

        session.present(question(Letter::A));
        session.select(Letter::B);
        let Advance::Completed(summary) = session.advance() else {
            panic!("expected completion");
        };
        assert_eq!(summary, Summary { score: 1, total_questions: 2, percentage: 50 });
        assert_eq!(session.phase(), Phase::Completed);
        assert_eq!(session.advance(), Advance::NotReady);
        assert_eq!(session.select(Letter::A), Selection::NotReady);
    }

    #[test]
    fn expiry_locks_question_without_scoring() {
        let mut session = QuizSession::new(config(Limit::Unlimited, Limit::Bounded(2), TimerScope::Question));
        assert_eq!(session.tick(), Tick::Idle);
        session.present(question(Letter::A));

        assert_eq!(session.tick(), Tick::Counting(1));
        assert_eq!(session.tick(), Tick::Expired);
        assert_eq!(session.tick(), Tick::Idle);
        assert_eq!(session.phase(), Phase::AnswerShown);
        assert_eq!(session.select(Letter::A), Selection::TimeUp);
        assert_eq!(session.score(), 0);
        assert_eq!(session.selected(), None);
        assert_eq!(session.option_state(Letter::A), OptionState::Correct);
    }

    #[test]
    fn per_question_timer_restarts_for_each_question() {
        let mut session = QuizSession::new(config(Limit::Unlimited, Limit::Bounded(3), TimerScope::Question));
        session.present(question(Letter::A));
        session.tick();
        session.tick();
        session.tick();
        assert_eq!(session.advance(), Advance::Load);

        session.present(question(Letter::A));
        assert_eq!(session.remaining(), Some(3));
        assert_eq!(session.select(Letter::A), Selection::Correct);
    }

    #[test]
    fn quiz_timer_carries_over_and_ends_quiz_when_spent() {
        let mut session = QuizSession::new(config(Limit::Unlimited, Limit::Bounded(3), TimerScope::Quiz));
        session.present(question(Letter::A));
        session.tick();
        session.select(Letter::A);
        assert_eq!(session.tick(), Tick::Idle, "no countdown while the answer is shown");
        assert_eq!(session.advance(), Advance::Load);

        session.present(question(Letter::A));
        assert_eq!(session.remaining(), Some(2));
        session.tick();
        assert_eq!(session.tick(), Tick::Expired);
        assert!(matches!(session.advance(), Advance::Completed(Summary { score: 1, total_questions: 2, .. })));
    }

    #[test]
    fn explanation_toggles_only_after_answer() {
        let mut session = QuizSession::new(config(Limit::Unlimited, Limit::Unlimited, TimerScope::Quiz));
        session.present(question(Letter::A));
        assert!(!session.toggle_explanation());
        assert_eq!(session.view().question.unwrap().explanation, None);

        session.select(Letter::C);
        assert!(session.toggle_explanation());
        let view = session.view();
        let shown = view.question.unwrap();
        assert_eq!(shown.explanation.as_deref(), Some("Axillary nerve."));
        assert_eq!(shown.correct_answer, Some(Letter::A));
        assert!(!session.toggle_explanation());
    }

    #[test]
    fn view_hides_answer_until_selection() {
        let mut session = QuizSession::new(config(Limit::Bounded(5), Limit::Bounded(30), TimerScope::Quiz));
        session.present(question(Letter::B));
        let view = session.view();
        assert_eq!(view.phase, Phase::AwaitingAnswer);
        assert_eq!(view.remaining_seconds, Some(30));
        let shown = view.question.unwrap();
        assert_eq!(shown.options.len(), 4);
        assert_eq!(shown.correct_answer, None);
        assert!(view.summary.is_none());
    }

    #[test]
    fn finish_counts_only_answered_questions() {
        let mut session = QuizSession::new(config(Limit::Unlimited, Limit::Unlimited, TimerScope::Quiz));
        session.present(question(Letter::A));
        session.select(Letter::A);
        session.advance();
        let summary = session.finish();
        assert_eq!(summary, Some(Summary { score: 1, total_questions: 1, percentage: 100 }));
        assert_eq!(session.phase(), Phase::Completed);
        assert_eq!(session.finish(), None);
        assert_eq!(session.summary().total_questions, 1);
    }
}
