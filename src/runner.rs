//! Drives a `QuizSession`: fetches questions, runs the countdown and turns
//! failures into notices.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::QuestionError;
use crate::models::{Letter, Question, QuizConfig};
use crate::notice::Notices;
use crate::session::{Advance, Phase, QuizSession, Selection, SessionView, Summary, Tick};

pub const TIME_UP_NOTICE: &str = "Time's up!";

/// Anything that can produce the next question for a configuration.
pub trait QuestionSource: Send + Sync + 'static {
    fn next_question(
        &self,
        config: &QuizConfig,
    ) -> impl Future<Output = Result<Question, QuestionError>> + Send;
}

/// Outcome of a load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Load {
    Presented,
    /// The request failed; a notice was emitted and the session is still loading.
    Failed,
    /// Not loading, or a request is already in flight. No request was made.
    Skipped,
    /// The runner was closed while the request was in flight.
    Discarded,
}

pub struct QuizRunner<Q> {
    config: QuizConfig,
    session: Arc<Mutex<QuizSession>>,
    source: Arc<Q>,
    notices: Notices,
    /// Signals the countdown that a question was just presented.
    presented: Arc<Notify>,
    in_flight: AtomicBool,
    closed: AtomicBool,
    ticker: Option<JoinHandle<()>>,
}

impl<Q: QuestionSource> QuizRunner<Q> {
    /// Creates the session and, if a time limit is set, its countdown task.
    ///
    /// Must be called inside a tokio runtime. The first question is fetched
    /// by `load_question`.
    pub fn start(config: QuizConfig, source: Arc<Q>, notices: Notices) -> Self {
        let session = Arc::new(Mutex::new(QuizSession::new(config.clone())));
        let presented = Arc::new(Notify::new());
        let ticker = config.time_limit.bound().map(|_| {
            tokio::spawn(countdown(
                Arc::downgrade(&session),
                presented.clone(),
                notices.clone(),
            ))
        });
        info!(
            subject = %config.subject,
            difficulty = %config.difficulty,
            question_count = ?config.question_count.bound(),
            time_limit = ?config.time_limit.bound(),
            "Quiz started"
        );
        Self {
            config,
            session,
            source,
            notices,
            presented,
            in_flight: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            ticker,
        }
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, QuizSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase()
    }

    pub fn view(&self) -> SessionView {
        self.lock().view()
    }

    pub fn with_session<R>(&self, f: impl FnOnce(&QuizSession) -> R) -> R {
        f(&self.lock())
    }

    /// Requests a question if the session is waiting for one.
    ///
    /// At most one request is in flight per runner.
    pub async fn load_question(&self) -> Load {
        if self.phase() != Phase::Loading || self.closed.load(Ordering::SeqCst) {
            return Load::Skipped;
        }
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("Question request already in flight");
            return Load::Skipped;
        };

        let result = self.source.next_question(&self.config).await;

        if self.closed.load(Ordering::SeqCst) {
            debug!("Discarding question for a closed quiz");
            return Load::Discarded;
        }
        match result {
            Ok(question) => {
                if self.lock().present(question) {
                    self.presented.notify_one();
                }
                Load::Presented
            }
            Err(e) => {
                warn!(error = %e, "Question generation failed");
                self.notices.error(e.notice_text());
                Load::Failed
            }
        }
    }

    pub fn select(&self, letter: Letter) -> Selection {
        self.lock().select(letter)
    }

    pub fn toggle_explanation(&self) -> bool {
        self.lock().toggle_explanation()
    }

    /// Moves past an answered question and fetches the next one, or completes.
    pub async fn advance(&self) -> (Advance, Option<Load>) {
        let advance = self.lock().advance();
        match advance {
            Advance::Load => (advance, Some(self.load_question().await)),
            Advance::Completed(summary) => {
                self.announce(summary);
                (advance, None)
            }
            Advance::NotReady => (advance, None),
        }
    }

    /// Stops the quiz early and reports the result.
    ///
    /// `None` if the quiz had already completed; nothing is announced then.
    pub fn finish(&self) -> Option<Summary> {
        let summary = self.lock().finish()?;
        self.announce(summary);
        Some(summary)
    }

    fn announce(&self, summary: Summary) {
        self.notices.success(format!(
            "Quiz completed! Final score: {}/{}",
            summary.score, summary.total_questions
        ));
    }

    /// Releases the countdown and drops any result still in flight.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(ticker) = &self.ticker {
            ticker.abort();
        }
    }
}

impl<Q> Drop for QuizRunner<Q> {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

async fn countdown(session: Weak<Mutex<QuizSession>>, presented: Arc<Notify>, notices: Notices) {
    let period = Duration::from_secs(1);
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = presented.notified() => {
                // A full second for the first tick of every question.
                interval.reset();
                continue;
            }
        }
        let Some(session) = session.upgrade() else {
            break;
        };
        let tick = session.lock().unwrap_or_else(PoisonError::into_inner).tick();
        if tick == Tick::Expired {
            notices.error(TIME_UP_NOTICE);
        }
    }
}
