//! Single-owner task that runs an `ActiveQuiz` against a timer and a command channel.

use std::time::Duration;

use async_trait::async_trait;
use quiz_core::session::SessionPhase;
use quiz_core::{QuizSessionError, SessionEvent};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::quiz_loop::ActiveQuiz;

/// Host input for a running quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizCommand {
    Select(usize),
    Submit,
    Advance,
    ToggleBookmark,
    Abort,
}

/// What the driver publishes to its subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    Session(SessionEvent),
    Rejected {
        command: QuizCommand,
        error: QuizSessionError,
    },
}

/// Why the driver loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverExit {
    Completed,
    Aborted,
}

/// Source of one-second timer pulses.
#[async_trait]
pub trait TickSource: Send {
    /// Wait for the next pulse. Returns `false` once the source is exhausted.
    async fn next_tick(&mut self) -> bool;

    /// Restart the period from now. Called whenever a question starts counting down.
    fn reset(&mut self) {}
}

/// Wall-clock ticks from `tokio::time::interval`.
///
/// The first pulse fires one period after creation or `reset`, not immediately.
pub struct IntervalTicks {
    interval: Interval,
}

impl IntervalTicks {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    #[must_use]
    pub fn every_second() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl TickSource for IntervalTicks {
    async fn next_tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }

    fn reset(&mut self) {
        self.interval.reset();
    }
}

/// Channel-backed ticks, fired explicitly through a `ManualTickHandle`.
pub struct ManualTicks {
    rx: mpsc::UnboundedReceiver<()>,
}

#[derive(Clone)]
pub struct ManualTickHandle {
    tx: mpsc::UnboundedSender<()>,
}

impl ManualTicks {
    #[must_use]
    pub fn channel() -> (ManualTickHandle, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ManualTickHandle { tx }, Self { rx })
    }
}

impl ManualTickHandle {
    /// Queue one pulse. Returns `false` if the ticks were dropped.
    pub fn tick(&self) -> bool {
        self.tx.send(()).is_ok()
    }

    /// Queue `n` pulses.
    pub fn tick_n(&self, n: u32) -> bool {
        (0..n).all(|_| self.tick())
    }
}

#[async_trait]
impl TickSource for ManualTicks {
    async fn next_tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

enum Step {
    Command(Option<QuizCommand>),
    Tick(bool),
}

/// Owns the quiz while it runs so ticks and commands are applied one at a time.
pub struct QuizDriver<T: TickSource> {
    quiz: ActiveQuiz,
    ticks: T,
    commands: mpsc::Receiver<QuizCommand>,
    events: mpsc::UnboundedSender<DriverEvent>,
}

impl<T: TickSource> QuizDriver<T> {
    #[must_use]
    pub fn new(
        quiz: ActiveQuiz,
        ticks: T,
        commands: mpsc::Receiver<QuizCommand>,
        events: mpsc::UnboundedSender<DriverEvent>,
    ) -> Self {
        Self {
            quiz,
            ticks,
            commands,
            events,
        }
    }

    /// Run until the quiz completes, an `Abort` arrives, or the command
    /// channel closes. Returns the quiz so callers can read the final state.
    ///
    /// Ticks are only awaited while a question is being answered, and the
    /// tick source is reset each time a question starts so its first pulse
    /// lands one full period later. The tick source is dropped when the loop
    /// exits.
    pub async fn run(self) -> (ActiveQuiz, DriverExit) {
        let Self {
            mut quiz,
            mut ticks,
            mut commands,
            events,
        } = self;
        let mut ticks_live = true;
        let mut was_answering = false;

        let exit = loop {
            if quiz.session().is_complete() {
                break DriverExit::Completed;
            }
            let answering = quiz.session().phase() == SessionPhase::Answering;
            if answering && !was_answering {
                ticks.reset();
            }
            was_answering = answering;

            let step = tokio::select! {
                biased;
                cmd = commands.recv() => Step::Command(cmd),
                alive = ticks.next_tick(), if answering && ticks_live => Step::Tick(alive),
            };

            match step {
                Step::Command(None) => break DriverExit::Aborted,
                Step::Command(Some(command)) => {
                    let result = match command {
                        QuizCommand::Select(index) => quiz.select_option(index),
                        QuizCommand::Submit => quiz.submit().await,
                        QuizCommand::Advance => quiz.advance().await,
                        QuizCommand::ToggleBookmark => quiz.toggle_bookmark(),
                        QuizCommand::Abort => break DriverExit::Aborted,
                    };
                    let event = match result {
                        Ok(event) => DriverEvent::Session(event),
                        Err(error) => {
                            log::debug!("rejected {command:?}: {error}");
                            DriverEvent::Rejected { command, error }
                        }
                    };
                    publish(&events, event);
                }
                Step::Tick(false) => {
                    log::debug!("tick source exhausted");
                    ticks_live = false;
                }
                Step::Tick(true) => {
                    if let Some(event) = quiz.tick().await {
                        publish(&events, DriverEvent::Session(event));
                    }
                }
            }
        };

        drop(ticks);
        log::debug!("quiz driver stopped: {exit:?}");
        (quiz, exit)
    }
}

fn publish(events: &mpsc::UnboundedSender<DriverEvent>, event: DriverEvent) {
    if events.send(event).is_err() {
        log::debug!("event subscriber dropped");
    }
}
