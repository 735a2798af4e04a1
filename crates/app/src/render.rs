//! Plain-text rendering of quiz state and parsing of typed commands.

use std::fmt::Write as _;

use quiz_core::model::Question;
use quiz_core::session::STREAK_MILESTONE;
use quiz_core::{AnswerOutcome, QuizSessionError, QuizSummary, SessionEvent};
use services::{DriverEvent, ProfileOverview, QuizCommand};

/// Seconds at or below which every tick is shown.
const COUNTDOWN_ALERT_SECS: u32 = 5;
/// Otherwise ticks are shown on multiples of this.
const COUNTDOWN_STEP_SECS: u32 = 30;

/// Map one line of input to a command. Options are typed 1-based.
pub fn parse_command(line: &str) -> Option<QuizCommand> {
    let line = line.trim();
    if let Ok(n) = line.parse::<usize>() {
        return n.checked_sub(1).map(QuizCommand::Select);
    }
    match line.to_ascii_lowercase().as_str() {
        "s" | "submit" => Some(QuizCommand::Submit),
        "n" | "next" => Some(QuizCommand::Advance),
        "b" | "bookmark" => Some(QuizCommand::ToggleBookmark),
        "q" | "quit" => Some(QuizCommand::Abort),
        _ => None,
    }
}

pub fn help() -> &'static str {
    "  <number> pick option  ·  s submit  ·  n next  ·  b bookmark  ·  q quit"
}

pub fn question(question: &Question, index: usize, total: usize, seconds: u32) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "Question {}/{total}  ({seconds}s)", index + 1);
    let _ = writeln!(out, "{}", question.text());
    if let Some(code) = question.code_snippet() {
        let _ = writeln!(out);
        for line in code.lines() {
            let _ = writeln!(out, "    {line}");
        }
    }
    let _ = writeln!(out);
    for option in question.options() {
        let _ = writeln!(out, "  {}) {}", option.order, option.text);
    }
    out
}

fn outcome(outcome: &AnswerOutcome) -> String {
    let mut out = String::new();
    if outcome.timed_out {
        let _ = writeln!(out, "Time's up!");
    } else if outcome.correct {
        let _ = writeln!(out, "Correct! +{} points", outcome.points_awarded);
    } else {
        let _ = writeln!(out, "Incorrect.");
    }
    let _ = writeln!(out, "Answer: option {}", outcome.correct_index + 1);
    let _ = writeln!(out, "{}", outcome.explanation);
    if outcome.streak >= STREAK_MILESTONE {
        let _ = writeln!(out, "{} in a row!", outcome.streak);
    }
    let _ = write!(out, "(n for next)");
    out
}

pub fn summary(summary: &QuizSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Quiz complete: {}/{} correct ({}%)",
        summary.score,
        summary.total_questions,
        summary.score_percentage()
    );
    let _ = writeln!(out, "Points earned: {}", summary.points_earned);
    let _ = writeln!(out, "Final streak: {}", summary.final_streak);
    if !summary.bookmarked.is_empty() {
        let _ = write!(out, "Bookmarked: {} question(s)", summary.bookmarked.len());
    }
    out.trim_end().to_string()
}

pub fn profile(overview: &ProfileOverview) -> String {
    let p = &overview.profile;
    format!(
        "{}  ·  level {}  ·  {} XP ({} to next level)  ·  {} day streak",
        p.display_name, p.level, p.xp_points, overview.xp_to_next_level, p.streak_days
    )
}

fn rejection(error: &QuizSessionError) -> String {
    match error {
        QuizSessionError::NoSelection => "Pick an option first.".into(),
        QuizSessionError::NotRevealed => "Submit an answer before moving on.".into(),
        QuizSessionError::AlreadyRevealed => "Already answered; type n for next.".into(),
        QuizSessionError::OptionOutOfRange { len, .. } => {
            format!("Choose an option between 1 and {len}.")
        }
        other => other.to_string(),
    }
}

/// Text for a driver event, or `None` for events that stay silent.
pub fn event(event: &DriverEvent) -> Option<String> {
    match event {
        DriverEvent::Rejected { error, .. } => Some(rejection(error)),
        DriverEvent::Session(SessionEvent::Ticked { remaining_seconds }) => {
            let secs = *remaining_seconds;
            (secs <= COUNTDOWN_ALERT_SECS || secs % COUNTDOWN_STEP_SECS == 0)
                .then(|| format!("  {secs}s left"))
        }
        DriverEvent::Session(SessionEvent::OptionSelected { index }) => {
            Some(format!("Selected {} (s to submit)", index + 1))
        }
        DriverEvent::Session(SessionEvent::Answered(o) | SessionEvent::TimedOut(o)) => {
            Some(outcome(o))
        }
        DriverEvent::Session(SessionEvent::BookmarkToggled { bookmarked, .. }) => Some(
            if *bookmarked {
                "Bookmarked."
            } else {
                "Bookmark removed."
            }
            .to_string(),
        ),
        DriverEvent::Session(SessionEvent::Advanced { .. }) => None,
        DriverEvent::Session(SessionEvent::Completed(s)) => Some(summary(s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionId;

    #[test]
    fn parses_one_based_options_and_keywords() {
        assert_eq!(parse_command(" 2 "), Some(QuizCommand::Select(1)));
        assert_eq!(parse_command("0"), None);
        assert_eq!(parse_command("S"), Some(QuizCommand::Submit));
        assert_eq!(parse_command("next"), Some(QuizCommand::Advance));
        assert_eq!(parse_command("b"), Some(QuizCommand::ToggleBookmark));
        assert_eq!(parse_command("q"), Some(QuizCommand::Abort));
        assert_eq!(parse_command("maybe"), None);
    }

    #[test]
    fn countdown_is_throttled() {
        let tick = |s| DriverEvent::Session(SessionEvent::Ticked {
            remaining_seconds: s,
        });
        assert!(event(&tick(90)).is_some());
        assert!(event(&tick(89)).is_none());
        assert!(event(&tick(3)).is_some());
    }

    #[test]
    fn question_lists_options_and_snippet() {
        let q = Question::new(
            QuestionId::random(),
            "What prints?",
            vec!["1".into(), "2".into()],
            0,
            None,
            None,
        )
        .unwrap()
        .with_code_snippet(Some("println!(\"1\");".into()));
        let text = question(&q, 0, 3, 120);
        assert!(text.contains("Question 1/3  (120s)"));
        assert!(text.contains("    println!(\"1\");"));
        assert!(text.contains("  2) 2"));
    }

    #[test]
    fn streak_milestone_is_celebrated() {
        let answered = |streak| {
            DriverEvent::Session(SessionEvent::Answered(AnswerOutcome {
                question_id: QuestionId::random(),
                chosen: Some(0),
                correct_index: 0,
                correct: true,
                timed_out: false,
                elapsed_seconds: 4,
                points_awarded: 10,
                streak,
                explanation: "ok".into(),
            }))
        };
        assert!(event(&answered(3)).unwrap().contains("3 in a row!"));
        assert!(!event(&answered(2)).unwrap().contains("in a row"));
    }

    #[test]
    fn rejections_are_friendly() {
        let ev = DriverEvent::Rejected {
            command: QuizCommand::Select(7),
            error: QuizSessionError::OptionOutOfRange { index: 7, len: 4 },
        };
        assert_eq!(
            event(&ev).unwrap(),
            "Choose an option between 1 and 4."
        );
    }
}
