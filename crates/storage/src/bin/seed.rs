use std::fmt;

use chrono::{DateTime, Duration, Utc};
use quiz_core::model::{
    Difficulty, DifficultyInfo, OptionDraft, QuestionId, Topic, TopicInfo, UserId, UserProfile,
};
use storage::repository::{QuestionRecord, Storage};
use uuid::Uuid;

const DEMO_USER: u128 = 0x5eed_0000_0000_4000_8000_0000_0000_0001;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    user_id: UserId,
    display_name: String,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidUserId { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| "sqlite:quiz.sqlite3".into());
        let mut user_id = std::env::var("QUIZ_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok())
            .unwrap_or_else(|| UserId::new(Uuid::from_u128(DEMO_USER)));
        let mut display_name =
            std::env::var("QUIZ_DISPLAY_NAME").unwrap_or_else(|_| "Demo Learner".into());
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    user_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?;
                }
                "--name" => {
                    display_name = require_value(&mut args, "--name")?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            user_id,
            display_name,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:quiz.sqlite3)");
    eprintln!("  --user <uuid>             Profile id to upsert (default: built-in demo id)");
    eprintln!("  --name <text>             Profile display name (default: Demo Learner)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL, QUIZ_USER_ID, QUIZ_DISPLAY_NAME");
}

struct Sample {
    topic: &'static str,
    difficulty: &'static str,
    text: &'static str,
    code: Option<&'static str>,
    options: [&'static str; 4],
    correct: u32,
    explanation: &'static str,
    points: i64,
}

const SAMPLES: &[Sample] = &[
    Sample {
        topic: "RUST",
        difficulty: "Easy",
        text: "Which keyword declares a mutable binding?",
        code: None,
        options: ["let mut", "var", "mut let", "let ref"],
        correct: 1,
        explanation: "Bindings are immutable unless declared with `let mut`.",
        points: 10,
    },
    Sample {
        topic: "RUST",
        difficulty: "Easy",
        text: "What does this print?",
        code: Some("let v = vec![1, 2, 3];\nprintln!(\"{}\", v.len());"),
        options: ["2", "3", "4", "It does not compile"],
        correct: 2,
        explanation: "`len` returns the number of elements, which is 3.",
        points: 10,
    },
    Sample {
        topic: "RUST",
        difficulty: "Easy",
        text: "Which type represents an optional value?",
        code: None,
        options: ["Result<T, E>", "Option<T>", "Maybe<T>", "Nullable<T>"],
        correct: 2,
        explanation: "`Option<T>` is either `Some(T)` or `None`.",
        points: 10,
    },
    Sample {
        topic: "RUST",
        difficulty: "Intermediate",
        text: "Which trait must a type implement to be sent across threads?",
        code: None,
        options: ["Sync", "Copy", "Send", "Clone"],
        correct: 3,
        explanation: "`Send` marks types whose ownership can move between threads.",
        points: 20,
    },
    Sample {
        topic: "RUST",
        difficulty: "Expert",
        text: "What does `Pin<&mut T>` guarantee?",
        code: None,
        options: [
            "T is heap allocated",
            "T will not move until dropped unless it is Unpin",
            "T is never dropped",
            "T is thread safe",
        ],
        correct: 2,
        explanation: "Pinning forbids moving the pointee unless it implements `Unpin`.",
        points: 30,
    },
    Sample {
        topic: "SQL",
        difficulty: "Easy",
        text: "Which clause filters grouped rows?",
        code: None,
        options: ["WHERE", "HAVING", "ORDER BY", "LIMIT"],
        correct: 2,
        explanation: "`HAVING` applies after `GROUP BY`; `WHERE` filters before grouping.",
        points: 10,
    },
];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    for (name, description) in [
        ("RUST", "Ownership, traits and the standard library"),
        ("SQL", "Relational queries"),
    ] {
        storage
            .catalog
            .upsert_topic(&TopicInfo {
                topic: Topic::new(name)?,
                description: Some(description.into()),
            })
            .await?;
    }

    for (order, name) in [(1, "Easy"), (2, "Intermediate"), (3, "Expert")] {
        storage
            .catalog
            .upsert_difficulty(&DifficultyInfo {
                difficulty: Difficulty::new(name)?,
                level_order: order,
                description: None,
            })
            .await?;
    }

    for (i, sample) in SAMPLES.iter().enumerate() {
        let seq = u32::try_from(i)?;
        let options = (1_u32..)
            .zip(sample.options)
            .map(|(order, text)| OptionDraft::new(order, text, order == sample.correct))
            .collect();
        let record = QuestionRecord {
            id: QuestionId::new(Uuid::from_u128(u128::from(seq) + 1)),
            topic: Topic::new(sample.topic)?,
            difficulty: Difficulty::new(sample.difficulty)?,
            text: sample.text.into(),
            code_snippet: sample.code.map(str::to_owned),
            explanation: Some(sample.explanation.into()),
            points: Some(sample.points),
            options,
            created_at: now + Duration::seconds(i64::from(seq)),
        };
        // Validate before writing so a bad sample fails the seed run.
        record.clone().into_question()?;
        storage.questions.upsert_question(&record).await?;
    }

    let profile = match storage.profiles.get_profile(args.user_id).await? {
        Some(mut existing) => {
            existing.display_name.clone_from(&args.display_name);
            existing
        }
        None => UserProfile::new(args.user_id, args.display_name.clone()),
    };
    storage.profiles.upsert_profile(&profile).await?;

    println!(
        "Seeded {} questions and profile {} ({}) into {}",
        SAMPLES.len(),
        profile.id,
        profile.display_name,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
