use std::fmt;
use std::io::BufRead;

use quiz_core::model::{
    DEFAULT_QUESTION_LIMIT, DEFAULT_TIME_PER_QUESTION_SECS, Difficulty, QuizSettings, Topic,
    UserId,
};
use quiz_core::SessionEvent;
use services::{
    AppServices, Clock, DriverEvent, DriverExit, IntervalTicks, QuizCommand, QuizDriver,
    QuizServiceError,
};
use tokio::sync::mpsc;

mod render;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidUserId { raw: String },
    InvalidTopic { raw: String },
    InvalidDifficulty { raw: String },
    InvalidTime { raw: String },
    InvalidLimit { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user value: {raw}"),
            ArgsError::InvalidTopic { raw } => write!(f, "invalid --topic value: {raw}"),
            ArgsError::InvalidDifficulty { raw } => {
                write!(f, "invalid --difficulty value: {raw}")
            }
            ArgsError::InvalidTime { raw } => {
                write!(f, "invalid --time value (expected 1..=3600 seconds): {raw}")
            }
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
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

#[derive(Debug)]
struct Args {
    db_url: String,
    user_id: Option<UserId>,
    settings: QuizSettings,
    shuffle: bool,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- play   [options]");
    eprintln!("  cargo run -p app -- topics [--db <sqlite_url>] [--user <uuid>]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:quiz.sqlite3)");
    eprintln!("  --user <uuid>             Profile id to play as");
    eprintln!("  --topic <name>            Topic (default: RUST)");
    eprintln!("  --difficulty <name>       Difficulty (default: Easy)");
    eprintln!("  --time <seconds>          Seconds per question (default: {DEFAULT_TIME_PER_QUESTION_SECS})");
    eprintln!("  --limit <n>               Maximum questions (default: {DEFAULT_QUESTION_LIMIT})");
    eprintln!("  --shuffle                 Shuffle question order");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_USER_ID, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Topics,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "topics" => Some(Self::Topics),
            _ => None,
        }
    }
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("sqlite:quiz.sqlite3".into()), normalize_sqlite_url);
        let mut user_id = match std::env::var("QUIZ_USER_ID") {
            Ok(raw) => Some(
                raw.parse::<UserId>()
                    .map_err(|_| ArgsError::InvalidUserId { raw: raw.clone() })?,
            ),
            Err(_) => None,
        };
        let mut topic = String::from("RUST");
        let mut difficulty = String::from("Easy");
        let mut time = DEFAULT_TIME_PER_QUESTION_SECS;
        let mut limit = DEFAULT_QUESTION_LIMIT;
        let mut shuffle = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => {
                    let value = require_value(args, "--user")?;
                    user_id = Some(
                        value
                            .parse()
                            .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?,
                    );
                }
                "--topic" => topic = require_value(args, "--topic")?,
                "--difficulty" => difficulty = require_value(args, "--difficulty")?,
                "--time" => {
                    let value = require_value(args, "--time")?;
                    time = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidTime { raw: value.clone() })?;
                }
                "--limit" => {
                    let value = require_value(args, "--limit")?;
                    limit = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidLimit { raw: value.clone() })?;
                }
                "--shuffle" => shuffle = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let topic_name =
            Topic::new(&topic).map_err(|_| ArgsError::InvalidTopic { raw: topic.clone() })?;
        let difficulty_name = Difficulty::new(&difficulty).map_err(|_| {
            ArgsError::InvalidDifficulty {
                raw: difficulty.clone(),
            }
        })?;
        let settings = QuizSettings::new(topic_name, difficulty_name)
            .with_time_per_question(time)
            .map_err(|_| ArgsError::InvalidTime {
                raw: time.to_string(),
            })?
            .with_question_limit(limit)
            .map_err(|_| ArgsError::InvalidLimit {
                raw: limit.to_string(),
            })?;

        Ok(Self {
            db_url,
            user_id,
            settings,
            shuffle,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn list_topics(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let topics = services.catalog().topics().await?;
    let difficulties = services.catalog().difficulties().await?;

    println!("Topics:");
    for info in &topics {
        match &info.description {
            Some(desc) => println!("  {}  {desc}", info.topic),
            None => println!("  {}", info.topic),
        }
    }
    println!("Difficulties:");
    for info in &difficulties {
        println!("  {}", info.difficulty);
    }
    Ok(())
}

/// Reads stdin on a dedicated thread; tokio's stdin would keep the runtime
/// alive until the next newline after the quiz ends.
fn spawn_input(commands: mpsc::Sender<QuizCommand>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match render::parse_command(&line) {
                Some(command) => {
                    if commands.blocking_send(command).is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => eprintln!("{}", render::help()),
            }
        }
    });
}

async fn play(services: &AppServices, settings: &QuizSettings) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(overview) = services.profiles().overview().await? {
        println!("{}", render::profile(&overview));
    }

    let quiz = match services.quiz_loop().start_quiz(settings).await {
        Ok(quiz) => quiz,
        Err(QuizServiceError::Unauthenticated) => {
            eprintln!("No profile selected. Pass --user <uuid> or set QUIZ_USER_ID (see the seed binary).");
            return Ok(());
        }
        Err(QuizServiceError::NoQuestions) => {
            println!(
                "No questions available for {} / {}.",
                settings.topic(),
                settings.difficulty()
            );
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let questions = quiz.session().questions().to_vec();
    let seconds = quiz.session().time_per_question();
    println!("{}", render::help());
    if let Some(first) = questions.first() {
        print!("{}", render::question(first, 0, questions.len(), seconds));
    }

    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let driver = tokio::spawn(
        QuizDriver::new(quiz, IntervalTicks::every_second(), cmd_rx, event_tx).run(),
    );
    spawn_input(cmd_tx);

    while let Some(event) = event_rx.recv().await {
        if let Some(text) = render::event(&event) {
            println!("{text}");
        }
        if let DriverEvent::Session(SessionEvent::Advanced { index }) = event {
            if let Some(next) = questions.get(index) {
                print!("{}", render::question(next, index, questions.len(), seconds));
            }
        }
    }

    let (quiz, exit) = driver.await?;
    match exit {
        DriverExit::Completed => {
            let profile = quiz.user();
            println!(
                "Level {}  ·  {} XP ({} to next level)  ·  {} day streak",
                profile.level,
                profile.xp_points,
                profile.xp_to_next_level(),
                profile.streak_days
            );
        }
        DriverExit::Aborted => println!("Quiz abandoned."),
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: play when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&parsed.db_url)?;
    let services = AppServices::new_sqlite(&parsed.db_url, Clock::default_clock(), parsed.user_id)
        .await?
        .with_shuffle(parsed.shuffle);

    match cmd {
        Command::Play => play(&services, &parsed.settings).await,
        Command::Topics => list_topics(&services).await,
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_string());
        Args::parse(&mut iter)
    }

    #[test]
    fn sqlite_urls_are_made_absolute() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
        assert_eq!(normalize_sqlite_url("sqlite:///tmp/q.db".into()), "sqlite:///tmp/q.db");
        assert_eq!(normalize_sqlite_url("sqlite:/tmp/q.db".into()), "sqlite:///tmp/q.db");
    }

    #[test]
    fn settings_flags_are_validated() {
        let args = parse(&["--topic", "go", "--difficulty", "EXPERT", "--time", "45", "--limit", "3"])
            .unwrap();
        assert_eq!(args.settings.topic().as_str(), "GO");
        assert_eq!(args.settings.difficulty().as_str(), "Expert");
        assert_eq!(args.settings.time_per_question(), 45);
        assert_eq!(args.settings.question_limit(), 3);

        assert!(matches!(parse(&["--time", "0"]), Err(ArgsError::InvalidTime { .. })));
        assert!(matches!(parse(&["--limit", "0"]), Err(ArgsError::InvalidLimit { .. })));
        assert!(matches!(parse(&["--topic"]), Err(ArgsError::MissingValue { .. })));
        assert!(matches!(parse(&["--bogus"]), Err(ArgsError::UnknownArg(_))));
    }
}
