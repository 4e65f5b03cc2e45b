use clap::{Parser, Subcommand};
use serde::Serialize;
use std::{
    error::Error,
    fs::File,
    io::{self, BufRead, Write},
    path::PathBuf,
    process::ExitCode,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use typex::{
    config::{ConfigStore, FileConfigStore},
    feedback,
    passages::{self, Difficulty},
    scoring,
    service::{Submission, TypingService},
    session::TypingSession,
    util::format_duration,
};

/// typing speed tester with history and leaderboards
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Measure typing speed and accuracy against bundled or custom passages, keep a per-user history, and rank users on a leaderboard."
)]
pub struct Cli {
    /// results database to use instead of the configured one
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    /// config file to load instead of the default location
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// more log output on stderr (-v info, -vv debug)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// log in as an existing user or register a new one
    Register {
        #[clap(short, long)]
        name: String,
        #[clap(short, long)]
        email: String,
    },

    /// change a user's display name
    Rename {
        #[clap(short, long)]
        email: String,
        #[clap(short, long)]
        name: String,
    },

    /// score an attempt without saving it
    Score {
        #[clap(short, long)]
        reference: String,
        #[clap(short, long)]
        typed: String,
        /// seconds the attempt took
        #[clap(short = 's', long, allow_hyphen_values = true)]
        elapsed: f64,
        #[clap(long)]
        json: bool,
    },

    /// take a typing test: type the shown passage and press enter
    Test {
        #[clap(short, long)]
        email: String,
        #[clap(short, long, value_enum)]
        difficulty: Option<Difficulty>,
        /// custom text to type instead of a bundled passage
        #[clap(short = 'p', long)]
        text: Option<String>,
        #[clap(long)]
        json: bool,
    },

    /// recent results of a user
    History {
        #[clap(short, long)]
        email: String,
        #[clap(short = 'n', long)]
        limit: Option<usize>,
        /// write the full history to a CSV file
        #[clap(long)]
        csv: Option<PathBuf>,
        #[clap(long)]
        json: bool,
    },

    /// averages, best score and rank of a user
    Stats {
        #[clap(short, long)]
        email: String,
        #[clap(long)]
        json: bool,
    },

    /// fastest tests, or best result per user with --per-user
    Leaderboard {
        #[clap(short = 'n', long)]
        limit: Option<usize>,
        #[clap(long)]
        per_user: bool,
        #[clap(long)]
        json: bool,
    },

    /// statistics across all users
    Global {
        #[clap(long)]
        json: bool,
    },

    /// print a random passage
    Passage {
        #[clap(short, long, value_enum)]
        difficulty: Option<Difficulty>,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let mut config = store.load();
    if let Some(db) = cli.db.clone() {
        config.db_path = Some(db);
    }
    debug!(?config, "loaded configuration");

    match cli.command {
        Command::Score {
            reference,
            typed,
            elapsed,
            json,
        } => run_score(&reference, &typed, elapsed, json),
        Command::Passage { difficulty } => {
            let difficulty = difficulty.unwrap_or(config.difficulty);
            println!("{}", passages::random_passage(difficulty)?);
            Ok(())
        }
        command => {
            let service = TypingService::open(config)?;
            run_with_service(&service, command)
        }
    }
}

fn run_score(reference: &str, typed: &str, elapsed: f64, json: bool) -> Result<(), Box<dyn Error>> {
    let score = scoring::score(reference, typed, elapsed)?;
    if json {
        return print_json(&score);
    }

    let session = TypingSession::new(reference);
    println!("WPM:      {:.2}", score.wpm());
    println!("Accuracy: {:.2}%", score.accuracy());
    println!(
        "Words:    {}/{} correct",
        score.correct_words(),
        score.typed_words()
    );
    println!("Chars:    {}/{}", score.correct_chars(), score.total_chars());
    println!("Marked:   {}", session.render_marked(typed));
    Ok(())
}

fn run_with_service(service: &TypingService, command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Register { name, email } => {
            let (user, created) = service.login_or_register(&name, &email)?;
            if created {
                println!("Account created! Welcome, {}!", user.name);
            } else {
                println!("Welcome back, {}!", user.name);
            }
        }
        Command::Rename { email, name } => {
            let user = service.user_by_email(&email)?;
            let user = service.rename(user.id, &name)?;
            println!("Renamed to {}", user.name);
        }
        Command::Test {
            email,
            difficulty,
            text,
            json,
        } => {
            let user = service.user_by_email(&email)?;
            let difficulty = difficulty.unwrap_or(service.config().difficulty);
            let prompt = passages::resolve_prompt(difficulty, text.as_deref())?;
            let avg_wpm = service.summary(user.id)?.averages.avg_wpm;

            println!(
                "Type the text below and press enter (about {}):",
                format_duration(feedback::estimated_secs(&prompt, avg_wpm))
            );
            println!();
            println!("{prompt}");
            println!();
            io::stdout().flush()?;

            let mut session = TypingSession::new(prompt);
            session.start();
            let mut typed = String::new();
            io::stdin().lock().read_line(&mut typed)?;
            let typed = typed.trim_end_matches(['\n', '\r']);

            let submission = service.submit_session(user.id, &session, typed)?;
            if json {
                print_json(&submission)?;
            } else {
                print_submission(&session, typed, &submission);
            }
        }
        Command::History {
            email,
            limit,
            csv,
            json,
        } => {
            let user = service.user_by_email(&email)?;
            if let Some(path) = csv {
                let written = service.export_history(user.id, File::create(&path)?)?;
                println!("Wrote {written} results to {}", path.display());
                return Ok(());
            }

            let history = service.history(user.id, limit)?;
            if json {
                return print_json(&history);
            }
            if history.is_empty() {
                println!("No tests yet. Take your first test to see stats!");
            }
            for r in history {
                println!(
                    "{}  {:>7.2} wpm  {:>6.2}%",
                    r.taken_at.format("%Y-%m-%d %H:%M"),
                    r.wpm,
                    r.accuracy
                );
            }
        }
        Command::Stats { email, json } => {
            let user = service.user_by_email(&email)?;
            let summary = service.summary(user.id)?;
            if json {
                return print_json(&summary);
            }

            println!("{} <{}>", summary.user.name, summary.user.email);
            if summary.averages.total_tests == 0 {
                println!("Take your first test to see stats!");
                return Ok(());
            }
            println!("Total tests:      {}", summary.averages.total_tests);
            println!("Average WPM:      {:.1}", summary.averages.avg_wpm);
            println!("Average accuracy: {:.1}%", summary.averages.avg_accuracy);
            if let Some(best) = summary.best {
                println!("Best WPM:         {:.1}", best.wpm);
            }
            if let Some(rank) = summary.rank {
                println!("Global rank:      #{rank}");
            }
        }
        Command::Leaderboard {
            limit,
            per_user,
            json,
        } => {
            if per_user || service.config().per_user_leaderboard {
                let board = service.leaderboard(limit)?;
                if json {
                    return print_json(&board);
                }
                for e in board {
                    println!(
                        "#{:<3} {:<24} {:>7.2} wpm  {:>6.2}%  ({} tests)",
                        e.rank, e.name, e.max_wpm, e.max_accuracy, e.tests
                    );
                }
            } else {
                let top = service.top_tests(limit)?;
                if json {
                    return print_json(&top);
                }
                for t in top {
                    println!(
                        "#{:<3} {:<24} {:>7.2} wpm  {:>6.2}%  {}",
                        t.rank,
                        t.name,
                        t.wpm,
                        t.accuracy,
                        t.taken_at.format("%Y-%m-%d")
                    );
                }
            }
        }
        Command::Global { json } => {
            let stats = service.global_stats()?;
            if json {
                return print_json(&stats);
            }
            println!("Total tests:      {}", stats.total_tests);
            println!("Average WPM:      {:.2}", stats.avg_wpm);
            println!("Highest WPM:      {:.2}", stats.highest_wpm);
            println!("Average accuracy: {:.2}%", stats.avg_accuracy);
            println!("WPM std dev:      {:.2}", stats.wpm_std_dev);
        }
        Command::Score { .. } | Command::Passage { .. } => {}
    }
    Ok(())
}

fn print_submission(session: &TypingSession, typed: &str, submission: &Submission) {
    let score = &submission.score;
    println!("Time:     {}", format_duration(score.elapsed_secs()));
    println!("WPM:      {:.2}", submission.result.wpm);
    println!("Accuracy: {:.2}%", submission.result.accuracy);
    println!("Rating:   {}", submission.rating);
    println!("Progress: {}", submission.progress.message);
    if score.correct_chars() < score.total_chars() {
        println!("Marked:   {}", session.render_marked(typed));
    }
    println!();
    println!("Tips:");
    for tip in &submission.tips {
        println!("  - {tip}");
    }
}
