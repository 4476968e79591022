//! Command-line front end for the pollbox voting store.
//!
//! Each invocation opens the store from `<root>/.pollbox/`, runs one command and
//! exits. The session survives between invocations through the `currentUser` slot.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::warn;

use pollbox::core::draft::{PollDraft, validate_draft};
use pollbox::core::query::{PollFilter, PollSort, list_polls, results_order};
use pollbox::core::types::Rejection;
use pollbox::exit_codes;
use pollbox::io::clock::SystemClock;
use pollbox::io::config::load_config;
use pollbox::io::init::{InitOptions, PollboxPaths, init_pollbox};
use pollbox::io::storage::FileStorage;
use pollbox::logging;
use pollbox::render::{render_feedback, render_poll_list, render_results, render_session};
use pollbox::store::VotingStore;

#[derive(Parser)]
#[command(name = "pollbox", version, about = "Internal polling app voting store")]
struct Cli {
    /// Project root containing `.pollbox/`.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.pollbox/` with default config and seed data.
    Init {
        /// Overwrite existing config and state.
        #[arg(short, long)]
        force: bool,
    },
    /// Sign in as `admin` or a four-digit employee id.
    Login {
        id: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// List polls.
    Polls {
        #[arg(long, default_value = "all")]
        filter: PollFilter,
        #[arg(long, default_value = "newest")]
        sort: PollSort,
    },
    /// Show tallies for every poll, most voted first.
    Results,
    /// Create a poll (admin only).
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Option text; repeat for each option.
        #[arg(long = "option")]
        options: Vec<String>,
        /// RFC 3339 timestamp, or `YYYY-MM-DD` for the end of that day (UTC).
        #[arg(long)]
        end_date: Option<String>,
    },
    /// Vote for an option, replacing any earlier vote in the poll.
    Vote { poll: String, option: String },
    /// Withdraw your vote in a poll.
    Retract { poll: String },
    /// Reopen a poll for voting (admin only).
    Activate { poll: String },
    /// Close a poll for voting (admin only).
    Deactivate { poll: String },
    /// Flip a poll between active and inactive (admin only).
    Toggle { poll: String },
    /// Delete a poll and every vote cast in it (admin only).
    Delete { poll: String },
    /// Leave feedback as the signed-in user.
    Feedback { message: String },
    /// Show all feedback (admin only).
    FeedbackList,
    /// Check stored state against schemas and invariants.
    Validate,
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let root = cli.root.as_path();
    match cli.command {
        Command::Init { force } => cmd_init(root, force),
        Command::Validate => cmd_validate(root),
        command => {
            let mut store = open_store(root)?;
            let code = dispatch(&mut store, command)?;
            if let Some(err) = store.take_persist_error() {
                warn!(error = %format!("{err:#}"), "slot write failed, rewriting all slots");
                store
                    .flush()
                    .map_err(|retry| retry.context(format!("state was not saved: {err:#}")))?;
            }
            Ok(code)
        }
    }
}

fn dispatch(store: &mut VotingStore<FileStorage>, command: Command) -> Result<i32> {
    let outcome = match command {
        Command::Init { .. } | Command::Validate => unreachable!("handled before opening the store"),
        Command::Login { id, password } => store.authenticate(&id, &password).map(|()| {
            if let Some(user) = store.current_user() {
                println!("Signed in as {} ({})", user.name, user.id);
            }
        }),
        Command::Logout => {
            store.end_session();
            println!("Signed out");
            Ok(())
        }
        Command::Whoami => {
            print!("{}", render_session(store.current_user())?);
            Ok(())
        }
        Command::Polls { filter, sort } => {
            let now = store.now();
            let polls = list_polls(store.polls(), filter, sort, now);
            print!("{}", render_poll_list(&polls, store.current_user(), now)?);
            Ok(())
        }
        Command::Results => {
            let polls = results_order(store.polls());
            print!("{}", render_results(&polls, store.current_user(), store.now())?);
            Ok(())
        }
        Command::Create {
            title,
            description,
            options,
            end_date,
        } => {
            let end_date = end_date.as_deref().map(parse_end_date).transpose()?;
            let draft = PollDraft {
                title,
                description,
                options,
                end_date,
            };
            match validate_draft(&draft, store.now()) {
                Ok(draft) => store
                    .create_poll(&draft.title, &draft.description, &draft.options, draft.end_date)
                    .map(|poll_id| println!("{poll_id}")),
                Err(message) => Err(Rejection::InvalidInput(message)),
            }
        }
        Command::Vote { poll, option } => store.cast_vote(&poll, &option).map(|change| {
            let text = store
                .poll(&poll)
                .and_then(|poll| poll.option(&option))
                .map_or(option.as_str(), |option| option.text.as_str());
            if change.removed_from.is_some() {
                println!("Vote changed to {text} in poll {}", change.poll_id);
            } else {
                println!("Vote recorded for {text} in poll {}", change.poll_id);
            }
        }),
        Command::Retract { poll } => store
            .retract_vote(&poll)
            .map(|change| println!("Vote retracted from poll {}", change.poll_id)),
        Command::Activate { poll } => store
            .set_poll_active(&poll, true)
            .map(|()| println!("Poll {poll} is now active")),
        Command::Deactivate { poll } => store
            .set_poll_active(&poll, false)
            .map(|()| println!("Poll {poll} is now inactive")),
        Command::Toggle { poll } => store.toggle_poll_active(&poll).map(|active| {
            let state = if active { "active" } else { "inactive" };
            println!("Poll {poll} is now {state}");
        }),
        Command::Delete { poll } => store
            .delete_poll(&poll)
            .map(|()| println!("Poll {poll} deleted")),
        Command::Feedback { message } => store
            .record_feedback(&message)
            .map(|_| println!("Thank you for your feedback")),
        Command::FeedbackList => match store.current_user() {
            None => Err(Rejection::NoActiveSession),
            Some(user) if !user.is_admin => Err(Rejection::Unauthorized),
            Some(_) => {
                print!("{}", render_feedback(store.feedback())?);
                Ok(())
            }
        },
    };

    match outcome {
        Ok(()) => Ok(exit_codes::OK),
        Err(rejection) => {
            eprintln!("{rejection}");
            Ok(rejection_code(&rejection))
        }
    }
}

fn cmd_init(root: &Path, force: bool) -> Result<i32> {
    let paths = init_pollbox(root, &InitOptions { force })?;
    println!("Initialized {}", paths.pollbox_dir.display());
    Ok(exit_codes::OK)
}

fn cmd_validate(root: &Path) -> Result<i32> {
    let store = open_store(root)?;
    println!(
        "ok: {} polls, {} users, {} feedback entries",
        store.polls().len(),
        store.users().len(),
        store.feedback().len()
    );
    Ok(exit_codes::OK)
}

fn open_store(root: &Path) -> Result<VotingStore<FileStorage>> {
    let paths = PollboxPaths::new(root);
    if !paths.pollbox_dir.is_dir() {
        bail!(
            "no .pollbox directory in {} (run `pollbox init` first)",
            root.display()
        );
    }
    let config = load_config(&paths.config_path)?;
    VotingStore::open(paths.storage(), Box::new(SystemClock), config)
        .with_context(|| format!("load state from {}", paths.state_dir.display()))
}

fn rejection_code(rejection: &Rejection) -> i32 {
    match rejection {
        Rejection::Unauthorized => exit_codes::UNAUTHORIZED,
        Rejection::InvalidCredentials => exit_codes::INVALID_CREDENTIALS,
        Rejection::NotFound(_)
        | Rejection::InvalidInput(_)
        | Rejection::NoActiveSession
        | Rejection::PollClosed(_)
        | Rejection::NothingToDo(_) => exit_codes::DECLINED,
    }
}

/// Parse `--end-date`: a full RFC 3339 timestamp, or a bare date meaning the
/// last second of that day in UTC.
fn parse_end_date(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid end date '{raw}' (expected RFC 3339 or YYYY-MM-DD)"))?;
    date.and_hms_opt(23, 59, 59)
        .map(|end| end.and_utc())
        .ok_or_else(|| anyhow!("invalid end date '{raw}'"))
}
