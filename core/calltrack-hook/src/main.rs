//! calltrack: command-line front end for the calltrack daemon.
//!
//! Telephony integrations call `calltrack call-state` on every phone-state
//! change. People use the remaining subcommands to work through tag prompts.
//!
//! ## Subcommands
//!
//! - `call-state`: Forward a telephony state (non-critical, always exits 0)
//! - `prompts`: List calls waiting for details
//! - `tag`: Fill in details for a prompted call
//! - `upload`: Record a number by hand as a follow-up
//! - `dispositions`: Show the accepted disposition values
//! - `health`: Check the daemon

mod daemon_client;
mod logging;

use calltrack_core::{CallState, DISPOSITION_OPTIONS};
use calltrack_daemon_protocol::TagSubmission;
use clap::{Parser, Subcommand};
use daemon_client::ClientError;

#[derive(Parser)]
#[command(name = "calltrack")]
#[command(about = "Call capture and tagging for the calltrack daemon")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forward a telephony state change (IDLE, RINGING, OFFHOOK)
    CallState {
        #[arg(value_name = "STATE")]
        state: String,
    },

    /// List calls waiting for details, oldest first
    Prompts,

    /// Submit details for a prompted call
    Tag {
        /// Number shown on the prompt
        #[arg(value_name = "PHONE")]
        phone_number: String,

        /// Label or code, e.g. "Lead Stage" or lead_stage (default: follow_up)
        #[arg(long)]
        disposition: Option<String>,

        #[arg(long, default_value = "")]
        name: String,

        #[arg(long, default_value = "")]
        address: String,

        #[arg(long, default_value = "")]
        remarks: String,
    },

    /// Record a number as a follow-up without a call
    Upload {
        #[arg(value_name = "PHONE")]
        phone_number: String,
    },

    /// Show accepted disposition values
    Dispositions,

    /// Check that the daemon is reachable
    Health,
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::CallState { state } => {
            // Never fail the telephony hook; the daemon's absence is only logged.
            if let Err(e) = run_call_state(&state) {
                tracing::warn!(error = %e, state = %state, "calltrack call-state failed");
            }
        }
        Commands::Prompts => exit_on_error("prompts", run_prompts()),
        Commands::Tag {
            phone_number,
            disposition,
            name,
            address,
            remarks,
        } => exit_on_error(
            "tag",
            run_tag(TagSubmission {
                phone_number,
                disposition,
                name,
                address,
                remarks,
            }),
        ),
        Commands::Upload { phone_number } => exit_on_error("upload", run_upload(&phone_number)),
        Commands::Dispositions => {
            for (label, status) in DISPOSITION_OPTIONS {
                println!("{:<16} {}", label, status);
            }
        }
        Commands::Health => exit_on_error("health", run_health()),
    }
}

fn exit_on_error(command: &str, result: Result<(), ClientError>) {
    if let Err(e) = result {
        tracing::error!(error = %e, "calltrack {} failed", command);
        eprintln!("calltrack {}: {}", command, e);
        std::process::exit(1);
    }
}

fn run_call_state(state: &str) -> Result<(), ClientError> {
    // Reject garbage locally so the hook never round-trips it.
    let parsed = CallState::parse(state).ok_or_else(|| ClientError::Daemon {
        code: "invalid_state".to_string(),
        message: format!("unrecognised call state: {}", state),
    })?;

    let scheduled = daemon_client::send_call_state(parsed.as_str())?;
    tracing::debug!(state = parsed.as_str(), scheduled, "Call state delivered");
    Ok(())
}

fn run_prompts() -> Result<(), ClientError> {
    let prompts = daemon_client::list_prompts()?;
    if prompts.is_empty() {
        println!("No calls waiting for details.");
        return Ok(());
    }
    for prompt in prompts {
        println!(
            "{:<20} {:>5}s  {}",
            prompt.phone_number,
            prompt.duration_seconds,
            prompt.raised_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    Ok(())
}

fn run_tag(submission: TagSubmission) -> Result<(), ClientError> {
    if let Some(selected) = submission.disposition.as_deref() {
        if !is_known_disposition(selected) {
            tracing::warn!(disposition = %selected, "Unrecognised disposition");
            eprintln!(
                "calltrack tag: unrecognised disposition {:?}; it will be recorded as follow_up",
                selected
            );
        }
    }

    let data = daemon_client::submit_tag(&submission)?;
    let status = data
        .get("status")
        .and_then(|value| value.as_str())
        .unwrap_or("follow_up");
    println!("Saved {} as {}", submission.phone_number, status);
    Ok(())
}

fn run_upload(phone_number: &str) -> Result<(), ClientError> {
    daemon_client::manual_upload(phone_number)?;
    println!("Queued {} as follow_up", phone_number);
    Ok(())
}

fn run_health() -> Result<(), ClientError> {
    let data = daemon_client::daemon_health()?;
    let rendered = serde_json::to_string_pretty(&data)
        .map_err(|err| ClientError::InvalidResponse(err.to_string()))?;
    println!("{}", rendered);
    Ok(())
}

fn is_known_disposition(selected: &str) -> bool {
    let selected = selected.trim();
    DISPOSITION_OPTIONS.iter().any(|(label, status)| {
        label.eq_ignore_ascii_case(selected) || status.as_str().eq_ignore_ascii_case(selected)
    })
}
