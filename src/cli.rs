//! Command-line surface.

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "orator", version, about = "Record a speech, get AI coaching feedback")]
pub struct Cli {
    /// Override the backend base URL for this invocation
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account
    Signup {
        username: String,
        email: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Log in and store the auth token
    Login {
        email: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored auth token
    Logout,
    /// Show the logged-in account
    Whoami,
    /// List audio input devices
    Devices,
    /// Record a speech and upload it for feedback
    Record {
        /// Input device name (default: configured or platform default)
        #[arg(long)]
        device: Option<String>,
    },
    /// Upload an existing audio file for feedback
    Analyze {
        file: std::path::PathBuf,
        /// Treat the file as a plain-text transcript instead of audio
        #[arg(long)]
        text: bool,
    },
    /// Past speeches and their feedback
    History,
    /// Score progression over time
    Progress,
    /// Aggregate score averages
    Analytics,
    /// Talk to the speaking coach
    Chat {
        /// One-shot message; omit for an interactive conversation
        message: Option<String>,
    },
    /// Generate a practice speech from a prompt
    Generate { prompt: String },
    /// Update account details
    Profile {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
    },
}
