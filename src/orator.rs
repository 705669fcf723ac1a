use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::Parser;
use orator::auth::AuthStore;
use orator::cli::{Cli, Command};
use orator::{ApiClient, ConfigManager, CpalCapture, DEFAULT_LOG_LEVEL, RecordingSession};
use orator::{coach, record, review};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Initialize the logger
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("ORATOR_LOG")
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
        )
        .init();

    let cli = Cli::parse();

    // Load config
    let config_manager = ConfigManager::new()?;
    let mut config = config_manager.load()?;
    // save back the config to create the file if it doesn't exist
    config_manager.save(&config)?;
    if let Some(url) = &cli.api_url {
        config.set_api_base_url(url);
    }

    // One background runtime for all backend calls; the recording session
    // itself stays on this thread.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    let auth = AuthStore::new()?;
    let mut client = ApiClient::new(config.api_base_url());
    client.set_token(auth.load()?);

    match cli.command {
        Command::Signup {
            username,
            email,
            password,
        } => {
            let password = password_or_prompt(password)?;
            let profile = runtime.block_on(client.signup(&username, &email, &password))?;
            println!("Account created: {} <{}>", profile.username, profile.email);
            println!("Run `orator login {}` to log in.", profile.email);
        }
        Command::Login { email, password } => {
            let password = password_or_prompt(password)?;
            let grant = runtime.block_on(client.login(&email, &password))?;
            auth.save(&grant.access_token)?;
            info!(token_type = %grant.token_type, "logged in");
            println!("Logged in as {email}.");
        }
        Command::Logout => {
            auth.clear()?;
            println!("Logged out.");
        }
        Command::Whoami => {
            let history = runtime.block_on(client.history())?;
            println!("{} <{}>", history.user.username, history.user.email);
        }
        Command::Devices => {
            let session = RecordingSession::new(Box::new(CpalCapture::new()));
            let devices = session.list_input_devices();
            if devices.is_empty() {
                println!("No input devices found; the platform default will be used.");
            }
            for device in devices {
                let marker = if device.default { " (default)" } else { "" };
                println!("{}{marker}", device.label);
            }
        }
        Command::Record { device } => record::run(&runtime, &config, &client, device)?,
        Command::Analyze { file, text } => {
            if text {
                record::analyze_transcript_file(&runtime, &client, &file)?
            } else {
                record::analyze_file(&runtime, &config, &client, &file)?
            }
        }
        Command::History => review::history(&runtime, &client)?,
        Command::Progress => review::progress(&runtime, &client)?,
        Command::Analytics => review::analytics(&runtime, &client)?,
        Command::Chat { message } => coach::chat(&runtime, &client, message)?,
        Command::Generate { prompt } => coach::generate(&runtime, &client, &prompt)?,
        Command::Profile { username, email } => {
            runtime.block_on(client.update_profile(&username, &email))?;
            println!("Profile updated.");
        }
    }

    Ok(())
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    print!("password: ");
    io::stdout().flush().ok();
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}
