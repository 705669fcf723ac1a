//! Coach chat and speech generation.
//!
//! The backend keeps the conversational context; all the client holds is
//! an opaque session id, fresh per run.

use std::io::{self, BufRead, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use orator_api::ApiClient;
use tokio::runtime::Runtime;

pub fn chat(runtime: &Runtime, client: &ApiClient, message: Option<String>) -> Result<()> {
    let session_id = local_session_id();

    if let Some(message) = message {
        let answer = runtime.block_on(client.chat(&session_id, &message))?;
        println!("{answer}");
        return Ok(());
    }

    println!("Chatting with your coach. Empty line or Ctrl-D to leave.");
    let stdin = io::stdin();
    loop {
        print!("you> ");
        io::stdout().flush().ok();
        let mut line = String::new();
        if stdin
            .lock()
            .read_line(&mut line)
            .context("failed to read message")?
            == 0
        {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            break;
        }
        match runtime.block_on(client.chat(&session_id, message)) {
            Ok(answer) => println!("coach> {answer}\n"),
            Err(err) => eprintln!("coach unavailable: {err}\n"),
        }
    }
    Ok(())
}

pub fn generate(runtime: &Runtime, client: &ApiClient, prompt: &str) -> Result<()> {
    let session_id = local_session_id();
    let draft = runtime.block_on(client.generate_speech(&session_id, prompt))?;
    println!("{draft}");
    Ok(())
}

/// Opaque per-run key for the server-side conversation context.
fn local_session_id() -> String {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("cli-{}-{seconds}", std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_prefixed_and_nonempty() {
        let id = local_session_id();
        assert!(id.starts_with("cli-"));
        assert!(id.len() > "cli-".len() + 1);
    }
}
