use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use console::style;
use inquire::{InquireError, Text};
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::error::DocQaError;
use crate::models::TurnRole;
use crate::services::ConversationalRagOrchestrator;

use super::ask::print_answer;
use super::{build_orchestrator, ingest_file, spinner, user_error, CROSS};

const HELP: &str = "/reset clears the conversation, /history shows it, /exit quits";

pub async fn handle_chat_command(config: AppConfig, file: Option<PathBuf>) -> Result<()> {
    let orchestrator = Arc::new(build_orchestrator(&config)?);

    let document_id = match &file {
        Some(path) => Some(ingest_file(&orchestrator, path).await?.0),
        None => {
            println!(
                "{}",
                style("No document given; answering as a general assistant.").dim()
            );
            None
        }
    };

    let session = orchestrator
        .open_session(document_id.as_deref())
        .await
        .map_err(user_error)?;
    println!("{}\n", style(HELP).dim());

    loop {
        let input = match Text::new("You:").prompt() {
            Ok(input) => input,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e.into()),
        };

        let question = input.trim();
        match question {
            "" => continue,
            "/exit" | "/quit" => break,
            "/help" => println!("{}", style(HELP).dim()),
            "/reset" => {
                orchestrator.reset_session(&session).await.map_err(user_error)?;
                println!("{}", style("Conversation cleared.").dim());
            }
            "/history" => print_history(&orchestrator, &session).await?,
            _ => ask_once(&orchestrator, &session, question).await,
        }
    }

    orchestrator.close_session(&session).await.map_err(user_error)?;
    Ok(())
}

/// Ask one question; Ctrl-C abandons it without touching the history
async fn ask_once(orchestrator: &ConversationalRagOrchestrator, session: &str, question: &str) {
    let cancel = CancellationToken::new();
    let spinner = match spinner("Thinking...".to_string()) {
        Ok(spinner) => spinner,
        Err(e) => {
            println!("{}{}", CROSS, e);
            return;
        }
    };

    let ask = orchestrator.ask_with_cancellation(session, question, cancel.clone());
    tokio::pin!(ask);

    let result = tokio::select! {
        result = &mut ask => result,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            ask.await
        }
    };
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            if response.standalone_question != question {
                println!(
                    "{}",
                    style(format!("(searched for: {})", response.standalone_question)).dim()
                );
            }
            print_answer(&response);
            println!();
        }
        Err(DocQaError::Cancelled { .. }) => {
            println!("{}", style("Cancelled.").dim());
        }
        Err(e) => {
            println!("{}{}", CROSS, style(e.user_message()).red());
        }
    }
}

async fn print_history(orchestrator: &ConversationalRagOrchestrator, session: &str) -> Result<()> {
    let history = orchestrator.history(session).await.map_err(user_error)?;
    if history.is_empty() {
        println!("{}", style("No turns yet.").dim());
        return Ok(());
    }

    for turn in history {
        let speaker = match turn.role {
            TurnRole::User => style("You").cyan().bold(),
            TurnRole::Assistant => style("Assistant").green().bold(),
        };
        println!(
            "{} {} {}",
            style(turn.timestamp.format("%H:%M:%S")).dim(),
            speaker,
            turn.content
        );
    }
    Ok(())
}
