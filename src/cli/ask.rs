use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use console::style;
use serde_json::json;

use crate::config::AppConfig;
use crate::services::rag::NOT_FOUND_MARKER;
use crate::services::AskResponse;

use super::{build_orchestrator, ingest_file, spinner, user_error, WARN};

pub async fn handle_ask_command(
    config: AppConfig,
    file: Option<PathBuf>,
    question: String,
    json_output: bool,
) -> Result<()> {
    let orchestrator = Arc::new(build_orchestrator(&config)?);

    let document_id = match &file {
        Some(path) => Some(ingest_file(&orchestrator, path).await?.0),
        None => None,
    };

    let session = orchestrator
        .open_session(document_id.as_deref())
        .await
        .map_err(user_error)?;

    let spinner = spinner("Thinking...".to_string())?;
    let result = orchestrator.ask(&session, &question).await;
    spinner.finish_and_clear();
    let response = result.map_err(user_error)?;

    if json_output {
        print_json(&response)?;
    } else {
        print_answer(&response);
    }
    Ok(())
}

fn print_json(response: &AskResponse) -> Result<()> {
    let sources: Vec<_> = response
        .cited_chunks
        .iter()
        .map(|chunk| {
            json!({
                "id": chunk.id,
                "index": chunk.index,
                "start": chunk.start,
                "end": chunk.end,
            })
        })
        .collect();

    let value = json!({
        "answer": response.answer,
        "grounded": response.grounded,
        "standalone_question": response.standalone_question,
        "sources": sources,
        "warnings": response.warnings.iter().map(|w| w.to_string()).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

pub(crate) fn print_answer(response: &AskResponse) {
    for warning in &response.warnings {
        println!("{}{}", WARN, style(warning.user_message()).yellow());
    }

    if response.answer == NOT_FOUND_MARKER {
        println!(
            "{}",
            style("The document does not contain an answer to this question.").yellow()
        );
        return;
    }

    println!("{}", response.answer);

    if !response.cited_chunks.is_empty() {
        let sources: Vec<String> = response
            .cited_chunks
            .iter()
            .map(|chunk| format!("#{} ({}..{})", chunk.index + 1, chunk.start, chunk.end))
            .collect();
        println!("{}", style(format!("Sources: {}", sources.join(", "))).dim());
    }
}
