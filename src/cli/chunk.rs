use std::path::PathBuf;

use anyhow::Result;
use console::style;

use crate::config::AppConfig;
use crate::services::rag::{reconstruct, ChunkerConfig, DocumentChunker};

use super::{document_id_for, read_document, user_error, CHECK, CROSS};

const PREVIEW_CHARS: usize = 60;

pub fn handle_chunk_command(config: AppConfig, file: PathBuf, show: bool) -> Result<()> {
    let text = read_document(&file)?;
    let document_id = document_id_for(&file);

    let chunker = DocumentChunker::new(ChunkerConfig {
        chunk_size: config.rag.chunk_size,
        overlap: config.rag.chunk_overlap,
        snap_to_boundaries: config.rag.snap_to_boundaries,
    })
    .map_err(user_error)?;

    let chunks = chunker.chunk(&document_id, &text);
    if chunks.is_empty() {
        println!("{}{}", CROSS, style("No extractable content.").yellow());
        return Ok(());
    }

    let chars = text.chars().count();
    println!(
        "{} {} characters -> {} chunks (size {}, overlap {})",
        style(&document_id).bold(),
        chars,
        chunks.len(),
        config.rag.chunk_size,
        config.rag.chunk_overlap
    );
    println!();

    for chunk in &chunks {
        println!(
            "{} {}",
            style(format!(
                "#{:<4} {:>7}..{:<7} {:>5} chars",
                chunk.index + 1,
                chunk.start,
                chunk.end,
                chunk.char_len()
            ))
            .cyan(),
            if show { String::new() } else { preview(&chunk.text) }
        );
        if show {
            println!("{}\n", chunk.text);
        }
    }

    if reconstruct(&chunks) == text {
        println!("\n{}chunks rebuild the original text", CHECK);
    } else {
        println!("\n{}{}", CROSS, style("chunks do not rebuild the original text").red());
    }
    Ok(())
}

fn preview(text: &str) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let head: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{head}...")
}
