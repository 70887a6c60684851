use anyhow::Result;
use console::style;

use crate::config::AppConfig;
use crate::services::embedding::create_embedder;
use crate::services::llm::LlmClientFactory;

use super::{CHECK, CROSS};

pub async fn handle_providers_command(config: AppConfig) -> Result<()> {
    println!("{}", style("Chat providers").bold());
    for (provider, available, status) in LlmClientFactory::list_available().await {
        let marker = if provider == config.llm.provider {
            style("(selected)").cyan().to_string()
        } else {
            String::new()
        };
        println!(
            "  {}{:<8} {} {}",
            if available { &CHECK } else { &CROSS },
            provider.to_string(),
            style(status).dim(),
            marker
        );
    }

    println!();
    println!("{}", style("Embeddings").bold());
    let model = config.embedding.resolved_model();
    match create_embedder(&config.embedding) {
        Ok(embedder) => match embedder.health_check().await {
            Ok(()) => println!(
                "  {}{} {}",
                CHECK,
                embedder.provider_name(),
                style(format!("model {model} ready")).dim()
            ),
            Err(e) => println!(
                "  {}{} {}",
                CROSS,
                embedder.provider_name(),
                style(e.user_message()).red()
            ),
        },
        Err(e) => println!(
            "  {}{} {}",
            CROSS,
            config.embedding.provider,
            style(e.user_message()).red()
        ),
    }

    Ok(())
}
