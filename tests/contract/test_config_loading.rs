use std::fs;

use docqa::config::{AppConfig, RagConfig};
use docqa::error::DocQaError;
use docqa::services::embedding::EmbeddingProviderType;
use docqa::services::llm::LlmProvider;
use tempfile::TempDir;

const SAMPLE: &str = r#"
[llm]
provider = "xai"
model = "grok-2-latest"
temperature = 0.2
max_tokens = 256
stop = ["<|im_end|>", "</s>"]

[embedding]
provider = "open-ai"
model = "text-embedding-3-small"

[rag]
chunk_size = 800
chunk_overlap = 100
top_k = 6
max_turns = 8
min_relevance = 0.25
"#;

#[test]
fn test_parse_full_file() {
    let config = AppConfig::from_toml_str(SAMPLE).unwrap();

    assert_eq!(config.llm.provider, LlmProvider::Xai);
    assert_eq!(config.llm.resolved_model(), "grok-2-latest");
    assert_eq!(config.llm.resolved_base_url(), "https://api.x.ai/v1");
    assert_eq!(config.llm.generation.temperature, 0.2);
    assert_eq!(config.llm.generation.max_tokens, 256);
    assert_eq!(config.llm.generation.stop.len(), 2);

    assert_eq!(config.embedding.provider, EmbeddingProviderType::OpenAi);
    assert_eq!(config.rag.chunk_size, 800);
    assert_eq!(config.rag.top_k, 6);
    assert_eq!(config.rag.min_relevance, Some(0.25));
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_sections_use_defaults() {
    let config = AppConfig::from_toml_str("[rag]\ntop_k = 2\n").unwrap();

    assert_eq!(config.rag.top_k, 2);
    assert_eq!(config.rag.chunk_size, 1000);
    assert_eq!(config.rag.chunk_overlap, 200);
    assert_eq!(config.llm.provider, LlmProvider::Ollama);
    assert_eq!(config.llm.resolved_model(), "llama3.2");
    assert_eq!(config.llm.generation.temperature, 0.7);
    assert_eq!(config.llm.generation.max_tokens, 512);
    assert_eq!(config.llm.generation.stop, vec!["<|im_end|>".to_string()]);
    assert_eq!(config.llm.repeat_penalty, Some(1.1));
}

#[test]
fn test_malformed_file_is_toml_error() {
    assert!(matches!(
        AppConfig::from_toml_str("[rag\nchunk_size = "),
        Err(DocQaError::Toml(_))
    ));
}

#[test]
fn test_invalid_values_rejected() {
    let config = AppConfig::from_toml_str("[rag]\nchunk_size = 100\nchunk_overlap = 100\n").unwrap();
    assert!(matches!(
        config.validate(),
        Err(DocQaError::InvalidConfig { .. })
    ));

    let config = AppConfig::from_toml_str("[llm]\ntemperature = 5.0\n").unwrap();
    assert!(config.validate().is_err());

    let rag = RagConfig {
        max_turns: 5,
        ..Default::default()
    };
    assert!(rag.validate().is_err());
}

#[test]
fn test_save_round_trip_never_writes_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = AppConfig::from_toml_str(SAMPLE).unwrap();
    config.llm.api_key = Some("xai-secret-key".to_string());
    config.save(&path).unwrap();

    let written = fs::read_to_string(&path).unwrap();
    assert!(!written.contains("xai-secret-key"));

    let loaded = AppConfig::from_file(&path).unwrap();
    assert_eq!(loaded.llm.provider, LlmProvider::Xai);
    assert_eq!(loaded.rag, config.rag);
    assert_eq!(loaded.llm.generation, config.llm.generation);
    assert!(loaded.llm.api_key.is_none());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[test]
fn test_load_explicit_path_then_env_overrides() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[rag]\nchunk_size = 500\nchunk_overlap = 50\n").unwrap();

    let config = AppConfig::load(Some(path.as_path())).unwrap();
    assert_eq!(config.rag.chunk_size, 500);

    std::env::set_var("DOCQA_CHUNK_OVERLAP", "75");
    let overridden = AppConfig::load(Some(path.as_path()));
    std::env::set_var("DOCQA_CHUNK_OVERLAP", "not-a-number");
    let malformed = AppConfig::load(Some(path.as_path()));
    std::env::remove_var("DOCQA_CHUNK_OVERLAP");

    assert_eq!(overridden.unwrap().rag.chunk_overlap, 75);
    assert!(matches!(malformed, Err(DocQaError::InvalidConfig { .. })));

    let missing = dir.path().join("absent.toml");
    assert!(matches!(
        AppConfig::load(Some(missing.as_path())),
        Err(DocQaError::Io(_))
    ));
}

#[test]
fn test_display_masks_api_keys() {
    let mut config = AppConfig::default();
    config.llm.api_key = Some("sk-1234567890abcdef".to_string());

    let shown = config.to_display_toml().unwrap();
    assert!(shown.contains("sk-1...cdef"));
    assert!(!shown.contains("sk-1234567890abcdef"));
}
