use super::*;
use std::fs;
use tempfile::TempDir;

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn config_file_persistence() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");
        let config_path = temp_dir.path().join("config.toml");

        let mut original_config = Config {
            base_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };
        original_config
            .completion
            .set_base_url("http://localhost:11434/v1/")
            .expect("should accept local url");
        original_config.completion.api_key_env = String::new();
        original_config.retrieval.embedding_dimension = Some(1024);

        let toml_content = toml::to_string_pretty(&original_config)
            .expect("config should convert to toml string successfully");
        fs::write(&config_path, toml_content).expect("should write to config_path successfully");

        let loaded_config =
            Config::load_from(temp_dir.path()).expect("should load config from disk");

        assert_eq!(original_config, loaded_config);
    }

    #[test]
    fn config_directory_name() {
        let dir = get_config_dir().expect("should resolve config dir");
        assert!(dir.ends_with(".report-search") || dir.ends_with("report-search"));
    }

    #[test]
    fn invalid_toml_handling() {
        let invalid_toml = r#"
            [retrieval
            top_k = "three"
        "#;

        let result: Result<Config, toml::de::Error> = toml::from_str(invalid_toml);
        assert!(result.is_err());
    }

    #[test]
    fn provider_section_requires_url_and_model() {
        let partial_toml = r#"
            [embedding]
            api_key_env = "MISTRAL_API_KEY"
        "#;

        let result: Result<Config, toml::de::Error> = toml::from_str(partial_toml);
        assert!(result.is_err());
    }

    #[test]
    fn complete_valid_config() {
        let valid_toml = r#"
            [embedding]
            base_url = "https://api.mistral.ai/v1/"
            model = "mistral-embed"
            api_key_env = "MISTRAL_API_KEY"
            timeout_seconds = 15

            [completion]
            base_url = "https://api.mistral.ai/v1/"
            model = "mistral-small-latest"
            api_key_env = "MISTRAL_API_KEY"

            [retrieval]
            min_content_chars = 300
            top_k = 5
            max_documents = 3
            embedding_dimension = 1024
        "#;

        let config: Config = toml::from_str(valid_toml).expect("should parse toml successfully");
        assert!(config.validate().is_ok());
        assert_eq!(config.embedding.timeout_seconds, 15);
        assert_eq!(config.completion.model, "mistral-small-latest");
        assert_eq!(config.completion.timeout_seconds, 30);
        assert_eq!(config.retrieval.min_content_chars, 300);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.max_documents, 3);
        assert_eq!(config.retrieval.embedding_dimension, Some(1024));
    }

    #[test]
    fn error_display_messages() {
        let errors = vec![
            ConfigError::InvalidProtocol("ftp".to_string()),
            ConfigError::InvalidTopK(0),
            ConfigError::InvalidMaxDocuments(0),
            ConfigError::InvalidModel(String::new()),
            ConfigError::InvalidUrl("invalid-url".to_string()),
            ConfigError::MissingApiKey("OPENAI_API_KEY".to_string()),
        ];

        for error in errors {
            let message = format!("{error}");
            assert!(!message.is_empty());
            assert!(message.len() > 10);
        }
    }
}
