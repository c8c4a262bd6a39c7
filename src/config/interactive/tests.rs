use super::load_existing_config as load_existing_config_impl;
use super::*;

#[test]
fn load_existing_config() {
    let config = load_existing_config_impl().expect("config loaded successfully");
    assert!(!config.embedding.model.is_empty());
    assert!(!config.completion.model.is_empty());
    assert!(config.retrieval.top_k > 0);
}

#[test]
fn unreachable_provider_reports_failure() {
    let mut provider = ProviderConfig::default_embedding();
    provider
        .set_base_url("http://127.0.0.1:9/v1/")
        .expect("should accept url");
    assert!(!test_provider_connection(&provider));
}
