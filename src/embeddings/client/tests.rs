use super::*;
use crate::config::ProviderConfig;

#[test]
fn request_uses_model_and_input_fields() {
    let request = EmbedRequest {
        model: "mistral-embed",
        input: "What was revenue growth?",
    };

    let json: serde_json::Value =
        serde_json::to_value(&request).expect("request should serialize");
    assert_eq!(json["model"], "mistral-embed");
    assert_eq!(json["input"], "What was revenue growth?");
}

#[test]
fn response_parsing_takes_first_vector() {
    let body = r#"{
        "id": "embd-1",
        "object": "list",
        "model": "mistral-embed",
        "data": [{"object": "embedding", "index": 0, "embedding": [0.1, -0.2, 0.3]}],
        "usage": {"prompt_tokens": 6, "total_tokens": 6}
    }"#;

    let response: EmbedResponse = serde_json::from_str(body).expect("response should parse");
    assert_eq!(response.data.len(), 1);
    assert_eq!(response.data[0].embedding, vec![0.1, -0.2, 0.3]);
}

#[test]
fn client_configuration() {
    let mut config = ProviderConfig::default_embedding();
    config.set_model("nomic-embed-text".to_string()).expect("valid model");
    let endpoint = ProviderEndpoint::new(PROVIDER_NAME, &config, None).expect("endpoint");
    let client = EmbeddingClient::new(endpoint);

    assert_eq!(client.model(), "nomic-embed-text");
}

#[test]
fn unreachable_server_is_unavailable() {
    let mut config = ProviderConfig::default_embedding();
    config
        .set_base_url("http://127.0.0.1:9/v1/")
        .expect("valid url");
    config.set_timeout_seconds(2).expect("valid timeout");
    let client = EmbeddingClient::new(
        ProviderEndpoint::new(PROVIDER_NAME, &config, None).expect("endpoint"),
    );

    let result = client.embed("anything");
    assert!(matches!(
        result,
        Err(SearchError::ProviderUnavailable { provider, .. }) if provider == "embedding"
    ));
}
