//! Integration tests for the completion client.
//!
//! These tests make real API calls to the hosted completion endpoint.
//! Run with: ADFORGE_API_BASE=... ADFORGE_API_KEY=... cargo test --test llm_integration -- --ignored

use adforge::llm::{CompletionProvider, CompletionRequest, HostedCompletionClient};

fn create_test_client() -> HostedCompletionClient {
    HostedCompletionClient::from_env()
        .expect("ADFORGE_API_BASE must be set for integration tests")
}

#[tokio::test]
#[ignore] // Run with: cargo test --test llm_integration -- --ignored
async fn test_simple_completion() {
    let client = create_test_client();

    let request = CompletionRequest::new(
        "You are a helpful assistant. Reply concisely.",
        "What is 2 + 2? Reply with just the number.",
        16,
    );

    let response = client.complete(request).await;
    assert!(response.is_ok(), "Completion failed: {:?}", response.err());

    let response = response.expect("Should have response");
    assert!(response.text.contains('4'), "got: {}", response.text);
    assert!(response.usage.output_tokens > 0, "Should have token usage");
}

#[tokio::test]
#[ignore]
async fn test_empty_system_prompt() {
    let client = create_test_client();

    let request = CompletionRequest::new("", "Reply with the single word: ok", 16);

    let response = client
        .complete(request)
        .await
        .expect("empty system prompt must be accepted");
    assert!(!response.text.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_truncation_flag_on_tiny_ceiling() {
    let client = create_test_client();

    // A one-token ceiling guarantees the response is cut off.
    let request = CompletionRequest::new("", "Write three sentences about tea.", 1);

    let response = client
        .complete(request)
        .await
        .expect("truncated completion still returns text");
    assert!(response.truncated, "expected the truncation flag to be set");
}
