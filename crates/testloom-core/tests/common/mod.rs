//! Deterministic text generator shared by the end-to-end tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use testloom_core::{GenerationError, TextGenerator};

/// Answers like a well-behaved model without any network access.
///
/// * cell prompts get `VALID_X` or `INVALID_X`
/// * rule prompts get a rule that only accepts `VALID_X`
/// * description prompts get a structured description
/// * refinement prompts get a structured, refined description
#[derive(Debug, Default)]
pub struct StubModel {
    calls: AtomicUsize,
}

impl StubModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for StubModel {
    async fn generate(&self, prompt: &str) -> Result<Vec<String>, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let reply = if prompt.contains("rule extraction specialist") {
            r#"Here you go: {"allowed_values": ["VALID_X"], "not_null": true}"#.to_string()
        } else if prompt.contains("refine the test case description") {
            "Test Case Description: 1. Refined rule || Example Input: Valid: VALID_X | Invalid: Y"
                .to_string()
        } else if prompt.contains("Data Dictionary Entry") {
            "Test Case Description: 1. Must be VALID_X || Example Input: Valid: VALID_X".to_string()
        } else if prompt.contains("logically invalid") {
            "INVALID_X".to_string()
        } else {
            "  VALID_X\n".to_string()
        };
        Ok(vec![reply])
    }
}

/// Always fails at the transport level
#[derive(Debug, Default)]
pub struct DownModel;

#[async_trait]
impl TextGenerator for DownModel {
    async fn generate(&self, _prompt: &str) -> Result<Vec<String>, GenerationError> {
        Err(GenerationError::Request("connection refused".into()))
    }
}
