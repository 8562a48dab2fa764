//! Capability interfaces for the external collaborators
//!
//! The core never talks to a model directly. It is handed a `TextGenerator`
//! (prompt in, text fragments out) and a `RuleExtractor` (description in,
//! `RuleSet` out), so every algorithm can run against deterministic stubs.

use crate::error::{ExtractionError, GenerationError};
use crate::prompts;
use crate::rules::RuleSet;
use async_trait::async_trait;
use std::sync::Arc;

/// Text generation backend
///
/// `Ok(vec![])` means the backend answered with no content; joining and
/// trimming the fragments is the caller's job.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Vec<String>, GenerationError>;
}

/// Turns a free-text rule description into a structured rule set
#[async_trait]
pub trait RuleExtractor: Send + Sync {
    async fn extract_rules(&self, description: &str) -> Result<RuleSet, ExtractionError>;
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for &T {
    async fn generate(&self, prompt: &str) -> Result<Vec<String>, GenerationError> {
        (**self).generate(prompt).await
    }
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Box<T> {
    async fn generate(&self, prompt: &str) -> Result<Vec<String>, GenerationError> {
        (**self).generate(prompt).await
    }
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    async fn generate(&self, prompt: &str) -> Result<Vec<String>, GenerationError> {
        (**self).generate(prompt).await
    }
}

#[async_trait]
impl<T: RuleExtractor + ?Sized> RuleExtractor for &T {
    async fn extract_rules(&self, description: &str) -> Result<RuleSet, ExtractionError> {
        (**self).extract_rules(description).await
    }
}

#[async_trait]
impl<T: RuleExtractor + ?Sized> RuleExtractor for Box<T> {
    async fn extract_rules(&self, description: &str) -> Result<RuleSet, ExtractionError> {
        (**self).extract_rules(description).await
    }
}

#[async_trait]
impl<T: RuleExtractor + ?Sized> RuleExtractor for Arc<T> {
    async fn extract_rules(&self, description: &str) -> Result<RuleSet, ExtractionError> {
        (**self).extract_rules(description).await
    }
}

/// Joined and trimmed text, or `None` when there were no fragments
pub fn join_fragments(fragments: &[String]) -> Option<String> {
    if fragments.is_empty() {
        None
    } else {
        Some(fragments.concat().trim().to_string())
    }
}

/// `RuleExtractor` that asks a text generator for a JSON rule object
#[derive(Debug, Clone)]
pub struct ModelRuleExtractor<G> {
    generator: G,
}

impl<G: TextGenerator> ModelRuleExtractor<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }
}

#[async_trait]
impl<G: TextGenerator> RuleExtractor for ModelRuleExtractor<G> {
    async fn extract_rules(&self, description: &str) -> Result<RuleSet, ExtractionError> {
        let prompt = prompts::rule_extraction_prompt(description);
        let fragments = self.generator.generate(&prompt).await?;
        match join_fragments(&fragments) {
            Some(text) => RuleSet::from_model_output(&text),
            None => Err(ExtractionError::NoJsonObject),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::DataType;

    struct Canned(Result<Vec<String>, GenerationError>);

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, _prompt: &str) -> Result<Vec<String>, GenerationError> {
            self.0.clone()
        }
    }

    #[test]
    fn test_join_fragments() {
        assert_eq!(join_fragments(&[]), None);
        assert_eq!(
            join_fragments(&[" 12".to_string(), "34 \n".to_string()]),
            Some("1234".to_string())
        );
        assert_eq!(join_fragments(&["  ".to_string()]), Some(String::new()));
    }

    #[tokio::test]
    async fn test_model_rule_extractor_parses_output() {
        let extractor = ModelRuleExtractor::new(Canned(Ok(vec![
            "Here you go: {\"data_type\": ".to_string(),
            "\"Float\", \"not_null\": true}".to_string(),
        ])));

        let rules = extractor.extract_rules("A positive price").await.unwrap();
        assert_eq!(rules.data_type, Some(DataType::Float));
        assert_eq!(rules.not_null, Some(true));
    }

    #[tokio::test]
    async fn test_model_rule_extractor_failures() {
        let failing = ModelRuleExtractor::new(Canned(Err(GenerationError::Request("down".into()))));
        assert!(matches!(
            failing.extract_rules("x").await,
            Err(ExtractionError::Generation(_))
        ));

        let empty = ModelRuleExtractor::new(Canned(Ok(Vec::new())));
        assert!(matches!(
            empty.extract_rules("x").await,
            Err(ExtractionError::NoJsonObject)
        ));
    }

    #[tokio::test]
    async fn test_blanket_impls() {
        let boxed: Box<dyn TextGenerator> = Box::new(Canned(Ok(vec!["v".into()])));
        assert_eq!(boxed.generate("p").await.unwrap(), vec!["v".to_string()]);

        let shared = Arc::new(Canned(Ok(vec!["w".into()])));
        let by_ref = &shared;
        assert_eq!(by_ref.generate("p").await.unwrap(), vec!["w".to_string()]);
    }
}
