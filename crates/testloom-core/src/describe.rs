//! Test-case description generation and feedback refinement
//!
//! Both passes walk the dictionary one field at a time and never abort on a
//! single failed call: description failures become placeholder text, and
//! refinement failures keep the field unchanged.

use crate::error::{LoomError, Result};
use crate::model::{DictionaryTable, FieldSpec};
use crate::parser::{parse_description_response, parse_refinement_response};
use crate::ports::{join_fragments, TextGenerator};
use crate::prompts;

/// Placeholder used when the model answered with no content
pub const NO_RESPONSE_TEXT: &str = "No response text from model.";

/// Generate one `FieldSpec` per dictionary row
pub async fn describe_dictionary<G>(table: &DictionaryTable, generator: &G) -> Result<Vec<FieldSpec>>
where
    G: TextGenerator + ?Sized,
{
    if table.headers.is_empty() {
        return Err(LoomError::MalformedInput(
            "data dictionary has no columns".into(),
        ));
    }

    let mut specs = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let field_name = table.field_name(row).unwrap_or_default().to_string();
        let prompt = prompts::description_prompt(table, row);

        let spec = match generator.generate(&prompt).await {
            Ok(fragments) => match join_fragments(&fragments) {
                Some(text) => {
                    let (description, examples) = parse_description_response(&text).into_parts();
                    FieldSpec::new(&field_name, description).with_example(examples)
                }
                None => FieldSpec::new(&field_name, NO_RESPONSE_TEXT).with_example(NO_RESPONSE_TEXT),
            },
            Err(error) => {
                tracing::warn!(field = %field_name, %error, "description generation failed");
                let message = format!("Error: {}", error);
                FieldSpec::new(&field_name, message.clone()).with_example(message)
            }
        };

        tracing::info!("Processed: {}", field_name);
        specs.push(spec);
    }

    Ok(specs)
}

/// Rewrite every description/example pair in light of reviewer feedback
pub async fn refine_field_specs<G>(specs: &[FieldSpec], feedback: &str, generator: &G) -> Vec<FieldSpec>
where
    G: TextGenerator + ?Sized,
{
    let mut refined = Vec::with_capacity(specs.len());
    for spec in specs {
        refined.push(refine_field_spec(spec, feedback, generator).await);
    }
    refined
}

/// Refine one field; the original is returned unchanged on any failure
pub async fn refine_field_spec<G>(spec: &FieldSpec, feedback: &str, generator: &G) -> FieldSpec
where
    G: TextGenerator + ?Sized,
{
    let prompt = prompts::refinement_prompt(spec, feedback);
    let text = match generator.generate(&prompt).await {
        Ok(fragments) => join_fragments(&fragments),
        Err(error) => {
            tracing::warn!(field = %spec.field_name, %error, "refinement failed, keeping original");
            None
        }
    };

    match text.as_deref().and_then(parse_refinement_response) {
        Some((description, examples)) => FieldSpec {
            field_name: spec.field_name.clone(),
            rule_description: description,
            example_input: Some(examples),
        },
        None => spec.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use async_trait::async_trait;

    struct Scripted(Vec<std::result::Result<Vec<String>, GenerationError>>, std::sync::Mutex<usize>);

    impl Scripted {
        fn new(replies: Vec<std::result::Result<Vec<String>, GenerationError>>) -> Self {
            Self(replies, std::sync::Mutex::new(0))
        }
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(&self, _prompt: &str) -> std::result::Result<Vec<String>, GenerationError> {
            let mut next = self.1.lock().unwrap();
            let reply = self.0[*next % self.0.len()].clone();
            *next += 1;
            reply
        }
    }

    fn table() -> DictionaryTable {
        DictionaryTable::new(
            vec!["column".into(), "rules".into()],
            vec![
                vec!["region".into(), "compass direction".into()],
                vec!["age".into(), "0-120".into()],
                vec!["price".into(), "positive".into()],
            ],
        )
    }

    #[tokio::test]
    async fn test_describe_handles_every_outcome() {
        let generator = Scripted::new(vec![
            Ok(vec![
                "Test Case Description: 1. North or South ".into(),
                "|| Example Input: Valid: North | Invalid: Up".into(),
            ]),
            Ok(vec![]),
            Err(GenerationError::Request("quota".into())),
        ]);

        let specs = describe_dictionary(&table(), &generator).await.unwrap();
        assert_eq!(specs.len(), 3);

        assert_eq!(specs[0].field_name, "region");
        assert_eq!(specs[0].rule_description, "1. North or South");
        assert_eq!(
            specs[0].example_input.as_deref(),
            Some("Valid: North | Invalid: Up")
        );

        assert_eq!(specs[1].rule_description, NO_RESPONSE_TEXT);
        assert_eq!(specs[1].example_input.as_deref(), Some(NO_RESPONSE_TEXT));

        assert!(specs[2].rule_description.starts_with("Error: "));
        assert!(specs[2].rule_description.contains("quota"));
    }

    #[tokio::test]
    async fn test_describe_rejects_headerless_table() {
        let generator = Scripted::new(vec![Ok(vec![])]);
        let err = describe_dictionary(&DictionaryTable::default(), &generator)
            .await
            .unwrap_err();
        assert!(matches!(err, LoomError::MalformedInput(_)));
    }

    #[tokio::test]
    async fn test_refine_replaces_or_keeps() {
        let original = vec![
            FieldSpec::new("region", "old").with_example("old example"),
            FieldSpec::new("age", "old age"),
            FieldSpec::new("price", "old price"),
        ];
        let generator = Scripted::new(vec![
            Ok(vec!["Test Case Description: 1. new || Example Input: Valid: East".into()]),
            Ok(vec!["no separator here".into()]),
            Err(GenerationError::Decode("bad body".into())),
        ]);

        let refined = refine_field_specs(&original, "be stricter", &generator).await;

        assert_eq!(refined[0].rule_description, "1. new");
        assert_eq!(refined[0].example_input.as_deref(), Some("Valid: East"));
        assert_eq!(refined[1], original[1]);
        assert_eq!(refined[2], original[2]);
    }
}
