//! Parser for description responses
//!
//! Grammar: `Test Case Description: <description> || Example Input: <examples>`.
//! The labelled form is preferred; otherwise the text is split on `||` and the
//! labels stripped from whatever pieces exist.

use lazy_static::lazy_static;
use regex::Regex;

pub const DESCRIPTION_LABEL: &str = "Test Case Description:";
pub const EXAMPLE_LABEL: &str = "Example Input:";
pub const SEPARATOR: &str = "||";

pub const MISSING_DESCRIPTION: &str = "Description not generated.";
pub const MISSING_EXAMPLES: &str = "Examples not generated.";

/// Result of parsing a description response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResponse {
    /// Both labels found in order
    Structured {
        description: String,
        examples: String,
    },
    /// Split on the separator; missing parts carry placeholder text
    Fallback {
        description: String,
        examples: String,
    },
}

impl ParsedResponse {
    pub fn description(&self) -> &str {
        match self {
            Self::Structured { description, .. } | Self::Fallback { description, .. } => {
                description
            }
        }
    }

    pub fn examples(&self) -> &str {
        match self {
            Self::Structured { examples, .. } | Self::Fallback { examples, .. } => examples,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured { .. })
    }

    pub fn into_parts(self) -> (String, String) {
        match self {
            Self::Structured {
                description,
                examples,
            }
            | Self::Fallback {
                description,
                examples,
            } => (description, examples),
        }
    }
}

lazy_static! {
    static ref STRUCTURED: Regex =
        Regex::new(r"(?s)Test Case Description:(.*)\|\| Example Input:(.*)").unwrap();
}

/// Parse a description-generation response; never fails
pub fn parse_description_response(text: &str) -> ParsedResponse {
    if let Some(captures) = STRUCTURED.captures(text) {
        let part = |i: usize| {
            captures
                .get(i)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default()
        };
        return ParsedResponse::Structured {
            description: part(1),
            examples: part(2),
        };
    }

    let mut parts = text.split(SEPARATOR);
    let description = parts
        .next()
        .map(|p| p.replace(DESCRIPTION_LABEL, "").trim().to_string())
        .unwrap_or_else(|| MISSING_DESCRIPTION.to_string());
    let examples = parts
        .next()
        .map(|p| p.replace(EXAMPLE_LABEL, "").trim().to_string())
        .unwrap_or_else(|| MISSING_EXAMPLES.to_string());

    ParsedResponse::Fallback {
        description,
        examples,
    }
}

/// Strict parse used for feedback refinement.
///
/// `None` when the separator is missing; the caller then keeps the original.
pub fn parse_refinement_response(text: &str) -> Option<(String, String)> {
    let mut parts = text.split(SEPARATOR);
    let description = parts.next()?.replace(DESCRIPTION_LABEL, "").trim().to_string();
    let examples = parts.next()?.replace(EXAMPLE_LABEL, "").trim().to_string();
    Some((description, examples))
}
