//! Instruction templates sent to the text generator

use crate::model::{DictionaryTable, FieldSpec};

/// Whether a generated cell must conform to or break its rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellIntent {
    Valid,
    Invalid,
}

impl CellIntent {
    pub fn from_invalid(is_invalid: bool) -> Self {
        if is_invalid {
            Self::Invalid
        } else {
            Self::Valid
        }
    }
}

/// Prompt asking for a single bare cell value
pub fn cell_value_prompt(rule_description: &str, intent: CellIntent) -> String {
    match intent {
        CellIntent::Invalid => format!(
            "Based on these rules: {}. Generate a single, logically invalid data value that \
             realistically breaks one of the rules. Provide only the value itself, with no \
             extra explanation.",
            rule_description
        ),
        CellIntent::Valid => format!(
            "Based on these rules: {}. Generate a single, valid data value. Provide only the \
             value itself, with no extra explanation.",
            rule_description
        ),
    }
}

/// Prompt turning one raw dictionary row into a description and examples
pub fn description_prompt(table: &DictionaryTable, row: usize) -> String {
    let entry = table
        .entries(row)
        .into_iter()
        .map(|(column, value)| format!("- {}: \"{}\"", column, value))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a test case design assistant. Your task is to create a detailed, point-wise \
test case description and a set of example inputs (both valid and invalid) based on the \
provided data dictionary information.

Data Dictionary Entry:
{entry}

Instructions:
1.  **Test Case Description**: Create a clear, point-wise description of all the rules a value \
in this column must follow. Combine all the provided details into a comprehensive checklist.
2.  **Example Input**: Provide one clear valid example and one clear invalid example that \
violates one of the rules. The invalid example should be realistic.

Output Format:
Please provide the output in a single line, using \"||\" as a separator between the description \
and the examples.

Test Case Description: [Your detailed, point-wise description here] || Example Input: Valid: \
[valid example] | Invalid: [invalid example with reason]"
    )
}

/// Prompt refining one field's description with reviewer feedback
pub fn refinement_prompt(spec: &FieldSpec, feedback: &str) -> String {
    let field = &spec.field_name;
    format!(
        "You are a test case design assistant. Your task is to refine the test case description \
and examples for the field '{field}' based on the user's feedback.

Original Description: {description}
User Feedback: \"{feedback}\"

Instructions:
- Update the description to be a numbered list of clear, concise rules for the '{field}' field.
- Provide a single, clear example of a valid and an invalid input for the '{field}' field, with \
a brief reason for the invalid case.
- Return the new description and examples in the following format:
  Test Case Description: [new description] || Example Input: [new examples]

Example of the desired output format for a field named 'region':
Test Case Description: 1. The 'region' field must be a string. 2. The 'region' field must \
contain one of the following values: \"North\", \"South\", \"East\", \"West\". 3. The 'region' \
field must not contain any leading or trailing whitespace. 4. The 'region' field must not be \
NULL or empty. 5. The 'region' field must not contain any special characters or numbers. || \
Example Input: Valid: North | Invalid: Northeast (Reason: Value \"Northeast\" is not in the \
allowed list)",
        description = spec.rule_description,
    )
}

/// Prompt converting a description into a JSON rule object
pub fn rule_extraction_prompt(description: &str) -> String {
    format!(
        "You are a rule extraction specialist. Analyze the following test case description and \
convert it into a structured JSON object.
The JSON should only contain keys for the rules that are explicitly mentioned in the description.
Possible keys are: data_type (String, Integer, Float, Date), length, format (e.g., YYYY-MM-DD), \
allowed_values (as a list), is_unique, not_null, is_numeric, is_alphanumeric.

Description: \"{description}\"

Return only the JSON object."
    )
}
