//! Structured records the model must produce.
//!
//! Every type here derives (or implements) `JsonSchema`; the schema is sent
//! as the request's response format and the reply is deserialised back with
//! [`crate::structured::parse_structured`].

use std::borrow::Cow;

use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::{Deserialize, Serialize};

use crate::structured::StructuredOutput;

/// The task category assigned to a user turn.
///
/// Deserialisation never fails on an unexpected label: anything that is not
/// one of the three known intents becomes [`IntentType::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum IntentType {
    Qa,
    Summarization,
    Calculation,
    Unknown,
}

impl IntentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Qa => "qa",
            Self::Summarization => "summarization",
            Self::Calculation => "calculation",
            Self::Unknown => "unknown",
        }
    }
}

impl From<String> for IntentType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "qa" => Self::Qa,
            "summarization" => Self::Summarization,
            "calculation" => Self::Calculation,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for IntentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl JsonSchema for IntentType {
    fn schema_name() -> Cow<'static, str> {
        "IntentType".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": "string",
            "enum": ["qa", "summarization", "calculation"],
            "description": "qa for questions about documents, summarization for summary requests, calculation for math"
        })
    }
}

/// Classifier output for one user turn.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UserIntent {
    /// The classified intent
    pub intent_type: IntentType,

    /// Confidence between 0 and 1
    pub confidence: f32,

    /// Why this intent was chosen
    pub reasoning: String,

    /// Extracted entities such as document ids or amounts
    #[serde(default)]
    pub entities: Vec<String>,
}

impl StructuredOutput for UserIntent {
    const NAME: &'static str = "UserIntent";
}

/// Output of the question-answering specialist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnswerResponse {
    /// The question being answered
    pub question: String,

    /// The answer
    pub answer: String,

    /// Document ids used to answer
    #[serde(default)]
    pub sources: Vec<String>,

    /// Confidence between 0 and 1
    #[serde(default)]
    pub confidence: f32,
}

impl StructuredOutput for AnswerResponse {
    const NAME: &'static str = "AnswerResponse";
}

/// Output of the summarization specialist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SummarizationResponse {
    /// The summary text
    pub summary: String,

    /// Key points extracted from the documents
    #[serde(default)]
    pub key_points: Vec<String>,

    /// Document ids that were summarised
    #[serde(default)]
    pub document_ids: Vec<String>,
}

impl StructuredOutput for SummarizationResponse {
    const NAME: &'static str = "SummarizationResponse";
}

/// Output of the calculation specialist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CalculationResponse {
    /// The expression that was evaluated
    pub expression: String,

    /// The numeric result
    pub result: f64,

    /// Step-by-step explanation
    pub explanation: String,

    /// Document ids the numbers came from
    #[serde(default)]
    pub document_ids: Vec<String>,
}

impl StructuredOutput for CalculationResponse {
    const NAME: &'static str = "CalculationResponse";
}

/// Output of the memory node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UpdateMemoryResponse {
    /// Summary of the whole conversation so far
    pub summary: String,

    /// Document ids the conversation refers to
    #[serde(default)]
    pub document_ids: Vec<String>,
}

impl StructuredOutput for UpdateMemoryResponse {
    const NAME: &'static str = "UpdateMemoryResponse";
}

/// The specialist output stored as `current_response` in session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuredResponse {
    Answer(AnswerResponse),
    Summary(SummarizationResponse),
    Calculation(CalculationResponse),
}

impl StructuredResponse {
    /// The user-facing text of the response.
    pub fn text(&self) -> String {
        match self {
            Self::Answer(r) => r.answer.clone(),
            Self::Summary(r) => {
                if r.key_points.is_empty() {
                    r.summary.clone()
                } else {
                    let points: Vec<String> =
                        r.key_points.iter().map(|p| format!("- {p}")).collect();
                    format!("{}\n\nKey points:\n{}", r.summary, points.join("\n"))
                }
            }
            Self::Calculation(r) => {
                if r.explanation.is_empty() {
                    format!("{} = {}", r.expression, r.result)
                } else {
                    r.explanation.clone()
                }
            }
        }
    }

    /// Document ids the specialist consulted.
    pub fn sources(&self) -> &[String] {
        match self {
            Self::Answer(r) => &r.sources,
            Self::Summary(r) => &r.document_ids,
            Self::Calculation(r) => &r.document_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_intent_labels_deserialize() {
        let intent: UserIntent = serde_json::from_str(
            r#"{"intent_type": "chitchat", "confidence": 0.4, "reasoning": "greeting"}"#,
        )
        .unwrap();
        assert_eq!(intent.intent_type, IntentType::Unknown);
        assert!(intent.entities.is_empty());
    }

    #[test]
    fn intent_labels_are_case_insensitive() {
        assert_eq!(IntentType::from("Calculation".to_string()), IntentType::Calculation);
        assert_eq!(IntentType::from(" qa ".to_string()), IntentType::Qa);
    }

    #[test]
    fn intent_serializes_lowercase() {
        let json = serde_json::to_string(&IntentType::Summarization).unwrap();
        assert_eq!(json, "\"summarization\"");
    }

    #[test]
    fn intent_schema_lists_known_labels() {
        let schema = serde_json::to_value(schemars::schema_for!(UserIntent)).unwrap();
        let text = schema.to_string();
        assert!(text.contains("summarization"));
        assert!(text.contains("intent_type"));
    }

    #[test]
    fn structured_response_text_and_sources() {
        let resp = StructuredResponse::Answer(AnswerResponse {
            question: "Total of INV-001?".into(),
            answer: "$22,000".into(),
            sources: vec!["INV-001".into()],
            confidence: 0.9,
        });
        assert_eq!(resp.text(), "$22,000");
        assert_eq!(resp.sources(), ["INV-001".to_string()]);

        let calc = StructuredResponse::Calculation(CalculationResponse {
            expression: "22000 * 0.15".into(),
            result: 3300.0,
            explanation: String::new(),
            document_ids: vec![],
        });
        assert_eq!(calc.text(), "22000 * 0.15 = 3300");
    }

    #[test]
    fn structured_response_is_tagged() {
        let resp = StructuredResponse::Summary(SummarizationResponse {
            summary: "A service contract".into(),
            key_points: vec!["12 months".into()],
            document_ids: vec!["CON-001".into()],
        });
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["kind"], "summary");
        assert!(resp.text().contains("- 12 months"));
    }
}
