//! Structured output — explicit deserialisation of model replies.
//!
//! Models are asked for JSON matching a schema, but replies still arrive as
//! text. Parsing tries, in order: the whole reply, the first fenced code
//! block, then the first balanced `{...}` object embedded in prose. A reply
//! that fits none of these is an [`Error::StructuredOutput`].

use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::provider::ResponseFormat;

/// A record the model can be asked to produce.
pub trait StructuredOutput: DeserializeOwned + JsonSchema {
    /// Name sent with the schema and reported in errors.
    const NAME: &'static str;

    /// The response format to attach to a provider request.
    fn response_format() -> ResponseFormat {
        let schema = serde_json::to_value(schemars::schema_for!(Self)).unwrap_or_default();
        ResponseFormat {
            name: Self::NAME.to_string(),
            schema,
        }
    }
}

/// Parse a model reply into `T`.
pub fn parse_structured<T: StructuredOutput>(content: &str) -> Result<T> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(Error::StructuredOutput {
            schema: T::NAME.into(),
            reason: "empty response".into(),
        });
    }

    let direct_err = match serde_json::from_str::<T>(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let candidates = [extract_fenced_block(trimmed), extract_json_object(trimmed)];
    for candidate in candidates.into_iter().flatten() {
        if let Ok(value) = serde_json::from_str::<T>(&candidate) {
            return Ok(value);
        }
    }

    Err(Error::StructuredOutput {
        schema: T::NAME.into(),
        reason: direct_err.to_string(),
    })
}

/// Content of the first ```` ``` ```` fenced block, language tag stripped.
fn extract_fenced_block(input: &str) -> Option<String> {
    let mut lines = input.lines();
    while let Some(line) = lines.next() {
        if !line.trim_start().starts_with("```") {
            continue;
        }
        let mut body = Vec::new();
        for inner in lines.by_ref() {
            if inner.trim() == "```" {
                let text = body.join("\n").trim().to_string();
                return (!text.is_empty()).then_some(text);
            }
            body.push(inner);
        }
    }
    None
}

/// The first balanced JSON object, ignoring braces inside strings.
fn extract_json_object(input: &str) -> Option<String> {
    let start = input.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in input[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(input[start..=start + i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
