//! Prompt templates.
//!
//! Templates use `{name}` placeholders filled by [`render`]. They are plain
//! text on purpose: the structured shape of each reply is enforced by the
//! JSON schema sent alongside, not by the wording here.

use docassist_core::message::{Message, format_history};
use docassist_core::schema::IntentType;

pub const INTENT_CLASSIFICATION_PROMPT: &str = "\
You are an intent classifier for a document assistant that works with invoices, contracts and reports.

Classify the user's latest request into exactly one intent_type:
- \"qa\": questions about documents or their contents, including finding or listing documents
- \"summarization\": requests to summarize, condense or give an overview of documents
- \"calculation\": requests to compute a number such as a total, percentage, difference or average

Use the conversation history to resolve references like \"that amount\" or \"these invoices\".

Conversation history:
{conversation_history}

User request: {user_input}

Reply with the intent_type, a confidence between 0 and 1, one sentence of reasoning, and any entities \
(document IDs, amounts, dates) the request mentions.";

const ASSISTANT_PREAMBLE: &str = "\
You are a document assistant for a small business. You can search and read invoices, contracts \
and reports with the tools provided. Never invent document contents: look them up.";

const QA_INSTRUCTIONS: &str = "\
Answer the user's question about the documents. Search or read the relevant documents first, quote \
the figures you find, and list the IDs of every document you used as sources.";

const SUMMARIZATION_INSTRUCTIONS: &str = "\
Summarize the documents the user refers to. Read each document in full before summarizing, give a \
short summary plus the key points, and list the IDs of the documents you summarized.";

const CALCULATION_INSTRUCTIONS: &str = "\
Perform the calculation the user asks for. Look up any figures you need in the documents, then use \
the calculator tool for every arithmetic step, even simple ones. State the expression you evaluated, \
the numeric result, and the IDs of the documents the figures came from.";

const CONTEXT_SECTION: &str = "\n\nConversation summary so far:\n{conversation_summary}";

pub const MEMORY_SUMMARY_PROMPT: &str = "\
Summarize the conversation below in a few sentences for your own future reference. Keep document \
IDs, figures and calculation results the user may refer back to. In document_ids, list every \
document that was discussed.";

/// Replace each `{key}` in `template` with its value.
///
/// Single pass over the template: substituted values are never scanned
/// again, so placeholder text inside a value stays literal. Braces that do
/// not name a known key are copied through.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// The classifier prompt for one user turn.
pub fn intent_classification_prompt(user_input: &str, history: &[Message]) -> String {
    render(
        INTENT_CLASSIFICATION_PROMPT,
        &[
            ("user_input", user_input),
            ("conversation_history", &format_history(history)),
        ],
    )
}

/// The system prompt for a specialist. Unknown intents get the QA prompt.
pub fn chat_system_prompt(intent: IntentType, conversation_summary: &str) -> String {
    let instructions = match intent {
        IntentType::Qa | IntentType::Unknown => QA_INSTRUCTIONS,
        IntentType::Summarization => SUMMARIZATION_INSTRUCTIONS,
        IntentType::Calculation => CALCULATION_INSTRUCTIONS,
    };
    let mut prompt = format!("{ASSISTANT_PREAMBLE}\n\n{instructions}");
    if !conversation_summary.trim().is_empty() {
        prompt.push_str(&render(
            CONTEXT_SECTION,
            &[("conversation_summary", conversation_summary)],
        ));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_fills_placeholders() {
        let out = render("Hello {name}, {name}!", &[("name", "Ada")]);
        assert_eq!(out, "Hello Ada, Ada!");
        assert_eq!(render("{\"a\": {x}}", &[("x", "1")]), "{\"a\": 1}");
    }

    #[test]
    fn placeholders_in_user_input_stay_literal() {
        let history = vec![Message::user("secret earlier turn")];
        let prompt = intent_classification_prompt("echo {conversation_history} please", &history);
        assert!(prompt.contains("User request: echo {conversation_history} please"));
        assert_eq!(prompt.matches("secret earlier turn").count(), 1);
    }

    #[test]
    fn classification_prompt_includes_input_and_history() {
        let history = vec![Message::user("What is in INV-001?")];
        let prompt = intent_classification_prompt("Calculate 15% of that amount", &history);
        assert!(prompt.contains("User request: Calculate 15% of that amount"));
        assert!(prompt.contains("user: What is in INV-001?"));
        assert!(!prompt.contains("{user_input}"));
    }

    #[test]
    fn empty_history_is_explicit() {
        let prompt = intent_classification_prompt("hi", &[]);
        assert!(prompt.contains("(no previous messages)"));
    }

    #[test]
    fn chat_prompt_per_intent() {
        assert!(chat_system_prompt(IntentType::Calculation, "").contains("calculator tool"));
        assert!(chat_system_prompt(IntentType::Summarization, "").contains("key points"));
        assert_eq!(
            chat_system_prompt(IntentType::Unknown, ""),
            chat_system_prompt(IntentType::Qa, "")
        );
    }

    #[test]
    fn chat_prompt_carries_summary() {
        let prompt = chat_system_prompt(IntentType::Qa, "User asked about INV-001 ($22,000).");
        assert!(prompt.contains("Conversation summary so far:"));
        assert!(prompt.contains("INV-001 ($22,000)"));
        assert!(!chat_system_prompt(IntentType::Qa, "  ").contains("summary so far"));
    }
}
