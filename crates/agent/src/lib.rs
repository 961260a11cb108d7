//! Model-facing pieces of the document assistant.
//!
//! The workflow's nodes talk to the LLM through this crate:
//!
//! 1. **Prompt**: render the classifier, specialist or memory prompt
//! 2. **Call**: send it through a [`ModelHandle`] (events are published per call)
//! 3. **Tools**: specialists run a [`ReactRunner`] that executes tool calls and
//!    feeds results back until the model answers
//! 4. **Structure**: the final reply is requested against a JSON schema and parsed
//!
//! The loop ends when the model replies without tool calls or the iteration
//! limit is reached; either way a structured answer is then requested.

pub mod model;
pub mod prompts;
pub mod react;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use model::ModelHandle;
pub use react::{ReactOutcome, ReactRunner};
