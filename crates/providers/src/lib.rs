//! LLM provider implementations for the document assistant.
//!
//! Every provider implements `docassist_core::Provider`. The assistant talks
//! to a single OpenAI-compatible chat-completions endpoint, selected by
//! [`build_from_config`].

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use docassist_config::AppConfig;
use docassist_core::Provider;
use docassist_core::error::ProviderError;
use std::sync::Arc;
use std::time::Duration;

/// Build the configured provider.
///
/// Fails with [`ProviderError::NotConfigured`] when no API key is set.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config
        .api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            ProviderError::NotConfigured(
                "set DOCASSIST_API_KEY or OPENAI_API_KEY, or api_key in config.toml".into(),
            )
        })?;

    let provider = OpenAiCompatProvider::new(
        "openai",
        &config.base_url,
        api_key,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    tracing::debug!(base_url = %config.base_url, model = %config.model, "Provider ready");
    Ok(Arc::new(provider))
}
