//! Ordered-fallback classification over a list of inference providers.
//!
//! Neither operation can fail. A provider that errors, times out, or answers
//! in an unusable shape is skipped in favour of the next one; when none is
//! left the result is permissive (every keyword kept, every account
//! accepted) so the run degrades to heuristic-only filtering.

use std::collections::HashSet;

use comet_core::AppConfig;
use serde_json::Value;

use crate::anthropic::AnthropicProvider;
use crate::error::ClassifierError;
use crate::openai::OpenAiProvider;
use crate::prompts::{
    personality_prompt, relevance_prompt, PERSONALITY_MAX_TOKENS, PERSONALITY_SYSTEM,
    RELEVANCE_MAX_TOKENS, RELEVANCE_SYSTEM,
};
use crate::provider::{CompletionRequest, InferenceProvider};
use crate::util::strip_code_blocks;

/// Reason given whenever no provider produced a usable answer, whether none
/// is configured or every one failed.
pub const NO_PROVIDER_REASON: &str = "no AI provider available";

/// Outcome of a relevance pass: the kept keywords in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelevanceVerdict {
    pub kept: Vec<String>,
    pub reason: String,
}

impl RelevanceVerdict {
    fn pass_through(keywords: &[String], reason: impl Into<String>) -> Self {
        Self {
            kept: keywords.to_vec(),
            reason: reason.into(),
        }
    }
}

/// Outcome of a personality check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalityVerdict {
    pub accepted: bool,
    pub reason: String,
}

impl PersonalityVerdict {
    fn accept(reason: impl Into<String>) -> Self {
        Self {
            accepted: true,
            reason: reason.into(),
        }
    }
}

pub struct Classifier {
    providers: Vec<Box<dyn InferenceProvider>>,
    personality_enabled: bool,
}

impl Classifier {
    /// Providers are tried in the order given.
    #[must_use]
    pub fn new(providers: Vec<Box<dyn InferenceProvider>>) -> Self {
        Self {
            providers,
            personality_enabled: true,
        }
    }

    #[must_use]
    pub fn with_personality_check(mut self, enabled: bool) -> Self {
        self.personality_enabled = enabled;
        self
    }

    /// Builds the provider list from configured API keys: Anthropic first,
    /// then OpenAI. Providers without a key are left out.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError`] if an HTTP client cannot be constructed.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ClassifierError> {
        let mut providers: Vec<Box<dyn InferenceProvider>> = Vec::new();
        if let Some(key) = config.anthropic_api_key.as_deref() {
            providers.push(Box::new(AnthropicProvider::new(
                key,
                &config.anthropic_model,
                config.ai_timeout_secs,
            )?));
        }
        if let Some(key) = config.openai_api_key.as_deref() {
            providers.push(Box::new(OpenAiProvider::new(
                key,
                &config.openai_model,
                config.ai_timeout_secs,
            )?));
        }
        if providers.is_empty() {
            tracing::warn!("no AI provider configured; classification is pass-through");
        }
        Ok(Self::new(providers).with_personality_check(config.personality_filter_enabled))
    }

    #[must_use]
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// `false` when every call is answered locally without a provider.
    #[must_use]
    pub fn has_providers(&self) -> bool {
        !self.providers.is_empty()
    }

    #[must_use]
    pub fn personality_check_enabled(&self) -> bool {
        self.personality_enabled
    }

    /// Keeps the keywords that lead to creator-made content.
    ///
    /// Shorthand for [`Classifier::classify_relevance`] without the reason.
    pub async fn classify_relevant(&self, keywords: &[String]) -> Vec<String> {
        self.classify_relevance(keywords).await.kept
    }

    /// The kept keywords are a subset of `keywords` in input order. The first
    /// provider to answer with valid JSON decides: an array selects keywords
    /// (case-insensitively), any other JSON value keeps the whole input.
    pub async fn classify_relevance(&self, keywords: &[String]) -> RelevanceVerdict {
        if keywords.is_empty() {
            return RelevanceVerdict::pass_through(keywords, "no keywords");
        }
        if self.providers.is_empty() {
            tracing::info!(
                count = keywords.len(),
                reason = NO_PROVIDER_REASON,
                "relevance filter skipped"
            );
            return RelevanceVerdict::pass_through(keywords, NO_PROVIDER_REASON);
        }

        let keywords_json = match serde_json::to_string(keywords) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "could not encode keywords; relevance filter skipped");
                return RelevanceVerdict::pass_through(keywords, "keywords could not be encoded");
            }
        };
        let request = CompletionRequest::new(relevance_prompt(&keywords_json), RELEVANCE_MAX_TOKENS)
            .system(RELEVANCE_SYSTEM);

        for provider in &self.providers {
            let text = match provider.complete(&request).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "relevance classification failed");
                    continue;
                }
            };
            match select_keywords(keywords, &text) {
                Ok(kept) => {
                    let reason = format!(
                        "{}: kept {} of {}",
                        provider.name(),
                        kept.len(),
                        keywords.len()
                    );
                    tracing::info!(%reason, "relevance filter applied");
                    return RelevanceVerdict { kept, reason };
                }
                Err(reason) => {
                    tracing::warn!(provider = provider.name(), %reason, "unusable relevance response");
                }
            }
        }

        tracing::warn!(reason = NO_PROVIDER_REASON, "all AI providers failed; relevance filter skipped");
        RelevanceVerdict::pass_through(keywords, NO_PROVIDER_REASON)
    }

    /// Decides whether an account is an individual creator.
    pub async fn classify_personality(
        &self,
        handle: &str,
        display_name: &str,
        bio: &str,
    ) -> PersonalityVerdict {
        if !self.personality_enabled {
            return PersonalityVerdict::accept("personality filter disabled");
        }
        if self.providers.is_empty() {
            return PersonalityVerdict::accept(NO_PROVIDER_REASON);
        }

        let request = CompletionRequest::new(
            personality_prompt(handle, display_name, bio),
            PERSONALITY_MAX_TOKENS,
        )
        .system(PERSONALITY_SYSTEM);

        for provider in &self.providers {
            let text = match provider.complete(&request).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(provider = provider.name(), handle, error = %e, "personality classification failed");
                    continue;
                }
            };
            match parse_decision(&text) {
                Some(true) => {
                    let verdict = PersonalityVerdict::accept(format!(
                        "{}: real creator",
                        provider.name()
                    ));
                    tracing::info!(handle, reason = %verdict.reason, "personality accepted");
                    return verdict;
                }
                Some(false) => {
                    let verdict = PersonalityVerdict {
                        accepted: false,
                        reason: format!("{}: rejected (@{handle})", provider.name()),
                    };
                    tracing::info!(handle, reason = %verdict.reason, "personality rejected");
                    return verdict;
                }
                None => {
                    tracing::warn!(
                        provider = provider.name(),
                        handle,
                        response = %text.trim(),
                        "ambiguous personality response"
                    );
                }
            }
        }

        tracing::warn!(handle, "all AI providers failed; accepting");
        PersonalityVerdict::accept(NO_PROVIDER_REASON)
    }
}

/// `Some(true)` for ACCEPT, `Some(false)` for REJECT, `None` when the text
/// contains both or neither.
fn parse_decision(text: &str) -> Option<bool> {
    let upper = text.to_uppercase();
    match (upper.contains("ACCEPT"), upper.contains("REJECT")) {
        (true, false) => Some(true),
        (false, true) => Some(false),
        _ => None,
    }
}

/// Maps a provider's JSON answer back onto the input keywords.
fn select_keywords(keywords: &[String], text: &str) -> Result<Vec<String>, String> {
    let value: Value = serde_json::from_str(strip_code_blocks(text))
        .map_err(|e| format!("not valid JSON: {e}"))?;

    let Value::Array(items) = value else {
        return Ok(keywords.to_vec());
    };

    let selected: HashSet<String> = items
        .iter()
        .filter_map(Value::as_str)
        .map(|s| s.trim().to_lowercase())
        .collect();

    Ok(keywords
        .iter()
        .filter(|k| selected.contains(&k.trim().to_lowercase()))
        .cloned()
        .collect())
}
