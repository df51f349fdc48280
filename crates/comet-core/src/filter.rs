//! Deterministic pre-AI rejection pipeline.
//!
//! Layer 1 rejects accounts that advertise another platform or look like a
//! clip/compilation channel. Layer 2 rejects captions written in the third
//! person ("he really just..."), a strong repost signal. The layers run in
//! order and stop at the first rejection.

use std::fmt;

use crate::policy::FilterPolicy;
use crate::types::AccountProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterLayer {
    Platform,
    Caption,
}

impl FilterLayer {
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            FilterLayer::Platform => 1,
            FilterLayer::Caption => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterVerdict {
    Passed,
    Rejected { layer: FilterLayer, reason: String },
}

impl FilterVerdict {
    #[must_use]
    pub fn passed(&self) -> bool {
        matches!(self, FilterVerdict::Passed)
    }

    #[must_use]
    pub fn layer(&self) -> Option<FilterLayer> {
        match self {
            FilterVerdict::Passed => None,
            FilterVerdict::Rejected { layer, .. } => Some(*layer),
        }
    }
}

impl fmt::Display for FilterVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterVerdict::Passed => write!(f, "filters passed"),
            FilterVerdict::Rejected { layer, reason } => {
                write!(f, "Layer {}: {reason}", layer.number())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContextFilter {
    platform_keywords: Vec<String>,
    repost_pronouns: Vec<String>,
}

impl Default for ContextFilter {
    fn default() -> Self {
        Self::from_policy(&FilterPolicy::default())
    }
}

impl ContextFilter {
    #[must_use]
    pub fn from_policy(policy: &FilterPolicy) -> Self {
        Self {
            platform_keywords: policy
                .platform_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            repost_pronouns: policy
                .repost_pronouns
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }

    /// Runs both layers against an account and the caption of the video it
    /// was found through.
    #[must_use]
    pub fn check(&self, account: &AccountProfile, caption: &str) -> FilterVerdict {
        if let Some(reason) = self.platform_affinity(account) {
            return FilterVerdict::Rejected {
                layer: FilterLayer::Platform,
                reason,
            };
        }
        if let Some(reason) = self.repost_caption(caption) {
            return FilterVerdict::Rejected {
                layer: FilterLayer::Caption,
                reason,
            };
        }
        FilterVerdict::Passed
    }

    fn platform_affinity(&self, account: &AccountProfile) -> Option<String> {
        let combined = format!(
            "{} {} {}",
            account.nickname, account.handle, account.signature
        )
        .to_lowercase();

        self.platform_keywords
            .iter()
            .find(|kw| combined.contains(kw.as_str()))
            .map(|kw| format!("Multi-platform keyword '{kw}' found"))
    }

    fn repost_caption(&self, caption: &str) -> Option<String> {
        let caption = caption.trim().to_lowercase();
        if caption.is_empty() {
            return None;
        }
        self.repost_pronouns
            .iter()
            .find(|p| {
                caption
                    .strip_prefix(p.as_str())
                    .is_some_and(|rest| rest.starts_with(' '))
            })
            .map(|p| format!("Repost pattern: starts with '{p}'"))
    }
}
