//! Keyword relevance and account personality classification backed by an
//! ordered list of inference providers.

pub mod anthropic;
pub mod classifier;
pub mod error;
pub mod openai;
pub mod prompts;
pub mod provider;
pub(crate) mod util;

pub use anthropic::AnthropicProvider;
pub use classifier::{Classifier, PersonalityVerdict, RelevanceVerdict, NO_PROVIDER_REASON};
pub use error::ClassifierError;
pub use openai::OpenAiProvider;
pub use provider::{CompletionRequest, InferenceProvider};
