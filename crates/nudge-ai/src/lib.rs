pub mod completion;
pub mod prompt;
pub mod sampling;

pub use completion::{CompletionError, CompletionProvider, LlamaCppProvider};
pub use prompt::{fill_slots, PromptTemplates};
pub use sampling::SamplingParams;
