mod engine;
mod error;
mod function;
mod history;
mod message;
mod reply;
mod request_builder;
mod summarizer;
mod token_estimator;

pub use engine::ConversationEngine;
pub use error::{ChatError, ChatResult};
pub use function::{FunctionDescriptor, default_functions};
pub use history::History;
pub use message::{Message, Role};
pub use reply::parse_reply;
pub use request_builder::{ChatCompletionRequest, RequestBuilder};
pub use summarizer::SummarizationPolicy;
pub use token_estimator::{DEFAULT_DELIMITERS, TokenEstimator};
