use serde::Serialize;

use super::error::ChatResult;
use super::function::FunctionDescriptor;
use super::history::History;
use super::message::Message;

/// Wire body of a chat-completion request.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<&'a Message>,
    pub functions: &'a [FunctionDescriptor],
}

/// Builds request bodies for one model. Pure: the same inputs always give
/// the same body, and nothing is kept between builds.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    model: String,
}

impl RequestBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn build<'a>(
        &'a self,
        system_message: &'a Message,
        functions: &'a [FunctionDescriptor],
        history: &'a History,
    ) -> ChatCompletionRequest<'a> {
        let messages = std::iter::once(system_message)
            .chain(history.iter())
            .collect();

        ChatCompletionRequest {
            model: &self.model,
            messages,
            functions,
        }
    }

    pub fn serialize(
        &self,
        system_message: &Message,
        functions: &[FunctionDescriptor],
        history: &History,
    ) -> ChatResult<String> {
        let request = self.build(system_message, functions, history);
        Ok(serde_json::to_string(&request)?)
    }
}
