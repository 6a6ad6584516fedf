use serde::Deserialize;

use super::error::{ChatError, ChatResult};

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
}

/// Pulls `choices[0].message.content` out of a chat-completion response.
pub fn parse_reply(body: &str) -> ChatResult<String> {
    let response: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| ChatError::Parse(e.to_string()))?;

    let message = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .ok_or_else(|| ChatError::Parse("response contained no message".to_string()))?;

    match (message.content, message.function_call) {
        (Some(content), _) => Ok(content),
        (None, Some(call)) => Err(ChatError::Parse(format!(
            "reply asked to call function '{}' without any message content",
            call.name
        ))),
        (None, None) => Err(ChatError::Parse("message has no content".to_string())),
    }
}
