use std::future::Future;
use std::pin::Pin;

use super::error::{ChatError, ChatResult};
use super::function::{FunctionDescriptor, default_functions};
use super::history::History;
use super::message::Message;
use super::reply::parse_reply;
use super::request_builder::RequestBuilder;
use super::summarizer::SummarizationPolicy;
use super::token_estimator::TokenEstimator;
use crate::config::AppConfig;
use crate::connection::{ConnectionSession, HttpRequest};
use crate::console::console;

type SendFuture<'a> = Pin<Box<dyn Future<Output = ChatResult<String>> + Send + 'a>>;

/// Whether a send may trigger compaction. The summary request itself is
/// sent with `Bypass` so it can never recurse into another compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BudgetCheck {
    Enforce,
    Bypass,
}

/// Drives one conversation: records turns, keeps requests under the token
/// budget by having the remote model summarize the history, and sends each
/// turn over a borrowed [`ConnectionSession`].
pub struct ConversationEngine {
    system_message: Message,
    functions: Vec<FunctionDescriptor>,
    history: History,
    builder: RequestBuilder,
    estimator: TokenEstimator,
    policy: SummarizationPolicy,
    chat_path: String,
    compactions: usize,
}

impl ConversationEngine {
    pub fn new(
        system_message: impl Into<String>,
        builder: RequestBuilder,
        policy: SummarizationPolicy,
        chat_path: impl Into<String>,
    ) -> Self {
        Self {
            system_message: Message::system(system_message),
            functions: default_functions(),
            history: History::new(),
            builder,
            estimator: TokenEstimator::new(),
            policy,
            chat_path: chat_path.into(),
            compactions: 0,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.system_prompt.clone(),
            RequestBuilder::new(config.model.clone()),
            SummarizationPolicy::from(config.budget),
            config.endpoint.chat_path.clone(),
        )
    }

    /// Registers the functions offered to the model, replacing the defaults.
    pub fn with_functions(mut self, functions: Vec<FunctionDescriptor>) -> Self {
        self.functions = functions;
        self
    }

    /// Resumes from an existing history.
    pub fn with_history(mut self, history: History) -> Self {
        self.history = history;
        self
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn functions(&self) -> &[FunctionDescriptor] {
        &self.functions
    }

    pub fn model(&self) -> &str {
        self.builder.model()
    }

    pub fn compactions(&self) -> usize {
        self.compactions
    }

    /// Estimated size of the request the current history would produce.
    pub fn estimated_tokens(&self) -> ChatResult<usize> {
        Ok(self.estimator.estimate(&self.serialize_body()?))
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Puts back a history captured before a send that was cancelled midway.
    pub fn restore_history(&mut self, history: History) {
        self.history = history;
    }

    /// Sends one user turn and returns the assistant's reply.
    ///
    /// The user turn stays in history even when the send fails; the reply is
    /// only recorded on a 200 response.
    pub async fn send(&mut self, session: &mut ConnectionSession, text: &str) -> ChatResult<String> {
        self.send_turn(session, text.to_string(), BudgetCheck::Enforce)
            .await
    }

    /// Compacts the history now, regardless of its size.
    pub async fn compact_now(
        &mut self,
        session: &mut ConnectionSession,
    ) -> ChatResult<Option<String>> {
        if self.history.is_empty() {
            return Ok(None);
        }
        self.compact(session).await.map(Some)
    }

    fn serialize_body(&self) -> ChatResult<String> {
        self.builder
            .serialize(&self.system_message, &self.functions, &self.history)
    }

    fn send_turn<'a>(
        &'a mut self,
        session: &'a mut ConnectionSession,
        text: String,
        budget: BudgetCheck,
    ) -> SendFuture<'a> {
        Box::pin(async move {
            self.history.push_user(text);

            let mut body = self.serialize_body()?;
            let estimated = self.estimator.estimate(&body);
            console().estimated_tokens(estimated);

            if budget == BudgetCheck::Enforce && self.policy.should_compact(estimated) {
                // The turn being sent is kept out of the summary and answered afterwards.
                let pending = self.history.pop_user_turn();
                let compacted = if self.history.is_empty() {
                    Ok(false)
                } else {
                    self.compact(session).await.map(|_| true)
                };
                if let Some(turn) = pending {
                    self.history.push(turn);
                }

                if compacted? {
                    body = self.serialize_body()?;
                    console().estimated_tokens(self.estimator.estimate(&body));
                }
            }

            let reply = self.transmit(session, body).await?;
            self.history.push_assistant(reply.clone());
            Ok(reply)
        })
    }

    /// Asks the remote model to summarize the history and replaces the
    /// history with that summary. On failure the history is left as it was.
    async fn compact(&mut self, session: &mut ConnectionSession) -> ChatResult<String> {
        let snapshot = self.history.clone();
        let prompt = self.policy.summary_prompt(&self.history);

        match self.send_turn(session, prompt, BudgetCheck::Bypass).await {
            Ok(summary) => {
                self.history.replace_with_summary(summary.clone());
                self.compactions += 1;
                console().summarizing(&summary);
                Ok(summary)
            }
            Err(e) => {
                self.history = snapshot;
                Err(e)
            }
        }
    }

    async fn transmit(&self, session: &mut ConnectionSession, body: String) -> ChatResult<String> {
        let response = session
            .send(HttpRequest::post(self.chat_path.as_str(), body))
            .await?;

        if !response.is_ok() {
            return Err(ChatError::Protocol {
                status: response.status,
                body: response.body,
            });
        }

        parse_reply(&response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;
    use crate::connection::{Credential, MockTransport, TransportError};
    use crate::conversations::message::Role;
    use serde_json::{Value, json};

    const SYSTEM: &str = "You are a helpful assistant that can call pre-defined functions. ";

    fn reply_body(content: &str) -> String {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
            .to_string()
    }

    fn engine(policy: SummarizationPolicy) -> ConversationEngine {
        ConversationEngine::new(
            SYSTEM,
            RequestBuilder::new("gpt-3.5-turbo-0613"),
            policy,
            "/v1/chat/completions",
        )
    }

    async fn connected(transport: &MockTransport) -> ConnectionSession {
        let mut session = ConnectionSession::new(
            EndpointConfig::default(),
            Credential::new("sk-test"),
            Box::new(transport.clone()),
        );
        session.connect().await.unwrap();
        session
    }

    fn sent_messages(request: &HttpRequest) -> Vec<(String, String)> {
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| {
                (
                    m["role"].as_str().unwrap().to_string(),
                    m["content"].as_str().unwrap().to_string(),
                )
            })
            .collect()
    }

    fn pair(role: &str, content: &str) -> (String, String) {
        (role.to_string(), content.to_string())
    }

    fn long_history() -> History {
        let chatter = "the quick brown fox jumps over the lazy dog, again and again! ".repeat(20);
        let mut history = History::new();
        history.push_user(format!("first: {}", chatter));
        history.push_assistant(format!("noted: {}", chatter));
        history.push_user(format!("second: {}", chatter));
        history.push_assistant(format!("noted again: {}", chatter));
        history
    }

    #[tokio::test]
    async fn test_hello_round_trip() {
        let transport = MockTransport::new();
        transport.push_response(200, reply_body("hi there"));
        let mut session = connected(&transport).await;
        let mut engine = engine(SummarizationPolicy::default());

        let reply = engine.send(&mut session, "hello").await.unwrap();

        assert_eq!(reply, "hi there");
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/v1/chat/completions");
        assert_eq!(
            sent_messages(&requests[0]),
            vec![pair("system", SYSTEM), pair("user", "hello")]
        );
        assert_eq!(
            engine.history().messages(),
            &[Message::user("hello"), Message::assistant("hi there")]
        );
        assert_eq!(engine.compactions(), 0);
    }

    #[tokio::test]
    async fn test_body_carries_model_and_functions() {
        let transport = MockTransport::new();
        transport.push_response(200, reply_body("ok"));
        let mut session = connected(&transport).await;
        let mut engine = engine(SummarizationPolicy::default());

        engine.send(&mut session, "hello").await.unwrap();

        let body: Value =
            serde_json::from_str(transport.requests()[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["model"], "gpt-3.5-turbo-0613");
        assert_eq!(body["functions"][0]["name"], "randomNumber");
    }

    #[tokio::test]
    async fn test_non_200_status_keeps_only_user_turn() {
        let transport = MockTransport::new();
        transport.push_response(429, "Rate limit exceeded");
        let mut session = connected(&transport).await;
        let mut engine = engine(SummarizationPolicy::default());

        let error = engine.send(&mut session, "hello").await.unwrap_err();

        assert_eq!(error.status(), Some(429));
        assert!(matches!(error, ChatError::Protocol { ref body, .. } if body == "Rate limit exceeded"));
        assert_eq!(engine.history().messages(), &[Message::user("hello")]);
    }

    #[tokio::test]
    async fn test_malformed_reply_is_parse_error() {
        let transport = MockTransport::new();
        transport.push_response(200, "<html>gateway</html>");
        let mut session = connected(&transport).await;
        let mut engine = engine(SummarizationPolicy::default());

        let error = engine.send(&mut session, "hello").await.unwrap_err();

        assert!(matches!(error, ChatError::Parse(_)));
        assert_eq!(engine.history().last_role(), Some(Role::User));
    }

    #[tokio::test]
    async fn test_closed_connection_surfaces_transport_error() {
        let transport = MockTransport::new();
        let mut session = connected(&transport).await;
        transport.close();
        let mut engine = engine(SummarizationPolicy::default());

        let error = engine.send(&mut session, "hello").await.unwrap_err();

        assert!(error.is_transport());
        assert!(matches!(
            error,
            ChatError::Transport(TransportError::NotConnected)
        ));
        assert!(!session.is_connected());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_over_budget_send_compacts_exactly_once() {
        let transport = MockTransport::new();
        transport.push_response(200, reply_body("short summary"));
        transport.push_response(200, reply_body("final answer"));
        let mut session = connected(&transport).await;

        let baseline = engine(SummarizationPolicy::default())
            .estimated_tokens()
            .unwrap();
        let mut engine =
            engine(SummarizationPolicy::new(baseline + 40, 50)).with_history(long_history());
        assert!(engine.estimated_tokens().unwrap() > baseline + 40);

        let reply = engine.send(&mut session, "what next?").await.unwrap();

        assert_eq!(reply, "final answer");
        assert_eq!(engine.compactions(), 1);

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);

        let summary_request = sent_messages(&requests[0]);
        assert_eq!(summary_request[0], pair("system", SYSTEM));
        let (role, prompt) = summary_request.last().unwrap();
        assert_eq!(role, "user");
        assert!(prompt.starts_with(
            "Please summarize the following conversation in less than 50 tokens. DO NOT MODIFY FUNCTIONS.\nuser: first:"
        ));
        assert!(!prompt.contains("what next?"));

        assert_eq!(
            sent_messages(&requests[1]),
            vec![
                pair("system", SYSTEM),
                pair("assistant", "short summary"),
                pair("user", "what next?"),
            ]
        );
        let rebuilt: Value = serde_json::from_str(requests[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(rebuilt["model"], "gpt-3.5-turbo-0613");
        assert_eq!(rebuilt["functions"][0]["name"], "randomNumber");
        assert_eq!(
            engine.history().messages(),
            &[
                Message::assistant("short summary"),
                Message::user("what next?"),
                Message::assistant("final answer"),
            ]
        );
    }

    #[tokio::test]
    async fn test_over_budget_first_turn_is_sent_without_summary() {
        let transport = MockTransport::new();
        transport.push_response(200, reply_body("answer"));
        let mut session = connected(&transport).await;
        let mut engine = engine(SummarizationPolicy::default());
        let long_turn = "conversation ".repeat(300);

        let reply = engine.send(&mut session, &long_turn).await.unwrap();

        assert_eq!(reply, "answer");
        assert_eq!(engine.compactions(), 0);
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            sent_messages(&requests[0]),
            vec![pair("system", SYSTEM), pair("user", &long_turn)]
        );
        assert_eq!(
            engine.history().messages(),
            &[Message::user(long_turn), Message::assistant("answer")]
        );
    }

    #[tokio::test]
    async fn test_under_budget_send_does_not_compact() {
        let transport = MockTransport::new();
        transport.push_response(200, reply_body("fine"));
        let mut session = connected(&transport).await;
        let mut engine = engine(SummarizationPolicy::new(10_000, 50)).with_history(long_history());

        engine.send(&mut session, "still small").await.unwrap();

        assert_eq!(transport.requests().len(), 1);
        assert_eq!(engine.compactions(), 0);
        assert_eq!(engine.history().len(), 6);
    }

    #[tokio::test]
    async fn test_failed_summary_restores_history() {
        let transport = MockTransport::new();
        transport.push_response(500, "upstream exploded");
        let mut session = connected(&transport).await;
        let mut engine = engine(SummarizationPolicy::new(0, 50)).with_history(long_history());

        let error = engine.send(&mut session, "what next?").await.unwrap_err();

        assert_eq!(error.status(), Some(500));
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(engine.compactions(), 0);

        let mut expected = long_history();
        expected.push_user("what next?");
        assert_eq!(engine.history(), &expected);
    }

    #[tokio::test]
    async fn test_compact_now_on_empty_history_is_noop() {
        let transport = MockTransport::new();
        let mut session = connected(&transport).await;
        let mut engine = engine(SummarizationPolicy::default());

        assert_eq!(engine.compact_now(&mut session).await.unwrap(), None);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_compact_now_replaces_history_with_summary() {
        let transport = MockTransport::new();
        transport.push_response(200, reply_body("they chatted about foxes"));
        let mut session = connected(&transport).await;
        let mut engine = engine(SummarizationPolicy::default()).with_history(long_history());

        let summary = engine.compact_now(&mut session).await.unwrap();

        assert_eq!(summary.as_deref(), Some("they chatted about foxes"));
        assert_eq!(
            engine.history().messages(),
            &[Message::assistant("they chatted about foxes")]
        );
        assert_eq!(engine.compactions(), 1);
    }

    #[test]
    fn test_from_config_uses_configured_model_and_budget() {
        let mut config = AppConfig::default();
        config.model = "gpt-4".to_string();
        config.budget.threshold = 5;

        let engine = ConversationEngine::from_config(&config);

        assert_eq!(engine.model(), "gpt-4");
        assert_eq!(engine.functions(), &[FunctionDescriptor::random_number()]);
        assert!(engine.history().is_empty());
    }
}
