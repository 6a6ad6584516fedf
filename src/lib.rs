pub mod cli;
pub mod config;
pub mod connection;
pub mod console;
pub mod conversations;
pub mod models;

pub use config::{AppConfig, BudgetConfig, ConfigError, EndpointConfig};
pub use connection::{
    ConnectionSession, Credential, HttpTransport, MockTransport, SessionState, Transport,
    TransportError,
};
pub use console::{Console, VerbosityLevel, console, init_console};
pub use conversations::{
    ChatError, ConversationEngine, FunctionDescriptor, History, Message, RequestBuilder, Role,
    SummarizationPolicy, TokenEstimator,
};
