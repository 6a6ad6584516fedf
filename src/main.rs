use anyhow::Result;
use clap::Parser;
use parley::{
    cli::{Cli, Commands, ConfigAction},
    config::AppConfig,
    connection::{ConnectionSession, Credential, HttpTransport},
    console::{console, init_console},
    conversations::{ChatResult, ConversationEngine},
    models::list_models,
};
use std::io::{self, Write};
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_default();

    // CLI flags take precedence over the configured verbosity
    let effective_verbosity = cli.get_effective_verbosity(config.get_verbosity());
    init_console(effective_verbosity);

    if let Some(model) = cli.model {
        config.model = model;
    }

    match cli.command {
        None => handle_chat(&config, None).await,
        Some(Commands::Chat { message }) => handle_chat(&config, message).await,
        Some(Commands::Models) => handle_models(&config).await,
        Some(Commands::Config { action }) => {
            handle_config(action)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn open_session(config: &AppConfig) -> Result<Option<ConnectionSession>> {
    let credential: Credential = config.resolve_credential()?;
    let mut session = ConnectionSession::new(
        config.endpoint.clone(),
        credential,
        Box::new(HttpTransport::new()),
    );

    if session.connect().await.is_err() || !session.is_connected() {
        console().error("Connection failed.");
        return Ok(None);
    }
    Ok(Some(session))
}

/// Reconnects if the connection was lost. Returns false if that failed.
async fn ensure_connected(session: &mut ConnectionSession) -> bool {
    if session.is_connected() {
        return true;
    }

    console().reconnecting();
    if session.connect().await.is_ok() && session.is_connected() {
        true
    } else {
        console().error("Reconnect failed.");
        false
    }
}

async fn handle_models(config: &AppConfig) -> Result<ExitCode> {
    let Some(mut session) = open_session(config).await? else {
        return Ok(ExitCode::FAILURE);
    };

    let code = match list_models(&mut session).await {
        Ok(ids) => {
            for id in ids {
                console().model_id(&id);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            console().error(&format!("Could not list models: {}", e));
            ExitCode::FAILURE
        }
    };

    session.shutdown().await;
    Ok(code)
}

async fn handle_chat(config: &AppConfig, message: Option<String>) -> Result<ExitCode> {
    let Some(mut session) = open_session(config).await? else {
        return Ok(ExitCode::FAILURE);
    };

    match list_models(&mut session).await {
        Ok(ids) => ids.iter().for_each(|id| console().model_id(id)),
        Err(e) => console().warning(&format!("Could not list models: {}", e)),
    }

    let mut engine = ConversationEngine::from_config(config);
    console().debug(&format!(
        "Registered functions:\n{}",
        serde_json::to_string_pretty(engine.functions())?
    ));

    let code = match message {
        Some(message) => {
            console().thinking();
            let result = engine.send(&mut session, &message).await;
            let ok = result.is_ok();
            report(result);
            if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
        }
        None => interactive_chat(&mut engine, &mut session, config).await?,
    };

    session.shutdown().await;
    Ok(code)
}

fn report(result: ChatResult<String>) {
    match result {
        Ok(reply) => {
            console().assistant(&reply);
            console().newline();
        }
        Err(e) => console().error(&format!("Error: {}", e)),
    }
}

fn print_help() {
    console().help_header();
    console().plain("  /history        - Show the conversation so far");
    console().plain("  /status         - Show connection and token budget status");
    console().plain("  /compact        - Summarize the conversation now");
    console().plain("  /clear          - Forget the conversation");
    console().plain("  /help           - Show this help");
    console().plain("  exit, quit, q   - Exit the chat");
    console().newline();
}

fn print_history(engine: &ConversationEngine) {
    if engine.history().is_empty() {
        console().info("History is empty.");
        return;
    }
    for (index, message) in engine.history().iter().enumerate() {
        console().plain(&format!("{:>3}. {}: {}", index + 1, message.role, message.content));
    }
}

fn print_status(engine: &ConversationEngine, session: &mut ConnectionSession, config: &AppConfig) {
    let connected = session.is_connected();
    console().plain(&format!(
        "Connection: {} ({})",
        session.state(),
        session.endpoint().base_url()
    ));
    if !connected {
        console().plain("  The next message will reconnect first.");
    }
    console().plain(&format!("Model: {}", engine.model()));
    console().plain(&format!("Turns: {}", engine.history().len()));
    match engine.estimated_tokens() {
        Ok(tokens) => console().plain(&format!(
            "Estimated tokens: {} / {}",
            tokens, config.budget.threshold
        )),
        Err(e) => console().warning(&format!("Could not estimate tokens: {}", e)),
    }
    console().plain(&format!("Compactions: {}", engine.compactions()));
}

async fn interactive_chat(
    engine: &mut ConversationEngine,
    session: &mut ConnectionSession,
    config: &AppConfig,
) -> Result<ExitCode> {
    console().welcome(&config.endpoint.host, engine.model());
    console().plain("Type 'exit', 'quit', or Ctrl+C to quit. Type /help for commands.");
    console().newline();

    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    loop {
        print!("You: ");
        io::stdout().flush()?;

        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break, // EOF
            Ok(_) => {
                let input = line.trim();

                if input.is_empty() {
                    continue;
                }

                if matches!(input, "exit" | "quit" | "q") {
                    console().goodbye();
                    break;
                }

                match input {
                    "/help" => {
                        print_help();
                        continue;
                    }
                    "/history" => {
                        print_history(engine);
                        continue;
                    }
                    "/status" => {
                        print_status(engine, session, config);
                        continue;
                    }
                    "/clear" => {
                        engine.clear();
                        console().success("Conversation cleared.");
                        continue;
                    }
                    _ => {}
                }

                if !ensure_connected(session).await {
                    return Ok(ExitCode::FAILURE);
                }

                // A cancelled request may stop halfway through a compaction
                let snapshot = engine.history().clone();

                if input == "/compact" {
                    tokio::select! {
                        result = engine.compact_now(session) => match result {
                            Ok(None) => console().info("Nothing to compact."),
                            Ok(Some(_)) => console().success("History compacted."),
                            Err(e) => console().error(&format!("Error: {}", e)),
                        },
                        _ = tokio::signal::ctrl_c() => {
                            engine.restore_history(snapshot);
                            console().warning("Compaction cancelled.");
                        }
                    }
                    continue;
                }

                if input.starts_with('/') {
                    console().warning(&format!("Unknown command: {}. Type /help for commands.", input));
                    continue;
                }

                console().thinking();
                tokio::select! {
                    result = engine.send(session, input) => report(result),
                    _ = tokio::signal::ctrl_c() => {
                        engine.restore_history(snapshot);
                        console().warning("Request cancelled.");
                    }
                }
            }
            Err(e) => {
                console().error(&format!("Error reading input: {}", e));
                break;
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn handle_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = AppConfig::load()?;
            if let Some(ref verbosity) = config.verbosity {
                console().plain(&format!("verbosity = \"{}\"", verbosity));
            }
            console().plain(&format!("model = \"{}\"", config.model));
            console().plain(&format!("system_prompt = \"{}\"", config.system_prompt));

            let endpoint = &config.endpoint;
            console().newline();
            console().plain("[endpoint]");
            console().plain(&format!("scheme = \"{}\"", endpoint.scheme));
            console().plain(&format!("host = \"{}\"", endpoint.host));
            console().plain(&format!("port = {}", endpoint.port));
            console().plain(&format!("chat_path = \"{}\"", endpoint.chat_path));
            console().plain(&format!("models_path = \"{}\"", endpoint.models_path));
            console().plain(&format!("api_key_env = \"{}\"", endpoint.api_key_env));
            if let Some(ref api_key) = endpoint.api_key {
                console().plain(&format!(
                    "api_key = \"{}\"",
                    Credential::new(api_key.as_str()).masked()
                ));
            }
            console().plain(&format!(
                "connect_timeout_secs = {}",
                endpoint.connect_timeout_secs
            ));
            console().plain(&format!(
                "request_timeout_secs = {}",
                endpoint.request_timeout_secs
            ));

            console().newline();
            console().plain("[budget]");
            console().plain(&format!("threshold = {}", config.budget.threshold));
            console().plain(&format!(
                "max_summary_tokens = {}",
                config.budget.max_summary_tokens
            ));
        }
        ConfigAction::Set { key, value } => {
            let mut config = AppConfig::load()?;
            match config.update_setting(&key, value) {
                Ok(()) => {
                    config.save()?;
                    console().success("Configuration updated successfully");
                }
                Err(e) => console().error(&e.to_string()),
            }
        }
    }
    Ok(())
}
