use colored::Colorize;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Verbosity levels for console output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum VerbosityLevel {
    /// Only show errors
    Quiet = 0,
    /// Normal output (default)
    #[default]
    Normal = 1,
    /// Verbose output with token estimates
    Verbose = 2,
    /// Debug output with full request and response dumps
    Debug = 3,
}

impl fmt::Display for VerbosityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerbosityLevel::Quiet => write!(f, "quiet"),
            VerbosityLevel::Normal => write!(f, "normal"),
            VerbosityLevel::Verbose => write!(f, "verbose"),
            VerbosityLevel::Debug => write!(f, "debug"),
        }
    }
}

impl VerbosityLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "quiet" => Some(VerbosityLevel::Quiet),
            "normal" => Some(VerbosityLevel::Normal),
            "verbose" => Some(VerbosityLevel::Verbose),
            "debug" => Some(VerbosityLevel::Debug),
            _ => None,
        }
    }
}

const RULE: &str = "==========================================================";

#[derive(Debug, Clone)]
pub struct Console {
    verbosity: VerbosityLevel,
}

impl Console {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    fn should_show(&self, level: VerbosityLevel) -> bool {
        self.verbosity >= level
    }

    pub fn error(&self, message: &str) {
        if self.verbosity > VerbosityLevel::Quiet {
            eprintln!("❌ {}", message);
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show(VerbosityLevel::Normal) {
            println!("⚠️  {}", message);
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show(VerbosityLevel::Normal) {
            println!("ℹ️  {}", message);
        }
    }

    pub fn success(&self, message: &str) {
        if self.should_show(VerbosityLevel::Normal) {
            println!("✅ {}", message);
        }
    }

    pub fn thinking(&self) {
        if self.should_show(VerbosityLevel::Normal) {
            println!("{}", "🔄 Thinking...".dimmed());
        }
    }

    pub fn verbose(&self, message: &str) {
        if self.should_show(VerbosityLevel::Verbose) {
            println!("{}", message);
        }
    }

    pub fn debug(&self, message: &str) {
        if self.should_show(VerbosityLevel::Debug) {
            println!("🐛 DEBUG: {}", message);
        }
    }

    pub fn plain(&self, message: &str) {
        if self.should_show(VerbosityLevel::Normal) {
            println!("{}", message);
        }
    }

    pub fn newline(&self) {
        if self.should_show(VerbosityLevel::Normal) {
            println!();
        }
    }

    pub fn connecting(&self, host: &str, port: u16) {
        if self.should_show(VerbosityLevel::Normal) {
            println!("{}", format!("🔌 Connecting to {}:{}", host, port).dimmed());
        }
    }

    pub fn connected(&self) {
        self.success("Connection successful.");
    }

    pub fn connection_closed(&self) {
        self.warning("Connection is closed.");
    }

    pub fn reconnecting(&self) {
        self.warning("Connection lost. Attempting to reconnect...");
    }

    pub fn estimated_tokens(&self, tokens: usize) {
        if self.should_show(VerbosityLevel::Verbose) {
            println!(
                "{}",
                format!("====== Estimated Tokens: {} ======", tokens).dimmed()
            );
        }
    }

    /// Dumps a labelled block, e.g. a request body, between horizontal rules.
    pub fn dump(&self, label: &str, content: &str) {
        if self.should_show(VerbosityLevel::Debug) {
            println!("{}", RULE.dimmed());
            println!("{}:", label.cyan());
            println!("{}", content);
            println!("{}", RULE.dimmed());
        }
    }

    pub fn summarizing(&self, summary: &str) {
        if self.should_show(VerbosityLevel::Normal) {
            println!("{}", RULE.dimmed());
            println!("{}", "                    !!!!SUMMARIZING!!!!                    ".yellow());
            println!("{}", RULE.dimmed());
            println!("Summary: {}", summary);
            println!("{}", RULE.dimmed());
        }
    }

    pub fn assistant(&self, content: &str) {
        if self.should_show(VerbosityLevel::Normal) && !content.is_empty() {
            println!("{} {}", "•".dimmed(), content);
        }
    }

    pub fn model_id(&self, id: &str) {
        if self.should_show(VerbosityLevel::Normal) {
            println!("Model ID: {}", id);
        }
    }

    pub fn welcome(&self, host: &str, model: &str) {
        if self.should_show(VerbosityLevel::Normal) {
            println!("🚀 Welcome to parley! Talking to {} using {}", host, model);
        }
    }

    pub fn goodbye(&self) {
        if self.should_show(VerbosityLevel::Normal) {
            println!("👋 Goodbye!");
        }
    }

    pub fn help_header(&self) {
        if self.should_show(VerbosityLevel::Normal) {
            println!("📚 Parley Help:");
        }
    }
}

static GLOBAL_CONSOLE: OnceLock<Arc<Console>> = OnceLock::new();

pub fn init_console(verbosity: VerbosityLevel) {
    let _ = GLOBAL_CONSOLE.set(Arc::new(Console::new(verbosity)));
}

/// Returns the process-wide console, falling back to normal verbosity when
/// `init_console` has not run (library use, tests).
pub fn console() -> Arc<Console> {
    GLOBAL_CONSOLE
        .get_or_init(|| Arc::new(Console::default()))
        .clone()
}

impl Default for Console {
    fn default() -> Self {
        Self {
            verbosity: VerbosityLevel::Normal,
        }
    }
}
