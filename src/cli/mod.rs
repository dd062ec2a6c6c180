//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod say;

use std::error::Error;
use std::sync::Arc;

use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand};
use tracing::debug;

use crate::cli::say::run_say;
use crate::core::config::Config;
use crate::core::session::SessionOptions;
use crate::core::transport::{ChatTransport, HttpTransport};
use crate::ui::repl::run_chat;

#[derive(Parser, Debug)]
#[command(name = "chatstream")]
#[command(version)]
#[command(about = "Stream chat replies from a chat endpoint into your terminal")]
#[command(
    long_about = "Chatstream sends your messages to a chat endpoint and prints the assistant's \
reply as it streams in.\n\n\
Configuration:\n\
  Use 'chatstream set <key> <value>' to store defaults (endpoint, model, memory,\n\
  session-id, strict-utf8, connect-timeout). Command-line flags override them.\n\n\
Commands (interactive chat):\n\
  /help             Show available commands\n\
  /new              Start a new chat\n\
  /log <filename>   Enable logging to specified file\n\
  /log              Toggle logging pause/resume\n\
  /status           Show session state\n\
  /quit             Leave the chat\n\n\
Diagnostics:\n\
  CHATSTREAM_LOG    tracing filter for stderr diagnostics (default: warn)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Chat endpoint URL
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Model name sent with every request
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Session id sent with every request
    #[arg(short = 's', long = "session", global = true, value_name = "ID")]
    pub session: Option<String>,

    /// Ask the server to keep conversation memory (`--memory=off` disables it)
    #[arg(
        long,
        global = true,
        value_name = "on|off",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "on",
        value_parser = BoolishValueParser::new()
    )]
    pub memory: Option<bool>,

    /// Enable logging to specified file
    #[arg(short = 'l', long, global = true)]
    pub log: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the interactive chat (default)
    Chat,
    /// Send one message and stream the reply to stdout
    Say {
        /// Message text
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Set configuration values, or show them when no value is given
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set for the key
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Option<Vec<String>>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

impl Args {
    /// Layers command-line flags over the loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = Some(endpoint.clone());
        }
        if let Some(model) = &self.model {
            config.model = Some(model.clone());
        }
        if let Some(session) = &self.session {
            config.session_id = Some(session.clone());
        }
        if let Some(memory) = self.memory {
            config.memory = Some(memory);
        }
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    crate::logging::init();
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    match args.command {
        Some(Commands::Set { ref key, ref value }) => {
            let mut config = Config::load()?;
            match value.as_deref().map(|parts| parts.join(" ")) {
                Some(value) if !value.is_empty() => match set_config_value(&mut config, key, &value)
                {
                    Ok(message) => {
                        config.save()?;
                        println!("{message}");
                    }
                    Err(e) => {
                        eprintln!("❌ {e}");
                        std::process::exit(1);
                    }
                },
                _ => config.print_all(),
            }
            Ok(())
        }
        Some(Commands::Unset { ref key }) => {
            let mut config = Config::load()?;
            match config.unset_value(key) {
                Ok(()) => {
                    config.save()?;
                    println!("✅ Unset {key}");
                }
                Err(e) => {
                    eprintln!("❌ {e}");
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        Some(Commands::Say { ref prompt }) => {
            let prompt = prompt.join(" ");
            let (transport, options) = resolve(&args)?;
            run_say(transport, options, prompt, args.log.clone()).await
        }
        Some(Commands::Chat) | None => {
            let (transport, options) = resolve(&args)?;
            run_chat(transport, options, args.log.clone()).await
        }
    }
}

fn set_config_value(config: &mut Config, key: &str, value: &str) -> Result<String, String> {
    config.set_value(key, value)?;
    Ok(format!("✅ Set {key} to: {value}"))
}

fn resolve(args: &Args) -> Result<(Arc<dyn ChatTransport>, SessionOptions), Box<dyn Error>> {
    let mut config = Config::load()?;
    args.apply_overrides(&mut config);
    reqwest::Url::parse(config.endpoint())
        .map_err(|e| format!("Invalid endpoint URL '{}': {e}", config.endpoint()))?;

    let transport =
        HttpTransport::with_connect_timeout(config.endpoint(), config.connect_timeout())?;
    debug!(
        endpoint = transport.endpoint(),
        model = config.model(),
        "Resolved chat settings"
    );
    Ok((Arc::new(transport), SessionOptions::from_config(&config)))
}
