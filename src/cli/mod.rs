//! Operator command line.
//!
//! Everything here runs the same core the extension contexts use, backed
//! by a [`FileStore`] instead of browser storage.

pub mod host;
pub mod listing;
pub mod say;
pub mod settings;


use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand};

use crate::core::background::{
    Coordinator, TabBroker, TabId, TabInfo, WindowError, WindowId, WindowManager,
};
use crate::core::config::Config;
use crate::core::protocol::{ChannelError, Reply, Request};
use crate::core::providers::ProviderClient;
use crate::core::storage::{FileStore, StorageAdapter};
use crate::utils::logging::init_tracing;

#[derive(Parser)]
#[command(name = "promptline")]
#[command(version)]
#[command(about = "AI replies for the Messenger composer")]
#[command(
    long_about = "Promptline turns a prefixed line typed into the Messenger composer into an \
AI-generated reply. This binary shares the extension's storage format and provides the \
native messaging host.\n\n\
Settings are stored as a flat JSON object. API keys, model, command prefix, response \
format and auto-send are changed with 'promptline set'.\n\n\
Environment Variables:\n\
  PROMPTLINE_LOG    tracing filter directive (default: warn)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Storage file to use instead of the configured one
    #[arg(short = 's', long, global = true, value_name = "PATH")]
    pub storage: Option<PathBuf>,

    /// Config file to use instead of the platform default
    #[arg(short = 'c', long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print debug logs to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a reply for a prompt and print it
    Say {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        prompt: Vec<String>,
        /// Tone id to answer in (defaults to the selected tone)
        #[arg(short = 't', long)]
        tone: Option<String>,
    },
    /// Set a setting, or print all settings when no key is given
    Set {
        key: Option<String>,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Restore a setting to its default
    Unset { key: String },
    /// List the model catalog
    Models,
    /// List built-in and custom tones
    Tones,
    /// Show or clear prompt history
    History {
        #[arg(long)]
        clear: bool,
        /// Case-insensitive prompt substring
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        tone: Option<String>,
    },
    /// Manage message templates
    Templates {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Serve the background coordinator over native messaging
    Host,
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    List,
    Add {
        title: String,
        #[arg(trailing_var_arg = true, required = true)]
        content: Vec<String>,
    },
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },
    Rm { id: String },
}

/// Storage and provider access resolved from flags and the config file.
pub struct Environment {
    pub config: Config,
    pub storage: StorageAdapter,
}

impl Environment {
    fn from_args(args: &Args) -> Result<Self, Box<dyn Error>> {
        let config = match &args.config {
            Some(path) => Config::load_from_path(path)?,
            None => Config::load()?,
        };
        let path = config.resolve_storage_path(args.storage.as_deref());
        tracing::debug!(path = %path.display(), "Using storage file");
        let storage = StorageAdapter::new(Arc::new(FileStore::new(path)));
        Ok(Self { config, storage })
    }

    /// A coordinator with no browser behind it.
    pub fn coordinator(&self) -> Result<Coordinator, Box<dyn Error>> {
        let client = ProviderClient::new(self.config.endpoints(), self.config.request_timeout())?;
        let detached = Arc::new(Detached);
        Ok(Coordinator::new(
            self.storage.clone(),
            Arc::new(client),
            detached.clone(),
            detached,
        ))
    }
}

/// Tab and window access outside a browser: there are none.
pub struct Detached;

#[async_trait]
impl TabBroker for Detached {
    async fn query_tabs(&self, _url_pattern: &str) -> Vec<TabInfo> {
        Vec::new()
    }

    async fn send_to_tab(&self, tab_id: TabId, _request: Request) -> Result<Reply, ChannelError> {
        Err(ChannelError::Disconnected(format!("no tab {tab_id}")))
    }
}

#[async_trait]
impl WindowManager for Detached {
    async fn window_exists(&self, _id: WindowId) -> bool {
        false
    }

    async fn focus(&self, id: WindowId) -> Result<(), WindowError> {
        Err(WindowError(format!("no window {id}")))
    }

    async fn create_popup(&self) -> Result<WindowId, WindowError> {
        Err(WindowError("windows are not available here".to_string()))
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let env = Environment::from_args(&args)?;

    match args.command {
        Commands::Say { prompt, tone } => say::run_say(&env, prompt, tone).await,
        Commands::Set { key, value } => match key {
            Some(key) => settings::set(&env.storage, &key, &value.join(" ")),
            None => settings::print_all(&env.storage),
        },
        Commands::Unset { key } => settings::unset(&env.storage, &key),
        Commands::Models => {
            listing::list_models(&env.storage);
            Ok(())
        }
        Commands::Tones => listing::list_tones(&env.storage),
        Commands::History {
            clear,
            search,
            tone,
        } => {
            if clear {
                env.storage.clear_history()?;
                println!("✅ History cleared");
                Ok(())
            } else {
                listing::list_history(&env.storage, search, tone)
            }
        }
        Commands::Templates { command } => listing::templates(&env.storage, command),
        Commands::Host => host::run_host(&env).await,
    }
}
