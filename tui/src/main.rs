//! Stock-Elf TUI Entry Point
//!
//! Launches the terminal UI for Stock-Elf.
//!
//! Usage:
//!   stock-elf [OPTIONS]
//!
//! Options:
//!   --api-base <URL>        Analysis service base URL (default: http://localhost:5000)
//!   -t, --ticker <TICKER>   Ticker to start with (default: AAPL)
//!   -c, --config <PATH>     Config file, must exist (default: ~/.config/stock-elf/config.toml, optional)
//!   --speech-command <CMD>  Speech recognizer command line
//!   --no-speech             Disable voice input

use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::panic;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stock_elf_core::{load_config, load_required_config, ConfigOverrides, StockElfConfig};
use stock_elf_tui::{App, ConductorClient};

/// Filter used when logging to a file and `RUST_LOG` is unset
const FILE_LOG_FILTER: &str = "info";

/// Filter used when logging to stderr; keeps the alternate screen clean
const STDERR_LOG_FILTER: &str = "error";

#[derive(Debug, Parser)]
#[command(
    name = "stock-elf",
    version,
    about = "Ask questions about a stock ticker from your terminal"
)]
struct Args {
    /// Analysis service base URL
    #[arg(long, value_name = "URL")]
    api_base: Option<String>,

    /// Ticker to start with
    #[arg(short, long)]
    ticker: Option<String>,

    /// Config file path
    #[arg(short, long, env = "STOCK_ELF_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Speech recognizer command line, e.g. "whisper-listen --once"
    #[arg(long, value_name = "CMD")]
    speech_command: Option<String>,

    /// Disable voice input
    #[arg(long)]
    no_speech: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(base) = &self.api_base {
            overrides = overrides.with_api_base(base.clone());
        }
        if let Some(ticker) = &self.ticker {
            overrides = overrides.with_ticker(ticker.clone());
        }
        if let Some(command) = &self.speech_command {
            overrides = overrides.with_speech_command(command);
        }
        if self.no_speech {
            overrides = overrides.without_speech();
        }
        overrides
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // An explicit --config must exist; the default path is optional
    let mut config = match &args.config {
        Some(path) => load_required_config(path.clone())?,
        None => load_config()?,
    };
    args.overrides().apply(&mut config)?;

    // Logging depends on the config, so report how it was loaded afterwards
    init_logging(&config)?;
    match &config.config_file_path {
        Some(path) => tracing::info!(path = %path.display(), "Loaded configuration from file"),
        None => tracing::debug!("No config file, using defaults"),
    }
    tracing::info!(
        api = %config.api.base_url,
        ticker = %config.ticker,
        source = %config.source(),
        "Starting Stock-Elf"
    );

    // Check if we have a TTY before attempting initialization
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("❌ Error: stock-elf requires a terminal (TTY)");
        eprintln!();
        eprintln!("This usually means:");
        eprintln!("  • Running in a non-interactive environment (CI, container)");
        eprintln!("  • SSH without -t flag");
        eprintln!("  • Piped stdin/stdout");
        std::process::exit(1);
    }

    let client = ConductorClient::from_config(&config)?;

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Restore terminal before printing panic
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Run the app
    let mut app = App::new(client);
    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // Propagate any errors
    result
}

/// Log to the configured file, or to stderr when none is set
fn init_logging(config: &StockElfConfig) -> anyhow::Result<()> {
    let fallback = config.log_filter.as_deref().unwrap_or(if config.log_file.is_some() {
        FILE_LOG_FILTER
    } else {
        STDERR_LOG_FILTER
    });
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))?;
    let registry = tracing_subscriber::registry().with(filter);

    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            registry
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            registry
                .with(fmt::layer().with_target(false).with_writer(io::stderr))
                .init();
        }
    }

    Ok(())
}
