mod commands;
mod helpers;
mod output;

use clap::{Parser, Subcommand};
use miette::Result;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "seamless")]
#[command(about = "Seamless platform sign-in from a GitHub credential")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Authenticate seamlessly using the GitHub credential (default)
    #[command(alias = "auth")]
    Authenticate,
    /// Show current authentication status
    Status,
    /// Configure editor chat to use GitHub Models with the same credential
    Editor,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .rgb_colors(miette::RgbColors::Preferred)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))?;
    miette::set_panic_hook();
    let cli = Cli::parse();

    // Initialize tracing with file logging
    use tracing_appender::rolling;
    use tracing_subscriber::{
        EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt,
    };

    // Create log directory in user's data directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("seamless")
        .join("logs");

    // Ensure log directory exists
    std::fs::create_dir_all(&log_dir).ok();

    // Create a rolling file appender that rotates daily
    let file_appender = rolling::daily(&log_dir, "seamless.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = if cli.debug {
        EnvFilter::new("seamless_core=debug,seamless_auth=debug,seamless_cli=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("seamless_core=warn,seamless_auth=warn,seamless_cli=warn,warn")
        })
    };

    let terminal_layer = if cli.debug {
        fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_timer(fmt::time::LocalTime::rfc_3339())
            .with_writer(std::io::stderr)
            .pretty()
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr)
            .compact()
            .boxed()
    };

    // File layer always captures debug output
    let file_env_filter =
        EnvFilter::new("seamless_core=debug,seamless_auth=debug,seamless_cli=debug,info");

    let file_layer = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_timer(fmt::time::LocalTime::rfc_3339())
        .with_ansi(false)
        .with_writer(non_blocking)
        .pretty();

    tracing_subscriber::registry()
        .with(terminal_layer.with_filter(env_filter))
        .with(file_layer.with_filter(file_env_filter))
        .init();

    info!(
        "Logging initialized. Logs are being written to: {:?}",
        log_dir.join("seamless.log")
    );

    let command = cli.command.unwrap_or(Commands::Authenticate);
    if let Err(report) = run(command, cli.config.as_deref()).await {
        // Authentication problems are reported, never turned into a failing exit.
        tracing::error!("{:?}", report);
        output::Output::new()
            .status("You can still use the platform with limited functionality or authenticate manually");
    }

    Ok(())
}

async fn run(command: Commands, config_path: Option<&std::path::Path>) -> Result<()> {
    let config = helpers::load_config(config_path).await?;
    match command {
        Commands::Authenticate => commands::authenticate::run(&config).await,
        Commands::Status => commands::status::run(&config).await,
        Commands::Editor => commands::editor::run(&config).await,
    }
}
