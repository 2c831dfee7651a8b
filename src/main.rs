mod cli;
mod core;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cli::context::AppContext;
use crate::core::config::AppConfig;

#[derive(Parser)]
#[command(name = "vv", about = "Cursor usage dashboard in the terminal", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Shorthand for --format json
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a dashboard session cookie
    Login {
        /// Cookie header or bare WorkosCursorSessionToken value (prompted if omitted)
        #[arg(long)]
        cookie: Option<String>,
    },
    /// Forget the stored session and snapshot
    Logout,
    /// Print the last fetched snapshot
    Show,
    /// Fetch fresh usage data once
    Refresh,
    /// Refresh periodically and redraw (p pause, r resume, n now, q quit)
    Watch,
    /// Show or change refresh settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print current settings
    Show,
    /// Change one setting
    Set {
        key: String,
        value: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Generate default config file
    Init,
    /// Validate config file
    Check,
    /// Print config and data locations
    Path,
}

/// RUST_LOG wins, then --verbose, then the config's log_level.
fn init_tracing(verbose: bool, config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose {
            "debug"
        } else {
            config.settings.log_level.as_str()
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} (using defaults)", e);
            AppConfig::default()
        }
    };
    init_tracing(cli.verbose, &config);

    let output_opts = cli::output::OutputOptions {
        format: if cli.json {
            cli::output::OutputFormat::Json
        } else {
            let default_format = config.settings.default_format.as_str();
            match cli.format.as_deref().unwrap_or(default_format) {
                "json" => cli::output::OutputFormat::Json,
                _ => cli::output::OutputFormat::Text,
            }
        },
        pretty: cli.pretty,
        use_color: cli::output::detect_color(!cli.no_color, &config.settings.color),
    };

    let command = match cli.command {
        Some(Commands::Config { action }) => {
            match action {
                ConfigAction::Init => cli::config_cmd::init(&output_opts)?,
                ConfigAction::Check => cli::config_cmd::check(&output_opts)?,
                ConfigAction::Path => cli::config_cmd::path(&output_opts)?,
            }
            return Ok(());
        }
        other => other.unwrap_or(Commands::Show),
    };

    let ctx = AppContext::load(&config).await?;
    match command {
        Commands::Login { cookie } => cli::auth_cmd::login(&ctx, cookie, &output_opts).await?,
        Commands::Logout => cli::auth_cmd::logout(&ctx).await?,
        Commands::Show => cli::dashboard_cmd::show(&ctx, &output_opts)?,
        Commands::Refresh => cli::dashboard_cmd::refresh(&ctx, &output_opts).await?,
        Commands::Watch => cli::dashboard_cmd::watch(&ctx, &output_opts).await?,
        Commands::Settings { action } => match action {
            None | Some(SettingsAction::Show) => cli::settings_cmd::show(&ctx, &output_opts).await?,
            Some(SettingsAction::Set { key, value }) => {
                cli::settings_cmd::set(&ctx, &key, &value, &output_opts)
                    .await?
            }
        },
        Commands::Config { .. } => {}
    }

    Ok(())
}
