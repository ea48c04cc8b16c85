//! CLI command definitions, routing, and tracing setup.

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use manybodylab_core::Enricher;
use manybodylab_shared::{
    AppConfig, DIRECTORY_REVALIDATE_SECS, DirectoryConfig, EnrichedProfile, init_config,
    load_config,
};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ManyBodyLab — organization member directory.
#[derive(Parser)]
#[command(
    name = "manybodylab",
    version,
    about = "Fetch ManyBodyLab's members from the directory and enrich their profiles.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Member list output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch and print the organization's enriched member profiles.
    Members {
        /// Organization to list (defaults to the configured organization).
        #[arg(short, long)]
        org: Option<String>,

        /// Directory API base URL override.
        #[arg(long, env = "MANYBODYLAB_DIRECTORY_URL")]
        base_url: Option<String>,

        /// Output format.
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "manybodylab=info",
        1 => "manybodylab=debug",
        _ => "manybodylab=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    // Directives match by prefix, so this also covers manybodylab_core etc.
    // Logs go to stderr; stdout carries the member output.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Members {
            org,
            base_url,
            format,
        } => cmd_members(org.as_deref(), base_url.as_deref(), format).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

async fn cmd_members(
    org: Option<&str>,
    base_url: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let config = load_config()?;
    let directory = directory_config(&config, base_url)?;

    let organization = org
        .map(String::from)
        .unwrap_or_else(|| config.directory.organization.clone());
    if organization.trim().is_empty() {
        return Err(eyre!("organization must not be empty"));
    }

    info!(
        organization = %organization,
        base_url = %directory.base_url,
        authenticated = directory.token.is_some(),
        "fetching members"
    );

    let enricher = Enricher::new(&directory)?;

    let spinner = spinner(&format!("Fetching members of {organization}"));
    let mut profiles = enricher.fetch_members(&organization).await;
    spinner.finish_and_clear();
    info!(
        profiles = profiles.len(),
        revalidate_secs = DIRECTORY_REVALIDATE_SECS,
        "members fetched"
    );

    // Completion order varies between runs; sort for stable output.
    profiles.sort_by(|a, b| a.login.to_lowercase().cmp(&b.login.to_lowercase()));

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&profiles)?);
        }
        OutputFormat::Text => {
            if profiles.is_empty() {
                println!("No members found for {organization}.");
            }
            for profile in &profiles {
                print_profile(profile);
            }
        }
    }

    Ok(())
}

/// Merge the config file's directory section with CLI overrides.
fn directory_config(config: &AppConfig, base_url: Option<&str>) -> Result<DirectoryConfig> {
    let mut directory = DirectoryConfig::from(config);

    if let Some(raw) = base_url {
        Url::parse(raw).map_err(|e| eyre!("invalid base URL '{raw}': {e}"))?;
        directory.base_url = raw.to_string();
    }

    Ok(directory)
}

fn print_profile(profile: &EnrichedProfile) {
    println!();
    println!("  {} (@{})", profile.name, profile.login);
    println!("  {}", profile.bio);
    println!("  GitHub:   {}", profile.github_url());
    if let Some(linkedin) = profile.linkedin_url() {
        println!("  LinkedIn: {linkedin}");
    }
    println!("  Avatar:   {}", profile.avatar_url);
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(
            style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_members_flags() {
        let cli = Cli::try_parse_from([
            "manybodylab",
            "-vv",
            "members",
            "--org",
            "SomeLab",
            "--format",
            "json",
        ])
        .expect("parse");

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Members { org, format, .. } => {
                assert_eq!(org.as_deref(), Some("SomeLab"));
                assert!(matches!(format, OutputFormat::Json));
            }
            Command::Config { .. } => panic!("expected members command"),
        }
    }

    #[test]
    fn base_url_override_is_validated() {
        let config = AppConfig::default();
        assert!(directory_config(&config, Some("not a url")).is_err());

        let directory = directory_config(&config, Some("http://localhost:8080")).unwrap();
        assert_eq!(directory.base_url, "http://localhost:8080");

        let directory = directory_config(&config, None).unwrap();
        assert_eq!(directory.base_url, "https://api.github.com");
    }
}
