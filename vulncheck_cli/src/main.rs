use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;

mod classify;
mod config;
mod output;
mod terminal;

use crate::config::{AppConfig, ConfigManager, get_config};
use vulncheck_client_core::{Entity, VulnCheckClient};

#[derive(Parser)]
#[command(name = "vulncheck")]
#[command(author, version, about = "VulnCheck client - threat intelligence lookups and batch enrichment", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up indicators (IPv4 addresses, email addresses, CVE ids)
    Lookup {
        /// Values to look up
        #[arg(required = true, value_name = "VALUE")]
        values: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List known-exploited-vulnerability records for a CVE
    Exploits {
        /// CVE identifier
        cve: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List threat actors associated with a CVE
    Actors {
        /// CVE identifier
        cve: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the NVD record for a CVE
    Details {
        /// CVE identifier
        cve: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Interactive setup for the API credential
    Init {
        /// Reconfigure even if already set up
        #[arg(short, long)]
        force: bool,
    },

    /// Get a configuration value
    Get {
        /// Configuration key (e.g., client.max_concurrent_lookups)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., client.max_concurrent_lookups)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration values
    List,

    /// Print the configuration file path
    Path,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on debug flag
    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Debug)
            .filter_module("vulncheck_client_core", log::LevelFilter::Debug)
            .filter_module("vulncheck_cli", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match cli.command {
        Commands::Lookup { values, format } => {
            let config = get_config().context("Failed to load configuration")?;
            lookup_command(config, values, format).await?;
        }
        Commands::Exploits { cve, format } => {
            let config = get_config().context("Failed to load configuration")?;
            exploits_command(config, &cve, format).await?;
        }
        Commands::Actors { cve, format } => {
            let config = get_config().context("Failed to load configuration")?;
            actors_command(config, &cve, format).await?;
        }
        Commands::Details { cve, format } => {
            let config = get_config().context("Failed to load configuration")?;
            details_command(config, &cve, format).await?;
        }
        Commands::Config { command } => {
            config_command(command).await?;
        }
        Commands::Completions { shell } => {
            generate_completions(shell);
        }
    }

    Ok(())
}

async fn lookup_command(
    config: AppConfig,
    values: Vec<String>,
    format: OutputFormat,
) -> Result<()> {
    let (entities, unrecognized) = classify::classify_values(&values);
    for value in &unrecognized {
        eprintln!(
            "{}",
            format!("Skipping unrecognized value: {value}").yellow()
        );
    }
    if entities.is_empty() {
        anyhow::bail!("No recognizable indicators given (expected IPv4, email, or CVE values)");
    }

    log::debug!("looking up {} indicator(s)", entities.len());
    let client = client_for(config)?;
    let rows = match client.lookup(&entities).await {
        Ok(rows) => rows,
        Err(err) => output::fail(err),
    };

    match format {
        OutputFormat::Text => output::render_lookup_text(&rows),
        OutputFormat::Json => output::render_json(&rows)?,
    }

    Ok(())
}

async fn exploits_command(config: AppConfig, cve: &str, format: OutputFormat) -> Result<()> {
    let entity = cve_entity(cve)?;
    let client = client_for(config)?;
    let records = match client.exploits(&entity).await {
        Ok(records) => records,
        Err(err) => output::fail(err),
    };

    match format {
        OutputFormat::Text => output::render_records_text("exploit", &entity.value, &records),
        OutputFormat::Json => output::render_json(&records)?,
    }

    Ok(())
}

async fn actors_command(config: AppConfig, cve: &str, format: OutputFormat) -> Result<()> {
    let entity = cve_entity(cve)?;
    let client = client_for(config)?;
    let records = match client.threat_actors(&entity).await {
        Ok(records) => records,
        Err(err) => output::fail(err),
    };

    match format {
        OutputFormat::Text => output::render_records_text("threat-actor", &entity.value, &records),
        OutputFormat::Json => output::render_json(&records)?,
    }

    Ok(())
}

async fn details_command(config: AppConfig, cve: &str, format: OutputFormat) -> Result<()> {
    let entity = cve_entity(cve)?;
    let client = client_for(config)?;

    match client.cve_details(&entity).await {
        Ok(Some(details)) => match format {
            OutputFormat::Text => output::render_details_text(&details),
            OutputFormat::Json => output::render_json(&details)?,
        },
        Ok(None) => println!("{}", format!("No NVD record for {}.", entity.value).yellow()),
        Err(err) => output::fail(err),
    }

    Ok(())
}

fn client_for(config: AppConfig) -> Result<VulnCheckClient> {
    VulnCheckClient::new(config.client).context("Failed to create VulnCheck client")
}

fn cve_entity(value: &str) -> Result<Entity> {
    if !classify::is_cve(value) {
        anyhow::bail!("'{value}' is not a CVE identifier (expected CVE-<year>-<number>)");
    }
    Ok(Entity::cve(value.trim().to_uppercase()))
}

async fn config_command(command: ConfigCommand) -> Result<()> {
    let mut manager = ConfigManager::new();

    match command {
        ConfigCommand::Init { force } => {
            config::interactive_init(force).await?;
        }
        ConfigCommand::Get { key } => match manager.get(&key) {
            Ok(value) => {
                println!("{value}");
            }
            Err(e) => {
                eprintln!("{}", format!("Error: {e}").red());
                std::process::exit(1);
            }
        },
        ConfigCommand::Set { key, value } => match manager.set(&key, &value) {
            Ok(()) => {
                eprintln!("{}", format!("Set {key} = {value}").green());
                eprintln!(
                    "Configuration saved to: {}",
                    manager.get_config_path().display()
                );
            }
            Err(e) => {
                eprintln!("{}", format!("Error: {e}").red());
                std::process::exit(1);
            }
        },
        ConfigCommand::List => match manager.list() {
            Ok(items) => {
                if items.is_empty() {
                    eprintln!("No configuration values set. Using defaults.");
                    eprintln!("Config file: {}", manager.get_config_path().display());
                } else {
                    eprintln!("{}", "Configuration:".bold().blue());
                    eprintln!("Config file: {}", manager.get_config_path().display());
                    eprintln!();

                    // Group items by section
                    let mut sections: std::collections::HashMap<String, Vec<(String, String)>> =
                        std::collections::HashMap::new();

                    for (key, value) in items {
                        let section = key.split('.').next().unwrap_or("general");
                        sections
                            .entry(section.to_string())
                            .or_default()
                            .push((key, value));
                    }

                    for (section, mut items) in sections {
                        eprintln!("[{}]", section.yellow());
                        items.sort_by(|a, b| a.0.cmp(&b.0));

                        for (key, value) in items {
                            let key_parts: Vec<&str> = key.split('.').collect();
                            let display_key = key_parts[1..].join(".");
                            eprintln!("  {} = {}", display_key.cyan(), value);
                        }
                        eprintln!();
                    }
                }
            }
            Err(e) => {
                eprintln!("{}", format!("Error: {e}").red());
                std::process::exit(1);
            }
        },
        ConfigCommand::Path => {
            println!("{}", manager.get_config_path().display());
        }
    }

    Ok(())
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
