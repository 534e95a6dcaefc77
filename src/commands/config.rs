// commands/config.rs
// Configuration management commands

use anyhow::Result;
use clap::Subcommand;
use vgm_tagger::config::Config;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration (API key masked)
    Show,
    /// Store the OpenAI API key in the config file
    SetKey { key: String },
}

pub fn run(cmd: ConfigCommand, config: Config) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            let mut shown = config;
            if shown.api_key().is_some() {
                shown.openai_api_key = Some("********".to_string());
            }
            println!("{}", serde_json::to_string_pretty(&shown)?);
            println!("\nConfig file: {}", Config::get_config_path()?.display());
            println!("Database: {}", shown.database_path()?.display());
        }
        ConfigCommand::SetKey { key } => {
            // Save the file contents, not the environment-overridden values
            let mut stored = Config::load_from(&Config::get_config_path()?)?;
            stored.openai_api_key = Some(key.trim().to_string());
            stored.save()?;
            println!("API key saved");
        }
    }
    Ok(())
}
