mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::config::ConfigCommand;
use commands::discography::DiscographyCommand;
use commands::reconcile::ReconcileArgs;
use commands::replacements::ReplacementCommand;
use vgm_tagger::config::Config;
use vgm_tagger::AppContext;

#[derive(Parser)]
#[command(name = "vgm-tagger", version)]
#[command(about = "Curate soundtrack and game music metadata", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List album directories with track counts and detected catalog numbers
    Scan {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Parse catalog numbers (and ranges) or a barcode out of text
    Catalog { text: String },
    /// Print the tags of one audio file as JSON
    Tags {
        file: String,
        /// Dump every raw tag item instead of the normalized record
        #[arg(long)]
        raw: bool,
    },
    /// Manage discographies, their sources and releases
    #[command(subcommand)]
    Discography(DiscographyCommand),
    /// Manage saved artist-name replacements
    #[command(subcommand)]
    Replacements(ReplacementCommand),
    /// Reconcile an album directory's tags with catalog data and the AI model
    Reconcile(ReconcileArgs),
    /// Show or change the configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    match cli.command {
        Command::Scan { paths } => commands::scan::scan(&paths, config.max_workers).await,
        Command::Catalog { text } => commands::scan::catalog(&text),
        Command::Tags { file, raw } => commands::tags::show(&file, raw),
        Command::Config(cmd) => commands::config::run(cmd, config),
        Command::Discography(cmd) => {
            let ctx = AppContext::init(config)?;
            let result = commands::discography::run(&ctx, cmd).await;
            ctx.close()?;
            result
        }
        Command::Replacements(cmd) => {
            let ctx = AppContext::init(config)?;
            let result = commands::replacements::run(&ctx, cmd);
            ctx.close()?;
            result
        }
        Command::Reconcile(args) => {
            let ctx = AppContext::init(config)?;
            let result = commands::reconcile::run(&ctx, args).await;
            ctx.close()?;
            result
        }
    }
}
