// commands/replacements.rs
use anyhow::Result;
use clap::Subcommand;
use vgm_tagger::AppContext;

#[derive(Subcommand)]
pub enum ReplacementCommand {
    /// Always write `replacement` where an artist is credited as `original`
    Set { original: String, replacement: String },
    Remove { original: String },
    List,
}

pub fn run(ctx: &AppContext, cmd: ReplacementCommand) -> Result<()> {
    match cmd {
        ReplacementCommand::Set { original, replacement } => {
            let entry = ctx.replacements.set(&original, &replacement)?;
            println!("{} -> {}", entry.original, entry.replacement);
        }
        ReplacementCommand::Remove { original } => {
            ctx.replacements.remove(&original)?;
            println!("Removed replacement for {}", original.trim());
        }
        ReplacementCommand::List => {
            let all = ctx.replacements.list()?;
            if all.is_empty() {
                println!("No replacements saved");
            }
            for entry in all {
                println!("{} -> {}", entry.original, entry.replacement);
            }
        }
    }
    Ok(())
}
