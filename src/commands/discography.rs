// commands/discography.rs
use anyhow::Result;
use clap::Subcommand;
use vgm_tagger::discography::{merge_releases, refetch_discography, Release, ReleaseStatus};
use vgm_tagger::AppContext;

#[derive(Subcommand)]
pub enum DiscographyCommand {
    /// Create an empty discography
    Create { name: String },
    List,
    /// Delete a discography with all its sources and releases
    Delete { discography: String },
    /// Add a VGMdb or MusicBrainz artist URL as a source
    AddSource { discography: String, url: String },
    RemoveSource { discography: String, source_id: String },
    Sources { discography: String },
    Releases {
        discography: String,
        /// Only show releases with this status
        #[arg(long)]
        status: Option<String>,
    },
    /// Fetch every source and add releases not seen before
    Refetch { discography: String },
    /// Merge two or more releases into one
    Merge {
        discography: String,
        #[arg(required = true, num_args = 2..)]
        release_ids: Vec<String>,
    },
    /// Mark a release as obtained, skipped or unobtained
    SetStatus {
        discography: String,
        release_id: String,
        status: String,
        /// Where the obtained release lives locally
        #[arg(long)]
        path: Option<String>,
    },
}

fn print_release(release: &Release) {
    println!(
        "{}  {:<10}  {:<16}  {:<17}  {}{}",
        release.id,
        release.release_date.as_deref().unwrap_or("-"),
        release.catalog_number.as_deref().unwrap_or("-"),
        release.status,
        release.title(),
        release
            .role
            .as_deref()
            .map(|r| format!("  ({})", r))
            .unwrap_or_default()
    );
}

pub async fn run(ctx: &AppContext, cmd: DiscographyCommand) -> Result<()> {
    let store = &ctx.discographies;

    match cmd {
        DiscographyCommand::Create { name } => {
            let created = store.create_discography(&name)?;
            println!("Created {} ({})", created.name, created.id);
        }
        DiscographyCommand::List => {
            for d in store.list_discographies()? {
                let releases = store.list_releases(&d.id)?;
                let obtained = releases
                    .iter()
                    .filter(|r| {
                        matches!(r.status, ReleaseStatus::ObtainedLossless | ReleaseStatus::ObtainedLossy)
                    })
                    .count();
                println!(
                    "{}  {}  ({}/{} obtained, created {})",
                    d.id,
                    d.name,
                    obtained,
                    releases.len(),
                    d.created_at.format("%Y-%m-%d")
                );
            }
        }
        DiscographyCommand::Delete { discography } => {
            let d = store.find_discography(&discography)?;
            store.delete_discography(&d.id)?;
            println!("Deleted {}", d.name);
        }
        DiscographyCommand::AddSource { discography, url } => {
            let d = store.find_discography(&discography)?;
            let source = store.add_source(&d.id, &url)?;
            println!("Added {} ({})", source, source.id);
        }
        DiscographyCommand::RemoveSource { discography, source_id } => {
            let d = store.find_discography(&discography)?;
            store.remove_source(&d.id, &source_id)?;
            println!("Removed source {}", source_id);
        }
        DiscographyCommand::Sources { discography } => {
            let d = store.find_discography(&discography)?;
            for source in store.list_sources(&d.id)? {
                println!("{}  {}  {}", source.id, source, source.url());
            }
        }
        DiscographyCommand::Releases { discography, status } => {
            let d = store.find_discography(&discography)?;
            let status: Option<ReleaseStatus> = status.map(|s| s.parse()).transpose()?;
            for release in store
                .list_releases(&d.id)?
                .iter()
                .filter(|r| status.map_or(true, |s| r.status == s))
            {
                print_release(release);
            }
        }
        DiscographyCommand::Refetch { discography } => {
            let d = store.find_discography(&discography)?;
            let result = refetch_discography(store, &ctx.catalogs, &d.id).await?;
            println!("Added {} releases", result.added);
            for error in &result.errors {
                println!("  error: {}", error);
            }
        }
        DiscographyCommand::Merge { discography, release_ids } => {
            let d = store.find_discography(&discography)?;
            let merged = merge_releases(store, &d.id, &release_ids)?;
            print_release(&merged);
        }
        DiscographyCommand::SetStatus {
            discography,
            release_id,
            status,
            path,
        } => {
            let d = store.find_discography(&discography)?;
            let status: ReleaseStatus = status.parse()?;
            let release = store.update_release_status(&d.id, &release_id, status, path)?;
            print_release(&release);
        }
    }
    Ok(())
}
