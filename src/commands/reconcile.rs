// commands/reconcile.rs
use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use vgm_tagger::ai::{self, ReconcileInput, ReconcileMode};
use vgm_tagger::discography::SourceKind;
use vgm_tagger::scanner::{self, AlbumDirectory, TrackRecord};
use vgm_tagger::sources::SupplementalAlbum;
use vgm_tagger::{tags, AppContext};

#[derive(Args)]
pub struct ReconcileArgs {
    /// Album directory to reconcile
    pub directory: String,
    /// Use this VGMdb album as supplemental data
    #[arg(long, conflicts_with = "musicbrainz_release")]
    pub vgmdb_album: Option<String>,
    /// Use this MusicBrainz release as supplemental data
    #[arg(long)]
    pub musicbrainz_release: Option<String>,
    /// Extra instructions for the model
    #[arg(long)]
    pub instructions: Option<String>,
    /// Only correct the album name and album artist
    #[arg(long)]
    pub album_only: bool,
    /// Write the changes to the files
    #[arg(long)]
    pub write: bool,
    /// Do not keep .backup copies when writing
    #[arg(long)]
    pub no_backup: bool,
}

/// Supplemental data from an explicit id, or a MusicBrainz catalog number
/// search when none was given
async fn find_supplemental(
    ctx: &AppContext,
    args: &ReconcileArgs,
    album: &AlbumDirectory,
) -> Result<Option<SupplementalAlbum>> {
    if let Some(id) = &args.vgmdb_album {
        return Ok(Some(ctx.catalogs.fetch_album(SourceKind::Vgmdb, id).await?));
    }
    if let Some(id) = &args.musicbrainz_release {
        return Ok(Some(ctx.catalogs.fetch_album(SourceKind::Musicbrainz, id).await?));
    }
    if album.catalog_numbers.is_empty() {
        log::info!("No catalog number in '{}', continuing without supplemental data", album.name);
        return Ok(None);
    }

    let found = ctx
        .catalogs
        .musicbrainz
        .lookup_by_catalog_numbers(&album.catalog_numbers)
        .await?;
    match found.into_iter().next() {
        Some(release) => {
            log::info!("Matched MusicBrainz release '{}' ({})", release.title, release.album_id);
            Ok(Some(release))
        }
        None => {
            log::info!("No MusicBrainz release for {}", album.catalog_numbers.join(", "));
            Ok(None)
        }
    }
}

fn print_changes(records: &[TrackRecord]) -> usize {
    let mut modified = 0;
    for record in records.iter().filter(|r| r.is_modified()) {
        modified += 1;
        println!("{}", record.current.filename);
        for (field, change) in record.changes() {
            println!("  {}: '{}' -> '{}'", field, change.old, change.new);
        }
    }
    modified
}

pub async fn run(ctx: &AppContext, args: ReconcileArgs) -> Result<()> {
    let llm = ctx.llm()?;
    let album = scanner::read_album(&args.directory, ctx.config.max_workers).await?;
    let supplemental = find_supplemental(ctx, &args, &album).await?;

    let mode = if args.album_only {
        ReconcileMode::AlbumOnly
    } else {
        ReconcileMode::Full
    };

    let mut input = ReconcileInput::from_tracks(album.tracks.clone(), mode);
    input.supplemental = supplemental;
    input.instructions = args.instructions.clone();

    let outcome = ai::reconcile(llm, &input).await;
    if outcome.failed {
        println!("AI reconciliation failed; original metadata kept");
    }
    if let Some(usage) = outcome.usage {
        println!(
            "Tokens: {} prompt + {} completion = {}",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        );
    }

    let mut records: Vec<TrackRecord> = album.tracks.into_iter().map(TrackRecord::new).collect();
    match mode {
        ReconcileMode::Full => {
            for track in outcome.tracks {
                if let Some(record) = records.iter_mut().find(|r| r.path() == track.path) {
                    record.apply(track);
                }
            }
        }
        ReconcileMode::AlbumOnly => {
            for record in records.iter_mut() {
                record.current.album = outcome.album.clone();
                record.current.album_artist = outcome.album_artist.clone();
            }
        }
    }

    let replacements = ctx.replacements.load()?;
    for record in records.iter_mut() {
        replacements.apply_to_track(&mut record.current);
    }

    let modified = print_changes(&records);
    if modified == 0 {
        println!("No changes");
        return Ok(());
    }
    if !args.write {
        println!("\n{} files would change (pass --write to save)", modified);
        return Ok(());
    }

    let pb = ProgressBar::new(modified as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("Writing [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("=> "),
    );

    let backup = ctx.config.backup_tags && !args.no_backup;
    let progress = pb.clone();
    let result = tags::write_tracks(&records, backup, ctx.config.max_workers, move |done| {
        progress.set_position(done as u64)
    })
    .await;
    pb.finish_and_clear();

    println!("Wrote {} files ({} failed)", result.success, result.failed);
    for error in &result.errors {
        println!("  {}: {}", error.path, error.error);
    }
    if result.failed > 0 {
        anyhow::bail!("{} files could not be written", result.failed);
    }
    Ok(())
}
