// commands/tags.rs
use anyhow::Result;
use vgm_tagger::{tag_inspector, tags};

pub fn show(file: &str, raw: bool) -> Result<()> {
    let json = if raw {
        serde_json::to_string_pretty(&tag_inspector::inspect_file_tags(file)?)?
    } else {
        serde_json::to_string_pretty(&tags::read_track(file)?)?
    };
    println!("{}", json);
    Ok(())
}
