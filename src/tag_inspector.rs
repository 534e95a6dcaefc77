// src/tag_inspector.rs
//! Raw dump of every tag item in a file, for `tags --raw`
use anyhow::Result;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{ItemKey, ItemValue};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
pub struct RawTags {
    pub file_path: String,
    pub file_format: String,
    pub duration_seconds: Option<u64>,
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub tags: Vec<TagEntry>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TagEntry {
    pub tag_type: String,
    pub key: String,
    pub value: String,
}

pub fn inspect_file_tags(file_path: &str) -> Result<RawTags> {
    let tagged_file = Probe::open(Path::new(file_path))?.read()?;

    let properties = tagged_file.properties();
    let duration_secs = properties.duration().as_secs();

    let mut tags = Vec::new();
    for tag in tagged_file.tags() {
        let tag_type = format!("{:?}", tag.tag_type());
        for item in tag.items() {
            let Some(value) = item_value_to_string(item.value()).filter(|v| !v.is_empty()) else {
                continue;
            };
            tags.push(TagEntry {
                tag_type: tag_type.clone(),
                key: item_key_name(item.key()),
                value,
            });
        }
    }

    Ok(RawTags {
        file_path: file_path.to_string(),
        file_format: format!("{:?}", tagged_file.file_type()),
        duration_seconds: (duration_secs > 0).then_some(duration_secs),
        bitrate: properties.audio_bitrate(),
        sample_rate: properties.sample_rate(),
        tags,
    })
}

fn item_key_name(key: &ItemKey) -> String {
    match key {
        ItemKey::Unknown(name) => format!("Custom: {}", name),
        other => format!("{:?}", other),
    }
}

fn item_value_to_string(value: &ItemValue) -> Option<String> {
    match value {
        ItemValue::Text(text) => Some(text.trim().to_string()),
        ItemValue::Locator(locator) => Some(locator.to_string()),
        ItemValue::Binary(binary) => Some(format!("<{} bytes>", binary.len())),
    }
}
