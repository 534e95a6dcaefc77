// commands/scan.rs
use anyhow::Result;
use vgm_tagger::catalog_number::{self, Identifier};
use vgm_tagger::scanner;

pub async fn scan(paths: &[String], max_workers: usize) -> Result<()> {
    let result = scanner::scan_directories(paths, max_workers).await?;

    for album in &result.albums {
        let catalogs = if album.catalog_numbers.is_empty() {
            String::new()
        } else {
            format!("  [{}]", album.catalog_numbers.join(", "))
        };
        println!("{} ({} tracks){}", album.directory, album.tracks.len(), catalogs);
    }

    println!(
        "\n{} albums, {} files ({} unreadable)",
        result.albums.len(),
        result.total_files,
        result.unreadable.len()
    );
    for path in &result.unreadable {
        println!("  unreadable: {}", path);
    }
    Ok(())
}

pub fn catalog(text: &str) -> Result<()> {
    match catalog_number::classify_identifier(text) {
        Some(Identifier::Barcode(barcode)) => println!("Barcode: {}", barcode),
        Some(Identifier::CatalogNumbers(numbers)) => {
            for number in numbers {
                println!("{}", number);
            }
        }
        None => println!("No catalog numbers found"),
    }
    Ok(())
}
