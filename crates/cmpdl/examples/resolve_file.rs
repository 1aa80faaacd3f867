//! Resolve a project (and optionally one of its files) without downloading it
//!
//! Run this example with:
//! ```
//! cargo run --example resolve_file -- "Better MC" [file-id]
//! ```

use cmpdl::{CatalogConfig, CatalogResolver, ProjectIdentifier};

#[tokio::main]
async fn main() -> cmpdl::Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(project) = args.next() else {
        eprintln!("Usage: resolve_file <project id|url|title> [file id]");
        std::process::exit(1);
    };
    let file_id = args.next().and_then(|raw| raw.parse::<u64>().ok());

    let config = CatalogConfig::load(std::path::Path::new("."))?;
    let resolver = CatalogResolver::from_config(config)?;

    let identifier = ProjectIdentifier::parse(&project);
    let resolved = resolver.resolve(&identifier, file_id).await?;

    println!("Version:   {}", resolved.version);
    println!("File name: {}", resolved.file_name);
    println!("URL:       {}", resolved.url);
    println!("Requests cached: {}", resolver.api().cache().len());

    Ok(())
}
