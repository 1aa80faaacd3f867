use clap::Parser;
use cmpdl::{
    CatalogConfig, CatalogResolver, CmpdlError, ConsoleProgressReporter, DownloadConfig, FileOperation, HttpDownloader,
    InstallReport, IntoProgressCallback, ModpackInstaller, ProjectIdentifier,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Download a CurseForge modpack and all of its mods
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Project ID, project URL or project title
    project: String,

    /// Specific file of the project; the latest client file when omitted
    file_id: Option<u64>,

    /// Folder the modpack is installed into
    #[arg(short, long, default_value = "./modpacks")]
    output: PathBuf,

    /// Log every request and resolution step
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn print_instructions(report: &InstallReport) {
    println!("Finished!");
    println!();
    println!("Now you have to install minecraft {}", report.manifest.minecraft.version);
    if !report.manifest.minecraft.mod_loaders.is_empty() {
        println!("Then you need to install mod loaders:");
        for loader in report.manifest.mod_loader_ids() {
            println!("{}", loader);
        }
    }
    println!(
        "After that copy everything from {}\nto your downloaded .minecraft and you're ready to go!",
        report.minecraft_dir.display()
    );
}

async fn run(args: Args) -> cmpdl::Result<InstallReport> {
    let cwd = std::env::current_dir().map_err(|e| CmpdlError::fs(".", FileOperation::Metadata, e))?;
    let config = CatalogConfig::load(&cwd)?;

    let resolver = CatalogResolver::from_config(config)?;
    let download_config = DownloadConfig::default();
    let reporter = ConsoleProgressReporter::new(download_config.label_width);
    let downloader = HttpDownloader::new(download_config)?;
    let installer = ModpackInstaller::new(resolver, downloader, args.output).with_progress(reporter.into_callback());

    let identifier = ProjectIdentifier::parse(&args.project);
    println!("Installing {}", identifier);
    let report = installer.install(&identifier, args.file_id).await?;
    println!("Downloaded {} mods, {} already present", report.downloaded, report.skipped);
    Ok(report)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args).await {
        Ok(report) => {
            print_instructions(&report);
            Ok(())
        }
        Err(e) => {
            tracing::debug!(category = e.category(), "Install failed");
            eprintln!("ERROR: {}", e);
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
            if let Some(suggestion) = e.suggestion() {
                eprintln!("{}", suggestion);
            }
            std::process::exit(1);
        }
    }
}
