use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use flate2::read::GzDecoder;
use log::{LevelFilter, info};

use xnbkit::content::Registry;
use xnbkit::export::{AssetExporter, ExportOptions};
use xnbkit::xnb::Document;

#[derive(Parser)]
#[command(name = "xnbkit", version, about = "Extract assets from XNA/MonoGame XNB files")]
struct Cli {
    /// XNB file to extract.
    input: PathBuf,
    /// Output directory.
    #[arg(short, long, default_value = "xnb_output")]
    output: PathBuf,
    /// The input file is gzip-compressed.
    #[arg(short = 'z', long)]
    gzipped: bool,
    /// Write into an existing output directory, replacing files.
    #[arg(long)]
    force: bool,
    /// Skip writing index.json.
    #[arg(long)]
    no_index: bool,
    /// Log every decoded object.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
    /// Only log warnings and errors.
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else if cli.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if cli.output.is_dir() && !cli.force {
        bail!(
            "output directory {} already exists (use --force to write into it)",
            cli.output.display()
        );
    }

    let raw = fs::read(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let data = if cli.gzipped {
        let mut out = Vec::new();
        GzDecoder::new(raw.as_slice())
            .read_to_end(&mut out)
            .with_context(|| format!("failed to gunzip {}", cli.input.display()))?;
        out
    } else {
        raw
    };

    let doc = Document::decode(&data, &Registry::with_builtins())
        .with_context(|| format!("failed to decode {}", cli.input.display()))?;

    let options = ExportOptions {
        write_manifest: !cli.no_index,
        overwrite: cli.force,
    };
    let written = AssetExporter::new(options)
        .export(&doc, &cli.output)
        .with_context(|| format!("failed to export to {}", cli.output.display()))?;
    info!("{} files written", written.len());
    Ok(())
}
