// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk: command-line document scanner
//
// Entry point. Initialises logging, loads the photo, runs the scanner and
// writes the rectified document (optionally binarised) to disk.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use image::DynamicImage;
use scanwerk_core::error::{Result, ScanError};
use scanwerk_core::{DocumentCatalog, DocumentProfile, ScanConfig};
use scanwerk_document::{Scanner, Stage, binarize, load_image};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "scanwerk")]
#[command(about = "Find a document in a photo and rectify it to a top-down scan", long_about = None)]
struct Cli {
    /// Photo to scan
    #[arg(required_unless_present = "list_types")]
    input: Option<PathBuf>,

    /// Where to write the rectified document
    #[arg(short, long, default_value = "scanned.png")]
    output: PathBuf,

    /// Expected document type (see --list-types)
    #[arg(short, long, conflicts_with = "aspect_ratio")]
    document: Option<String>,

    /// Expected width / height ratio, for documents not in the catalog
    #[arg(long)]
    aspect_ratio: Option<f64>,

    /// JSON file with document profiles replacing the built-in catalog
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// JSON scanner configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Annotate the result as skewed beyond this many degrees
    #[arg(long)]
    skew_threshold: Option<f32>,

    /// Apply adaptive binarization to the rectified document
    #[arg(short, long)]
    binarize: bool,

    /// Write an image per pipeline stage into this directory
    #[arg(long)]
    dump_stages: Option<PathBuf>,

    /// Print the per-strategy report as JSON
    #[arg(long)]
    report: bool,

    /// List known document types and exit
    #[arg(long)]
    list_types: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("scanwerk: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let catalog = match &cli.catalog {
        Some(path) => DocumentCatalog::from_json_str(&std::fs::read_to_string(path)?)?,
        None => DocumentCatalog::builtin(),
    };

    if cli.list_types {
        print_catalog(&catalog);
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = match &cli.config {
        Some(path) => ScanConfig::from_json_file(path)?,
        None => ScanConfig::default(),
    };
    if cli.skew_threshold.is_some() {
        config.skew_threshold_degrees = cli.skew_threshold;
    }
    let binarize_config = config.binarize.clone();

    let profile = resolve_profile(cli, &catalog)?;
    let input = cli
        .input
        .as_deref()
        .ok_or_else(|| ScanError::InvalidConfig("no input image given".into()))?;
    let photo = load_image(input)?;

    let scanner = Scanner::new(config)?;
    let report = match &cli.dump_stages {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let mut index = 0usize;
            let mut dump = |stage: Stage, image: &DynamicImage| {
                index += 1;
                save_stage(dir, index, stage, image);
            };
            scanner.scan_observed(&photo, profile.as_ref(), &mut dump)
        }
        None => scanner.scan_with_report(&photo, profile.as_ref()),
    };

    if cli.report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    let Some(document) = report.into_document() else {
        eprintln!("No document detected in {}", input.display());
        return Ok(ExitCode::from(2));
    };

    let output = if cli.binarize {
        DynamicImage::ImageLuma8(binarize(&document.image, &binarize_config))
    } else {
        document.image
    };
    output.save(&cli.output).map_err(|err| {
        ScanError::ImageError(format!("failed to write {}: {}", cli.output.display(), err))
    })?;

    info!(
        path = %cli.output.display(),
        strategy = %document.strategy,
        width = document.size.0,
        height = document.size.1,
        skewed = ?document.skewed,
        "Document written"
    );
    Ok(ExitCode::SUCCESS)
}

/// The profile named on the command line, if any.
fn resolve_profile(cli: &Cli, catalog: &DocumentCatalog) -> Result<Option<DocumentProfile>> {
    if let Some(ratio) = cli.aspect_ratio {
        if !(ratio.is_finite() && ratio > 0.0) {
            return Err(ScanError::InvalidConfig(format!(
                "aspect ratio must be positive, got {ratio}"
            )));
        }
        return Ok(Some(DocumentProfile::with_aspect_ratio("custom", ratio)));
    }
    cli.document
        .as_deref()
        .map(|id| catalog.require(id).cloned())
        .transpose()
}

fn save_stage(dir: &Path, index: usize, stage: Stage, image: &DynamicImage) {
    let path = dir.join(format!("{index:02}-{stage}.png"));
    match image.save(&path) {
        Ok(()) => info!(path = %path.display(), %stage, "Stage image written"),
        Err(err) => warn!(path = %path.display(), %stage, error = %err, "Could not write stage image"),
    }
}

fn print_catalog(catalog: &DocumentCatalog) {
    println!("{:<12} {:<28} {:>8} {:>16}", "ID", "NAME", "RATIO", "SIZE (mm)");
    for profile in catalog.profiles() {
        println!(
            "{:<12} {:<28} {:>8.3} {:>16}",
            profile.id,
            profile.name,
            profile.aspect_ratio,
            format!("{} x {}", profile.width_mm, profile.height_mm)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn input_is_optional_only_for_listing() {
        assert!(Cli::try_parse_from(["scanwerk"]).is_err());
        assert!(Cli::try_parse_from(["scanwerk", "--list-types"]).is_ok());
    }

    #[test]
    fn document_and_ratio_conflict() {
        let parsed =
            Cli::try_parse_from(["scanwerk", "photo.jpg", "-d", "a4", "--aspect-ratio", "0.7"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn profile_comes_from_catalog_or_ratio() {
        let catalog = DocumentCatalog::builtin();

        let cli = Cli::parse_from(["scanwerk", "photo.jpg", "--document", "passport"]);
        let profile = resolve_profile(&cli, &catalog).expect("known id").expect("profile");
        assert_eq!(profile.aspect_ratio, 1.42);

        let cli = Cli::parse_from(["scanwerk", "photo.jpg", "--aspect-ratio", "1.25"]);
        let profile = resolve_profile(&cli, &catalog).expect("valid").expect("profile");
        assert_eq!(profile.aspect_ratio, 1.25);

        let cli = Cli::parse_from(["scanwerk", "photo.jpg"]);
        assert!(resolve_profile(&cli, &catalog).expect("no profile").is_none());
    }

    #[test]
    fn unknown_document_type_is_an_error() {
        let cli = Cli::parse_from(["scanwerk", "photo.jpg", "--document", "library-card"]);
        assert!(matches!(
            resolve_profile(&cli, &DocumentCatalog::builtin()),
            Err(ScanError::UnknownDocumentType(_))
        ));
    }

    #[test]
    fn non_positive_ratio_is_rejected() {
        let cli = Cli::parse_from(["scanwerk", "photo.jpg", "--aspect-ratio", "0"]);
        assert!(matches!(
            resolve_profile(&cli, &DocumentCatalog::builtin()),
            Err(ScanError::InvalidConfig(_))
        ));
    }
}
