mod scan;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

use exif_editor::{EditorConfig, EditorContext, FileBatch, MetadataImage};

#[derive(Parser, Debug)]
#[command(
    name = "exif-editor",
    version,
    about = "Inspect and batch-edit EXIF, IPTC and XMP metadata of JPEG, PNG and WebP images"
)]
struct Cli {
    /// Image files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: exif-editor.json in the working directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write a default config file and exit
    #[arg(long)]
    init: bool,

    /// Display all metadata, grouped by namespace
    #[arg(long)]
    show: bool,

    /// Print the value of a tag (repeatable)
    #[arg(long, value_name = "KEY")]
    get: Vec<String>,

    /// Set a tag value (repeatable)
    #[arg(long, value_name = "KEY=VALUE", value_parser = parse_assignment)]
    set: Vec<(String, String)>,

    /// Delete a tag (repeatable)
    #[arg(long, value_name = "KEY")]
    delete: Vec<String>,

    /// Copy the tags named by --tag from this file to every input image
    #[arg(long, value_name = "FILE", requires = "tag")]
    copy_from: Option<PathBuf>,

    /// Tag to copy with --copy-from (repeatable)
    #[arg(long, value_name = "KEY", requires = "copy_from")]
    tag: Vec<String>,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Apply edits in memory and report them without writing to files
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{s}`")),
    }
}

#[derive(Serialize)]
struct TagReport {
    key: String,
    label: String,
    #[serde(rename = "type")]
    tag_type: &'static str,
    raw: String,
    interpreted: String,
}

#[derive(Serialize)]
struct GroupReport {
    name: String,
    label: String,
    tags: Vec<TagReport>,
}

#[derive(Serialize)]
struct FileReport {
    path: String,
    format: &'static str,
    groups: Vec<GroupReport>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let written = EditorConfig::default().save(cli.config.as_deref())?;
        println!("Default config written to {}", written.display());
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    let config = EditorConfig::load(cli.config.as_deref())?;
    let mut batch = FileBatch::new(EditorContext::with_config(config));

    let images = scan::collect_images(&cli.paths);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }
    log::info!("Found {} image(s)", images.len());

    let mut failed = 0;

    if let Some(ref source) = cli.copy_from {
        let changed = batch.copy_tag(source, &images, &cli.tag)?;
        log::info!("Copied {} tag(s) from {}: {changed} change(s)", cli.tag.len(), source.display());
    }

    // Per-image edits and reports
    let mut reports = Vec::new();
    let total = images.len();
    for (i, image_path) in images.iter().enumerate() {
        log::debug!("[{}/{}] {}", i + 1, total, image_path.display());

        let image = match batch.get(image_path) {
            Ok(image) => image,
            Err(e) => {
                log::error!("{e}");
                failed += 1;
                continue;
            }
        };

        if let Err(e) = apply_edits(image, &cli) {
            log::error!("{}: {e}", image_path.display());
            batch.discard(image_path);
            failed += 1;
            continue;
        }

        if cli.show || !cli.get.is_empty() {
            reports.push(report(image, &cli.get));
        }
    }

    if cli.json {
        if !reports.is_empty() {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
    } else {
        for report in &reports {
            print!("{}", render_report(report));
        }
    }

    if cli.dry_run {
        let dirty = batch.dirty_paths();
        if !dirty.is_empty() {
            log::info!("DRY RUN: {} file(s) would be modified", dirty.len());
            for path in &dirty {
                log::info!("  {}", path.display());
            }
        }
    } else if batch.dirty_count() > 0 {
        let failures = batch.save_all();
        for (path, error) in &failures {
            log::error!("Failed to save {}: {error}", path.display());
        }
        failed += failures.len();
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {total} image(s) failed");
    }
    Ok(())
}

/// Apply --set and --delete to one image. The first failing edit aborts.
fn apply_edits(image: &mut MetadataImage, cli: &Cli) -> Result<()> {
    for (key, value) in &cli.set {
        if image.set_value(key, value)?.is_changed() {
            log::info!("  {}: set {key}", image.path().display());
        }
    }
    for key in &cli.delete {
        if image.del_value(key).is_changed() {
            log::info!("  {}: deleted {key}", image.path().display());
        }
    }
    Ok(())
}

/// Collect the tags to display. With `only` empty, every tag is reported.
fn report(image: &MetadataImage, only: &[String]) -> FileReport {
    let groups = image
        .group_tags()
        .into_iter()
        .filter_map(|group| {
            let tags: Vec<TagReport> = group
                .keys
                .iter()
                .filter(|key| only.is_empty() || only.contains(*key))
                .filter_map(|key| tag_report(image, key))
                .collect();
            (!tags.is_empty()).then(|| GroupReport {
                label: group.label(),
                name: group.name,
                tags,
            })
        })
        .collect();

    FileReport {
        path: image.path().display().to_string(),
        format: image.format().name(),
        groups,
    }
}

fn tag_report(image: &MetadataImage, key: &str) -> Option<TagReport> {
    let value = image.get_value(key)?;
    Some(TagReport {
        key: key.to_string(),
        label: image.label(key),
        tag_type: image.tag_type(key)?.name(),
        raw: value.raw,
        interpreted: value.interpreted,
    })
}

/// One file's metadata as an indented text table, grouped by namespace.
fn render_report(report: &FileReport) -> String {
    let mut out = format!("{} ({})\n", report.path, report.format);
    if report.groups.is_empty() {
        out.push_str("  (no metadata found)\n");
    }
    for group in &report.groups {
        out.push_str(&format!("  [{}]\n", group.label));
        for tag in &group.tags {
            out.push_str(&format!("    {:<28} {}\n", tag.label, tag.interpreted));
        }
    }
    out
}
