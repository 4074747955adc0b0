use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::warn;

use sdso_db::config::Settings;
use sdso_db::dataset::{self, format_timestamp, SourceRun};
use sdso_db::effects::{parse_potential_effects, parse_skill_effects};
use sdso_db::page::Capture;
use sdso_db::snapshot::{DirStore, SnapshotStore};
use sdso_db::source::{builder_for, PageRecordBuilder};

#[derive(Parser)]
#[command(name = "sdso_db", about = "Seven Deadly Sins: Origin database builder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the dataset from the captured pages
    Build {
        /// Merge the secondary source (check its terms of use first)
        #[arg(long)]
        enable_secondary: bool,
        /// Do not write snapshot history or the latest diff
        #[arg(long)]
        no_snapshot: bool,
    },
    /// Diff the two newest snapshots
    Diff,
    /// List snapshots, newest first
    Snapshots,
    /// Run the effect extractor on one description
    Effects {
        text: String,
        /// Treat the text as a potential tier instead of a skill
        #[arg(long)]
        potential: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build {
            enable_secondary,
            no_snapshot,
        } => {
            let settings = Settings::load().context("Failed to load settings")?;
            run_build(&settings, enable_secondary, !no_snapshot)
        }
        Commands::Diff => {
            let settings = Settings::load().context("Failed to load settings")?;
            let store = DirStore::new(settings.snapshot_dir());
            let diff = store.latest_diff()?;
            println!("{}", serde_json::to_string_pretty(&diff)?);
            Ok(())
        }
        Commands::Snapshots => {
            let settings = Settings::load().context("Failed to load settings")?;
            let store = DirStore::new(settings.snapshot_dir());
            let ids = store.list()?;
            if ids.is_empty() {
                println!("No snapshots in {}", store.dir().display());
                return Ok(());
            }
            for id in ids.iter().rev() {
                println!("{}", id);
            }
            println!("\n{} snapshots", ids.len());
            Ok(())
        }
        Commands::Effects { text, potential } => {
            let out = if potential {
                serde_json::to_string_pretty(&parse_potential_effects(&text))?
            } else {
                serde_json::to_string_pretty(&parse_skill_effects(&text))?
            };
            println!("{}", out);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn run_build(settings: &Settings, enable_secondary: bool, snapshot: bool) -> Result<()> {
    let now = Utc::now();
    let generated_at = format_timestamp(now);
    let vocab = settings.vocabulary();

    let primary_builder = builder_for(&settings.primary, &vocab, &generated_at)
        .with_context(|| format!("No page builder for source '{}'", settings.primary.name))?;
    let primary_capture = Capture::load(&settings.capture_path(&settings.primary.name))?;

    let mut secondary: Option<(Box<dyn PageRecordBuilder>, Capture)> = None;
    if enable_secondary {
        let name = &settings.secondary.name;
        match (
            builder_for(&settings.secondary, &vocab, &generated_at),
            Capture::load(&settings.capture_path(name)),
        ) {
            (Some(builder), Ok(capture)) => secondary = Some((builder, capture)),
            (None, _) => warn!(source = %name, "no page builder for secondary source"),
            (_, Err(e)) => warn!(source = %name, "secondary capture unavailable: {:#}", e),
        }
    }

    println!(
        "Building from {} character pages, {} weapon pages...",
        primary_capture.characters.len(),
        primary_capture.weapons.len()
    );
    let output = dataset::build(
        SourceRun {
            builder: primary_builder.as_ref(),
            capture: &primary_capture,
        },
        secondary.as_ref().map(|(builder, capture)| SourceRun {
            builder: builder.as_ref(),
            capture,
        }),
        &settings.precedence,
        &generated_at,
    );

    let data_dir = &settings.data_dir;
    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    write_json(&data_dir.join("db.json"), &output.dataset)?;
    write_json(&data_dir.join("db_legacy.json"), &output.legacy)?;
    write_json(&data_dir.join("db_meta.json"), &output.meta)?;

    let counts = &output.meta.counts;
    println!(
        "Saved {} characters, {} weapons, {} skills ({} conflicts, {} skipped).",
        counts.characters,
        counts.weapons,
        counts.skills,
        counts.conflicts,
        output.meta.skipped.len()
    );
    println!(" - {} (normalized)", data_dir.join("db.json").display());
    println!(" - {} (legacy)", data_dir.join("db_legacy.json").display());
    println!(" - {} (run meta)", data_dir.join("db_meta.json").display());

    if snapshot {
        let mut store = DirStore::new(settings.snapshot_dir());
        let id = store.write(now, &serde_json::to_value(&output.dataset)?)?;
        store.retain(settings.snapshot_limit)?;
        let diff = store.latest_diff()?;
        write_json(&data_dir.join("db_diff_latest.json"), &diff)?;
        println!(" - {}/{}.json (snapshot)", store.dir().display(), id);
        println!(" - {} (diff latest)", data_dir.join("db_diff_latest.json").display());
    }
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
