//! Emote asset packer binary

use anyhow::Context;
use clap::Parser;
use emote::assets::constants::MANIFEST_FILENAME;
use emote::assets::manifest::{EmojiEntry, IconEntry, Manifest, decode_entry};
use emote::assets::writer::ContainerBuilder;
use emote::exceptions::EmoteError;
use emote::exit_codes::{
    EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_PANIC, EXIT_SUCCESS, exit_code_for,
};
use log::{info, warn};
use std::{env, panic, path::Path, path::PathBuf, process};

const VERSION: &str = emote::version::VERSION;

#[derive(Parser, Debug)]
#[command(version = VERSION, about = "Pack an asset directory into an emote container")]
struct Args {
    /// Directory holding index.json and the files it references
    #[arg(short, long)]
    input_dir: PathBuf,

    /// Output path for the container
    #[arg(short, long)]
    output: PathBuf,

    /// Fail when the manifest references files missing from the directory
    #[arg(long)]
    strict: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() {
    panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: {}", panic_info);
        process::exit(EXIT_PANIC);
    }));

    match panic::catch_unwind(run) {
        Ok(exit_code) => process::exit(exit_code),
        Err(_) => {
            eprintln!("Fatal: Unhandled panic in packer");
            process::exit(EXIT_PANIC);
        }
    }
}

fn run() -> i32 {
    if env::args().nth(1).as_deref() == Some("--version") {
        println!("emote-pack {}", emote::version::full_version());
        return EXIT_SUCCESS;
    }

    let args = Args::parse();

    if let Some(ref level) = args.log_level {
        emote::logger::JsonLogger::init_with_level(level);
    } else {
        emote::logger::JsonLogger::init();
    }

    if !args.input_dir.is_dir() {
        eprintln!("Input directory not found: {}", args.input_dir.display());
        return EXIT_INVALID_ARGS;
    }

    match pack(&args) {
        Ok((entries, bytes)) => {
            println!(
                "✅ Packed {} entries ({} bytes) into {}",
                entries,
                bytes,
                args.output.display()
            );
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Pack error: {:#}", e);
            e.downcast_ref::<EmoteError>()
                .map(exit_code_for)
                .unwrap_or(EXIT_ERROR)
        }
    }
}

/// Files named by the manifest that are not in the directory
fn missing_files(manifest: &Manifest, dir: &Path) -> Vec<String> {
    let emoji = manifest
        .emoji_collection
        .iter()
        .filter_map(|raw| decode_entry::<EmojiEntry>(raw).ok())
        .map(|entry| entry.file);
    let icons = manifest
        .icon_collection
        .iter()
        .filter_map(|raw| decode_entry::<IconEntry>(raw).ok())
        .map(|entry| entry.file);
    emoji
        .chain(icons)
        .chain(manifest.text_font.clone())
        .filter(|file| !dir.join(file).is_file())
        .collect()
}

fn pack(args: &Args) -> anyhow::Result<(usize, u64)> {
    let manifest_path = args.input_dir.join(MANIFEST_FILENAME);
    let raw = std::fs::read(&manifest_path)
        .map_err(EmoteError::from)
        .with_context(|| format!("reading {}", manifest_path.display()))?;
    let manifest = Manifest::parse(&raw)?;
    info!(
        "📋 Manifest: {} emojis, {} icons, {} layout entries",
        manifest.emoji_collection.len(),
        manifest.icon_collection.len(),
        manifest.layout.len()
    );

    let missing = missing_files(&manifest, &args.input_dir);
    for file in &missing {
        warn!("⚠️ Manifest references missing file '{}'", file);
    }
    if args.strict && !missing.is_empty() {
        return Err(EmoteError::AssetNotFound(missing.join(", ")).into());
    }

    let mut builder = ContainerBuilder::new();
    builder.add_dir(&args.input_dir)?;
    let bytes = builder
        .write_to(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    Ok((builder.len(), bytes))
}
