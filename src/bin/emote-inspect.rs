//! Emote container inspector binary

use clap::Parser;
use emote::assets::constants::MANIFEST_FILENAME;
use emote::assets::manifest::Manifest;
use emote::assets::{AssetSource, Container, PartitionTable};
use emote::exceptions::{EmoteError, Result};
use emote::exit_codes::{EXIT_PANIC, EXIT_SUCCESS, exit_code_for};
use emote::{Callbacks, Emote, EmoteConfig, HeadlessEngine};
use std::{env, panic, path::PathBuf, process};

const VERSION: &str = emote::version::VERSION;

#[derive(Parser, Debug)]
#[command(version = VERSION, about = "Verify and list an emote asset container")]
struct Args {
    /// Container file to inspect
    container: PathBuf,

    /// Treat the file as a partition image and open it through a label
    #[arg(long)]
    partition_label: Option<String>,

    /// Also load the container into a headless session and report skips
    #[arg(long)]
    simulate: bool,

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
            eprintln!("Fatal: Unhandled panic in inspector");
            process::exit(EXIT_PANIC);
        }
    }
}

fn run() -> i32 {
    if env::args().nth(1).as_deref() == Some("--version") {
        println!("emote-inspect {}", emote::version::full_version());
        return EXIT_SUCCESS;
    }

    let args = Args::parse();

    if let Some(ref level) = args.log_level {
        emote::logger::JsonLogger::init_with_level(level);
    } else {
        emote::logger::JsonLogger::init();
    }

    match inspect(&args) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Inspect error: {}", e);
            exit_code_for(&e)
        }
    }
}

fn source(args: &Args, partitions: &PartitionTable) -> Result<AssetSource> {
    match &args.partition_label {
        Some(label) => {
            partitions.register_file(label, &args.container)?;
            Ok(AssetSource::Partition(label.clone()))
        }
        None => Ok(AssetSource::Path(args.container.clone())),
    }
}

fn inspect(args: &Args) -> Result<()> {
    let partitions = PartitionTable::new();
    let source = source(args, &partitions)?;
    let container = Container::open(&source, &partitions)?;
    let header = container.header();

    println!("📦 {}", container.source());
    println!(
        "   entries: {}  stored: {} bytes  checksum: {:#010x} ✅",
        header.stored_files, header.stored_len, header.checksum
    );
    for entry in container.entries() {
        if entry.width > 0 || entry.height > 0 {
            println!(
                "   {:<32} {:>9} bytes  @{:<9} {}x{}",
                entry.name, entry.size, entry.offset, entry.width, entry.height
            );
        } else {
            println!("   {:<32} {:>9} bytes  @{}", entry.name, entry.size, entry.offset);
        }
    }

    if container.find(MANIFEST_FILENAME).is_none() {
        println!("   (no {MANIFEST_FILENAME}; boot container or raw assets)");
        return Ok(());
    }
    let manifest = Manifest::parse(&container.read_entry(MANIFEST_FILENAME)?)?;
    println!(
        "📋 manifest: {} emojis, {} icons, {} layout entries, font: {}",
        manifest.emoji_collection.len(),
        manifest.icon_collection.len(),
        manifest.layout.len(),
        manifest.text_font.as_deref().unwrap_or("-")
    );

    if args.simulate {
        simulate(&source, &partitions)?;
    }
    Ok(())
}

fn simulate(source: &AssetSource, partitions: &PartitionTable) -> Result<()> {
    let emote = Emote::init(EmoteConfig::default(), HeadlessEngine::new(), Callbacks::new())?;
    if let AssetSource::Partition(label) = source {
        let region = partitions.find(label)?;
        emote.partitions().register(label, region);
    }
    let report = emote.load_assets_from_source(source)?;
    println!(
        "🧪 simulated load: {} emojis, {} icons, {} layout entries applied, font loaded: {}",
        report.emojis, report.icons, report.layouts_applied, report.font_loaded
    );
    for skipped in &report.skipped {
        println!("   ⏭️ {} '{}': {}", skipped.section, skipped.name, skipped.reason);
    }
    let (created, listing) = emote.inspect(|session| {
        let listing: Vec<String> = [
            (session.emoji().kind(), session.emoji().names().collect::<Vec<_>>()),
            (session.icons().kind(), session.icons().names().collect::<Vec<_>>()),
        ]
        .into_iter()
        .map(|(kind, mut names)| {
            names.sort_unstable();
            format!("{kind}: {}", names.join(", "))
        })
        .collect();
        (session.objects().len(), listing)
    })?;
    for line in &listing {
        println!("   {line}");
    }
    println!("   scene objects: {created}");
    emote.deinit();
    if report.skipped.is_empty() {
        Ok(())
    } else {
        Err(EmoteError::Parse(format!(
            "{} manifest entries were skipped",
            report.skipped.len()
        )))
    }
}
