//! Patchwork CLI - round-trip verification and conversion of FXP presets.
//!
//! This is the main entry point for the patchwork command-line application.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use patchwork::prelude::*;
use patchwork::xml::json;

/// Patchwork - lossless preset XML conversion tool
#[derive(Parser)]
#[command(name = "patchwork")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Round-trip every preset below a directory and report failures
    Verify {
        /// Directory searched recursively
        #[arg(env = "PATCHWORK_ROOT")]
        root: PathBuf,

        /// Preset file extension
        #[arg(long, default_value = "fxp")]
        ext: String,

        /// Parser backend(s) to cross-validate with
        #[arg(short, long, value_enum, default_value_t = BackendChoice::All)]
        backend: BackendChoice,

        /// Write before/after XML and JSON dumps here
        #[arg(long, env = "PATCHWORK_DUMP_DIR")]
        dump_dir: Option<PathBuf>,

        /// Worker threads (default: one per core)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the headers of a preset
    Info {
        /// Input preset file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Write the parts embedded in a preset
    Extract {
        /// Input preset file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the embedded XML
        #[arg(long)]
        xml: Option<PathBuf>,

        /// Output file for the JSON form of the XML
        #[arg(long)]
        json: Option<PathBuf>,

        /// Output file for the trailing payload
        #[arg(long)]
        payload: Option<PathBuf>,
    },

    /// Convert an XML document to JSON
    ToJson {
        /// Input XML file
        #[arg(short, long)]
        input: PathBuf,

        /// Output JSON file
        #[arg(short, long)]
        output: PathBuf,

        /// Parser backend
        #[arg(short, long, value_enum, default_value_t = BackendChoice::Tree)]
        backend: BackendChoice,
    },

    /// Convert a JSON document back to XML
    FromJson {
        /// Input JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Output XML file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Rebuild a preset around a new XML document
    ReplaceXml {
        /// Input preset file
        #[arg(short, long)]
        input: PathBuf,

        /// Replacement XML file
        #[arg(long)]
        xml: PathBuf,

        /// Output preset file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendChoice {
    Tree,
    Event,
    All,
}

impl BackendChoice {
    fn kinds(self) -> Vec<BackendKind> {
        match self {
            Self::Tree => vec![BackendKind::Tree],
            Self::Event => vec![BackendKind::Event],
            Self::All => BackendKind::ALL.to_vec(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Verify {
            root,
            ext,
            backend,
            dump_dir,
            threads,
            json,
        } => {
            let mut config = BatchConfig::new(root);
            config.extension = ext;
            config.backends = backend.kinds();
            config.dump_dir = dump_dir;
            config.threads = threads;
            cmd_verify(&config, json)?;
        }
        Commands::Info { input } => {
            cmd_info(&input)?;
        }
        Commands::Extract {
            input,
            xml,
            json,
            payload,
        } => {
            cmd_extract(&input, xml.as_deref(), json.as_deref(), payload.as_deref())?;
        }
        Commands::ToJson { input, output, backend } => {
            cmd_to_json(&input, &output, backend)?;
        }
        Commands::FromJson { input, output } => {
            cmd_from_json(&input, &output)?;
        }
        Commands::ReplaceXml { input, xml, output } => {
            cmd_replace_xml(&input, &xml, &output)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_verify(config: &BatchConfig, json: bool) -> Result<()> {
    let total = find_presets(&config.root, &config.extension)
        .with_context(|| format!("Failed to scan {}", config.root.display()))?
        .len();
    info!(root = %config.root.display(), backends = ?config.backends, total, "starting verification");

    let start = Instant::now();
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let report = run_batch(config, |done, _| pb.set_position(done as u64)).context("Batch verification failed")?;
    pb.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for failure in &report.failures {
            println!("FAIL [{}] {}: {}", failure.stage, failure.path.display(), failure.message);
        }
        println!(
            "{}/{} presets round-tripped in {:?}",
            report.passed,
            report.total,
            start.elapsed()
        );
    }

    if !report.is_success() {
        bail!("{} of {} presets failed", report.failures.len(), report.total);
    }

    Ok(())
}

fn fourcc(bytes: &[u8; 4]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn cmd_info(input: &Path) -> Result<()> {
    let preset = PresetFile::load(input).with_context(|| format!("Failed to load {}", input.display()))?;
    let header = &preset.header;
    let patch = &preset.patch;

    println!("File:            {}", input.display());
    println!("Program name:    {}", preset.program_name()?);
    println!("Chunk magic:     {}", fourcc(&header.chunk_magic));
    println!("Byte size:       {}", header.byte_size.get());
    println!("FX magic:        {}", fourcc(&header.fx_magic));
    println!("Version:         {}", header.version.get());
    println!("FX id:           {}", fourcc(&header.fx_id.get().to_be_bytes()));
    println!("FX version:      {}", header.fx_version.get());
    println!("Programs:        {}", header.num_programs.get());
    println!("Chunk size:      {}", header.chunk_size.get());
    println!("Patch magic:     {}", fourcc(&patch.magic));
    println!("XML size:        {}", patch.xml_size.get());
    println!("Patch version:   {}", patch.version.get());
    println!("Wavetables:      {}", patch.wavetables.get());
    println!("Samples:         {}", patch.samples.get());
    println!("Zones:           {}", patch.zones.get());
    println!("Mod matrix:      {}", patch.modmatrix.get());
    println!("Mod matrix rows: {}", patch.modmatrix_rows.get());
    println!("Payload:         {} bytes", preset.payload.len());

    Ok(())
}

fn cmd_extract(input: &Path, xml: Option<&Path>, json_out: Option<&Path>, payload: Option<&Path>) -> Result<()> {
    let preset = PresetFile::load(input).with_context(|| format!("Failed to load {}", input.display()))?;

    if xml.is_none() && json_out.is_none() && payload.is_none() {
        bail!("Nothing to extract: pass --xml, --json or --payload");
    }

    if let Some(path) = xml {
        fs::write(path, &preset.xml).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("XML ({} bytes) -> {}", preset.xml.len(), path.display());
    }

    if let Some(path) = json_out {
        let document = BackendKind::Tree
            .backend()
            .parse_document(&preset.xml)
            .context("Failed to parse embedded XML")?;
        fs::write(path, json::to_json_string(&document)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("JSON -> {}", path.display());
    }

    if let Some(path) = payload {
        fs::write(path, &preset.payload).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Payload ({} bytes) -> {}", preset.payload.len(), path.display());
    }

    Ok(())
}

fn cmd_to_json(input: &Path, output: &Path, backend: BackendChoice) -> Result<()> {
    let xml = fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))?;

    let kind = match backend {
        BackendChoice::Event => BackendKind::Event,
        BackendChoice::Tree | BackendChoice::All => BackendKind::Tree,
    };
    let document = kind.backend().parse_document(&xml).context("Failed to parse XML")?;

    fs::write(output, json::to_json_string(&document)?)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Converted {} -> {}", input.display(), output.display());

    Ok(())
}

fn cmd_from_json(input: &Path, output: &Path) -> Result<()> {
    let text = fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let document = json::from_json_str(&text).context("Failed to decode JSON document")?;
    let xml = document
        .to_xml_string(&SerializationPolicy::default())
        .context("Failed to render XML")?;

    fs::write(output, xml).with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Converted {} -> {}", input.display(), output.display());

    Ok(())
}

fn cmd_replace_xml(input: &Path, xml_path: &Path, output: &Path) -> Result<()> {
    let mut preset = PresetFile::load(input).with_context(|| format!("Failed to load {}", input.display()))?;
    let xml = fs::read_to_string(xml_path).with_context(|| format!("Failed to read {}", xml_path.display()))?;

    BackendKind::Tree
        .backend()
        .parse_document(&xml)
        .with_context(|| format!("{} is not a well-formed document", xml_path.display()))?;

    let old_len = preset.xml.len();
    preset.set_xml(xml)?;
    info!(old_len, new_len = preset.xml.len(), "replaced embedded XML");
    preset.save(output).with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Replaced XML ({} -> {} bytes), wrote {}",
        old_len,
        preset.xml.len(),
        output.display()
    );

    Ok(())
}
