use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn, Level};

use easy::io_utils::{
    check_extension, easy_cli_error, io_cli_error, simple_cli_error, CliError, ARCHIVE_EXTENSION,
    FRAME_EXTENSION,
};
use easy::{lz, Archive, CodecRegistry, CompressionKind, Config, LengthBits, OpenMode};

#[derive(Parser)]
#[command(name = "easy")]
#[command(about = "EasyLZ frames and EasyArchive containers", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file into an .eslz frame
    Compress {
        input: PathBuf,
        output: PathBuf,
        /// Bits of each match byte spent on the length (1-7)
        #[arg(long)]
        length_bits: Option<u8>,
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Decompress an .eslz frame
    Decompress { input: PathBuf, output: PathBuf },
    /// Build an .esar archive from files and directories
    Pack {
        output: PathBuf,
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Compression for every entry (defaults to the configured kind)
        #[arg(long, value_enum)]
        compression: Option<CompressionKind>,
    },
    /// List archive entries
    List {
        archive: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Extract every entry into a directory
    Extract { archive: PathBuf, dir: PathBuf },
    /// Check both checksums of every entry
    Verify {
        archive: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => Config::load(path).map_err(|e| easy_cli_error("loading config", e))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Compress {
            input,
            output,
            length_bits,
            json,
        } => compress(&config, &input, &output, length_bits, json),
        Commands::Decompress { input, output } => decompress(&input, &output),
        Commands::Pack {
            output,
            inputs,
            compression,
        } => pack(
            &config,
            &output,
            &inputs,
            compression.unwrap_or(config.default_compression),
        ),
        Commands::List { archive, json } => list(&config, &archive, json),
        Commands::Extract { archive, dir } => extract(&config, &archive, &dir),
        Commands::Verify { archive, json } => verify(&config, &archive, json),
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>, CliError> {
    fs::read(path).map_err(|e| io_cli_error("reading", path, e))
}

fn write_output(path: &Path, data: &[u8]) -> Result<(), CliError> {
    fs::write(path, data).map_err(|e| io_cli_error("writing", path, e))
}

fn compress(
    config: &Config,
    input: &Path,
    output: &Path,
    length_bits: Option<u8>,
    json: bool,
) -> Result<(), CliError> {
    check_extension(output, FRAME_EXTENSION)?;
    let bits = match length_bits {
        Some(bits) => LengthBits::new(bits),
        None => config.length_bits(),
    }
    .map_err(|e| easy_cli_error("choosing length bits", e))?;

    let data = read_input(input)?;
    let start = Instant::now();
    let (frame, stats) =
        lz::encode_with_stats(&data, bits).map_err(|e| easy_cli_error("compressing", e))?;
    write_output(output, &frame)?;

    let elapsed = start.elapsed();
    if json {
        let report = serde_json::json!({
            "input_bytes": data.len(),
            "compressed_bytes": frame.len(),
            "length_bits": bits.get(),
            "elapsed_ms": elapsed.as_millis(),
            "tokens": stats,
        });
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| simple_cli_error(&format!("encoding report: {e}")))?;
        println!("{text}");
    } else {
        let ratio = if data.is_empty() {
            100.0
        } else {
            frame.len() as f64 * 100.0 / data.len() as f64
        };
        info!(
            input = data.len(),
            output = frame.len(),
            "compressed to {:.2}% in {:.2?}",
            ratio,
            elapsed
        );
    }
    Ok(())
}

fn decompress(input: &Path, output: &Path) -> Result<(), CliError> {
    check_extension(input, FRAME_EXTENSION)?;
    let frame = read_input(input)?;
    let data = lz::decode(&frame).map_err(|e| easy_cli_error("decompressing", e))?;
    write_output(output, &data)?;
    info!(output = data.len(), "decompressed");
    Ok(())
}

fn open_archive(config: &Config, path: &Path) -> Result<Archive<File>, CliError> {
    check_extension(path, ARCHIVE_EXTENSION)?;
    let file = File::open(path).map_err(|e| io_cli_error("opening", path, e))?;
    let registry =
        CodecRegistry::from_config(config).map_err(|e| easy_cli_error("loading codecs", e))?;
    Archive::open_with_registry(file, OpenMode::Read, registry)
        .map_err(|e| easy_cli_error("reading archive", e))
}

fn pack(
    config: &Config,
    output: &Path,
    inputs: &[PathBuf],
    kind: CompressionKind,
) -> Result<(), CliError> {
    check_extension(output, ARCHIVE_EXTENSION)?;
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(output)
        .map_err(|e| io_cli_error("creating", output, e))?;
    let registry =
        CodecRegistry::from_config(config).map_err(|e| easy_cli_error("loading codecs", e))?;
    let mut archive = Archive::open_with_registry(file, OpenMode::Create, registry)
        .map_err(|e| easy_cli_error("creating archive", e))?;

    let bar = ProgressBar::new(inputs.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}") {
        bar.set_style(style);
    }
    for input in inputs {
        bar.set_message(input.display().to_string());
        if input.is_dir() {
            archive
                .add_dir(input, kind)
                .map_err(|e| easy_cli_error(&format!("adding {}", input.display()), e))?;
        } else {
            let name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| simple_cli_error(&format!("'{}' has no file name", input.display())))?;
            archive
                .add_file(input, &name, kind)
                .map_err(|e| easy_cli_error(&format!("adding {}", input.display()), e))?;
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    archive
        .finalize()
        .map_err(|e| easy_cli_error("writing archive", e))?;
    info!(entries = archive.len(), compression = %kind, "packed");
    Ok(())
}

fn list(config: &Config, path: &Path, json: bool) -> Result<(), CliError> {
    let archive = open_archive(config, path)?;
    if json {
        let entries: Vec<_> = archive
            .entries()
            .iter()
            .map(|e| {
                serde_json::json!({
                    "name": e.name(),
                    "compression": e.compression_kind().map(|k| k.name()),
                    "compression_tag": e.compression_tag(),
                    "modified": e.modified(),
                    "uncompressed_len": e.uncompressed_len(),
                    "compressed_len": e.compressed_len(),
                })
            })
            .collect();
        let text = serde_json::to_string_pretty(&entries)
            .map_err(|e| simple_cli_error(&format!("encoding listing: {e}")))?;
        println!("{text}");
    } else {
        for e in archive.entries() {
            let kind = e
                .compression_kind()
                .map_or_else(|| e.compression_tag().to_string(), |k| k.to_string());
            println!(
                "{:>10} {:>10} {:<8} {}",
                e.uncompressed_len(),
                e.compressed_len(),
                kind,
                e.name()
            );
        }
    }
    Ok(())
}

fn extract(config: &Config, path: &Path, dir: &Path) -> Result<(), CliError> {
    let mut archive = open_archive(config, path)?;
    fs::create_dir_all(dir).map_err(|e| io_cli_error("creating", dir, e))?;
    let written = archive
        .extract_all(dir)
        .map_err(|e| easy_cli_error("extracting", e))?;
    info!(files = written, dir = %dir.display(), "extracted");
    Ok(())
}

fn verify(config: &Config, path: &Path, json: bool) -> Result<(), CliError> {
    let mut archive = open_archive(config, path)?;
    let mut failed = 0usize;
    let mut results = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let name = archive
            .entry(index)
            .map(|e| e.name().to_string())
            .map_err(|e| easy_cli_error("verifying", e))?;
        let ok = match archive.verify(index) {
            Ok(check) => {
                if !check.is_ok() {
                    warn!(entry = %name, ?check, "checksum mismatch");
                }
                check.is_ok()
            }
            Err(e) => {
                warn!(entry = %name, error = %e, "payload unreadable");
                false
            }
        };
        if !ok {
            failed += 1;
        }
        results.push(serde_json::json!({ "name": name, "ok": ok }));
    }
    if json {
        let text = serde_json::to_string_pretty(&results)
            .map_err(|e| simple_cli_error(&format!("encoding report: {e}")))?;
        println!("{text}");
    }
    if failed > 0 {
        return Err(simple_cli_error(&format!(
            "{failed} of {} entries failed verification",
            archive.len()
        )));
    }
    info!(entries = archive.len(), "all entries verified");
    Ok(())
}
