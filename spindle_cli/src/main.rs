use spindle_core::byte_stream::ByteStream;
use spindle_core::config::SpindleConfig;
use spindle_core::datasource::{DEFAULT_STREAM, Datasource};
use spindle_core::random_source::RandomSource;
use spindle_core::record::Records;
use spindle_core::shape::{Kind, decode_value, parse_shape};

use anyhow::Context;
use clap::{Parser, Subcommand};
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Inspect, decode and generate length-prefixed fuzz input streams", long_about = None)]
struct Cli {
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    /// Log at debug level unless RUST_LOG says otherwise.
    #[clap(short, long)]
    verbose: bool,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the records of a stream, taking every length field at face value.
    Dump {
        file: PathBuf,
        #[clap(long)]
        json: bool,
        /// Payload bytes to show per record.
        #[clap(long)]
        preview: Option<usize>,
        #[clap(long)]
        max_records: Option<usize>,
    },
    /// Decode a stream the way a harness issuing the given shape would.
    Decode {
        file: PathBuf,
        /// Comma-separated kinds, e.g. "choice,u32,vec<text>".
        #[clap(short, long)]
        shape: String,
        /// Keep decoding the shape until the input runs out.
        #[clap(long)]
        repeat: bool,
        #[clap(long)]
        json: bool,
    },
    /// Synthesise a stream that decodes cleanly under the given shape.
    Generate {
        #[clap(short, long)]
        shape: String,
        #[clap(long)]
        seed: Option<u64>,
        /// Number of times to draw the shape.
        #[clap(long, default_value_t = 1)]
        count: usize,
        #[clap(long)]
        budget: Option<usize>,
        #[clap(long)]
        max_record_len: Option<usize>,
        /// Write the stream here instead of stdout.
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(config_file: Option<PathBuf>) -> Result<SpindleConfig, anyhow::Error> {
    match config_file {
        Some(config_path) => {
            info!("Loading configuration from specified path: {config_path:?}");
            SpindleConfig::load_from_file(&config_path)
        }
        None => {
            let default_config_path = PathBuf::from("spindle.toml");
            if default_config_path.exists() {
                info!("No config file specified, loading default: {default_config_path:?}");
                SpindleConfig::load_from_file(&default_config_path)
            } else {
                debug!("No config file specified and default 'spindle.toml' not found, using built-in defaults.");
                Ok(SpindleConfig::default())
            }
        }
    }
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = load_config(cli.config_file)?;
    debug!("Effective configuration: {config:?}");

    match cli.command {
        Command::Dump {
            file,
            json,
            preview,
            max_records,
        } => {
            if let Some(preview) = preview {
                config.dump.preview_bytes = preview;
            }
            if let Some(max_records) = max_records {
                config.dump.max_records = max_records;
            }
            config.dump.json |= json;
            dump(&file, &config)
        }
        Command::Decode {
            file,
            shape,
            repeat,
            json,
        } => {
            let shape = parse_shape(&shape).context("Invalid --shape")?;
            decode(&file, &shape, repeat, json)
        }
        Command::Generate {
            shape,
            seed,
            count,
            budget,
            max_record_len,
            output,
        } => {
            let shape = parse_shape(&shape).context("Invalid --shape")?;
            let settings = &mut config.generate;
            if let Some(seed) = seed {
                settings.seed = seed;
            }
            if let Some(budget) = budget {
                settings.budget = budget;
            }
            if let Some(max_record_len) = max_record_len {
                settings.max_record_len = max_record_len;
            }
            generate(&shape, count, &config, output.as_deref())
        }
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>, anyhow::Error> {
    std::fs::read(path).with_context(|| format!("Failed to read input file {path:?}"))
}

fn dump(path: &Path, config: &SpindleConfig) -> Result<(), anyhow::Error> {
    let data = read_input(path)?;
    let settings = &config.dump;

    if !settings.json {
        println!(
            "{} ({} bytes, md5 {:x})",
            path.display(),
            data.len(),
            md5::compute(&data)
        );
    }

    let mut records = Records::new(&data);
    let mut shown = 0;
    let mut stopped_early = false;
    for (index, record) in records.by_ref().enumerate() {
        if settings.max_records != 0 && index >= settings.max_records {
            stopped_early = true;
            break;
        }
        shown += 1;
        let preview_len = record.payload.len().min(settings.preview_bytes);
        let preview = hex_preview(&record.payload[..preview_len]);

        if settings.json {
            let line = serde_json::json!({
                "index": index,
                "offset": record.offset,
                "declared_len": record.declared_len,
                "present_len": record.payload.len(),
                "complete": record.complete,
                "preview": preview,
            });
            println!("{line}");
            continue;
        }

        let ellipsis = if preview_len < record.payload.len() { " …" } else { "" };
        print!(
            "#{index:<5} @{:<8} len {:<8} {preview}{ellipsis}",
            record.offset, record.declared_len
        );
        if !record.complete {
            print!(
                "  (truncated: {}/{} bytes)",
                record.payload.len(),
                record.declared_len
            );
        }
        println!();
    }

    // Past a stop the remainder is unvisited records, not trailing bytes.
    let remainder = if stopped_early { &[][..] } else { records.remainder() };
    if settings.json {
        if !remainder.is_empty() {
            let line = serde_json::json!({ "trailing": hex_preview(remainder) });
            println!("{line}");
        }
    } else {
        if !remainder.is_empty() {
            println!("trailing {} bytes: {}", remainder.len(), hex_preview(remainder));
        }
        if stopped_early {
            println!("{shown} records shown, stopped at limit");
        } else {
            println!("{shown} records");
        }
    }
    Ok(())
}

fn hex_preview(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode(path: &Path, shape: &[Kind], repeat: bool, json: bool) -> Result<(), anyhow::Error> {
    let data = read_input(path)?;
    let mut stream = ByteStream::new(&data);

    'passes: loop {
        for kind in shape {
            let offset = stream.offset();
            match decode_value(&mut stream, kind, DEFAULT_STREAM) {
                Ok(value) if json => println!("{}", serde_json::to_string(&value)?),
                Ok(value) => println!("@{offset:<8} {value}"),
                Err(err) => {
                    // A rejection is a normal outcome for fuzz inputs.
                    if json {
                        let line = serde_json::json!({ "rejected": err.to_string(), "offset": offset });
                        println!("{line}");
                    } else {
                        println!("rejected at @{offset}: {err}");
                    }
                    break 'passes;
                }
            }
        }
        if !repeat || stream.left() == 0 {
            break;
        }
    }

    if !json {
        println!("{} of {} bytes left", stream.left(), stream.len());
    }
    Ok(())
}

fn generate(
    shape: &[Kind],
    count: usize,
    config: &SpindleConfig,
    output: Option<&Path>,
) -> Result<(), anyhow::Error> {
    let settings = &config.generate;
    let rng = ChaCha8Rng::seed_from_u64(settings.seed);
    let mut source =
        RandomSource::new(rng, settings.budget).with_max_record_len(settings.max_record_len);

    for pass in 0..count {
        for kind in shape {
            let value = decode_value(&mut source, kind, DEFAULT_STREAM)
                .with_context(|| format!("Budget exhausted while drawing pass {pass}"))?;
            debug!(pass, %kind, %value, left = source.left(), "drew value");
        }
    }

    let transcript = source.into_transcript();
    match output {
        Some(path) => {
            std::fs::write(path, &transcript)
                .with_context(|| format!("Failed to write {path:?}"))?;
            info!(
                bytes = transcript.len(),
                seed = settings.seed,
                "wrote {}",
                path.display()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&transcript)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
