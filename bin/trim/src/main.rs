//! Trim CLI - Drive the redundancy elimination stages offline.
//!
//! Provides commands for:
//! - Replaying a capture through encoder and decoder contexts
//! - Inspecting shim descriptors in hex payloads

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use trim_core::shim::{MARKER_BYTE, MARKER_LEN, SHIM_LEN};
use trim_core::{scan, ShimDescriptor, TrimConfig};
use trim_engine::{ContextSet, CountingObserver, Decoder, Encoder, TrimStats};

/// Inline packet redundancy elimination tool.
#[derive(Parser)]
#[command(name = "trim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, default_value = "trim.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a file through encoder and decoder and verify the round trip
    Replay {
        /// File whose contents are cut into payloads
        input: PathBuf,

        /// Bytes per payload
        #[arg(long, default_value_t = 1400)]
        payload_size: usize,

        /// Number of independent contexts, each on its own thread
        #[arg(long, default_value_t = 1)]
        contexts: usize,

        /// Number of times the file is sent
        #[arg(long, default_value_t = 2)]
        repeat: usize,

        /// Override the store capacity from the configuration
        #[arg(long)]
        capacity: Option<usize>,
    },

    /// Decode a hex descriptor, or find the first one in a hex payload
    Inspect {
        /// Hex-encoded bytes
        hex: String,
    },
}

/// Load stage configuration from a TOML file.
fn load_config(path: &Path) -> Result<TrimConfig> {
    if !path.exists() {
        info!("No config file found at {:?}, using defaults", path);
        return Ok(TrimConfig::default());
    }

    let content = std::fs::read_to_string(path).context("Failed to read config file")?;
    let config: TrimConfig = toml::from_str(&content).context("Failed to parse config file")?;
    config.validate().context("Invalid configuration")?;
    info!("Loaded config from {:?}", path);
    Ok(config)
}

/// One encoder and one decoder back to back.
struct LinkContext {
    encoder: Encoder,
    decoder: Decoder,
    buf: Vec<u8>,
}

impl LinkContext {
    fn new(config: &TrimConfig, observer: Arc<CountingObserver>) -> Result<Self> {
        Ok(Self {
            encoder: Encoder::new(config.clone())?.with_observer(observer.clone()),
            decoder: Decoder::new(config.clone())?.with_observer(observer),
            buf: vec![0u8; config.max_payload],
        })
    }

    /// Sends one payload through both stages. Returns true if it arrived
    /// intact.
    fn send(&mut self, payload: &[u8]) -> Result<bool> {
        let len = payload.len();
        self.buf[..len].copy_from_slice(payload);
        let sent = self.encoder.process(&mut self.buf, len)?;
        let received = self.decoder.process(&mut self.buf, sent.len)?;
        Ok(&self.buf[..received.len] == payload)
    }
}

fn replay(
    mut config: TrimConfig,
    input: &Path,
    payload_size: usize,
    contexts: usize,
    repeat: usize,
    capacity: Option<usize>,
) -> Result<()> {
    if let Some(capacity) = capacity {
        config = TrimConfig {
            max_payload: config.max_payload,
            index_limit: config.index_limit,
            ..TrimConfig::with_capacity(capacity)
        };
        config.validate().context("Invalid capacity")?;
    }
    if payload_size == 0 || payload_size > config.max_payload {
        bail!(
            "payload size must be in 1..={}, got {}",
            config.max_payload,
            payload_size
        );
    }
    if contexts == 0 {
        bail!("at least one context is required");
    }

    let data = std::fs::read(input).with_context(|| format!("Failed to read {:?}", input))?;
    let payloads: Vec<&[u8]> = data.chunks(payload_size).collect();
    info!(
        payloads = payloads.len(),
        contexts,
        repeat,
        capacity = config.store_capacity,
        "Replaying capture"
    );

    let observer = Arc::new(CountingObserver::new());
    let set = ContextSet::new(contexts, |_| LinkContext::new(&config, observer.clone()))?;

    let corrupted = std::thread::scope(|scope| -> Result<usize> {
        let workers: Vec<_> = (0..contexts)
            .map(|idx| {
                let set = &set;
                let payloads = &payloads;
                scope.spawn(move || -> Result<usize> {
                    let mut corrupted = 0;
                    for _ in 0..repeat {
                        for payload in payloads.iter().skip(idx).step_by(contexts) {
                            let intact = set
                                .with(idx, |link| link.send(payload))
                                .ok_or_else(|| anyhow!("missing context {}", idx))??;
                            if !intact {
                                corrupted += 1;
                            }
                        }
                    }
                    debug!(context = idx, corrupted, "Context finished");
                    Ok(corrupted)
                })
            })
            .collect();

        let mut total = 0;
        for worker in workers {
            total += worker
                .join()
                .map_err(|_| anyhow!("replay worker panicked"))??;
        }
        Ok(total)
    })?;

    print_stats(&observer.snapshot());
    if corrupted > 0 {
        warn!(corrupted, "Payloads did not survive the round trip");
        bail!("{} payloads corrupted in transit", corrupted);
    }
    println!("All payloads restored intact");
    Ok(())
}

fn print_stats(stats: &TrimStats) {
    println!("Payloads:        {}", stats.encoded);
    println!("Bytes in:        {}", stats.encoder_bytes_in);
    println!("Bytes on wire:   {}", stats.encoder_bytes_out);
    println!("Savings:         {:.2}%", stats.savings() * 100.0);
    println!("Rewritten:       {}", stats.rewritten);
    println!("Declined:        {}", stats.declined);
    println!("Too short:       {}", stats.too_short);
    println!("Reconstructed:   {}", stats.reconstructed);
    println!("Rejected:        {}", stats.rejected);
    println!("Marker collisions: {}", stats.marker_collisions);
}

fn inspect(input: &str) -> Result<()> {
    let bytes = hex::decode(input.trim()).context("Invalid hex input")?;

    if bytes.len() == SHIM_LEN && bytes[..MARKER_LEN].iter().all(|&b| b == MARKER_BYTE) {
        let desc = ShimDescriptor::decode(&bytes)?;
        print_descriptor(0, &desc);
        return Ok(());
    }

    match scan(&bytes) {
        Some(hit) => print_descriptor(hit.offset, &hit.descriptor),
        None => println!("No descriptor in {} bytes", bytes.len()),
    }
    Ok(())
}

fn print_descriptor(offset: usize, desc: &ShimDescriptor) {
    println!("Descriptor at offset {}", offset);
    println!("  Reference id: {}", desc.ref_id);
    println!("  Stored span:  [{}, {}]", desc.stored_left, desc.stored_right);
    match desc.span_len() {
        Some(len) => println!("  Span length:  {}", len),
        None => println!("  Span length:  invalid (inverted)"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set up logging")?;

    match cli.command {
        Commands::Replay {
            input,
            payload_size,
            contexts,
            repeat,
            capacity,
        } => {
            let config = load_config(&cli.config)?;
            replay(config, &input, payload_size, contexts, repeat, capacity)
        }
        Commands::Inspect { hex } => inspect(&hex),
    }
}
