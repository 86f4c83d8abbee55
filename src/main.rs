// src/main.rs
//! eegscope: feeds a recorded or simulated EEG session through the conditioning and
//! spectral pipeline, then exports the latest derived signals and spectra.
//!
//! ```bash
//! eegscope simulate --seconds 10 --out plots
//! eegscope --config scope.json --record session.csv replay session.jsonl
//! ```
mod drivers;
mod engine;
mod recorder;
mod types;
use std::path::PathBuf;
use std::sync::mpsc::channel;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use drivers::{render_spectrum_png, render_stacked_png, MessageSource, PlotStyle, ReplaySource, ScopeConfig, ScopeError, SimulatedSource};
use recorder::SnapshotRecorder;
use types::{ScopeCommand, ScopeEvent};

#[derive(Parser, Debug)]
#[command(name = "eegscope")]
#[command(version, about = "EEG reference / normalization / spectrum pipeline", long_about = None)]
struct Cli {
    /// JSON configuration file (missing keys use defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging verbosity when RUST_LOG is unset
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Directory for the exported PNG plots
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Write every emitted snapshot to this CSV file
    #[arg(long)]
    record: Option<PathBuf>,

    /// Reference channels for common-average correction
    #[arg(long, value_delimiter = ',')]
    reference: Vec<String>,

    /// Channels to display (default: all)
    #[arg(long, value_delimiter = ',')]
    channels: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a recorded session (one JSON message per line)
    Replay { file: PathBuf },
    /// Generate a synthetic session
    Simulate {
        #[arg(long, default_value = "10")]
        seconds: usize,
        #[arg(long, default_value = "256")]
        rate: f64,
        #[arg(long, value_delimiter = ',', default_value = "Fp1,Fp2,C3,C4,O1,O2")]
        sim_channels: Vec<String>,
    },
}

// 入口函数
fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level.as_str())).init();

    let config = match &cli.config {
        Some(path) => ScopeConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => ScopeConfig::default(),
    };
    info!("config: {:?}", config);

    let mut source: Box<dyn MessageSource> = match &cli.command {
        Commands::Replay { file } => Box::new(ReplaySource::open(file).with_context(|| format!("opening {}", file.display()))?),
        Commands::Simulate { seconds, rate, sim_channels } => Box::new(SimulatedSource::new(sim_channels.clone(), *rate, *seconds, 42)),
    };
    let mut recorder = match &cli.record {
        Some(path) => Some(SnapshotRecorder::create(path).with_context(|| format!("creating {}", path.display()))?),
        None => None,
    };

    let (tx, rx) = channel();
    let handle = engine::spawn(config, tx);
    if !cli.channels.is_empty() {
        handle.send(ScopeCommand::SelectChannels(cli.channels.clone()));
    }
    if !cli.reference.is_empty() {
        handle.send(ScopeCommand::SetReference(cli.reference.clone()));
    }

    // 1. 泵入数据源
    let mut pumped = 0usize;
    loop {
        match source.next_message() {
            Ok(Some(text)) => {
                handle.send(ScopeCommand::Inbound(text));
                pumped += 1;
            }
            Ok(None) => break,
            Err(e) => {
                error!("source failed after {pumped} message(s): {e}");
                break;
            }
        }
        drain_events(&rx, &handle, recorder.as_mut())?;
    }
    // 数据源结束：用最后一帧刷新一次输出
    handle.send(ScopeCommand::Flush);
    let output = handle.output();
    handle.shutdown();
    for event in rx.try_iter() {
        if let (ScopeEvent::Updated(snapshot), Some(recorder)) = (event, recorder.as_mut()) {
            recorder.write_snapshot(&snapshot)?;
        }
    }
    info!("🌊 {pumped} message(s) processed");

    if let Some(recorder) = recorder {
        recorder.finish().context("flushing recording")?;
    }

    // 2. 导出最后一帧
    let snapshot = match output.latest() {
        Ok(snapshot) => snapshot,
        Err(ScopeError::NoData) => {
            warn!("No data: no valid frame was received.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    std::fs::create_dir_all(&cli.out).with_context(|| format!("creating {}", cli.out.display()))?;
    let style = PlotStyle::default();
    for (name, png) in [
        ("signals.png", render_stacked_png(&snapshot, &style)),
        ("spectrum.png", render_spectrum_png(&snapshot, &style)),
    ] {
        match png {
            Ok(bytes) => {
                let path = cli.out.join(name);
                std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
                info!("wrote {}", path.display());
            }
            Err(e) => warn!("skipping {name}: {e}"),
        }
    }
    for signal in &snapshot.signals {
        let flagged = signal.trigger_flags.iter().filter(|f| **f).count();
        match snapshot.spectrum(&signal.channel) {
            Some(profile) if !profile.is_empty() => info!(
                "{}: peak {:.1} Hz, alpha/total {:.2}, {flagged} trigger sample(s)",
                signal.channel,
                profile.peak_hz.unwrap_or(0.0),
                profile.bands.alpha / profile.bands.total().max(f64::EPSILON)
            ),
            _ => info!("{}: no spectrum, {flagged} trigger sample(s)", signal.channel),
        }
    }
    if let Some(first) = snapshot.signals.first().and_then(|s| snapshot.signal(&s.channel)) {
        info!("top trace {} sits at offset {:.1}", first.channel, first.offset);
    }
    Ok(())
}

fn drain_events<W: std::io::Write>(rx: &std::sync::mpsc::Receiver<ScopeEvent>, handle: &engine::ScopeHandle, mut recorder: Option<&mut SnapshotRecorder<W>>) -> Result<()> {
    while let Ok(event) = rx.try_recv() {
        match event {
            ScopeEvent::Updated(snapshot) => {
                info!("snapshot {}: {} channel(s), {} trigger(s) matched, {} unmatched", snapshot.sequence, snapshot.signals.len(), snapshot.alignment.matched.len(), snapshot.alignment.unmatched.len());
                if let Some(recorder) = recorder.as_deref_mut() {
                    recorder.write_snapshot(&snapshot)?;
                }
            }
            ScopeEvent::Control(control) => info!("control → {}", control.to_json()?),
            ScopeEvent::StreamsListed { data_streams, marker_streams } => {
                let names: Vec<&str> = data_streams.iter().chain(&marker_streams).map(|s| s.name.as_str()).collect();
                info!("streams: {}", names.join(", "));
                // 默认选中第一个数据流和标记流
                handle.send(ScopeCommand::SelectStreams { data: data_streams.first().cloned(), marker: marker_streams.first().cloned() });
            }
            ScopeEvent::ChannelsListed(channels) => info!("{} channel(s) announced", channels.len()),
            ScopeEvent::ConfigChanged(config) => info!("config changed: {:?}", config),
            ScopeEvent::ServerError(message) => warn!("server error: {message}"),
        }
    }
    Ok(())
}
