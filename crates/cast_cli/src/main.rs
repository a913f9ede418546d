//! Cast demo driver
//!
//! Runs one output line on a timer thread, fed by synthetic tones and a
//! ring-buffer receiver, while a control thread edits volume and EQ.
//!
//! Usage: cast [--seconds N] [--rate HZ] [--layout NAME] [--preset NAME] [--linear]

mod tone;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use cast_core::{
    ring, shared, standard_pipeline, Bits, Channel, ChannelLayout, Format, MixerEvent,
    PipelineConfig, Player, Rate, RingWriter, Switch,
};
use cast_dsp::Preset;
use clap::Parser;
use crossbeam_channel::tick;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::tone::{beep_s16, ToneSource};

#[derive(Parser)]
#[command(name = "cast", about = "Run one Cast output line on synthetic sources", version)]
struct Cli {
    /// How long to run
    #[arg(long, default_value_t = 3)]
    seconds: u64,

    /// Output sample rate in Hz
    #[arg(long, default_value_t = Rate::R48000)]
    rate: Rate,

    /// Output channel layout, e.g. 2.0 or 5.1
    #[arg(long, default_value = "2.0", value_parser = parse_layout)]
    layout: ChannelLayout,

    /// Equalizer preset applied after the first quarter
    #[arg(long, value_parser = parse_preset)]
    preset: Option<&'static Preset>,

    /// Linear spectrum axis instead of the pseudo-log one
    #[arg(long)]
    linear: bool,
}

fn parse_layout(name: &str) -> Result<ChannelLayout, String> {
    ChannelLayout::by_name(name).ok_or_else(|| format!("unknown layout {name}"))
}

fn parse_preset(name: &str) -> Result<&'static Preset, String> {
    cast_dsp::preset(name).ok_or_else(|| format!("unknown preset {name}"))
}

impl Cli {
    fn config(&self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::default();
        config.format.rate = self.rate;
        config.format.layout = self.layout;
        config.spectrum_log_axis = !self.linear;
        config
            .validate()
            .map_err(anyhow::Error::msg)
            .context("invalid pipeline configuration")?;
        Ok(config)
    }
}

/// Simulated network receiver pushing s16 packets into the ring
fn spawn_receiver(mut writer: RingWriter, running: Arc<AtomicBool>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let packet = beep_s16(writer.format(), 220.0, Duration::from_millis(5));
        while running.load(Ordering::Relaxed) {
            if writer.free_frames() > 0 && writer.write_pcm(&packet) == 0 {
                debug!("receiver ring full");
            }
            if writer.is_abandoned() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        // Dropping the writer lets the mixer detach the ring once drained
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = cli.config()?;
    info!(format = %config.format, latency_ms = config.latency_ms(), "Starting Cast demo line");

    let line = Arc::new(standard_pipeline(&config)?);
    let player = Arc::new(Player::new());
    line.pipeline.append(player.clone());

    let events = line.mixer.subscribe();
    let event_logger = thread::spawn(move || {
        for event in events {
            match &event {
                MixerEvent::FormatChanged { format, .. } => info!(%format, "output format"),
                other => debug!(event = ?other, "mixer event"),
            }
        }
    });

    // Sources: a steady tone, a short one that ends by itself, and a ring receiver
    let steady = Arc::new(Mutex::new(ToneSource::new(config.format, 440.0, 0.3)));
    line.mixer.add(steady.clone());
    line.mixer.add(shared(
        ToneSource::new(config.format, 660.0, 0.2).with_length(Duration::from_millis(800)),
    ));
    let wire = Format::new(Rate::R48000, Bits::S16, ChannelLayout::STEREO);
    let (writer, ring_source) = ring(wire, config.samples_per_pass() * 8);
    line.mixer.add(shared(ring_source));

    let running = Arc::new(AtomicBool::new(true));
    let receiver = spawn_receiver(writer, running.clone());

    let worker = {
        let line = line.clone();
        let running = running.clone();
        let period = config.buffer_duration();
        thread::spawn(move || {
            let ticker = tick(period);
            let mut passes: u64 = 0;
            while running.load(Ordering::Relaxed) {
                if ticker.recv().is_err() {
                    warn!("pass timer stopped");
                    break;
                }
                let Some(report) = line.pipeline.stream_owned() else {
                    warn!("pipeline has no buffer");
                    break;
                };
                for (element, err) in &report.failures {
                    warn!(element = element.as_str(), error = %err, "pass degraded");
                }
                passes += 1;
                if passes % 50 == 0 {
                    let snapshot = line.spectrum.snapshot();
                    let peak = snapshot
                        .magnitudes
                        .iter()
                        .enumerate()
                        .max_by(|a, b| a.1.total_cmp(b.1))
                        .map(|(i, _)| i);
                    info!(
                        level = snapshot.level,
                        peak_bin = ?peak,
                        delivered = report.delivered,
                        cost_us = report.cost.as_micros() as u64,
                        "line"
                    );
                }
            }
            passes
        })
    };

    // Control plane
    let total = Duration::from_secs(cli.seconds);
    let step = total / 4;
    thread::sleep(step);
    match cli.preset {
        Some(preset) => {
            line.equalizer.apply_preset(preset)?;
            info!(preset = preset.name, "equalizer preset applied");
        }
        None => {
            line.equalizer.set(1000.0, 6.0, 1.0)?;
            line.equalizer.set(100.0, -3.0, 0.7)?;
        }
    }
    line.equalizer.set_delay(Duration::from_millis(40));

    thread::sleep(step);
    line.volume.set_volume(0.8);
    steady.lock().set_frequency(880.0);
    let beep = Format::new(config.format.rate, Bits::S16, ChannelLayout::MONO);
    if let Err(err) = player.add_pcm_on(Channel::FrontLeft, beep, &beep_s16(beep, 1200.0, Duration::from_millis(200))) {
        warn!(error = %err, "channel test clip refused");
    }

    thread::sleep(step);
    line.spectrum.off();
    line.volume.set_mute(true);
    info!(state = ?line.equalizer.state(), "muted, spectrum off");

    thread::sleep(step);
    running.store(false, Ordering::Relaxed);
    let passes = worker.join().map_err(|_| anyhow::anyhow!("worker thread panicked"))?;
    if receiver.join().is_err() {
        warn!("receiver thread panicked");
    }

    let stats = line.pipeline.stats();
    info!(passes, stats = %serde_json::to_string(&stats)?, "line stopped");
    line.pipeline.close();
    // Dropping the line drops the mixer and its event senders, ending the logger
    drop(line);
    if event_logger.join().is_err() {
        warn!("event logger thread panicked");
    }
    Ok(())
}
