//! Offline pipeline rendering command.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::Args;

use austreamer_algo::{BuildContext, ElementRegistry};
use austreamer_config::{ConfigBlock, ConfigStore, ElementConfig, LinkConfig, PipelineConfig};
use austreamer_core::{MsgId, State};

use crate::wav;

/// Name of the sink appended to every rendered pipeline.
const RENDER_SINK: &str = "render_out";

#[derive(Args)]
pub struct RenderArgs {
    /// Pipeline description (TOML)
    #[arg(value_name = "PIPELINE")]
    pipeline: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Configuration blob overlaid on the factory defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of scheduler ticks
    #[arg(short, long, default_value = "500")]
    ticks: u32,

    /// Element whose output is written; defaults to the last listed element
    #[arg(long)]
    from: Option<String>,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let mut config = PipelineConfig::load(&args.pipeline)
        .with_context(|| format!("loading {}", args.pipeline.display()))?;
    let from = match args.from {
        Some(name) => name,
        None => config
            .elements
            .last()
            .map(|e| e.name.clone())
            .context("pipeline has no elements")?,
    };
    attach_output(&mut config, &from, &args.output);

    let store = match &args.config {
        Some(path) => {
            let block = ConfigBlock::load(path).with_context(|| format!("loading {}", path.display()))?;
            ConfigStore::defaults_with(&block)?
        }
        None => ConfigStore::defaults(),
    };

    let mut registry = ElementRegistry::new();
    wav::register(&mut registry);
    let ctx = BuildContext::new(store.shared());
    let mut built = registry.build(&config, &ctx)?;
    let pipeline = &mut built.pipeline;

    let finished = Arc::new(AtomicBool::new(false));
    {
        let finished = Arc::clone(&finished);
        pipeline.set_message_handler(move |msg| {
            if msg.id == MsgId::END_OF_STREAM {
                finished.store(true, Ordering::SeqCst);
            }
        });
    }

    println!(
        "Rendering '{}' ({} Hz, {} ch, {} samples/frame) from '{}'...",
        config.name, config.format.sample_rate, config.format.channels, config.format.frame_samples, from
    );
    pipeline.set_state(State::Play)?;
    let mut ticks = 0;
    while ticks < args.ticks && !finished.load(Ordering::SeqCst) {
        if let Err(err) = pipeline.tick() {
            tracing::warn!("tick {ticks}: {err}");
        }
        ticks += 1;
    }
    pipeline.set_state(State::Idle)?;

    let reason = if finished.load(Ordering::SeqCst) {
        "end of stream"
    } else {
        "tick limit"
    };
    println!("Stopped after {ticks} ticks ({reason})");
    println!("Wrote {}", args.output.display());
    Ok(())
}

/// Appends a `wav_sink` fed by `from`.
fn attach_output(config: &mut PipelineConfig, from: &str, output: &std::path::Path) {
    let chained = config.links.is_empty();
    if chained {
        config.links = config.link_plan();
    }
    config.elements.push(
        ElementConfig::new(RENDER_SINK, "wav_sink").with_prop("path", output.to_string_lossy().into_owned()),
    );
    config.links.push(LinkConfig::new(from, RENDER_SINK));
}
