// Parla Command Line Interface
// Simulate speaking turns and animation blends against an in-memory avatar

mod scene;

use anyhow::anyhow;
use clap::{Parser, Subcommand, ValueEnum};
use parla_core::ConfigFormat;
use parla_me::{BlendProgress, BlendTiming, Speaker, TurnOutcome, VISEME_NAMES};
use parla_spk::{silent_wav, ScriptedTtsEngine, SynthesisEvent, SynthesisSession, VisemeEvent};
use scene::{demo_track, parse_viseme, CliConfig, Scene};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parla")]
#[command(about = "Parla - avatar lip sync and animation blending", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (JSON, TOML or YAML)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one speaking turn with a scripted synthesizer
    Simulate {
        /// Text to speak
        #[arg(default_value = "Hello")]
        text: String,

        /// Viseme as id:offset_ms (repeatable)
        #[arg(long = "viseme", value_parser = parse_viseme)]
        visemes: Vec<VisemeEvent>,

        /// Length of the synthesized audio in milliseconds
        #[arg(long)]
        audio_ms: Option<u64>,

        /// Make synthesis fail with this detail
        #[arg(long)]
        fail: Option<String>,
    },

    /// Cross-fade between two clips and print the weights per frame
    Blend {
        #[arg(default_value = "Idle")]
        from: String,

        #[arg(default_value = "Talk")]
        to: String,

        /// Blend duration in seconds
        #[arg(long, short, default_value = "2.0")]
        duration: f64,

        /// Print every Nth frame
        #[arg(long, default_value = "10")]
        every: usize,

        /// Step by elapsed time instead of a fixed frame fraction
        #[arg(long)]
        elapsed: bool,
    },

    /// Print the viseme id to morph target table
    Visemes,

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show {
        #[arg(long, short, value_enum, default_value = "toml")]
        format: Format,
    },
    /// Check the configuration for errors
    Validate,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Toml,
    Yaml,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?;

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.instance.log_level.to_lowercase()))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Simulate { text, visemes, audio_ms, fail } => {
            simulate(config, &text, visemes, audio_ms, fail).await?;
        }
        Commands::Blend { from, to, duration, every, elapsed } => {
            blend(config, &from, &to, duration, every, elapsed)?;
        }
        Commands::Visemes => {
            for (id, name) in VISEME_NAMES.iter().enumerate() {
                println!("{:>2}  {}", id, name);
            }
        }
        Commands::Config(cmd) => {
            handle_config_command(&config, cmd)?;
        }
    }

    Ok(())
}

async fn simulate(
    config: CliConfig,
    text: &str,
    visemes: Vec<VisemeEvent>,
    audio_ms: Option<u64>,
    fail: Option<String>,
) -> anyhow::Result<()> {
    config.validate()?;
    let scene = Scene::build(&config)?;
    scene.avatar.start_idle();

    let track = if visemes.is_empty() { demo_track() } else { visemes };
    let last_offset = track.iter().map(|v| v.offset_ms).fold(0.0, f64::max);
    let audio_ms = audio_ms.unwrap_or(last_offset as u64 + 150);

    let engine = match fail {
        Some(detail) => ScriptedTtsEngine::failing(track, detail),
        None => ScriptedTtsEngine::new(track, silent_wav(Duration::from_millis(audio_ms), 16_000)?),
    };
    let session = SynthesisSession::new(config.speech.clone(), Arc::new(engine))?;
    let speaker = Arc::new(Speaker::with_defaults(Arc::clone(&scene.avatar), session));

    let mut synthesis_events = speaker.session().subscribe();
    let turn = {
        let speaker = Arc::clone(&speaker);
        let text = text.to_string();
        tokio::spawn(async move { speaker.speak(&text).await })
    };

    let start = tokio::time::Instant::now();
    let mut last = Vec::new();
    while !turn.is_finished() {
        while let Ok(event) = synthesis_events.try_recv() {
            print_synthesis_event(&event);
        }

        let active = scene.active_targets();
        if active != last {
            println!(
                "{:>6} ms  {:?}  {}",
                start.elapsed().as_millis(),
                scene.avatar.state(),
                if active.is_empty() { "-".to_string() } else { active.join(", ") }
            );
            last = active;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    while let Ok(event) = synthesis_events.try_recv() {
        print_synthesis_event(&event);
    }

    let report = turn.await??;
    match &report.outcome {
        TurnOutcome::Spoken => println!("✅ Turn {} spoken", report.turn_id),
        other => println!("⚠️  Turn {} ended: {:?}", report.turn_id, other),
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn print_synthesis_event(event: &SynthesisEvent) {
    match event {
        SynthesisEvent::Started { chars, .. } => println!("   synthesis started ({} chars)", chars),
        SynthesisEvent::Viseme(v) => debug!("viseme {} at {} ms", v.id, v.offset_ms),
        SynthesisEvent::Completed { audio_bytes, .. } => {
            println!("   synthesis completed ({} bytes)", audio_bytes)
        }
        SynthesisEvent::Failed { detail, .. } => println!("   synthesis failed: {}", detail),
    }
}

fn blend(
    mut config: CliConfig,
    from: &str,
    to: &str,
    duration: f64,
    every: usize,
    elapsed: bool,
) -> anyhow::Result<()> {
    if elapsed {
        config.avatar.blend_timing = BlendTiming::ElapsedTime;
    }
    config.validate()?;
    let scene = Scene::build(&config)?;
    let animations = scene.avatar.animations();

    scene.avatar.blend(from, to, duration)?;
    info!("Stepping blend at {} fps", config.avatar.assumed_frame_rate);

    let frame = Duration::from_secs_f64(1.0 / f64::from(config.avatar.assumed_frame_rate));
    let every = every.max(1);
    let mut frames = 0usize;
    println!("{:>6}  {:>8}  {:>8}", "frame", from, to);

    loop {
        frames += 1;
        let progress = scene.avatar.tick(frame);
        let lib = animations.lock();
        let weight = |name: &str| lib.get(name).map(|c| c.weight()).unwrap_or(0.0);

        match progress {
            BlendProgress::Blending { .. } => {
                if frames % every == 0 {
                    println!("{:>6}  {:>8.3}  {:>8.3}", frames, weight(from), weight(to));
                }
            }
            BlendProgress::Finished => {
                let stopped = lib.get(from).map(|c| !c.is_playing()).unwrap_or(true);
                println!("{:>6}  {:>8}  {:>8.3}", frames, if stopped { "stopped" } else { "playing" }, weight(to));
                println!(
                    "✅ Blend finished after {} frames ({:.3}s)",
                    frames,
                    frames as f64 * frame.as_secs_f64()
                );
                return Ok(());
            }
            BlendProgress::Inactive => return Err(anyhow!("blend ended unexpectedly")),
        }
    }
}

fn handle_config_command(config: &CliConfig, cmd: ConfigCommands) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Show { format } => {
            let format = match format {
                Format::Json => ConfigFormat::Json,
                Format::Toml => ConfigFormat::Toml,
                Format::Yaml => ConfigFormat::Yaml,
            };
            let rendered = parla_core::render(config, format)?;
            println!("{}", rendered);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("✅ Configuration is valid");
        }
    }
    Ok(())
}
