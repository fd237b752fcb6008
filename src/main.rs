//! trackforge: prompt-to-music generation pipeline.
//!
//! Loads configuration and credentials once at startup, builds the engine
//! and the requested adapters, runs one pipeline invocation, and prints the
//! produced artifact paths.

use trackforge::cli::{Cli, DeviceArg};
use trackforge::config::{AppConfig, Credentials};
use trackforge::engine::{ensure_weights, Engine};
use trackforge::expander::{ExpanderConfig, PromptExpander};
use trackforge::pipeline::TrackPipeline;
use trackforge::types::TrackRequest;
use trackforge::voice::{VoiceConfig, VoiceSynthesizer};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_args();

    let mut config = AppConfig::from_env();
    if cli.model_dir.is_some() {
        config.model_path = cli.model_dir.clone();
    }
    if cli.output_dir.is_some() {
        config.output_path = cli.output_dir.clone();
    }
    if cli.device != DeviceArg::Auto {
        config.device = cli.device.to_device();
    }
    if cli.threads.is_some() {
        config.threads = cli.threads;
    }

    if let Some(problem) = config.validate() {
        return Err(format!("invalid configuration: {}", problem).into());
    }

    // Credentials are read exactly once, here; a missing key only matters
    // if the feature that needs it was requested.
    let credentials = Credentials::from_env();

    let spec = cli.model.to_spec();
    let model_dir = cli.model_directory();
    let output_dir = cli.output_directory();

    eprintln!("=== trackforge ===");
    eprintln!("Model: {} ({})", spec, spec.version());
    eprintln!("Duration: {}s", cli.duration);
    eprintln!("Output: {}", output_dir.display());
    if let Some(seed) = cli.seed {
        eprintln!("Seed: {}", seed);
    }
    eprintln!();

    ensure_weights(&model_dir, spec)?;

    let engine = Engine::load(&model_dir, spec, config.device, config.threads)?;
    eprintln!(
        "Loaded {} on {} ({}Hz output)",
        engine.version(),
        engine.device(),
        engine.sample_rate()
    );

    let mut pipeline = TrackPipeline::new(engine, &output_dir)
        .with_normalization(cli.normalization.to_strategy());

    if cli.expand {
        let key = credentials.require_openai()?;
        pipeline = pipeline.with_expander(PromptExpander::new(key, ExpanderConfig::default())?);
    }

    if cli.voice_text.is_some() {
        let key = credentials.require_eleven()?;
        pipeline = pipeline.with_synthesizer(VoiceSynthesizer::new(key, VoiceConfig::default())?);
    }

    let mut request = TrackRequest::new(cli.intent.clone(), cli.duration);
    if cli.expand {
        request = request.with_expansion();
    }
    if let Some(text) = cli.voice_text.clone() {
        request = request.with_voice_text(text);
    }
    if let Some(seed) = cli.seed {
        request = request.with_seed(seed);
    }

    let outcome = pipeline.run(&request)?;

    eprintln!();
    eprintln!("Prompt: \"{}\"", outcome.prompt);
    println!("{}", outcome.music.path.display());
    if let Some(voice) = &outcome.voice {
        println!("{}", voice.path.display());
    }

    Ok(())
}
