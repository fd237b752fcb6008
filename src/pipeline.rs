//! Pipeline orchestrator.
//!
//! Sequences the run: expand the intent if requested, generate the waveform,
//! encode it to disk, and synthesize the optional voice-over. A run is
//! strictly sequential and terminal on its first failure; the failing stage
//! rides along in the returned [`RunError`], and files written before the
//! failure are left in place.

use std::path::PathBuf;

use log::info;

use crate::audio::{write_waveform, Normalization};
use crate::config::{ELEVEN_KEY_VAR, OPENAI_KEY_VAR};
use crate::engine::Engine;
use crate::error::{PipelineError, Result, RunError, Stage};
use crate::expander::PromptExpander;
use crate::types::{compute_artifact_id, AudioArtifact, GenerationRequest, TrackRequest, Waveform};
use crate::voice::{self, VoiceSynthesizer};

/// The generation seam.
///
/// The orchestrator talks to the engine through this trait so the engine can
/// be handed in as a value (no hidden process-wide state) and replaced in
/// tests where model weights are unavailable.
pub trait Generator {
    /// Generates a waveform for an immutable request.
    fn generate(&mut self, request: &GenerationRequest) -> Result<Waveform>;

    /// Output sample rate in Hz, fixed by the loaded model.
    fn sample_rate(&self) -> u32;

    /// Maximum duration in seconds the generator accepts.
    fn max_duration_sec(&self) -> u32;

    /// Model version string, used for artifact naming.
    fn version(&self) -> &str;
}

impl Generator for Engine {
    fn generate(&mut self, request: &GenerationRequest) -> Result<Waveform> {
        Engine::generate(self, request)
    }

    fn sample_rate(&self) -> u32 {
        Engine::sample_rate(self)
    }

    fn max_duration_sec(&self) -> u32 {
        Engine::max_duration_sec(self)
    }

    fn version(&self) -> &str {
        Engine::version(self)
    }
}

/// Result of a successful run.
#[derive(Debug)]
pub struct RunOutcome {
    /// The prompt the music was generated from (expanded or raw intent).
    pub prompt: String,

    /// The music track artifact.
    pub music: AudioArtifact,

    /// The voice-over artifact, when one was requested.
    pub voice: Option<AudioArtifact>,
}

/// One configured pipeline.
///
/// All collaborators are injected: the generator, the optional expander and
/// synthesizer, the normalization strategy, and the output directory. A
/// pipeline owns its generator exclusively, so concurrent runs need their
/// own pipeline each.
pub struct TrackPipeline<G> {
    generator: G,
    expander: Option<PromptExpander>,
    synthesizer: Option<VoiceSynthesizer>,
    normalization: Normalization,
    output_dir: PathBuf,
}

impl<G: Generator> TrackPipeline<G> {
    /// Creates a pipeline with no expander or synthesizer and the default
    /// normalization strategy.
    pub fn new(generator: G, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            generator,
            expander: None,
            synthesizer: None,
            normalization: Normalization::default(),
            output_dir: output_dir.into(),
        }
    }

    /// Attaches a prompt expander.
    pub fn with_expander(mut self, expander: PromptExpander) -> Self {
        self.expander = Some(expander);
        self
    }

    /// Attaches a voice synthesizer.
    pub fn with_synthesizer(mut self, synthesizer: VoiceSynthesizer) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Overrides the normalization strategy.
    pub fn with_normalization(mut self, strategy: Normalization) -> Self {
        self.normalization = strategy;
        self
    }

    /// Runs the pipeline for one request.
    ///
    /// Stage order: expand (skipped when not requested), generate, encode,
    /// voice (skipped when no voice text). The first failure aborts the run
    /// with its stage attached; nothing already written is removed.
    pub fn run(&mut self, request: &TrackRequest) -> std::result::Result<RunOutcome, RunError> {
        // Expand: the raw intent becomes the prompt when expansion is off.
        let prompt = if request.expand {
            let expander = self.expander.as_ref().ok_or_else(|| {
                RunError::at(Stage::Expand, PipelineError::missing_credential(OPENAI_KEY_VAR))
            })?;
            expander
                .expand(&request.intent)
                .map_err(|e| RunError::at(Stage::Expand, e))?
        } else {
            request.intent.clone()
        };

        info!("prompt ready: \"{}\"", prompt);

        // Generate.
        let generation = GenerationRequest {
            prompt: prompt.clone(),
            duration_sec: request.duration_sec,
            seed: request.seed,
        };
        generation
            .validate(self.generator.max_duration_sec())
            .map_err(|e| RunError::at(Stage::Generate, e))?;

        let waveform = self
            .generator
            .generate(&generation)
            .map_err(|e| RunError::at(Stage::Generate, e))?;

        // Encode. The artifact name is deterministic in the generation
        // parameters, so re-running a request overwrites its own output.
        let artifact_id = compute_artifact_id(
            &prompt,
            request.seed.unwrap_or_default(),
            request.duration_sec,
            self.generator.version(),
        );
        let music_path = self.output_dir.join(format!("track_{}.wav", artifact_id));

        let music = write_waveform(&waveform, &music_path, self.normalization)
            .map_err(|e| RunError::at(Stage::Encode, e))?;
        info!("music track written to {}", music.path.display());

        // Voice: side branch, only when requested.
        let voice = match &request.voice_text {
            None => None,
            Some(text) => {
                let synthesizer = self.synthesizer.as_ref().ok_or_else(|| {
                    RunError::at(Stage::Voice, PipelineError::missing_credential(ELEVEN_KEY_VAR))
                })?;
                let audio = synthesizer
                    .synthesize(text)
                    .map_err(|e| RunError::at(Stage::Voice, e))?;
                let voice_path = self.output_dir.join(format!("voice_{}.mp3", artifact_id));
                let artifact = voice::save(&audio, &voice_path)
                    .map_err(|e| RunError::at(Stage::Voice, e))?;
                info!("voice-over written to {}", artifact.path.display());
                Some(artifact)
            }
        };

        Ok(RunOutcome {
            prompt,
            music,
            voice,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    /// Deterministic generator standing in for a loaded engine.
    struct StubGenerator {
        sample_rate: u32,
        calls: usize,
    }

    impl StubGenerator {
        fn new() -> Self {
            Self {
                sample_rate: 32000,
                calls: 0,
            }
        }
    }

    impl Generator for StubGenerator {
        fn generate(&mut self, request: &GenerationRequest) -> Result<Waveform> {
            request.validate(self.max_duration_sec())?;
            self.calls += 1;
            let frames = request.duration_sec as usize * self.sample_rate as usize;
            let samples = (0..frames)
                .map(|i| 0.1 * (i as f32 * 0.01).sin())
                .collect();
            Ok(Waveform::mono(samples, self.sample_rate))
        }

        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn max_duration_sec(&self) -> u32 {
            120
        }

        fn version(&self) -> &str {
            "stub-v1"
        }
    }

    #[test]
    fn run_without_voice_produces_one_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = TrackPipeline::new(StubGenerator::new(), dir.path());

        let request = TrackRequest::new("lofi beats", 2);
        let outcome = pipeline.run(&request).unwrap();

        assert_eq!(outcome.prompt, "lofi beats");
        assert!(outcome.voice.is_none());
        assert!(outcome.music.path.exists());

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn waveform_length_matches_duration() {
        let mut generator = StubGenerator::new();
        let request = GenerationRequest::new("ambient pads", 3);
        let waveform = generator.generate(&request).unwrap();
        let expected = 3 * generator.sample_rate() as usize;
        assert_eq!(waveform.samples.len(), expected);
        assert_eq!(waveform.sample_rate, generator.sample_rate());
    }

    #[test]
    fn zero_duration_fails_before_any_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = TrackPipeline::new(StubGenerator::new(), dir.path());

        let request = TrackRequest::new("lofi beats", 0);
        let err = pipeline.run(&request).unwrap_err();

        assert_eq!(err.stage, Stage::Generate);
        assert_eq!(err.cause.code, ErrorCode::InvalidDuration);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn runs_are_independent() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let request = TrackRequest::new("jazz piano", 1).with_seed(42);

        let mut first = TrackPipeline::new(StubGenerator::new(), dir_a.path());
        let mut second = TrackPipeline::new(StubGenerator::new(), dir_b.path());

        let a = first.run(&request).unwrap();
        let b = second.run(&request).unwrap();

        assert!(a.music.path.exists());
        assert!(b.music.path.exists());
        assert_ne!(a.music.path, b.music.path);
        // Deterministic naming: same request, same filename.
        assert_eq!(a.music.path.file_name(), b.music.path.file_name());
    }

    #[test]
    fn expansion_without_expander_fails_at_expand() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = TrackPipeline::new(StubGenerator::new(), dir.path());

        let request = TrackRequest::new("lofi beats", 2).with_expansion();
        let err = pipeline.run(&request).unwrap_err();

        assert_eq!(err.stage, Stage::Expand);
        assert_eq!(err.cause.code, ErrorCode::MissingCredential);
    }

    #[test]
    fn voice_without_synthesizer_fails_after_music_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = TrackPipeline::new(StubGenerator::new(), dir.path());

        let request = TrackRequest::new("lofi beats", 2).with_voice_text("Welcome back.");
        let err = pipeline.run(&request).unwrap_err();

        assert_eq!(err.stage, Stage::Voice);
        assert_eq!(err.cause.code, ErrorCode::MissingCredential);

        // The music track was already encoded and stays in place.
        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].starts_with("track_"));
    }

    #[test]
    fn generator_is_only_called_once_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = TrackPipeline::new(StubGenerator::new(), dir.path());

        pipeline.run(&TrackRequest::new("one", 1)).unwrap();
        assert_eq!(pipeline.generator.calls, 1);

        pipeline.run(&TrackRequest::new("two", 1)).unwrap();
        assert_eq!(pipeline.generator.calls, 2);
    }
}
