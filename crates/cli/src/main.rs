//! Binary entry point for the reel generator.

use anyhow::Result;
use autoreel_core::config::ReelConfig;
use autoreel_core::llm::openai::OpenAiChat;
use autoreel_core::reel::{make_reel, Collaborators};
use autoreel_core::tts::elevenlabs::ElevenLabsSynthesizer;
use autoreel_core::tts::{PrerecordedNarration, SpeechSynthesizer};
use autoreel_core::video::Ffmpeg;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command line options for the binary.
#[derive(Parser)]
#[command(name = "autoreel", about = "Turn a narration script into a captioned vertical reel")]
struct Cli {
    /// Narration script to voice and caption.
    #[arg(long, default_value = "src/assets/script.txt")]
    script: PathBuf,

    /// JSON file overriding the default settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory that receives the video, subtitles and metadata.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Looping background clip.
    #[arg(long)]
    background: Option<PathBuf>,

    /// Background music track.
    #[arg(long, conflicts_with = "no_music")]
    music: Option<PathBuf>,

    /// Skip background music entirely.
    #[arg(long)]
    no_music: bool,

    /// Caption font (TrueType or OpenType).
    #[arg(long)]
    font: Option<PathBuf>,

    /// Expected narration length in seconds, used to time captions.
    #[arg(long)]
    target_duration: Option<f64>,

    /// Seed for picking the background clip window.
    #[arg(long)]
    seed: Option<u64>,

    /// Use this audio file as narration instead of calling text-to-speech.
    #[arg(long)]
    narration: Option<PathBuf>,

    /// Enable verbose debug and trace logs.
    #[arg(long)]
    debug: bool,
}

impl Cli {
    /// Layer command line overrides on top of `config`.
    fn apply(&self, config: &mut ReelConfig) {
        if let Some(dir) = &self.out_dir {
            config.output_dir = dir.clone();
        }
        if let Some(bg) = &self.background {
            config.background_video = bg.clone();
        }
        if self.no_music {
            config.background_music = None;
        } else if let Some(music) = &self.music {
            config.background_music = Some(music.clone());
        }
        if let Some(font) = &self.font {
            config.font = font.clone();
        }
        if let Some(secs) = self.target_duration {
            config.target_duration_secs = secs;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(narration) = &self.narration {
            config.narration_override = Some(narration.clone());
        }
    }
}

/// Text-to-speech backend for `config`. ElevenLabs credentials are only
/// needed when no narration file was given.
fn synthesizer(config: &ReelConfig) -> Result<Box<dyn SpeechSynthesizer>> {
    if config.narration_override.is_some() {
        return Ok(Box::new(PrerecordedNarration));
    }
    Ok(Box::new(ElevenLabsSynthesizer::new(config.elevenlabs.clone())?))
}

/// Application entry point which parses CLI args and performs actions.
/// This function should initialize logging and delegate to the core library.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = if cli.debug {
        EnvFilter::default()
            .add_directive("autoreel=trace".parse()?)
            .add_directive("autoreel_core=trace".parse()?)
            .add_directive("info".parse()?)
    } else {
        EnvFilter::default()
            .add_directive("autoreel=info".parse()?)
            .add_directive("autoreel_core=info".parse()?)
            .add_directive("warn".parse()?)
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    dotenvy::dotenv().ok();

    let mut config = match &cli.config {
        Some(path) => ReelConfig::load(path)?,
        None => ReelConfig::default(),
    };
    cli.apply(&mut config);

    let tts = synthesizer(&config)?;
    let llm = OpenAiChat::new(config.openai.clone())?;
    let services = Collaborators {
        tts: tts.as_ref(),
        llm: &llm,
        compositor: &Ffmpeg,
    };
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let out = make_reel(&cli.script, &config, &services, &mut rng).await?;
    info!(
        "done: {} ({:.1}s), metadata in {}",
        out.video.display(),
        out.duration_secs,
        out.metadata_path.display()
    );
    Ok(())
}
