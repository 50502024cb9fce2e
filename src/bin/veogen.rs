//! CLI for veogen - prompt, generate and download Veo videos.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use veogen::{
    AspectRatio, GeminiClientBuilder, JobOutcome, PersonPolicy, PollPolicy, PromptSource,
    Resolution, Settings, TextModel, VideoConfig, VideoJobDriver, VideoModel,
};

#[derive(Parser)]
#[command(name = "veogen")]
#[command(about = "Write a prompt with Gemini (or take one from VIDEO_PROMPT) and render it with Veo")]
#[command(version)]
struct Cli {
    /// Where the prompt comes from (default: env when VIDEO_PROMPT is set, else dynamic)
    #[arg(long, value_enum)]
    prompt_source: Option<PromptSourceArg>,

    /// Use this prompt verbatim
    #[arg(long, conflicts_with = "prompt_source")]
    prompt: Option<String>,

    /// Directory the videos are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Aspect ratio (16:9, 16:10, 9:16)
    #[arg(long, default_value = "9:16")]
    aspect_ratio: AspectRatio,

    /// Number of videos to generate (1-4)
    #[arg(short = 'n', long, default_value_t = 1)]
    count: u8,

    /// Video length in seconds (5-8)
    #[arg(short, long, default_value_t = 8)]
    duration: u8,

    /// Resolution (480p, 720p, 1080p)
    #[arg(long, default_value = "720p")]
    resolution: Resolution,

    /// Person generation policy (allow_all, allow_adult, dont_allow)
    #[arg(long, default_value = "allow_all")]
    person_policy: PersonPolicy,

    /// Veo model
    #[arg(long, value_enum, default_value = "veo3-fast")]
    model: VideoModelArg,

    /// Gemini model used to write the prompt
    #[arg(long, value_enum, default_value = "gemini-1.5-flash")]
    text_model: TextModelArg,

    /// Seconds between status checks
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval: u64,

    /// Give up after this many status checks (default: wait forever)
    #[arg(long)]
    max_polls: Option<u32>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PromptSourceArg {
    /// Ask Gemini to write the prompt
    Dynamic,
    /// Read VIDEO_PROMPT
    Env,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VideoModelArg {
    #[value(name = "veo3-fast")]
    Veo3Fast,
    #[value(name = "veo3")]
    Veo3,
    #[value(name = "veo3.1-preview")]
    Veo31Preview,
}

impl From<VideoModelArg> for VideoModel {
    fn from(arg: VideoModelArg) -> Self {
        match arg {
            VideoModelArg::Veo3Fast => VideoModel::Veo3Fast,
            VideoModelArg::Veo3 => VideoModel::Veo3,
            VideoModelArg::Veo31Preview => VideoModel::Veo31Preview,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TextModelArg {
    #[value(name = "gemini-1.5-flash")]
    Gemini15Flash,
    #[value(name = "gemini-2.5-flash")]
    Gemini25Flash,
}

impl From<TextModelArg> for TextModel {
    fn from(arg: TextModelArg) -> Self {
        match arg {
            TextModelArg::Gemini15Flash => TextModel::Gemini15Flash,
            TextModelArg::Gemini25Flash => TextModel::Gemini25Flash,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let settings = Settings::from_env();
    run(cli, settings).await
}

fn init_tracing() {
    // Progress messages are part of the user-facing output, so they go to stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("veogen=info")),
        )
        .with_writer(std::io::stdout)
        .with_target(false)
        .without_time()
        .init();
}

fn prompt_source(cli: &Cli, settings: &Settings) -> PromptSource {
    if let Some(prompt) = &cli.prompt {
        return PromptSource::Literal(prompt.clone());
    }
    match cli.prompt_source {
        Some(PromptSourceArg::Dynamic) => PromptSource::dynamic(),
        Some(PromptSourceArg::Env) => PromptSource::environment(),
        None if settings.video_prompt.is_some() => PromptSource::environment(),
        None => PromptSource::dynamic(),
    }
}

async fn run(cli: Cli, settings: Settings) -> anyhow::Result<()> {
    let config = VideoConfig::default()
        .with_aspect_ratio(cli.aspect_ratio)
        .with_video_count(cli.count)
        .with_duration(cli.duration)
        .with_resolution(cli.resolution)
        .with_person_policy(cli.person_policy);
    config.validate()?;

    let mut policy = PollPolicy::every(Duration::from_secs(cli.poll_interval));
    if let Some(max) = cli.max_polls {
        policy = policy.with_max_attempts(max);
    }

    let client = GeminiClientBuilder::from_settings(&settings)
        .text_model(cli.text_model.into())
        .video_model(cli.model.into())
        .build()?;

    let source = prompt_source(&cli, &settings);
    let Some(prompt) = source.resolve(&client).await? else {
        report(&JobOutcome::MissingInput, cli.json)?;
        return Ok(());
    };
    if matches!(source, PromptSource::Dynamic { .. }) && !cli.json {
        println!("Generated prompt:\n{prompt}");
    }

    let mut driver = VideoJobDriver::new(client)
        .with_config(config)
        .with_poll_policy(policy)
        .with_output_dir(&cli.output_dir);
    let outcome = driver.generate(&prompt).await?;

    report(&outcome, cli.json)
}

fn report(outcome: &JobOutcome, json_output: bool) -> anyhow::Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    match outcome {
        JobOutcome::MissingInput => {
            println!("No prompt provided. Set VIDEO_PROMPT or pass --prompt.");
        }
        JobOutcome::QuotaExceeded { message } => {
            println!("Quota exceeded, no video generated: {message}");
        }
        JobOutcome::NoOutput { reason } => {
            println!("Error: {reason}.");
        }
        JobOutcome::Saved { videos } => {
            println!("Generated {} video(s).", videos.len());
            for video in videos {
                println!(
                    "Saved: {} ({} bytes)",
                    video.path.display(),
                    video.size_bytes
                );
            }
        }
    }
    Ok(())
}
