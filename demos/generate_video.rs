//! Basic video generation example.
//!
//! Run with: `cargo run --example generate_video`
//!
//! Requires `GEMINI_API_KEY` environment variable.

use veogen::{GeminiClient, JobOutcome, VideoConfig, VideoJobDriver};

#[tokio::main]
async fn main() -> veogen::Result<()> {
    let client = GeminiClient::builder().build()?;

    let config = VideoConfig::default().with_duration(5);
    let mut driver = VideoJobDriver::new(client).with_config(config);

    println!("Generating video (this may take a few minutes)...");
    match driver
        .generate("Ocean waves crashing on a rocky shore at sunset")
        .await?
    {
        JobOutcome::Saved { videos } => {
            for video in videos {
                println!("Saved {} ({} bytes)", video.path.display(), video.size_bytes);
            }
        }
        other => println!("Nothing saved: {other:?}"),
    }

    Ok(())
}
