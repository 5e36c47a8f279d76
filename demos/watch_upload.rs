//! Upload one file and print every state the controller goes through.
//!
//! ```bash
//! GHIBLI_API_URL=http://localhost:5000 cargo run --example watch_upload -- cat.jpg 70 balanced
//! ```

use ghibli_client::{
    Config, MediaFile, Outcome, Phase, Presenter, QualityPreset, TransformSettings,
    UploadController, View, spawn_presenter,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct TerminalPresenter;

impl Presenter for TerminalPresenter {
    fn render(&self, view: &View) {
        match view.phase {
            Phase::Idle => {}
            Phase::Validating => println!("Checking file..."),
            Phase::Uploading => println!(
                "Uploading {}. {}",
                view.media_label.unwrap_or("file"),
                view.processing_message.unwrap_or_default()
            ),
            Phase::Polling => println!("{}%", view.progress),
            Phase::Result => {
                if let Some(result) = &view.result {
                    println!(
                        "Done: {} (save as {})",
                        result.media_url.as_deref().unwrap_or("<no url>"),
                        result.download_name
                    );
                    if let Some(secs) = result.processing_seconds {
                        println!("Processed in {secs} seconds");
                    }
                }
            }
            Phase::Error => eprintln!("Error: {}", view.error.as_deref().unwrap_or_default()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ghibli_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: watch_upload <file> [strength 0-100] [fast|balanced|quality]");
        std::process::exit(2);
    };
    let mut settings = TransformSettings::default();
    if let Some(strength) = args.next() {
        settings.strength_percent = strength.parse()?;
    }
    if let Some(quality) = args.next() {
        settings.quality = quality.parse::<QualityPreset>()?;
    }

    let controller = UploadController::new(Config::from_env()?)?;
    let presenter = spawn_presenter(&controller, TerminalPresenter);

    let file = MediaFile::from_path(&path).await?;
    let outcome = controller.run(file, settings).await?;

    drop(controller);
    presenter.await?;

    match outcome {
        Outcome::Completed(_) => Ok(()),
        Outcome::Failed(_) | Outcome::Cancelled => std::process::exit(1),
    }
}
