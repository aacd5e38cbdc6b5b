//! LeafScan command-line client.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use leafscan_client::{ClientConfig, InferenceClient};
use leafscan_detector::live::open_camera;
use leafscan_detector::{telemetry, LiveConfig, LiveDetector, StillImageDetector};
use leafscan_media::{Frame, RasterCanvas};
use leafscan_models::{CropRect, PixelRect};

#[derive(Parser, Debug)]
#[command(name = "leafscan", author, version, about)]
struct Cli {
    /// Inference service base URL.
    #[arg(long, env = "LEAFSCAN_API_URL", global = true)]
    api_url: Option<String>,

    /// TrueType font used for box labels.
    #[arg(long, env = "LEAFSCAN_FONT", global = true)]
    font: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a single leaf photo.
    Predict {
        /// Image file to submit.
        image: PathBuf,
        /// Crop rectangle in preview coordinates: x,y,width,height.
        #[arg(long, value_parser = parse_crop)]
        crop: Option<CropRect>,
        /// Crop to the default centred rectangle.
        #[arg(long, conflicts_with = "crop")]
        auto_crop: bool,
        /// Write the annotated preview here (PNG or JPEG).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run live detection on a camera.
    Live {
        /// Camera source: device path, `file://<image>` or `stub://`.
        #[arg(long)]
        camera: Option<String>,
        /// Stop after this many seconds instead of waiting for Ctrl-C.
        #[arg(long)]
        duration: Option<u64>,
        /// Save the last rendered overlay here before stopping.
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
}

fn parse_crop(s: &str) -> Result<CropRect, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("{p}: {e}")))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        [x, y, width, height] if *width > 0.0 && *height > 0.0 => {
            Ok(CropRect::new(PixelRect::new(*x, *y, *width, *height)))
        }
        _ => Err("expected x,y,width,height with positive width and height".to_string()),
    }
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    telemetry::init_tracing();

    let cli = Cli::parse();

    if let Err(e) = telemetry::init_metrics() {
        warn!("Failed to start metrics exporter: {}", e);
    }

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut client_config = ClientConfig::from_env();
    if let Some(url) = cli.api_url {
        client_config.base_url = url;
    }
    let client = Arc::new(InferenceClient::new(client_config)?);

    let font = cli
        .font
        .as_deref()
        .map(RasterCanvas::load_font)
        .transpose()
        .context("loading label font")?;

    match cli.command {
        Command::Predict {
            image,
            crop,
            auto_crop,
            output,
            json,
        } => {
            let mut detector = StillImageDetector::new(client);
            if let Some(font) = font {
                detector = detector.with_font(font);
            }

            let crop = if auto_crop {
                let frame = Frame::open(&image)?;
                Some(CropRect::initial(detector.display_size(frame.size())))
            } else {
                crop
            };

            let outcome = detector.detect_file(&image, crop.as_ref()).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.summary())?);
            } else {
                print_outcome(&outcome);
            }

            if let Some(path) = output {
                outcome.annotated.save(&path)?;
                info!(path = %path.display(), "Saved annotated image");
            }
        }
        Command::Live {
            camera,
            duration,
            snapshot,
        } => {
            let mut config = LiveConfig::from_env();
            if let Some(camera) = camera {
                config.camera = camera;
            }

            if !client.health_check().await? {
                warn!(url = %client.config().base_url, "Inference service not reachable, continuing anyway");
            }

            let mut canvas = RasterCanvas::new(0, 0);
            if let Some(font) = font {
                canvas = canvas.with_font(font);
            }

            let camera = open_camera(&config.camera)?;
            let detector = LiveDetector::new(camera, client, canvas, config)?;
            detector.start().await?;

            run_until_stopped(&detector, duration.map(Duration::from_secs)).await;

            if let Some(path) = snapshot {
                save_snapshot(&detector, &path)?;
            }
            detector.stop();
            info!("Live detection finished");
        }
    }

    Ok(())
}

async fn run_until_stopped(detector: &LiveDetector<RasterCanvas>, duration: Option<Duration>) {
    let deadline = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut report = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Received shutdown signal");
                break;
            }
            _ = &mut deadline => break,
            _ = report.tick() => {
                let status = detector.status();
                info!(
                    fps = status.render_rate,
                    detections = status.detection_count(),
                    processing_time_ms = status.processing_time_ms,
                    error = status.last_error.as_deref().unwrap_or(""),
                    "Live status"
                );
                for prediction in &status.detections {
                    info!("  {}", prediction.label());
                }
            }
        }
    }
}

fn save_snapshot(detector: &LiveDetector<RasterCanvas>, path: &Path) -> Result<()> {
    let canvas = detector.canvas();
    let (width, height) = canvas.image().dimensions();
    if width == 0 || height == 0 {
        return Err(anyhow!("no frame rendered yet, snapshot not written"));
    }
    canvas.save(path)?;
    info!(path = %path.display(), "Saved live snapshot");
    Ok(())
}

fn print_outcome(outcome: &leafscan_detector::StillOutcome) {
    println!("Detection results ({} ms)", outcome.elapsed.as_millis());
    if outcome.result.is_empty() {
        println!("  No disease detected");
    }
    for prediction in &outcome.result {
        println!("  {}", prediction.label());
    }
    if let Some(guidance) = outcome.guidance {
        println!();
        println!("{}", guidance.title);
        for treatment in guidance.treatments {
            println!("  - {}", treatment);
        }
    }
}
