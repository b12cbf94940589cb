use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use clap::Parser;
use qr_viewfinder::capture::{CaptureSource, FacingMode};
use qr_viewfinder::capture::still::StillImageSource;
use qr_viewfinder::config::ScannerConfig;
use qr_viewfinder::decode::InversionAttempts;
use qr_viewfinder::notify::TracingNotifier;
use qr_viewfinder::Viewfinder;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Scan a QR code from the camera or from still images, freeze the scan band
/// and save it as a PNG.
#[derive(Parser, Debug)]
#[command(name = "viewfinder")]
#[command(about = "📷 Scan a QR code and save the frozen scan band as PNG")]
#[command(long_about = "Scan a QR code from the camera or from still images. The first code found \
in the centered scan band is printed and the band is saved as a PNG.")]
struct Args {
    /// Still images played back as video frames, in order (last one repeats)
    #[arg(short, long = "image", value_name = "PATH")]
    images: Vec<PathBuf>,

    /// Scan the live camera (requires the `camera` feature)
    #[arg(long, conflicts_with = "images")]
    camera: bool,

    /// Camera device index instead of picking by facing mode
    #[arg(long, requires = "camera")]
    camera_index: Option<u32>,

    /// Requested camera
    #[arg(long, default_value = "environment", help = "Camera facing: environment (rear) or user (front)")]
    facing: FacingMode,

    /// Directory the capture is saved into
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// File name of the saved capture
    #[arg(long, default_value = "qr-scan.png")]
    file_name: String,

    /// Frame callbacks per second
    #[arg(short = 'f', long, default_value_t = 60)]
    fps: u32,

    /// Ideal stream width
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Ideal stream height
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Decoder polarity passes
    #[arg(long, default_value = "dont-invert",
          help = "Inversion mode: dont-invert, only-invert, attempt-both, invert-first")]
    invert: InversionAttempts,

    /// Give up after this long: 30s, 2m, 1h
    #[arg(short, long)]
    timeout: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let timeout = args.timeout.as_deref().map(parse_duration).transpose()?;

    let config = ScannerConfig::new(
        args.facing,
        args.width,
        args.height,
        args.fps,
        args.invert,
        args.file_name.clone(),
    );
    config.validate()?;

    let mounted = Viewfinder::builder()
        .options(config.to_scan_options())
        .shared_source(select_source(&args)?)
        .notifier(Arc::new(TracingNotifier))
        .build()?
        .mount();

    let captured = tokio::select! {
        image = mounted.captured() => image,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            None
        }
        _ = wait_for(timeout) => {
            info!("Timed out");
            None
        }
    };

    let saved = match &captured {
        Some(_) => Some(mounted.download(&args.output_dir)?),
        None => None,
    };
    let report = mounted.shutdown().await?;

    let Some(image) = captured else {
        bail!("No QR code captured after {} frames", report.stats.frames_sampled);
    };

    if args.json {
        let out = serde_json::json!({
            "payload": image.payload(),
            "inverted": image.code.inverted,
            "width": image.width,
            "height": image.height,
            "path": saved.as_ref().map(|p| p.display().to_string()),
            "frames": report.stats.frames_sampled,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", image.payload());
        if let Some(path) = saved {
            eprintln!("Saved {}", path.display());
        }
    }
    Ok(())
}

fn select_source(args: &Args) -> Result<Arc<dyn CaptureSource>> {
    if args.camera {
        #[cfg(feature = "camera")]
        return Ok(Arc::new(qr_viewfinder::capture::camera::CameraSource::new(
            args.camera_index,
        )));
        #[cfg(not(feature = "camera"))]
        return Err(anyhow!(
            "Camera capture not available - enable with: cargo run --features camera"
        ));
    }
    if args.images.is_empty() {
        bail!("Nothing to scan: pass --image <PATH> or --camera");
    }
    Ok(Arc::new(StillImageSource::from_paths(args.images.clone())))
}

async fn wait_for(timeout: Option<Duration>) {
    match timeout {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending().await,
    }
}

/// Parse duration string like "30s", "2m", "1h"
fn parse_duration(duration: &str) -> Result<Duration> {
    if let Ok(seconds) = duration.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    let len = duration.len();
    if len < 2 {
        return Err(anyhow!("Invalid duration format: {}", duration));
    }

    let (num_str, unit) = duration.split_at(len - 1);
    let num: u64 = num_str
        .parse()
        .map_err(|_| anyhow!("Invalid number in duration: {}", num_str))?;

    match unit {
        "s" => Ok(Duration::from_secs(num)),
        "m" => Ok(Duration::from_secs(num * 60)),
        "h" => Ok(Duration::from_secs(num * 3600)),
        _ => Err(anyhow!(
            "Invalid duration unit: {}. Use 's' for seconds, 'm' for minutes, 'h' for hours",
            unit
        )),
    }
}
