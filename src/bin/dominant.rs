use anyhow::{Context, Result, bail};
use clap::Parser;
use dominant_colors::stream::{FrameResponse, run_session};
use dominant_colors::{
    BATCH_NUM_COLORS, ColorExtractor, ExtractorConfig, STREAM_NUM_COLORS, TracingSink, encode_hex,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

/// Extract dominant colors from images with k-means clustering.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// One or more input image paths
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Number of colors to extract per image
    #[arg(short = 'k', long, default_value_t = BATCH_NUM_COLORS)]
    num_colors: usize,

    /// JSON config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Longest side of the image used for clustering
    #[arg(long)]
    max_dimension: Option<u32>,

    /// k-means seed
    #[arg(long)]
    seed: Option<u64>,

    /// k-means restarts; the best-scoring run is kept
    #[arg(long)]
    runs: Option<u32>,

    /// Print one JSON object per image
    #[arg(long)]
    json: bool,

    /// Also print each cluster's pixel population
    #[arg(short, long)]
    verbose: bool,

    /// Treat inputs as consecutive frames of one streaming session
    /// (3 colors per frame, one JSON line per frame)
    #[arg(long)]
    stream: bool,

    /// Log level written to stderr
    #[arg(long, default_value = "warn")]
    log_level: Level,
}

fn load_config(args: &Args) -> Result<ExtractorConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            ExtractorConfig::from_json(&text).context("invalid config file")?
        }
        None => ExtractorConfig::default(),
    };

    if let Some(max_dimension) = args.max_dimension {
        config.max_dimension = max_dimension;
    }
    if let Some(seed) = args.seed {
        config.cluster.seed = seed;
    }
    if let Some(runs) = args.runs {
        config.cluster.runs = runs;
    }
    config.validate().context("invalid option")?;
    Ok(config)
}

fn extract_files(extractor: &ColorExtractor, args: &Args) -> Result<()> {
    let mut failures = 0usize;

    for input in &args.inputs {
        let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;

        match extractor.extract_clusters(&bytes, args.num_colors) {
            Ok(clusters) => {
                let colors: Vec<String> =
                    clusters.iter().map(|c| encode_hex(&c.centroid)).collect();
                if args.json {
                    let mut line = serde_json::json!({
                        "file": input.display().to_string(),
                        "dominant_colors": colors,
                    });
                    if args.verbose {
                        line["populations"] =
                            clusters.iter().map(|c| c.population).collect::<Vec<_>>().into();
                    }
                    println!("{line}");
                } else if args.verbose {
                    println!("{}:", input.display());
                    for (color, cluster) in colors.iter().zip(&clusters) {
                        println!("  {color}  {} px", cluster.population);
                    }
                } else {
                    println!("{}: {}", input.display(), colors.join(" "));
                }
            }
            Err(err) => {
                failures += 1;
                eprintln!("{}: {err}", input.display());
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} images failed", args.inputs.len());
    }
    Ok(())
}

fn stream_files(extractor: ColorExtractor, args: &Args) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .context("building runtime")?;

    let frames: Vec<Vec<u8>> = args
        .inputs
        .iter()
        .map(|p| fs::read(p).with_context(|| format!("reading {}", p.display())))
        .collect::<Result<_>>()?;

    runtime.block_on(async move {
        let (frame_tx, frame_rx) = mpsc::channel(1);
        let (response_tx, mut response_rx) = mpsc::channel::<FrameResponse>(1);

        let session = tokio::spawn(run_session(
            Arc::new(extractor),
            frame_rx,
            response_tx,
            STREAM_NUM_COLORS,
        ));
        let feeder = tokio::spawn(async move {
            for frame in frames {
                if frame_tx.send(frame).await.is_err() {
                    break;
                }
            }
        });

        while let Some(response) = response_rx.recv().await {
            println!("{}", response.to_json()?);
        }

        feeder.await.context("frame feeder failed")?;
        let summary = session.await.context("session task failed")?;
        info!(frames = summary.frames, failed = summary.failed, "stream finished");
        Ok::<(), anyhow::Error>(())
    })
}

fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("installing logger")?;

    let config = load_config(&args)?;
    let extractor = ColorExtractor::new(config, Arc::new(TracingSink));

    if args.stream {
        stream_files(extractor, &args)
    } else {
        extract_files(&extractor, &args)
    }
}
