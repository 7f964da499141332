use clap::{Parser, Subcommand};
use cli::{load_settings, save_manifest, BatchConfig, JobConfig};
use color_eyre::eyre::{eyre, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sticker::{Mode, PipelineSettings, StickerPipeline};
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn a single photo into sticker artifacts
    Generate {
        /// Path to the input photo
        #[arg(short, long)]
        input: PathBuf,
        /// Output mode: cutout, sticker, badge or labeled
        #[arg(short, long, default_value = "sticker")]
        mode: String,
        /// Badge theme (unknown names fall back to the default theme)
        #[arg(long)]
        theme: Option<String>,
        /// Caption for labeled mode
        #[arg(long)]
        caption: Option<String>,
        /// Pipeline settings file (.toml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory the PNG files are written to
        #[arg(short, long)]
        output_dir: PathBuf,
        /// Base name of the output files (defaults to the input file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Run every job of a batch configuration file concurrently
    Batch {
        /// Path to the batch configuration (.toml or .json)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the JSON schema of batch configuration files
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            input,
            mode,
            theme,
            caption,
            config,
            output_dir,
            name,
        } => {
            let settings = match config {
                Some(path) => load_settings(path)?,
                None => PipelineSettings::default(),
            };
            let job = JobConfig {
                input: input.to_string_lossy().into_owned(),
                mode: Mode::parse(&mode)?,
                theme,
                caption,
                output_dir: output_dir.to_string_lossy().into_owned(),
                name,
            };
            let pipeline = StickerPipeline::builder().with_settings(settings).build()?;
            info!("{}", pipeline.info());
            run_job(&pipeline, &job)?;
        }
        Commands::Batch { config } => {
            process_batch(&config).await?;
        }
        Commands::Schema => {
            let schema = schemars::schema_for!(BatchConfig);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }

    Ok(())
}

fn run_job(pipeline: &StickerPipeline, job: &JobConfig) -> Result<Vec<PathBuf>> {
    let photo = sticker::types::open_image(&job.input)?;
    let caption = job.caption.as_deref();
    let manifest = pipeline.generate_mode(&photo, caption, job.mode, job.theme.as_deref())?;

    let base = job.base_name();
    let written = save_manifest(&manifest, Path::new(&job.output_dir), &base)?;
    for path in &written {
        info!("Wrote {}", path.display());
    }
    Ok(written)
}

async fn process_batch(config_path: &Path) -> Result<()> {
    let batch = BatchConfig::from_file(config_path)?;
    info!("Loaded {} jobs from {}", batch.jobs.len(), config_path.display());

    let pipeline = Arc::new(StickerPipeline::builder().with_settings(batch.settings).build()?);
    info!("{}", pipeline.info());

    let handles: Vec<_> = batch
        .jobs
        .into_iter()
        .map(|job| {
            let pipeline = Arc::clone(&pipeline);
            tokio::task::spawn_blocking(move || {
                let result = run_job(&pipeline, &job);
                (job, result)
            })
        })
        .collect();

    let total = handles.len();
    let mut failed = 0;
    for handle in handles {
        let (job, result) = handle.await?;
        match result {
            Ok(written) => {
                info!("Job '{}' ({}) produced {} files", job.input, job.mode, written.len())
            }
            Err(e) => {
                failed += 1;
                error!("Job '{}' ({}) failed: {:?}", job.input, job.mode, e);
            }
        }
    }

    if failed > 0 {
        return Err(eyre!("{failed} of {total} jobs failed"));
    }
    info!("✅ Batch completed: {} jobs", total);
    Ok(())
}
