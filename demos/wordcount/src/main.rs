use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use sindri::io::open_writer;
use sindri::{load_work_items, naive, write_results, GroupStrategy, OutputFormat, PipelineConfig, ReduceMode, RuntimePipeline};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "wordcount", about = "Count whitespace-delimited tokens per input file")]
struct Args {
    /// Input files or directories (walked recursively). Each file is keyed by its file name.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Map pool width [default: SINDRI_POOL_SIZE or number of CPUs]
    #[arg(long, short = 'p')]
    pool_size: Option<usize>,
    /// Reduce pool width [default: SINDRI_REDUCE_POOL_SIZE or number of CPUs]
    #[arg(long, conflicts_with = "thread_per_token")]
    reduce_pool_size: Option<usize>,
    /// Spawn one thread per distinct token in the reduce phase
    #[arg(long)]
    thread_per_token: bool,
    /// Group on a pool of map-pool width instead of the calling thread
    #[arg(long)]
    parallel_group: bool,
    /// Mapped items per parallel group task
    #[arg(long)]
    group_batch: Option<usize>,
    /// Output file (stdout when omitted)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
    /// Print phase timings as JSON on stderr
    #[arg(long)]
    stats: bool,
    /// Recount single-threaded and fail if the results differ
    #[arg(long)]
    verify: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
        }
    }
}

fn build_config(args: &Args) -> PipelineConfig {
    let mut config = PipelineConfig::from_env();
    if let Some(n) = args.pool_size { config = config.with_pool_size(n); }
    if args.thread_per_token {
        config = config.with_reduce_mode(ReduceMode::ThreadPerToken);
    } else if let Some(n) = args.reduce_pool_size {
        config = config.with_reduce_mode(ReduceMode::Pooled { pool_size: n });
    }
    if args.parallel_group { config = config.with_group_strategy(GroupStrategy::Parallel); }
    if let Some(n) = args.group_batch { config = config.with_group_batch(n); }
    config
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    let config = build_config(&args);

    let t0 = Instant::now();
    let store = load_work_items(args.inputs.as_slice()).context("loading inputs")?;
    info!(sources = store.len(), bytes = store.total_bytes(), load_ms = t0.elapsed().as_millis() as u64, "Inputs loaded");

    let pipeline = RuntimePipeline::new(config);
    let output = pipeline.word_count(&store).context("word count pipeline")?;

    if args.verify {
        let reference = naive::word_count(&store);
        let mismatched = naive::diff(&reference, &output.result);
        if !mismatched.is_empty() {
            bail!("pipeline disagrees with sequential count on {} token(s), first: {:?}", mismatched.len(), mismatched[0]);
        }
        info!(tokens = reference.len(), "Verified against sequential count");
    }

    match &args.output {
        Some(path) => {
            let mut w = open_writer(path).with_context(|| format!("open {}", path.display()))?;
            write_results(&mut w, &output.result, args.format.into()).with_context(|| format!("write {}", path.display()))?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write_results(&mut lock, &output.result, args.format.into()).context("write stdout")?;
        }
    }

    if args.stats {
        let mut err = std::io::stderr().lock();
        serde_json::to_writer_pretty(&mut err, &output.stats)?;
        writeln!(err)?;
    }
    info!(pool_size = output.stats.pool_size, tokens = output.result.len(), total_ms = t0.elapsed().as_millis() as u64, "Done");
    Ok(())
}
