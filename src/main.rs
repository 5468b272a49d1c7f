use anyhow::Result;
use clap::{Parser, Subcommand};

mod attention;
mod block;
mod config;
mod embedding;
mod feed_forward;
mod inference;
mod positional;
mod training;
mod transformer;
mod utils_tensor;
mod vocab;

#[derive(Parser, Debug)]
#[command(name = "wordlm", about = "Word-level transformer language model")]
pub struct Args {
    /// Force CPU even when a GPU backend is available
    #[arg(long)]
    pub cpu: bool,

    /// Write a chrome trace of the run to trace-timestamp.json
    #[arg(long)]
    pub tracing: bool,

    #[command(subcommand)]
    task: Task,
}

#[derive(Subcommand, Debug)]
enum Task {
    Train(TrainingCmd),
}

#[derive(Parser, Debug)]
pub struct TrainingCmd {
    /// Corpus file, one sentence per line
    #[arg(long)]
    pub corpus: String,

    #[arg(long, default_value_t = 200)]
    pub epochs: usize,

    #[arg(long, default_value_t = 32)]
    pub embedding_dim: usize,

    #[arg(long, default_value_t = 64)]
    pub hidden_dim: usize,

    #[arg(long, default_value_t = 2)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub learning_rate: f64,

    /// Capacity of the precomputed positional table; longer sentences are rejected
    #[arg(long, default_value_t = 80)]
    pub max_seq_len: usize,

    /// Report total epoch loss every this many epochs, 0 to disable
    #[arg(long, default_value_t = 10)]
    pub log_every: usize,

    /// After training, read prompts from stdin and print the predicted next word
    #[arg(long)]
    pub interactive: bool,
}

fn main() -> Result<()> {
    use tracing_chrome::ChromeLayerBuilder;
    use tracing_subscriber::prelude::*;

    let args = Args::parse();

    let _guard = if args.tracing {
        let (chrome_layer, guard) = ChromeLayerBuilder::new().build();
        tracing_subscriber::registry().with(chrome_layer).init();
        Some(guard)
    } else {
        tracing_subscriber::fmt::init();
        None
    };

    match &args.task {
        Task::Train(cmd) => training::run(cmd, &args),
    }
}
