use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::info;

use ngram_lm_core::experiment::{self, ExperimentSettings};

const DEFAULT_OUTPUT: &str = "results/experiment_results.csv";

#[derive(Parser, Debug)]
#[command(author, version, about = "Unigram / bigram language model experiments", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Train one model and report its validation perplexity
	Run(RunArgs),
	/// Run the reference experiment grid and write a CSV report
	Grid(GridArgs),
}

#[derive(Args, Debug)]
struct Corpora {
	/// Training corpus, one sentence per line
	#[arg(long, value_name = "PATH")]
	train: PathBuf,

	/// Validation corpus, one sentence per line
	#[arg(long, value_name = "PATH")]
	valid: PathBuf,
}

#[derive(Args, Debug)]
struct RunArgs {
	#[command(flatten)]
	corpora: Corpora,

	/// Model order (1 or 2)
	#[arg(long, default_value_t = 2)]
	n: usize,

	/// Minimum training frequency to keep a token
	#[arg(long, default_value_t = 2)]
	minfreq: usize,

	/// Smoothing: none, addk or interp
	#[arg(long, default_value = "addk")]
	smoothing: String,

	/// Additive constant
	#[arg(long, default_value_t = 1.0)]
	k: f64,

	/// Interpolation weight on the bigram estimate
	#[arg(long = "lambda", alias = "lambda_", default_value_t = 0.5)]
	lambda: f64,
}

#[derive(Args, Debug)]
struct GridArgs {
	#[command(flatten)]
	corpora: Corpora,

	/// Output path for the CSV report
	#[arg(short, long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
	output: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

	match Cli::parse().command {
		Commands::Run(args) => run(args),
		Commands::Grid(args) => grid(args),
	}
}

fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
	let settings = ExperimentSettings::new(args.n, &args.smoothing, args.k, args.lambda, args.minfreq);
	// Reject bad options before reading any corpus
	settings.to_config()?;

	let result = experiment::evaluate_files(&args.corpora.train, &args.corpora.valid, &settings)?;

	println!(
		"Model settings: n={}, smoothing={}, k={}, lambda={}, minfreq={}",
		result.n, result.smoothing, result.k, result.lambda, result.minfreq
	);
	println!("Vocab size (train): {}", result.vocab_size);
	if result.perplexity.is_finite() {
		println!("Perplexity on validation: {:.4}", result.perplexity);
	} else {
		println!("Perplexity: INF (zero-prob encountered)");
	}
	Ok(())
}

fn grid(args: GridArgs) -> Result<(), Box<dyn std::error::Error>> {
	let train = experiment::load_corpus(&args.corpora.train)?;
	let valid = experiment::load_corpus(&args.corpora.valid)?;
	info!("loaded {} training and {} validation sentences", train.len(), valid.len());

	let results = experiment::run_grid(train, valid, &experiment::default_grid())?;
	for result in &results {
		println!(
			"Done: n={}, smoothing={}, k={}, lambda={}, minfreq={} -> PP={}",
			result.n, result.smoothing, result.k, result.lambda, result.minfreq, result.perplexity
		);
	}

	experiment::write_csv(&args.output, &results)?;
	println!("\nResults saved to {}", args.output.display());
	Ok(())
}
