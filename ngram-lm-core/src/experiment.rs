use std::path::Path;
use std::sync::{Arc, mpsc};
use std::thread;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::io::{add_sentence_tokens, ensure_parent_dir, read_corpus};
use crate::model::config::ModelConfig;
use crate::model::ngram_model::NGramModel;

/// Settings of a single train-then-evaluate run.
///
/// Field names follow the experiment CSV columns. Missing fields fall back
/// to a bigram add-1 model with a frequency cutoff of 2.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ExperimentSettings {
	pub n: usize,
	pub smoothing: String,
	pub k: f64,
	#[serde(alias = "lambda_")]
	pub lambda: f64,
	pub minfreq: usize,
}

impl Default for ExperimentSettings {
	fn default() -> Self {
		Self { n: 2, smoothing: "addk".to_owned(), k: 1.0, lambda: 0.5, minfreq: 2 }
	}
}

impl ExperimentSettings {
	pub fn new(n: usize, smoothing: &str, k: f64, lambda: f64, minfreq: usize) -> Self {
		Self { n, smoothing: smoothing.to_owned(), k, lambda, minfreq }
	}

	/// Validates the settings into a model configuration.
	pub fn to_config(&self) -> Result<ModelConfig, String> {
		ModelConfig::from_options(self.n, &self.smoothing, self.k, self.lambda, self.minfreq)
	}
}

/// Outcome of one experiment, one row of the results CSV.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ExperimentResult {
	pub n: usize,
	pub smoothing: String,
	pub k: f64,
	pub lambda: f64,
	pub minfreq: usize,
	pub vocab_size: usize,
	pub perplexity: f64,
}

/// The reference grid: unigram and bigram baselines, add-k over several
/// `k`, and interpolation over several `lambda`.
pub fn default_grid() -> Vec<ExperimentSettings> {
	let d = ExperimentSettings::default();
	vec![
		ExperimentSettings { n: 1, smoothing: "none".to_owned(), ..d.clone() },
		ExperimentSettings { n: 1, smoothing: "addk".to_owned(), k: 1.0, ..d.clone() },
		ExperimentSettings { n: 2, smoothing: "none".to_owned(), ..d.clone() },
		ExperimentSettings { k: 0.1, ..d.clone() },
		ExperimentSettings { k: 0.5, ..d.clone() },
		ExperimentSettings { k: 1.0, ..d.clone() },
		ExperimentSettings { smoothing: "interp".to_owned(), k: 0.1, lambda: 0.3, ..d.clone() },
		ExperimentSettings { smoothing: "interp".to_owned(), k: 0.1, lambda: 0.5, ..d.clone() },
		ExperimentSettings { smoothing: "interp".to_owned(), k: 0.1, lambda: 0.7, ..d },
	]
}

/// Reads a corpus file, lowercased and wrapped with sentence markers.
pub fn load_corpus<P: AsRef<Path>>(path: P) -> std::io::Result<Vec<Vec<String>>> {
	Ok(add_sentence_tokens(read_corpus(path, true)?))
}

/// Trains a model on `train` and measures its perplexity on `valid`.
///
/// Both corpora must already carry sentence markers. Validation sentences
/// are normalized against the fitted vocabulary before scoring.
///
/// # Errors
/// Returns an error if the settings are not a valid model configuration.
pub fn evaluate(train: &[Vec<String>], valid: &[Vec<String>], settings: &ExperimentSettings) -> Result<ExperimentResult, String> {
	let mut model = NGramModel::new(settings.to_config()?);
	model.fit(train)?;

	let valid = model.normalize_all(valid);
	let perplexity = model.perplexity(&valid);
	if perplexity.is_infinite() {
		warn!("{:?}: zero-probability event, perplexity is infinite", settings);
	}

	Ok(ExperimentResult {
		n: settings.n,
		smoothing: settings.smoothing.clone(),
		k: settings.k,
		lambda: settings.lambda,
		minfreq: settings.minfreq,
		vocab_size: model.vocabulary().len(),
		perplexity,
	})
}

/// Loads both corpora from disk and runs [`evaluate`].
pub fn evaluate_files<PT, PV>(train_path: PT, valid_path: PV, settings: &ExperimentSettings) -> Result<ExperimentResult, Box<dyn std::error::Error>>
where
	PT: AsRef<Path>,
	PV: AsRef<Path>,
{
	let train = load_corpus(train_path)?;
	let valid = load_corpus(valid_path)?;
	Ok(evaluate(&train, &valid, settings)?)
}

/// Runs every experiment of `grid`, in parallel, and returns the results in
/// grid order.
///
/// # Behavior
/// - Splits the grid into chunks (one per CPU core).
/// - Each worker thread evaluates its chunk with its own models.
/// - Results are collected over an MPSC channel and reordered.
///
/// # Errors
/// Returns the first configuration error, or an error if a worker died.
pub fn run_grid(train: Vec<Vec<String>>, valid: Vec<Vec<String>>, grid: &[ExperimentSettings]) -> Result<Vec<ExperimentResult>, String> {
	if grid.is_empty() {
		return Ok(Vec::new());
	}

	let train = Arc::new(train);
	let valid = Arc::new(valid);
	let chunk_size = grid.len().div_ceil(num_cpus::get().max(1));

	let (tx, rx) = mpsc::channel();
	for (chunk_index, chunk) in grid.chunks(chunk_size).enumerate() {
		let tx = tx.clone();
		let chunk: Vec<ExperimentSettings> = chunk.to_vec();
		let train = Arc::clone(&train);
		let valid = Arc::clone(&valid);

		thread::spawn(move || {
			for (offset, settings) in chunk.iter().enumerate() {
				let result = evaluate(&train, &valid, settings);
				// The receiver outlives every worker
				let _ = tx.send((chunk_index * chunk_size + offset, result));
			}
		});
	}
	drop(tx);

	let mut results: Vec<Option<ExperimentResult>> = vec![None; grid.len()];
	for (index, result) in rx.iter() {
		let result = result?;
		info!(
			"Done: n={}, smoothing={}, k={}, lambda={}, minfreq={} -> PP={}",
			result.n, result.smoothing, result.k, result.lambda, result.minfreq, result.perplexity
		);
		results[index] = Some(result);
	}

	results
		.into_iter()
		.enumerate()
		.map(|(index, result)| result.ok_or_else(|| format!("Experiment {} did not complete", index)))
		.collect()
}

/// Writes experiment results as CSV, creating the parent directory.
///
/// Infinite perplexities are written as `inf`.
pub fn write_csv<P: AsRef<Path>>(path: P, results: &[ExperimentResult]) -> Result<(), Box<dyn std::error::Error>> {
	ensure_parent_dir(&path)?;
	let mut writer = csv::Writer::from_path(&path)?;
	for result in results {
		writer.serialize(result)?;
	}
	writer.flush()?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::io::tokenize_lines;
	use std::io::Write;

	const TRAIN: &str = "the cat sat on the mat\nthe dog sat on the log\na cat and a dog\nthe cat ran\n";
	const VALID: &str = "the dog ran\nthe bird sat on the mat\n";

	fn corpus(text: &str) -> Vec<Vec<String>> {
		add_sentence_tokens(tokenize_lines(text, true))
	}

	#[test]
	fn settings_defaults() {
		let settings = ExperimentSettings::default();
		assert_eq!(settings, ExperimentSettings::new(2, "addk", 1.0, 0.5, 2));
		assert!(settings.to_config().is_ok());
		assert!(ExperimentSettings::new(3, "addk", 1.0, 0.5, 2).to_config().is_err());
	}

	#[test]
	fn default_grid_is_valid() {
		let grid = default_grid();
		assert_eq!(grid.len(), 9);
		assert!(grid.iter().all(|s| s.to_config().is_ok()));
		assert_eq!(grid.iter().filter(|s| s.smoothing == "interp").count(), 3);
		assert_eq!(grid.iter().filter(|s| s.n == 1).count(), 2);
	}

	#[test]
	fn evaluate_reports_vocab_and_perplexity() {
		let train = corpus(TRAIN);
		let valid = corpus(VALID);

		let result = evaluate(&train, &valid, &ExperimentSettings::default()).unwrap();
		assert!(result.perplexity.is_finite());
		assert!(result.perplexity > 1.0);

		// "bird" is unseen, but normalization maps it to <UNK>, which the
		// cutoff of 2 populates with the training singletons
		let unsmoothed = evaluate(&train, &valid, &ExperimentSettings::new(1, "none", 1.0, 0.5, 2)).unwrap();
		assert!(unsmoothed.perplexity.is_finite());

		let bigram = evaluate(&train, &valid, &ExperimentSettings::new(2, "none", 1.0, 0.5, 1)).unwrap();
		assert_eq!(bigram.perplexity, f64::INFINITY);

		assert!(evaluate(&train, &valid, &ExperimentSettings::new(2, "bogus", 1.0, 0.5, 1)).is_err());
	}

	#[test]
	fn grid_results_keep_order() {
		let grid = default_grid();
		let results = run_grid(corpus(TRAIN), corpus(VALID), &grid).unwrap();

		assert_eq!(results.len(), grid.len());
		for (settings, result) in grid.iter().zip(&results) {
			assert_eq!(settings.n, result.n);
			assert_eq!(settings.smoothing, result.smoothing);
			assert_eq!(settings.k, result.k);
			assert_eq!(settings.lambda, result.lambda);
		}

		let sequential = evaluate(&corpus(TRAIN), &corpus(VALID), &grid[4]).unwrap();
		assert_eq!(results[4], sequential);
	}

	#[test]
	fn grid_propagates_bad_settings() {
		let grid = vec![ExperimentSettings::default(), ExperimentSettings::new(2, "addk", -1.0, 0.5, 2)];
		assert!(run_grid(corpus(TRAIN), corpus(VALID), &grid).is_err());
		assert!(run_grid(corpus(TRAIN), corpus(VALID), &[]).unwrap().is_empty());
	}

	#[test]
	fn files_and_csv() {
		let dir = tempfile::tempdir().unwrap();
		let train_path = dir.path().join("train.txt");
		let valid_path = dir.path().join("val.txt");
		std::fs::File::create(&train_path).unwrap().write_all(TRAIN.as_bytes()).unwrap();
		std::fs::File::create(&valid_path).unwrap().write_all(VALID.as_bytes()).unwrap();

		let finite = evaluate_files(&train_path, &valid_path, &ExperimentSettings::default()).unwrap();
		let infinite = evaluate_files(&train_path, &valid_path, &ExperimentSettings::new(2, "none", 1.0, 0.5, 1)).unwrap();

		let csv_path = dir.path().join("results").join("experiment_results.csv");
		write_csv(&csv_path, &[finite, infinite]).unwrap();

		let written = std::fs::read_to_string(&csv_path).unwrap();
		let lines: Vec<&str> = written.lines().collect();
		assert_eq!(lines.len(), 3);
		assert_eq!(lines[0], "n,smoothing,k,lambda,minfreq,vocab_size,perplexity");
		assert!(lines[1].starts_with("2,addk,1.0,0.5,2,"));
		assert!(lines[2].ends_with(",inf"));
	}

	#[test]
	fn settings_from_csv_with_alias() {
		let data = "n,smoothing,k,lambda_,minfreq\n1,none,1.0,0.3,1\n";
		let mut reader = csv::Reader::from_reader(data.as_bytes());
		let settings: ExperimentSettings = reader.deserialize().next().unwrap().unwrap();
		assert_eq!(settings, ExperimentSettings::new(1, "none", 1.0, 0.3, 1));
	}
}
