use std::collections::HashMap;

use log::{debug, info};

use super::config::{ModelConfig, Order, Smoothing};
use super::vocabulary::{END_TOKEN, START_TOKEN, UNK_TOKEN, Vocabulary};

/// Word-level n-gram language model (unigram or bigram).
///
/// The `NGramModel` counts unigrams and, for order 2, bigrams over
/// vocabulary-normalized training sentences, then answers probability and
/// perplexity queries under its configured smoothing.
///
/// # Responsibilities
/// - Build the vocabulary and rewrite rare tokens to `<UNK>`
/// - Accumulate unigram and bigram counts
/// - Estimate probabilities (none, add-k, interpolation)
/// - Score sentences and corpora (negative log-likelihood, perplexity)
///
/// # Invariants
/// - Counts are only taken over normalized sentences
/// - Sum of `unigrams` values equals `total_tokens`
/// - Bigrams never span two sentences
/// - Once fitted, the model is never mutated again
#[derive(Clone, Debug)]
pub struct NGramModel {
	config: ModelConfig,

	/// Retained tokens, empty until `fit` is called.
	vocabulary: Vocabulary,

	/// Token occurrences over the normalized training set.
	unigrams: HashMap<String, usize>,

	/// Bigram occurrences, indexed by history then by next token.
	/// Example: { "the" => { "cat" => 3, "dog" => 1 } }
	bigrams: HashMap<String, HashMap<String, usize>>,

	/// Number of tokens counted during fit.
	total_tokens: usize,

	fitted: bool,
}

impl NGramModel {
	/// Creates an unfitted model.
	pub fn new(config: ModelConfig) -> Self {
		Self {
			config,
			vocabulary: Vocabulary::default(),
			unigrams: HashMap::new(),
			bigrams: HashMap::new(),
			total_tokens: 0,
			fitted: false,
		}
	}

	/// Creates an unfitted model from raw option values.
	///
	/// # Errors
	/// Returns an error if `n` is not 1 or 2, if the smoothing name is
	/// unknown, or if `k` / `lambda` are out of range.
	pub fn with_options(n: usize, smoothing: &str, k: f64, lambda: f64, min_freq: usize) -> Result<Self, String> {
		Ok(Self::new(ModelConfig::from_options(n, smoothing, k, lambda, min_freq)?))
	}

	/// Trains the model on tokenized sentences.
	///
	/// Sentences are expected to be wrapped with `<s>` / `</s>` already.
	///
	/// # Behavior
	/// - Builds the vocabulary with the configured frequency cutoff.
	/// - Rewrites every sentence against that vocabulary.
	/// - Counts unigrams, and bigrams inside each sentence if order is 2.
	/// - Adds `<UNK>`, `<s>` and `</s>` to the vocabulary.
	///
	/// # Errors
	/// Returns an error if the model was already fitted. The model is left
	/// untouched in that case.
	pub fn fit<S: AsRef<[String]>>(&mut self, sentences: &[S]) -> Result<(), String> {
		if self.fitted {
			return Err("Model is already fitted".to_owned());
		}

		self.vocabulary = Vocabulary::build(sentences, self.config.min_freq());
		debug!(
			"vocabulary built: {} retained of {} distinct tokens (min_freq={})",
			self.vocabulary.len(),
			self.vocabulary.frequencies().len(),
			self.config.min_freq()
		);

		for sentence in sentences {
			let sentence = self.normalize(sentence.as_ref());

			for token in &sentence {
				*self.unigrams.entry(token.clone()).or_insert(0) += 1;
			}
			self.total_tokens += sentence.len();

			if self.config.order() == Order::Bigram {
				for pair in sentence.windows(2) {
					*self
						.bigrams
						.entry(pair[0].clone())
						.or_default()
						.entry(pair[1].clone())
						.or_insert(0) += 1;
				}
			}
		}

		self.vocabulary.extend([UNK_TOKEN, START_TOKEN, END_TOKEN]);
		self.fitted = true;

		info!(
			"fitted {}-gram model ({}): {} sentences, {} tokens, vocabulary size {}",
			self.config.order().n(),
			self.config.smoothing(),
			sentences.len(),
			self.total_tokens,
			self.vocabulary.len()
		);
		Ok(())
	}

	/// Rewrites every token outside the vocabulary to `<UNK>`.
	///
	/// This is the rewrite `fit` applies to training data; callers must apply
	/// it to evaluation sentences before scoring them.
	pub fn normalize<T: AsRef<str>>(&self, tokens: &[T]) -> Vec<String> {
		tokens
			.iter()
			.map(|token| self.vocabulary.map_token(token.as_ref()).to_owned())
			.collect()
	}

	/// Applies [`NGramModel::normalize`] to every sentence.
	pub fn normalize_all<S: AsRef<[String]>>(&self, sentences: &[S]) -> Vec<Vec<String>> {
		sentences.iter().map(|sentence| self.normalize(sentence.as_ref())).collect()
	}

	/// Probability of `word` on its own.
	///
	/// Unknown words count as zero occurrences. Without smoothing, an empty
	/// model returns 0.
	pub fn unigram_probability(&self, word: &str) -> f64 {
		match self.config.smoothing() {
			Smoothing::None => {
				if self.total_tokens == 0 {
					return 0.0;
				}
				self.unigram_count(word) as f64 / self.total_tokens as f64
			}
			Smoothing::Additive { k } | Smoothing::Interpolation { k, .. } => self.additive_unigram(word, k),
		}
	}

	/// Probability of `word` following `history`.
	///
	/// Without smoothing, an unseen history and an unseen continuation both
	/// give exactly 0.
	pub fn bigram_probability(&self, history: &str, word: &str) -> f64 {
		match self.config.smoothing() {
			Smoothing::None => {
				let history_count = self.unigram_count(history);
				if history_count == 0 {
					return 0.0;
				}
				self.bigram_count(history, word) as f64 / history_count as f64
			}
			Smoothing::Additive { k } => self.additive_bigram(history, word, k),
			Smoothing::Interpolation { k, lambda } => {
				lambda * self.additive_bigram(history, word, k) + (1.0 - lambda) * self.additive_unigram(word, k)
			}
		}
	}

	/// (c(w) + k) / (N + k|V|)
	fn additive_unigram(&self, word: &str, k: f64) -> f64 {
		let denominator = self.total_tokens as f64 + k * self.vocabulary.len() as f64;
		if denominator <= 0.0 {
			return 0.0;
		}
		(self.unigram_count(word) as f64 + k) / denominator
	}

	/// (c(h, w) + k) / (c(h) + k|V|)
	fn additive_bigram(&self, history: &str, word: &str, k: f64) -> f64 {
		let denominator = self.unigram_count(history) as f64 + k * self.vocabulary.len() as f64;
		if denominator <= 0.0 {
			return 0.0;
		}
		(self.bigram_count(history, word) as f64 + k) / denominator
	}

	/// Negative log-likelihood of a sentence.
	///
	/// Position 0 (`<s>`) is never scored. Returns `f64::INFINITY` as soon as
	/// one token has a probability of 0.
	pub fn sentence_score<T: AsRef<str>>(&self, tokens: &[T]) -> f64 {
		let mut total = 0.0;
		for i in 1..tokens.len() {
			let word = tokens[i].as_ref();
			let p = match self.config.order() {
				Order::Unigram => self.unigram_probability(word),
				Order::Bigram => self.bigram_probability(tokens[i - 1].as_ref(), word),
			};
			// Also catches NaN
			if !(p > 0.0) {
				return f64::INFINITY;
			}
			total -= p.ln();
		}
		total
	}

	/// Corpus perplexity, normalized by the number of scored tokens.
	///
	/// # Returns
	/// - `f64::INFINITY` if any sentence is impossible under the model
	/// - `f64::INFINITY` if there is nothing to score
	/// - `exp(total negative log-likelihood / scored tokens)` otherwise
	pub fn perplexity<S: AsRef<[String]>>(&self, sentences: &[S]) -> f64 {
		let mut scored_tokens: usize = 0;
		let mut total_neg_log = 0.0;

		for sentence in sentences {
			let sentence = sentence.as_ref();
			scored_tokens += sentence.len().saturating_sub(1);
			let score = self.sentence_score(sentence);
			if score == f64::INFINITY {
				return f64::INFINITY;
			}
			total_neg_log += score;
		}

		if scored_tokens == 0 {
			return f64::INFINITY;
		}
		(total_neg_log / scored_tokens as f64).exp()
	}

	/// Number of occurrences of `word` in the normalized training set.
	pub fn unigram_count(&self, word: &str) -> usize {
		self.unigrams.get(word).copied().unwrap_or(0)
	}

	/// Number of times `word` directly followed `history` in training.
	pub fn bigram_count(&self, history: &str, word: &str) -> usize {
		self.bigrams
			.get(history)
			.and_then(|next| next.get(word))
			.copied()
			.unwrap_or(0)
	}

	pub fn total_tokens(&self) -> usize {
		self.total_tokens
	}

	pub fn vocabulary(&self) -> &Vocabulary {
		&self.vocabulary
	}

	pub fn config(&self) -> &ModelConfig {
		&self.config
	}

	pub fn is_fitted(&self) -> bool {
		self.fitted
	}
}
