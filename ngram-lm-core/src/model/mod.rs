//! Top-level module for the language model.
//!
//! - Model configuration (`ModelConfig`, `Order`, `Smoothing`)
//! - Vocabulary builder with frequency cutoff (`Vocabulary`)
//! - Unigram / bigram model with smoothing and perplexity (`NGramModel`)

/// Validated model parameters.
///
/// Order, smoothing strategy (with its `k` / `lambda`) and frequency cutoff.
pub mod config;

/// Vocabulary built from training sentences.
///
/// Counts token frequencies, prunes rare tokens and defines the
/// `<UNK>`, `<s>` and `</s>` markers.
pub mod vocabulary;

/// Unigram / bigram model.
///
/// Handles fitting, vocabulary normalization, smoothed probability
/// estimation, sentence scoring and perplexity.
pub mod ngram_model;

pub use config::{ModelConfig, Order, Smoothing};
pub use ngram_model::NGramModel;
pub use vocabulary::{END_TOKEN, START_TOKEN, UNK_TOKEN, Vocabulary};
