//! Word-level n-gram language modelling library.
//!
//! This crate provides a small statistical language model toolkit including:
//! - Vocabulary construction with a frequency cutoff and `<UNK>` substitution
//! - Unigram and bigram models with add-k and interpolation smoothing
//! - Sentence scoring and corpus perplexity
//! - Corpus loading and parallel experiment grids with CSV reports
//!
//! The model itself does no I/O: it consumes tokenized sentences and answers
//! probability queries. File handling lives in `io` and `experiment`.

/// Vocabulary, configuration and n-gram models.
///
/// Exposes `NGramModel` and its configuration types.
pub mod model;

/// Corpus I/O (file loading, tokenization, sentence markers).
pub mod io;

/// Train-then-evaluate runs over one or many model settings.
///
/// Used by the command line tool and the HTTP server.
pub mod experiment;
