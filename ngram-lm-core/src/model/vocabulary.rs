use std::collections::{HashMap, HashSet};

/// Placeholder substituted for tokens outside the vocabulary.
pub const UNK_TOKEN: &str = "<UNK>";

/// Marker prepended to every sentence.
pub const START_TOKEN: &str = "<s>";

/// Marker appended to every sentence.
pub const END_TOKEN: &str = "</s>";

/// Set of tokens retained by a model, built once from training data.
///
/// A `Vocabulary` is the result of counting every token of a training set
/// and keeping those seen at least `min_freq` times.
///
/// # Invariants
/// - `UNK_TOKEN` is always a member
/// - `frequencies` holds the raw counts of every observed token, including
///   the ones that were pruned
#[derive(Clone, Debug, Default)]
pub struct Vocabulary {
	/// Retained tokens.
	tokens: HashSet<String>,
	/// Full frequency counter over the training sentences.
	/// Example: { "the" => 42, "zebra" => 1 }
	frequencies: HashMap<String, usize>,
}

impl Vocabulary {
	/// Builds a vocabulary from tokenized sentences.
	///
	/// Tokens whose total count is at least `min_freq` are kept, and
	/// `UNK_TOKEN` is always added. With `min_freq == 0` every observed token
	/// is kept.
	pub fn build<S: AsRef<[String]>>(sentences: &[S], min_freq: usize) -> Self {
		let mut frequencies: HashMap<String, usize> = HashMap::new();
		for sentence in sentences {
			for token in sentence.as_ref() {
				*frequencies.entry(token.clone()).or_insert(0) += 1;
			}
		}

		let mut tokens: HashSet<String> = frequencies
			.iter()
			.filter(|(_, count)| **count >= min_freq)
			.map(|(token, _)| token.clone())
			.collect();
		tokens.insert(UNK_TOKEN.to_owned());

		Self { tokens, frequencies }
	}

	/// Adds tokens to the retained set. Already present tokens are ignored.
	pub(crate) fn extend<'a, I: IntoIterator<Item = &'a str>>(&mut self, tokens: I) {
		self.tokens.extend(tokens.into_iter().map(str::to_owned));
	}

	pub fn contains(&self, token: &str) -> bool {
		self.tokens.contains(token)
	}

	/// Returns `token` itself if retained, `UNK_TOKEN` otherwise.
	pub fn map_token<'a>(&self, token: &'a str) -> &'a str {
		if self.contains(token) { token } else { UNK_TOKEN }
	}

	/// Number of retained tokens (|V|).
	pub fn len(&self) -> usize {
		self.tokens.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}

	/// Iterates over the retained tokens in no particular order.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.tokens.iter().map(String::as_str)
	}

	/// Raw training count of `token`, before any pruning.
	pub fn frequency(&self, token: &str) -> usize {
		self.frequencies.get(token).copied().unwrap_or(0)
	}

	/// Full frequency counter over the training sentences.
	pub fn frequencies(&self) -> &HashMap<String, usize> {
		&self.frequencies
	}
}
