use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::{fs, io};

use crate::model::vocabulary::{END_TOKEN, START_TOKEN};

/// Splits text into sentences of whitespace-separated tokens.
///
/// - One sentence per line, blank lines are skipped
/// - Tokens are lowercased if `lowercase` is set
pub fn tokenize_lines(text: &str, lowercase: bool) -> Vec<Vec<String>> {
	text.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty())
		.map(|line| {
			line.split_whitespace()
				.map(|token| if lowercase { token.to_lowercase() } else { token.to_owned() })
				.collect()
		})
		.collect()
}

/// Reads a UTF-8 corpus file and tokenizes it with [`tokenize_lines`].
pub fn read_corpus<P: AsRef<Path>>(filename: P, lowercase: bool) -> io::Result<Vec<Vec<String>>> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(tokenize_lines(&contents, lowercase))
}

/// Wraps every sentence with the `<s>` / `</s>` markers.
pub fn add_sentence_tokens(sentences: Vec<Vec<String>>) -> Vec<Vec<String>> {
	sentences
		.into_iter()
		.map(|tokens| {
			let mut sentence = Vec::with_capacity(tokens.len() + 2);
			sentence.push(START_TOKEN.to_owned());
			sentence.extend(tokens);
			sentence.push(END_TOKEN.to_owned());
			sentence
		})
		.collect()
}

/// Creates the parent directory of `path` if it does not exist yet.
pub(crate) fn ensure_parent_dir<P: AsRef<Path>>(path: P) -> io::Result<()> {
	match path.as_ref().parent() {
		Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
		_ => Ok(()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn tokenize_skips_blank_lines() {
		let text = "The cat sat\n\n   \n  a  Dog\r\n";
		assert_eq!(
			tokenize_lines(text, true),
			vec![vec!["the", "cat", "sat"], vec!["a", "dog"]]
		);
		assert_eq!(tokenize_lines(text, false)[1], vec!["a", "Dog"]);
		assert!(tokenize_lines("", true).is_empty());
	}

	#[test]
	fn sentence_markers() {
		let wrapped = add_sentence_tokens(vec![vec!["hi".to_owned()], vec![]]);
		assert_eq!(wrapped, vec![vec!["<s>", "hi", "</s>"], vec!["<s>", "</s>"]]);
	}

	#[test]
	fn read_corpus_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "Hello World").unwrap();
		writeln!(file).unwrap();
		writeln!(file, "bye").unwrap();

		let corpus = read_corpus(file.path(), true).unwrap();
		assert_eq!(corpus, vec![vec!["hello", "world"], vec!["bye"]]);
	}

	#[test]
	fn read_missing_corpus() {
		assert!(read_corpus("/definitely/not/here.txt", true).is_err());
	}

	#[test]
	fn parent_dir_is_created() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("results").join("out.csv");
		ensure_parent_dir(&path).unwrap();
		assert!(dir.path().join("results").is_dir());
		ensure_parent_dir("out.csv").unwrap();
	}
}
