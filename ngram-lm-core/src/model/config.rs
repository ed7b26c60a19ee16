use std::fmt;

/// Order of an n-gram model.
///
/// Only unigram and bigram statistics are supported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
	Unigram,
	Bigram,
}

impl Order {
	/// Returns the numeric order (`1` or `2`).
	pub fn n(&self) -> usize {
		match self {
			Order::Unigram => 1,
			Order::Bigram => 2,
		}
	}
}

impl TryFrom<usize> for Order {
	type Error = String;

	fn try_from(n: usize) -> Result<Self, Self::Error> {
		match n {
			1 => Ok(Order::Unigram),
			2 => Ok(Order::Bigram),
			_ => Err(format!("Unsupported order {}, n must be 1 or 2", n)),
		}
	}
}

/// Smoothing strategy applied to probability estimates.
///
/// Each variant carries the parameters it needs, so an interpolated model
/// can never exist without its weight.
///
/// # Variants
/// - `None`: relative frequencies, unseen events get probability 0.
/// - `Additive { k }`: add-k smoothing over the vocabulary.
/// - `Interpolation { k, lambda }`: `lambda` times the add-k bigram estimate
///   plus `1 - lambda` times the add-k unigram estimate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Smoothing {
	None,
	Additive { k: f64 },
	Interpolation { k: f64, lambda: f64 },
}

impl Smoothing {
	/// Builds a smoothing strategy from its mode name.
	///
	/// Accepted names are `none`, `addk` (or `additive`) and `interp`
	/// (or `interpolation`). `k` is ignored by `none`, `lambda` is only used
	/// by interpolation.
	///
	/// # Errors
	/// Returns an error for an unknown mode name or out-of-range parameters.
	pub fn from_name(name: &str, k: f64, lambda: f64) -> Result<Self, String> {
		let smoothing = match name.to_lowercase().as_str() {
			"none" => Smoothing::None,
			"addk" | "additive" => Smoothing::Additive { k },
			"interp" | "interpolation" => Smoothing::Interpolation { k, lambda },
			_ => return Err(format!("Unknown smoothing '{}', expected none, addk or interp", name)),
		};
		smoothing.validate()?;
		Ok(smoothing)
	}

	/// Short mode name, as accepted by [`Smoothing::from_name`].
	pub fn name(&self) -> &'static str {
		match self {
			Smoothing::None => "none",
			Smoothing::Additive { .. } => "addk",
			Smoothing::Interpolation { .. } => "interp",
		}
	}

	/// Checks the parameter ranges.
	///
	/// # Errors
	/// - `k` must be finite and strictly positive.
	/// - `lambda` must lie in `[0.0, 1.0]`.
	pub fn validate(&self) -> Result<(), String> {
		match *self {
			Smoothing::None => Ok(()),
			Smoothing::Additive { k } => check_k(k),
			Smoothing::Interpolation { k, lambda } => {
				check_k(k)?;
				if !(0.0..=1.0).contains(&lambda) {
					return Err("Lambda must be between 0.0 and 1.0".to_owned());
				}
				Ok(())
			}
		}
	}
}

fn check_k(k: f64) -> Result<(), String> {
	if !k.is_finite() || k <= 0.0 {
		return Err(format!("k must be a positive number, got {}", k));
	}
	Ok(())
}

impl fmt::Display for Smoothing {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Smoothing::None => write!(f, "none"),
			Smoothing::Additive { k } => write!(f, "addk(k={})", k),
			Smoothing::Interpolation { k, lambda } => write!(f, "interp(k={}, lambda={})", k, lambda),
		}
	}
}

/// Immutable parameters of an n-gram model.
///
/// # Invariants
/// - `smoothing` parameters are in range (checked by [`ModelConfig::new`])
/// - Never changes after the model is built
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelConfig {
	order: Order,
	smoothing: Smoothing,
	min_freq: usize,
}

impl ModelConfig {
	/// Creates a validated configuration.
	///
	/// # Errors
	/// Returns an error if the smoothing parameters are out of range.
	pub fn new(order: Order, smoothing: Smoothing, min_freq: usize) -> Result<Self, String> {
		smoothing.validate()?;
		Ok(Self { order, smoothing, min_freq })
	}

	/// Creates a configuration from raw option values.
	///
	/// # Errors
	/// Returns an error if `n` is not 1 or 2, or the smoothing is invalid.
	pub fn from_options(n: usize, smoothing: &str, k: f64, lambda: f64, min_freq: usize) -> Result<Self, String> {
		Self::new(Order::try_from(n)?, Smoothing::from_name(smoothing, k, lambda)?, min_freq)
	}

	pub fn order(&self) -> Order {
		self.order
	}

	pub fn smoothing(&self) -> Smoothing {
		self.smoothing
	}

	/// Minimum number of training occurrences for a token to stay in the vocabulary.
	pub fn min_freq(&self) -> usize {
		self.min_freq
	}
}
