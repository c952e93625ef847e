//! Closed category vocabulary used for bulk selection.

use serde::{Deserialize, Serialize};

/// Fixed-vocabulary classification tag. `Misc` is the fallback for unrecognized input when
/// loading artifacts authored elsewhere; direct caller input is validated strictly instead
/// (see [`crate::validate::validate_category`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
	Ssh,
	Http,
	Web,
	Tls,
	Database,
	Iot,
	Network,
	Misc,
}
impl Category {
	/// All categories in the fixed vocabulary, `Misc` last.
	pub const ALL: [Category; 8] = [
		Category::Ssh,
		Category::Http,
		Category::Web,
		Category::Tls,
		Category::Database,
		Category::Iot,
		Category::Network,
		Category::Misc,
	];

	/// The lowercase tag used in manifests, tag indices, and display.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Ssh => "ssh",
			Self::Http => "http",
			Self::Web => "web",
			Self::Tls => "tls",
			Self::Database => "database",
			Self::Iot => "iot",
			Self::Network => "network",
			Self::Misc => "misc",
		}
	}

	/// Parses a category name case-insensitively, falling back to [`Category::Misc`] for any
	/// value outside the enumerated set. Used when loading artifacts, where an unrecognized
	/// category should not fail the whole load.
	pub fn parse_lenient(raw: &str) -> Self {
		Self::parse_strict(raw).unwrap_or(Self::Misc)
	}

	/// Parses a category name case-insensitively, returning `None` if it is not one of the
	/// enumerated categories (including `misc` itself, which must be spelled explicitly).
	pub fn parse_strict(raw: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|category| category.as_str().eq_ignore_ascii_case(raw))
	}
}
impl std::fmt::Display for Category {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
impl<'de> serde::Deserialize<'de> for Category {
	/// Routes unrecognized values to [`Category::Misc`] via [`Category::parse_lenient`] rather
	/// than failing, so one unknown tag in a remote manifest doesn't sink the whole decode.
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;

		Ok(Self::parse_lenient(&raw))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lenient_parse_falls_back_to_misc() {
		assert_eq!(Category::parse_lenient("SSH"), Category::Ssh);
		assert_eq!(Category::parse_lenient("nonsense"), Category::Misc);
	}

	#[test]
	fn strict_parse_rejects_unknown() {
		assert_eq!(Category::parse_strict("nonsense"), None);
		assert_eq!(Category::parse_strict("misc"), Some(Category::Misc));
	}

	#[test]
	fn deserialize_falls_back_to_misc_on_unknown_value() {
		let known: Category = serde_json::from_str("\"ssh\"").unwrap();
		let unknown: Category = serde_json::from_str("\"quantum\"").unwrap();

		assert_eq!(known, Category::Ssh);
		assert_eq!(unknown, Category::Misc);
	}
}
