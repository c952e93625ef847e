//! The plugin artifact (`YamlPlugin`) and its metadata enums.

// std
use std::{collections::HashSet, path::PathBuf};
// crates.io
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
// self
use crate::{Error, Result};

/// How a plugin's output is consumed by the (out-of-scope) evaluator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginType {
	Evaluation,
	Output,
	Integration,
}
impl Default for PluginType {
	fn default() -> Self {
		Self::Evaluation
	}
}

/// Severity rating carried by a plugin's metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
	Info,
	Low,
	Medium,
	High,
	Critical,
}
impl Default for Severity {
	fn default() -> Self {
		Self::Medium
	}
}

/// Logical combinator for a [`MatchBlock`]'s rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchLogic {
	And,
	Or,
}

/// An opaque condition atom. The core never interprets these; it only validates shape and
/// hands them to the (out-of-scope) evaluator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriggerAtom {
	/// Condition kind, interpreted by the evaluator (e.g. `"port_open"`, `"banner_contains"`).
	#[serde(rename = "type")]
	pub kind: String,
	/// Free-form parameters for the condition, passed through unevaluated.
	#[serde(default)]
	pub params: serde_yaml::Mapping,
}

/// An opaque match block: a logic combinator over a non-empty rule list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchBlock {
	/// Combinator applied across `rules`.
	pub logic: MatchLogic,
	/// Rules combined by `logic`; must be non-empty.
	pub rules: Vec<TriggerAtom>,
}

/// An opaque output block; only `message` is required by the core.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputBlock {
	/// Human-readable finding message template, interpreted by the evaluator.
	pub message: String,
	/// Free-form additional output parameters, passed through unevaluated.
	#[serde(flatten)]
	pub extra: serde_yaml::Mapping,
}

/// A single parsed plugin definition, decoded from YAML or JSON by the [`crate::loader`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct YamlPlugin {
	/// Slug identifier, `^[a-z][a-z0-9_-]{2,62}$`.
	pub id: String,
	/// Display name.
	pub name: String,
	/// SemVer version.
	pub version: semver::Version,
	/// Plugin kind, consumed by the evaluator.
	#[serde(rename = "type", default)]
	pub plugin_type: PluginType,
	/// Author attribution.
	pub author: String,
	/// Minimum host version constraint this plugin requires, if any.
	#[serde(default)]
	pub min_host_version: Option<semver::VersionReq>,

	/// Severity rating.
	#[serde(default)]
	pub severity: Severity,
	/// Free-form classification tags.
	#[serde(default)]
	pub tags: HashSet<String>,
	/// Optional CVE identifier this plugin detects.
	#[serde(default)]
	pub cve: Option<String>,

	/// Ordered trigger conditions, opaque to the core.
	#[serde(default)]
	pub triggers: Vec<TriggerAtom>,
	/// Optional match block, opaque to the core.
	#[serde(rename = "match", default)]
	pub match_block: Option<MatchBlock>,
	/// Output block; required by the data model even though its contents are opaque.
	pub output: OutputBlock,

	/// Path on disk this artifact was loaded from. Populated by the loader, not by serde.
	#[serde(skip)]
	pub file_path: PathBuf,
	/// When the loader read this artifact. Populated by the loader, not by serde.
	#[serde(skip)]
	pub loaded_at: Option<DateTime<Utc>>,
}
impl YamlPlugin {
	/// Validates required fields are non-empty and that `match.rules` is non-empty whenever
	/// `match` is present.
	pub fn validate(&self) -> Result<()> {
		crate::validate::validate_plugin_id(&self.id)?;

		if self.name.trim().is_empty() {
			return Err(Error::Validation { field: "name", reason: "Must not be empty.".into() });
		}
		if self.author.trim().is_empty() {
			return Err(Error::Validation { field: "author", reason: "Must not be empty.".into() });
		}
		if let Some(block) = &self.match_block
			&& block.rules.is_empty()
		{
			return Err(Error::Validation { field: "match.rules", reason: "Must be non-empty when present.".into() });
		}
		if self.output.message.trim().is_empty() {
			return Err(Error::Validation { field: "output.message", reason: "Must not be empty.".into() });
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> YamlPlugin {
		YamlPlugin {
			id: "ssh-weak-cipher".into(),
			name: "SSH weak cipher".into(),
			version: semver::Version::new(1, 0, 0),
			plugin_type: PluginType::Evaluation,
			author: "scanhub".into(),
			min_host_version: None,
			severity: Severity::High,
			tags: HashSet::from(["ssh".to_string()]),
			cve: None,
			triggers: vec![],
			match_block: None,
			output: OutputBlock { message: "weak cipher detected".into(), extra: Default::default() },
			file_path: PathBuf::new(),
			loaded_at: None,
		}
	}

	#[test]
	fn validate_rejects_empty_match_rules() {
		let mut plugin = sample();

		plugin.match_block = Some(MatchBlock { logic: MatchLogic::And, rules: vec![] });

		assert!(plugin.validate().is_err());
	}

	#[test]
	fn validate_accepts_well_formed_plugin() {
		assert!(sample().validate().is_ok());
	}
}
