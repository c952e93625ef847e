//! Data model: plugin artifacts, categories, sources, and remote manifests.

mod category;
mod plugin;
mod remote;
mod source;

pub use category::Category;
pub use plugin::{MatchBlock, OutputBlock, PluginType, Severity, TriggerAtom, YamlPlugin};
pub use remote::{RemoteManifest, RemoteManifestEntry};
pub use source::PluginSource;
