//! Configuration types deserialized from `strata.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use strata_common::ContentHash;

/// The top-level project configuration parsed from `strata.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata.
    pub project: ProjectMeta,
    /// Modules of the project keyed by module name.
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleConfig>,
    /// Settings shared by every resolution session of the project.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Check suppression and promotion settings.
    #[serde(default)]
    pub checks: CheckConfig,
}

/// Core project metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// The project version string.
    #[serde(default)]
    pub version: String,
    /// A brief description of the project.
    #[serde(default)]
    pub description: String,
}

/// The compilation platform a module targets.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Platform-independent code shared by other modules through dependsOn edges.
    #[default]
    Common,
    /// JVM bytecode.
    Jvm,
    /// JavaScript.
    Js,
    /// Native binaries.
    Native,
    /// WebAssembly.
    Wasm,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Common => "common",
            Platform::Jvm => "jvm",
            Platform::Js => "js",
            Platform::Native => "native",
            Platform::Wasm => "wasm",
        };
        f.write_str(name)
    }
}

/// One module of the project and its three kinds of dependency edges.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleConfig {
    /// Target platform of the module.
    #[serde(default)]
    pub platform: Platform,
    /// Regular compile dependencies.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Modules this module refines (expect/actual source-set edges).
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Modules whose internal declarations this module may access.
    #[serde(default)]
    pub friends: Vec<String>,
}

/// Settings that shape how resolution sessions behave.
///
/// Two sessions for the same module are shared only when their analysis
/// configurations have the same [`fingerprint`](Self::fingerprint).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Language version the resolvers assume.
    #[serde(default = "default_language_version")]
    pub language_version: String,
    /// Re-run a phase resolver that failed previously instead of returning
    /// the recorded failure.
    #[serde(default = "default_true")]
    pub retry_failed_phases: bool,
    /// Verify the exactly-once traversal invariant after every diagnostic pass.
    #[serde(default = "default_true")]
    pub verify_traversal: bool,
    /// Resolve declarations and check files on the rayon thread pool.
    #[serde(default = "default_true")]
    pub parallel: bool,
}

fn default_language_version() -> String {
    "2.0".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            language_version: default_language_version(),
            retry_failed_phases: true,
            verify_traversal: true,
            parallel: true,
        }
    }
}

impl AnalysisConfig {
    /// Returns a stable hash of every setting.
    pub fn fingerprint(&self) -> ContentHash {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        ContentHash::from_bytes(&bytes)
    }
}

/// Check settings: which checks are promoted to errors or suppressed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckConfig {
    /// Check names whose diagnostics are promoted to errors.
    #[serde(default)]
    pub deny: Vec<String>,
    /// Check names that are not run.
    #[serde(default)]
    pub allow: Vec<String>,
}
