//! Proxy resolver configuration.

use serde::{Deserialize, Serialize};

/// Name allow-lists and patterns the proxy resolver matches against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// View functions that return the implementation address or class hash
    #[serde(default = "default_getter_names")]
    pub getter_names: Vec<String>,
    /// Case-insensitive substring identifying implementation arguments and constructor inputs
    #[serde(default = "default_implementation_pattern")]
    pub implementation_pattern: String,
    /// Case-insensitive substring identifying upgrade events
    #[serde(default = "default_upgrade_pattern")]
    pub upgrade_pattern: String,
    /// ABI type the implementation argument must have
    #[serde(default = "default_argument_type")]
    pub argument_type: String,
}

fn default_getter_names() -> Vec<String> {
    [
        "get_implementation",
        "getImplementation",
        "implementation",
        "get_implementation_hash",
        "getImplementationHash",
        "get_implementation_class_hash",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_implementation_pattern() -> String { "implement".into() }
fn default_upgrade_pattern() -> String { "upgrade".into() }
fn default_argument_type() -> String { "felt".into() }

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            getter_names: default_getter_names(),
            implementation_pattern: default_implementation_pattern(),
            upgrade_pattern: default_upgrade_pattern(),
            argument_type: default_argument_type(),
        }
    }
}

impl ResolverConfig {
    pub fn is_getter(&self, name: &str) -> bool {
        self.getter_names.iter().any(|g| g == name)
    }

    pub fn mentions_implementation(&self, name: &str) -> bool {
        contains_ignore_case(name, &self.implementation_pattern)
    }

    pub fn mentions_upgrade(&self, name: &str) -> bool {
        contains_ignore_case(name, &self.upgrade_pattern)
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
