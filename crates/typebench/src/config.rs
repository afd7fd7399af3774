//! Benchmark target configuration.
//!
//! Targets are loaded from YAML and validated once at startup:
//!
//! ```yaml
//! targets:
//!   vanilla:
//!     url: http://localhost:8000
//!   lit:
//!     url: http://localhost:8001
//!     input_selectors: [["todo-app", "todo-form", "input"]]
//! defaults:
//!   input_selectors: [["input.new-todo"], ["#new-todo"]]
//!   item_selectors: [[".todo-list li"]]
//!   timeout_ms: 5000
//!   viewport: { width: 1280, height: 800 }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::browser::{DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH};
use crate::result::{TypebenchError, TypebenchResult};
use crate::selector::{SelectorChain, SelectorSet, DEFAULT_RESOLVE_TIMEOUT_MS};

/// Viewport dimensions in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: DEFAULT_VIEWPORT_WIDTH,
            height: DEFAULT_VIEWPORT_HEIGHT,
        }
    }
}

/// One entry of the `targets` map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetEntry {
    /// Page to open
    pub url: String,
    /// Override for the default input selectors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_selectors: Option<SelectorSet>,
    /// Override for the default item selectors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_selectors: Option<SelectorSet>,
}

impl TargetEntry {
    /// Entry with only a URL
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            input_selectors: None,
            item_selectors: None,
        }
    }
}

/// Settings shared by every target unless overridden
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Defaults {
    /// Where to type
    pub input_selectors: SelectorSet,
    /// What counts as a created item
    pub item_selectors: SelectorSet,
    /// Budget for each wait, in milliseconds
    pub timeout_ms: u64,
    /// Page viewport
    pub viewport: Viewport,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            input_selectors: SelectorSet::new([
                SelectorChain::single("input.new-todo"),
                SelectorChain::single("#new-todo"),
            ]),
            item_selectors: SelectorSet::new([
                SelectorChain::single(".todo-list li"),
                SelectorChain::single("li.todo-item"),
            ]),
            timeout_ms: DEFAULT_RESOLVE_TIMEOUT_MS,
            viewport: Viewport::default(),
        }
    }
}

/// The whole configuration file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Named targets
    pub targets: BTreeMap<String, TargetEntry>,
    /// Shared settings
    #[serde(default)]
    pub defaults: Defaults,
}

/// A target with its defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Target name, used for output file names
    pub name: String,
    /// Parsed page URL
    pub url: Url,
    /// Where to type
    pub input_selectors: SelectorSet,
    /// What counts as a created item
    pub item_selectors: SelectorSet,
    /// Budget for each wait
    pub timeout: Duration,
    /// Page viewport
    pub viewport: Viewport,
}

impl TargetConfig {
    /// Three local implementations on ports 8000 to 8002
    #[must_use]
    pub fn builtin() -> Self {
        let targets = [("vanilla", 8000), ("lit", 8001), ("react", 8002)]
            .into_iter()
            .map(|(name, port)| {
                (
                    name.to_string(),
                    TargetEntry::new(format!("http://localhost:{port}")),
                )
            })
            .collect();
        Self {
            targets,
            defaults: Defaults::default(),
        }
    }

    /// Parse from YAML text
    ///
    /// # Errors
    ///
    /// Returns error if the YAML is malformed or has unknown keys
    pub fn from_yaml_str(yaml: &str) -> TypebenchResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Read and parse a YAML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> TypebenchResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    /// Serialize to YAML
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_yaml(&self) -> TypebenchResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Check the whole file
    ///
    /// # Errors
    ///
    /// Returns the first problem found as a `Config` error
    pub fn validate(&self) -> TypebenchResult<()> {
        if self.targets.is_empty() {
            return Err(TypebenchError::config("no targets configured"));
        }
        if self.defaults.timeout_ms == 0 {
            return Err(TypebenchError::config("timeout_ms must be greater than zero"));
        }
        validate_selectors("defaults.input_selectors", &self.defaults.input_selectors)?;
        validate_selectors("defaults.item_selectors", &self.defaults.item_selectors)?;

        for (name, entry) in &self.targets {
            if name.trim().is_empty() {
                return Err(TypebenchError::config("target names must not be empty"));
            }
            parse_target_url(name, &entry.url)?;
            if let Some(ref set) = entry.input_selectors {
                validate_selectors(&format!("{name}.input_selectors"), set)?;
            }
            if let Some(ref set) = entry.item_selectors {
                validate_selectors(&format!("{name}.item_selectors"), set)?;
            }
        }
        Ok(())
    }

    /// Target names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    /// Look up `name` and apply defaults
    ///
    /// # Errors
    ///
    /// Returns a `Config` error for unknown names or an invalid URL
    pub fn resolve(&self, name: &str) -> TypebenchResult<Target> {
        let entry = self.targets.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.names().collect();
            TypebenchError::config(format!(
                "unknown target '{name}' (known: {})",
                known.join(", ")
            ))
        })?;
        Ok(Target {
            name: name.to_string(),
            url: parse_target_url(name, &entry.url)?,
            input_selectors: entry
                .input_selectors
                .clone()
                .unwrap_or_else(|| self.defaults.input_selectors.clone()),
            item_selectors: entry
                .item_selectors
                .clone()
                .unwrap_or_else(|| self.defaults.item_selectors.clone()),
            timeout: Duration::from_millis(self.defaults.timeout_ms),
            viewport: self.defaults.viewport,
        })
    }
}

fn parse_target_url(name: &str, raw: &str) -> TypebenchResult<Url> {
    let url = Url::parse(raw)
        .map_err(|e| TypebenchError::config(format!("target '{name}': invalid url '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(TypebenchError::config(format!(
            "target '{name}': url must be http or https, got '{}'",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(TypebenchError::config(format!(
            "target '{name}': url '{raw}' has no host"
        )));
    }
    Ok(url)
}

fn validate_selectors(field: &str, set: &SelectorSet) -> TypebenchResult<()> {
    set.validate()
        .map_err(|e| TypebenchError::config(format!("{field}: {e}")))
}
