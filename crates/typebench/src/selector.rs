//! Selector chains and selector sets.
//!
//! A [`SelectorChain`] is an ordered list of CSS selectors where every step
//! after the first is resolved inside the shadow root (or, lacking one, the
//! subtree) of the element matched by the previous step. A [`SelectorSet`]
//! lists alternative chains for the same element; the first chain that
//! resolves wins.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::result::{TypebenchError, TypebenchResult};
use crate::wait::DEFAULT_POLL_INTERVAL_MS;

/// Default per-step timeout for element resolution (5 seconds)
pub const DEFAULT_RESOLVE_TIMEOUT_MS: u64 = 5000;

/// Separator used when rendering a chain for diagnostics
pub const CHAIN_SEPARATOR: &str = " >> ";

/// Ordered selector steps, each scoped to the previous step's shadow-root-or-self
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SelectorChain {
    steps: Vec<String>,
}

impl SelectorChain {
    /// Create a chain from its steps.
    ///
    /// An empty chain can be built but is rejected when resolved.
    #[must_use]
    pub fn new<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            steps: steps.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a single-step chain
    #[must_use]
    pub fn single(selector: impl Into<String>) -> Self {
        Self {
            steps: vec![selector.into()],
        }
    }

    /// The selector steps in resolution order
    #[must_use]
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Number of steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the chain has no steps
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Fail with `InvalidInput` when the chain is empty
    pub fn ensure_not_empty(&self) -> TypebenchResult<()> {
        if self.is_empty() {
            return Err(TypebenchError::invalid_input(
                "empty selector chain provided",
            ));
        }
        if self.steps.iter().any(|s| s.trim().is_empty()) {
            return Err(TypebenchError::invalid_input(format!(
                "blank selector step in chain {self}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for SelectorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.steps.join(CHAIN_SEPARATOR))
    }
}

impl From<&str> for SelectorChain {
    fn from(selector: &str) -> Self {
        Self::single(selector)
    }
}

impl From<String> for SelectorChain {
    fn from(selector: String) -> Self {
        Self::single(selector)
    }
}

impl<S: Into<String>> From<Vec<S>> for SelectorChain {
    fn from(steps: Vec<S>) -> Self {
        Self::new(steps)
    }
}

impl<'de> Deserialize<'de> for SelectorChain {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // A bare string is shorthand for a one-step chain.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Single(String),
            Steps(Vec<String>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Single(s) => Self::single(s),
            Repr::Steps(steps) => Self { steps },
        })
    }
}

/// Alternative chains for one logical element, tried in order
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectorSet {
    chains: Vec<SelectorChain>,
}

impl SelectorSet {
    /// Create a set from its chains
    #[must_use]
    pub fn new<I, C>(chains: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<SelectorChain>,
    {
        Self {
            chains: chains.into_iter().map(Into::into).collect(),
        }
    }

    /// The chains in priority order
    #[must_use]
    pub fn chains(&self) -> &[SelectorChain] {
        &self.chains
    }

    /// Number of alternative chains
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Whether the set has no chains
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Fail with `InvalidInput` when the set has no chains
    pub fn ensure_not_empty(&self) -> TypebenchResult<()> {
        if self.is_empty() {
            return Err(TypebenchError::invalid_input("empty selector set provided"));
        }
        Ok(())
    }

    /// Stricter check used for configuration: every chain must be usable too
    pub fn validate(&self) -> TypebenchResult<()> {
        self.ensure_not_empty()?;
        self.chains
            .iter()
            .try_for_each(SelectorChain::ensure_not_empty)
    }

    /// JSON rendering used in error messages
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self.chains))
    }
}

impl fmt::Display for SelectorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

impl From<SelectorChain> for SelectorSet {
    fn from(chain: SelectorChain) -> Self {
        Self {
            chains: vec![chain],
        }
    }
}

/// Options for resolving a selector chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Budget for each step of a chain
    pub timeout: Duration,
    /// Delay between polls of a single step
    pub poll_interval: Duration,
    /// Whether the matched element must be visible
    pub visible: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_RESOLVE_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            visible: true,
        }
    }
}

impl ResolveOptions {
    /// Create options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-step timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the per-step timeout in milliseconds
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout = Duration::from_millis(timeout_ms);
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the visibility requirement
    #[must_use]
    pub const fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

/// Comparison applied by count-based waits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CountOperator {
    /// `==`
    #[serde(rename = "==")]
    Equal,
    /// `>=`
    #[default]
    #[serde(rename = ">=")]
    AtLeast,
    /// `<=`
    #[serde(rename = "<=")]
    AtMost,
}

impl CountOperator {
    /// Whether `actual` satisfies the comparison against `expected`
    #[must_use]
    pub const fn compare(self, actual: usize, expected: usize) -> bool {
        match self {
            Self::Equal => actual == expected,
            Self::AtLeast => actual >= expected,
            Self::AtMost => actual <= expected,
        }
    }

    /// Operator symbol
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::AtLeast => ">=",
            Self::AtMost => "<=",
        }
    }
}

impl fmt::Display for CountOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CountOperator {
    type Err = TypebenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "==" => Ok(Self::Equal),
            ">=" => Ok(Self::AtLeast),
            "<=" => Ok(Self::AtMost),
            other => Err(TypebenchError::invalid_input(format!(
                "unknown count operator '{other}' (expected ==, >= or <=)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    mod chain_tests {
        use super::*;

        #[test]
        fn test_chain_display_joins_steps() {
            let chain = SelectorChain::new(["todo-app", "todo-form", "input"]);
            assert_eq!(chain.to_string(), "todo-app >> todo-form >> input");
            assert_eq!(chain.len(), 3);
        }

        #[test]
        fn test_empty_chain_rejected() {
            let chain = SelectorChain::default();
            assert!(chain.is_empty());
            assert!(matches!(
                chain.ensure_not_empty(),
                Err(TypebenchError::InvalidInput { .. })
            ));
        }

        #[test]
        fn test_blank_step_rejected() {
            let chain = SelectorChain::new(["todo-app", "  "]);
            assert!(chain.ensure_not_empty().is_err());
        }

        #[test]
        fn test_chain_from_str() {
            let chain: SelectorChain = "#new-todo".into();
            assert_eq!(chain.steps(), ["#new-todo"]);
        }

        #[test]
        fn test_chain_deserializes_from_string_or_list() {
            let single: SelectorChain = serde_json::from_str("\"input\"").unwrap();
            assert_eq!(single, SelectorChain::single("input"));

            let steps: SelectorChain = serde_json::from_str(r#"["a", "b"]"#).unwrap();
            assert_eq!(steps, SelectorChain::new(["a", "b"]));
        }
    }

    mod set_tests {
        use super::*;

        #[test]
        fn test_empty_set_rejected() {
            let set = SelectorSet::default();
            assert!(matches!(
                set.ensure_not_empty(),
                Err(TypebenchError::InvalidInput { .. })
            ));
        }

        #[test]
        fn test_set_with_empty_chain_fails_validation_only() {
            let set = SelectorSet::new([SelectorChain::single("input"), SelectorChain::default()]);
            assert!(set.ensure_not_empty().is_ok());
            assert!(set.validate().is_err());
        }

        #[test]
        fn test_set_json_rendering() {
            let set = SelectorSet::new([
                SelectorChain::new(["todo-app", "input"]),
                SelectorChain::single("#new-todo"),
            ]);
            assert_eq!(set.to_json(), r##"[["todo-app","input"],["#new-todo"]]"##);
            assert_eq!(set.to_string(), set.to_json());
        }

        #[test]
        fn test_set_yaml_roundtrip_shape() {
            let set: SelectorSet =
                serde_yaml_ng::from_str("- [todo-app, input]\n- \"#new-todo\"\n").unwrap();
            assert_eq!(set.len(), 2);
            assert_eq!(set.chains()[1], SelectorChain::single("#new-todo"));
        }
    }

    mod options_tests {
        use super::*;

        #[test]
        fn test_resolve_options_default() {
            let opts = ResolveOptions::default();
            assert_eq!(opts.timeout, Duration::from_millis(DEFAULT_RESOLVE_TIMEOUT_MS));
            assert_eq!(opts.poll_interval, Duration::from_millis(100));
            assert!(opts.visible);
        }

        #[test]
        fn test_resolve_options_builder() {
            let opts = ResolveOptions::new()
                .with_timeout_ms(250)
                .with_poll_interval(Duration::from_millis(10))
                .with_visible(false);
            assert_eq!(opts.timeout, Duration::from_millis(250));
            assert_eq!(opts.poll_interval, Duration::from_millis(10));
            assert!(!opts.visible);
        }
    }

    mod operator_tests {
        use super::*;

        #[test]
        fn test_comparator_table() {
            let satisfied = |op: CountOperator| -> Vec<usize> {
                (0..=3).filter(|&count| op.compare(count, 2)).collect()
            };
            assert_eq!(satisfied(CountOperator::AtLeast), vec![2, 3]);
            assert_eq!(satisfied(CountOperator::AtMost), vec![0, 1, 2]);
            assert_eq!(satisfied(CountOperator::Equal), vec![2]);
        }

        #[test]
        fn test_default_is_at_least() {
            assert_eq!(CountOperator::default(), CountOperator::AtLeast);
        }

        #[test]
        fn test_parse_operator() {
            assert_eq!("==".parse::<CountOperator>().unwrap(), CountOperator::Equal);
            assert_eq!(">=".parse::<CountOperator>().unwrap(), CountOperator::AtLeast);
            assert_eq!("<=".parse::<CountOperator>().unwrap(), CountOperator::AtMost);
            assert!("<".parse::<CountOperator>().is_err());
        }

        #[test]
        fn test_operator_serde() {
            let op: CountOperator = serde_json::from_str("\"<=\"").unwrap();
            assert_eq!(op, CountOperator::AtMost);
            assert_eq!(serde_json::to_string(&CountOperator::Equal).unwrap(), "\"==\"");
        }

        proptest! {
            #[test]
            fn prop_operators_partition_ordering(actual in 0usize..1000, expected in 0usize..1000) {
                let eq = CountOperator::Equal.compare(actual, expected);
                let ge = CountOperator::AtLeast.compare(actual, expected);
                let le = CountOperator::AtMost.compare(actual, expected);
                prop_assert_eq!(eq, ge && le);
                prop_assert!(ge || le);
            }

            #[test]
            fn prop_operator_display_parses_back(idx in 0usize..3) {
                let op = [CountOperator::Equal, CountOperator::AtLeast, CountOperator::AtMost][idx];
                prop_assert_eq!(op.to_string().parse::<CountOperator>().unwrap(), op);
            }
        }
    }
}
