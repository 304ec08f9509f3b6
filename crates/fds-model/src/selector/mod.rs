//! Label selectors in their wire form and their compiled, matchable form.
//!
//! [`LabelSelector`] mirrors the API object (`matchLabels` + `matchExpressions`).
//! Calling [`LabelSelector::compile`] validates it once and produces a [`Selector`]
//! that can be matched against many label sets without re-parsing.
mod requirement;
pub use requirement::{Operator, Requirement};

mod compiled;
pub use compiled::Selector;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Labels, ModelError, ModelResult};

/// Label query over a set of objects.
///
/// All `match_labels` entries and all `match_expressions` must hold (logical AND).
/// An empty selector matches every label set.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// Exact key/value pairs, equivalent to `In` with a single value.
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub match_labels: Labels,
    /// Set-based requirements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_expressions: Vec<Requirement>,
}

impl LabelSelector {
    /// Create an empty selector (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a selector from exact key/value pairs only.
    pub fn from_labels(labels: Labels) -> Self {
        Self {
            match_labels: labels,
            match_expressions: Vec::new(),
        }
    }

    /// Append a set-based requirement.
    ///
    /// Returns `self` for chaining.
    pub fn with_expression(mut self, req: Requirement) -> Self {
        self.match_expressions.push(req);
        self
    }

    /// Returns `true` if the selector carries no requirements at all.
    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty() && self.match_expressions.is_empty()
    }

    /// Validate the selector and turn it into a matchable [`Selector`].
    ///
    /// Rules:
    /// - every key is non-empty;
    /// - `In` / `NotIn` carry at least one value;
    /// - `Exists` / `DoesNotExist` carry no values.
    pub fn compile(&self) -> ModelResult<Selector> {
        let mut matchers = Vec::with_capacity(self.match_labels.len() + self.match_expressions.len());

        for (key, value) in self.match_labels.iter() {
            if key.trim().is_empty() {
                return Err(ModelError::InvalidSelector(
                    "matchLabels contains an empty key".into(),
                ));
            }
            matchers.push(compiled::Matcher::equals(key, value));
        }
        for req in &self.match_expressions {
            matchers.push(req.compile()?);
        }
        Ok(Selector::from_matchers(matchers))
    }

    /// Render the selector in the API server `labelSelector` query syntax.
    ///
    /// `matchLabels` render as `k=v`, expressions as `k in (a,b)`, `k notin (a,b)`,
    /// `k` and `!k`. Values are sorted so the output is stable.
    /// An empty selector renders as an empty string (select everything).
    pub fn to_query(&self) -> String {
        let mut parts: Vec<String> = self
            .match_labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        parts.extend(self.match_expressions.iter().map(Requirement::to_query));
        parts.join(",")
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("<everything>");
        }
        f.write_str(&self.to_query())
    }
}
