use std::collections::BTreeSet;

use crate::Labels;

/// One validated requirement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Matcher {
    Equals(String, String),
    In(String, BTreeSet<String>),
    NotIn(String, BTreeSet<String>),
    Exists(String),
    DoesNotExist(String),
}

impl Matcher {
    pub(crate) fn equals(key: &str, value: &str) -> Self {
        Matcher::Equals(key.to_string(), value.to_string())
    }

    fn matches(&self, labels: &Labels) -> bool {
        match self {
            Matcher::Equals(k, v) => labels.get(k) == Some(v.as_str()),
            Matcher::In(k, values) => labels.get(k).is_some_and(|v| values.contains(v)),
            Matcher::NotIn(k, values) => labels.get(k).is_none_or(|v| !values.contains(v)),
            Matcher::Exists(k) => labels.contains_key(k),
            Matcher::DoesNotExist(k) => !labels.contains_key(k),
        }
    }
}

/// Compiled label selector, ready to be matched repeatedly.
///
/// Obtained from [`crate::LabelSelector::compile`], or from
/// [`crate::AntiAffinityTerm::compile_selector`] which yields [`Selector::nothing`]
/// for a term whose selector is absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    matchers: Vec<Matcher>,
    nothing: bool,
}

impl Selector {
    pub(crate) fn from_matchers(matchers: Vec<Matcher>) -> Self {
        Self {
            matchers,
            nothing: false,
        }
    }

    /// Selector that matches no label set.
    pub fn nothing() -> Self {
        Self {
            matchers: Vec::new(),
            nothing: true,
        }
    }

    /// Returns `true` if `labels` satisfies every requirement.
    pub fn matches(&self, labels: &Labels) -> bool {
        !self.nothing && self.matchers.iter().all(|m| m.matches(labels))
    }
}
