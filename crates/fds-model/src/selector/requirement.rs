use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

use crate::{ModelError, ModelResult, selector::compiled::Matcher};

/// Set-based selector operator.
///
/// Serialized with the API spelling (`In`, `NotIn`, `Exists`, `DoesNotExist`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Key present and its value is one of `values`.
    In,
    /// Key absent, or its value is none of `values`.
    NotIn,
    /// Key present, any value.
    Exists,
    /// Key absent.
    DoesNotExist,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::In => "In",
            Operator::NotIn => "NotIn",
            Operator::Exists => "Exists",
            Operator::DoesNotExist => "DoesNotExist",
        };
        f.write_str(s)
    }
}

/// Single `matchExpressions` entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    /// Label key the requirement applies to.
    pub key: String,
    /// Relation between the key and `values`.
    pub operator: Operator,
    /// Candidate values; must be empty for `Exists` / `DoesNotExist`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl Requirement {
    /// Create a new requirement.
    pub fn new<K, I, V>(key: K, operator: Operator, values: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            key: key.into(),
            operator,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub(crate) fn compile(&self) -> ModelResult<Matcher> {
        if self.key.trim().is_empty() {
            return Err(ModelError::InvalidSelector(
                "matchExpressions contains an empty key".into(),
            ));
        }
        let values: BTreeSet<String> = self.values.iter().cloned().collect();

        match self.operator {
            Operator::In | Operator::NotIn if values.is_empty() => {
                Err(ModelError::InvalidSelector(format!(
                    "operator {} on key '{}' requires at least one value",
                    self.operator, self.key
                )))
            }
            Operator::Exists | Operator::DoesNotExist if !values.is_empty() => {
                Err(ModelError::InvalidSelector(format!(
                    "operator {} on key '{}' must not carry values",
                    self.operator, self.key
                )))
            }
            Operator::In => Ok(Matcher::In(self.key.clone(), values)),
            Operator::NotIn => Ok(Matcher::NotIn(self.key.clone(), values)),
            Operator::Exists => Ok(Matcher::Exists(self.key.clone())),
            Operator::DoesNotExist => Ok(Matcher::DoesNotExist(self.key.clone())),
        }
    }

    pub(crate) fn to_query(&self) -> String {
        let sorted: BTreeSet<&str> = self.values.iter().map(String::as_str).collect();
        let values = sorted.into_iter().collect::<Vec<_>>().join(",");

        match self.operator {
            Operator::In => format!("{} in ({values})", self.key),
            Operator::NotIn => format!("{} notin ({values})", self.key),
            Operator::Exists => self.key.clone(),
            Operator::DoesNotExist => format!("!{}", self.key),
        }
    }
}
