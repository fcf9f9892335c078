//! Wire-shaped filter expressions: a two-level list of rules, deserialized with `serde`
//! the same way this corpus's other wire messages are typed structures rather than
//! hand-rolled parsers.

use serde::Deserialize;

/// `Expression = [Clause]`.
pub type Expression = Vec<Clause>;

/// `Clause = [Rule]`.
pub type Clause = Vec<Rule>;

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub field: String,
    pub operation: Operation,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Contains,
    NotContains,
    In,
    NotIn,
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    StartsWith,
    EndsWith,
}

/// A rule's right-hand side: a single scalar or a list (for `IN`/`NOT_IN`).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Number(f64),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    pub fn as_list(&self) -> Vec<&Value> {
        match self {
            Value::List(items) => items.iter().collect(),
            other => vec![other],
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Dnf,
    Cnf,
}

impl Mode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dnf" | "disjunctive_normal_form" => Some(Self::Dnf),
            "cnf" | "conjunctive_normal_form" => Some(Self::Cnf),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mode_accepts_aliases() {
        assert_eq!(Mode::parse("dnf"), Some(Mode::Dnf));
        assert_eq!(Mode::parse("disjunctive_normal_form"), Some(Mode::Dnf));
        assert_eq!(Mode::parse("CNF"), Some(Mode::Cnf));
        assert_eq!(Mode::parse("nonsense"), None);
    }

    #[test]
    fn rule_deserializes_from_json() {
        let json = r#"{"field": "origin", "operation": "EQUAL", "value": "SEA"}"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.field, "origin");
        assert_eq!(rule.operation, Operation::Equal);
        assert_eq!(rule.value.as_text(), Some("SEA"));
    }

    #[test]
    fn list_value_deserializes_for_in() {
        let json = r#"{"field": "origin", "operation": "IN", "value": ["SEA", "PDX"]}"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.value.as_list().len(), 2);
    }
}
