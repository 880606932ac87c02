use crate::fields::NativeAttr;
use crate::model::{Scope, SortOrder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Host table names used in raw SQL previews.
pub const ENTITY_TABLE: &str = "entities";
pub const META_TABLE: &str = "entity_meta";

/// How predicates combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    #[default]
    And,
    Or,
}

/// Comparison operators available to metadata and attribute predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    #[serde(alias = "=", alias = "eq")]
    Equals,
    #[serde(alias = "!=", alias = "ne")]
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    #[serde(alias = "<", alias = "lt")]
    Less,
    #[serde(alias = "<=", alias = "lte")]
    LessOrEqual,
    #[serde(alias = ">", alias = "gt")]
    Greater,
    #[serde(alias = ">=", alias = "gte")]
    GreaterOrEqual,
    IsEmpty,
    IsNotEmpty,
}

impl CompareOp {
    pub fn needs_value(&self) -> bool {
        !matches!(self, CompareOp::IsEmpty | CompareOp::IsNotEmpty)
    }

    /// Evaluates the operator against the scalar values a record holds for the target.
    ///
    /// Text comparisons are case-insensitive. `NotEquals` holds when no value
    /// equals the operand, which includes records without the target. Numeric
    /// comparisons fail when either side does not parse.
    pub fn evaluate(&self, candidates: &[String], operand: &str, numeric: bool) -> bool {
        let is_empty = candidates.iter().all(|c| c.trim().is_empty());
        match self {
            CompareOp::IsEmpty => is_empty,
            CompareOp::IsNotEmpty => !is_empty,
            CompareOp::NotEquals => !candidates.iter().any(|c| equals(c, operand, numeric)),
            op => candidates.iter().any(|c| op.matches_one(c, operand, numeric)),
        }
    }

    fn matches_one(&self, candidate: &str, operand: &str, numeric: bool) -> bool {
        let lower_c = candidate.to_lowercase();
        let lower_o = operand.to_lowercase();
        match self {
            CompareOp::Equals => equals(candidate, operand, numeric),
            CompareOp::Contains => lower_c.contains(&lower_o),
            CompareOp::StartsWith => lower_c.starts_with(&lower_o),
            CompareOp::EndsWith => lower_c.ends_with(&lower_o),
            CompareOp::Less
            | CompareOp::LessOrEqual
            | CompareOp::Greater
            | CompareOp::GreaterOrEqual => {
                let ordering = if numeric {
                    match (parse_number(candidate), parse_number(operand)) {
                        (Some(a), Some(b)) => a.partial_cmp(&b),
                        _ => None,
                    }
                } else {
                    Some(lower_c.cmp(&lower_o))
                };
                match ordering {
                    Some(o) => match self {
                        CompareOp::Less => o.is_lt(),
                        CompareOp::LessOrEqual => o.is_le(),
                        CompareOp::Greater => o.is_gt(),
                        _ => o.is_ge(),
                    },
                    None => false,
                }
            }
            CompareOp::NotEquals | CompareOp::IsEmpty | CompareOp::IsNotEmpty => false,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            CompareOp::Equals => "=",
            CompareOp::NotEquals => "!=",
            CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith => "LIKE",
            CompareOp::Less => "<",
            CompareOp::LessOrEqual => "<=",
            CompareOp::Greater => ">",
            CompareOp::GreaterOrEqual => ">=",
            CompareOp::IsEmpty => "NOT EXISTS",
            CompareOp::IsNotEmpty => "EXISTS",
        }
    }
}

fn equals(candidate: &str, operand: &str, numeric: bool) -> bool {
    if numeric {
        if let (Some(a), Some(b)) = (parse_number(candidate), parse_number(operand)) {
            return a == b;
        }
    }
    candidate.trim().eq_ignore_ascii_case(operand.trim())
}

pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

/// What a comparison predicate reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// A host-native attribute.
    Attribute(NativeAttr),
    /// A metadata key.
    Meta(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Attribute(attr) => write!(f, "@{}", attr.name()),
            Target::Meta(key) => write!(f, "meta:{}", key),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Native status predicate.
    Status(String),
    /// Native author predicate.
    Author(u64),
    /// Relational join on a term id.
    Term { taxonomy: String, term_id: u64 },
    Compare {
        target: Target,
        op: CompareOp,
        value: String,
        numeric: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ordering {
    /// Lexical ordering on the title.
    Title(SortOrder),
    Native { attr: NativeAttr, order: SortOrder },
    Meta { key: String, numeric: bool, order: SortOrder },
    /// Ordering by the expression of the descriptor's [`RawClause`].
    Raw(SortOrder),
}

impl Ordering {
    pub fn order(&self) -> SortOrder {
        match self {
            Ordering::Title(order)
            | Ordering::Native { order, .. }
            | Ordering::Meta { order, .. }
            | Ordering::Raw(order) => *order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

/// Raw query augmentation for sorting by a number nested in a JSON-encoded value.
///
/// The host left-joins its metadata table under [`RawClause::ALIAS`] and orders
/// by the extracted value cast to a decimal. Records without the metadata sort
/// as NULL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawClause {
    pub meta_key: String,
    pub path: Vec<PathSegment>,
}

impl RawClause {
    pub const ALIAS: &'static str = "tabula_sort";

    /// The base amount of the first pricing tier.
    pub fn base_amount(meta_key: impl Into<String>) -> Self {
        Self {
            meta_key: meta_key.into(),
            path: vec![PathSegment::Index(0), PathSegment::Key("amount".to_string())],
        }
    }

    /// JSON path in MySQL syntax, e.g. `$[0].amount`.
    pub fn json_path(&self) -> String {
        let mut out = String::from("$");
        for segment in &self.path {
            match segment {
                PathSegment::Index(i) => out.push_str(&format!("[{}]", i)),
                PathSegment::Key(k) => {
                    out.push('.');
                    out.push_str(k);
                }
            }
        }
        out
    }

    pub fn join_sql(&self) -> String {
        format!(
            "LEFT JOIN {meta} AS {alias} ON ({alias}.entity_id = {entities}.id AND {alias}.meta_key = '{key}')",
            meta = META_TABLE,
            alias = Self::ALIAS,
            entities = ENTITY_TABLE,
            key = sql_quote(&self.meta_key),
        )
    }

    pub fn order_sql(&self, order: SortOrder) -> String {
        format!(
            "CAST(JSON_UNQUOTE(JSON_EXTRACT({alias}.meta_value, '{path}')) AS DECIMAL(20,4)) {dir}",
            alias = Self::ALIAS,
            path = sql_quote(&self.json_path()),
            dir = order.as_str().to_uppercase(),
        )
    }

    /// Extracts and numerically casts the nested value.
    pub fn extract(&self, value: &Value) -> Option<f64> {
        let mut current = value;
        for segment in &self.path {
            current = match segment {
                PathSegment::Index(i) => current.get(*i)?,
                PathSegment::Key(k) => current.get(k.as_str())?,
            };
        }
        match current {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_number(s),
            _ => None,
        }
    }
}

fn sql_quote(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('\'', "''")
}

/// A query mutation built for one request. Never executed here; the host runs it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub scope: Scope,
    pub order: Option<Ordering>,
    pub predicates: Vec<Predicate>,
    pub relation: Relation,
    pub raw: Option<RawClause>,
}

impl QueryDescriptor {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            order: None,
            predicates: Vec::new(),
            relation: Relation::And,
            raw: None,
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.predicates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vals(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn text_operators_are_case_insensitive() {
        let c = vals(&["Harbour View"]);
        assert!(CompareOp::Equals.evaluate(&c, "harbour view", false));
        assert!(CompareOp::Contains.evaluate(&c, "BOUR", false));
        assert!(CompareOp::StartsWith.evaluate(&c, "harb", false));
        assert!(CompareOp::EndsWith.evaluate(&c, "view", false));
        assert!(!CompareOp::EndsWith.evaluate(&c, "harb", false));
    }

    #[test]
    fn numeric_comparison_uses_numbers() {
        let c = vals(&["9"]);
        assert!(CompareOp::Less.evaluate(&c, "10", true));
        assert!(!CompareOp::Less.evaluate(&c, "10", false));
        assert!(CompareOp::Equals.evaluate(&vals(&["2.50"]), "2.5", true));
        assert!(!CompareOp::Greater.evaluate(&vals(&["n/a"]), "1", true));
    }

    #[test]
    fn emptiness_and_negation() {
        assert!(CompareOp::IsEmpty.evaluate(&[], "", false));
        assert!(CompareOp::IsEmpty.evaluate(&vals(&[" "]), "", false));
        assert!(CompareOp::IsNotEmpty.evaluate(&vals(&["x"]), "", false));
        assert!(CompareOp::NotEquals.evaluate(&[], "x", false));
        assert!(!CompareOp::NotEquals.evaluate(&vals(&["a", "x"]), "x", false));
    }

    #[test]
    fn operator_aliases_deserialize() {
        let op: CompareOp = serde_json::from_value(json!(">=")).unwrap();
        assert_eq!(op, CompareOp::GreaterOrEqual);
        let op: CompareOp = serde_json::from_value(json!("starts_with")).unwrap();
        assert_eq!(op, CompareOp::StartsWith);
    }

    #[test]
    fn raw_clause_sql_preview() {
        let raw = RawClause::base_amount("price");
        assert_eq!(raw.json_path(), "$[0].amount");
        assert_eq!(
            raw.join_sql(),
            "LEFT JOIN entity_meta AS tabula_sort ON (tabula_sort.entity_id = entities.id AND tabula_sort.meta_key = 'price')"
        );
        assert_eq!(
            raw.order_sql(SortOrder::Desc),
            "CAST(JSON_UNQUOTE(JSON_EXTRACT(tabula_sort.meta_value, '$[0].amount')) AS DECIMAL(20,4)) DESC"
        );
    }

    #[test]
    fn raw_clause_quotes_keys() {
        let raw = RawClause::base_amount("o'brien");
        assert!(raw.join_sql().contains("'o''brien'"));
    }

    #[test]
    fn raw_clause_extracts_nested_numbers() {
        let raw = RawClause::base_amount("price");
        assert_eq!(raw.extract(&json!([{"amount": "120.5"}])), Some(120.5));
        assert_eq!(raw.extract(&json!([{"amount": 80}])), Some(80.0));
        assert_eq!(raw.extract(&json!([])), None);
        assert_eq!(raw.extract(&json!({"amount": 1})), None);
    }
}
