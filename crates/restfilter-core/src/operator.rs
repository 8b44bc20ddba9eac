//! The fixed operator catalog.
//!
//! Operators are written in a query value as an `op:` prefix, e.g.
//! `age=between:(18,65)`. The first catalog entry (`eq`) is used when no
//! prefix is given.

use std::fmt;

use serde::Serialize;

/// Comparison primitive a lookup asks the store to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetOp {
    /// Equality.
    Exact,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Case-insensitive substring match.
    IContains,
    /// Membership in a list.
    In,
    /// Inclusive range over two bounds.
    Range,
    /// Null test; the operand is an integer flag.
    IsNull,
}

impl TargetOp {
    /// The store-facing lookup name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetOp::Exact => "exact",
            TargetOp::Lt => "lt",
            TargetOp::Lte => "lte",
            TargetOp::Gt => "gt",
            TargetOp::Gte => "gte",
            TargetOp::IContains => "icontains",
            TargetOp::In => "in",
            TargetOp::Range => "range",
            TargetOp::IsNull => "isnull",
        }
    }
}

impl fmt::Display for TargetOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named operator usable in a filter expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operator {
    /// Token used in the query string.
    pub name: &'static str,
    /// Store primitive this operator maps to.
    pub target: TargetOp,
    /// Human-readable description.
    pub description: &'static str,
    /// Whether matching rows are excluded rather than kept.
    pub negate: bool,
    /// Minimum number of operand values.
    pub min_vals: usize,
    /// Maximum number of operand values.
    pub max_vals: usize,
    /// Whether the operand must be an integer flag.
    pub boolean: bool,
}

impl Operator {
    const fn new(name: &'static str, target: TargetOp, description: &'static str) -> Self {
        Self {
            name,
            target,
            description,
            negate: false,
            min_vals: 1,
            max_vals: 1,
            boolean: false,
        }
    }

    const fn negated(mut self) -> Self {
        self.negate = true;
        self
    }

    const fn with_arity(mut self, min_vals: usize, max_vals: usize) -> Self {
        self.min_vals = min_vals;
        self.max_vals = max_vals;
        self
    }

    const fn flag(mut self) -> Self {
        self.boolean = true;
        self
    }

    /// Look up an operator by its query-string token.
    pub fn lookup(name: &str) -> Option<&'static Operator> {
        OPERATORS.iter().find(|op| op.name == name)
    }

    /// The operator used when an expression has no `op:` prefix.
    pub fn default_operator() -> &'static Operator {
        &OPERATORS[0]
    }

    /// Whether the operand is parsed as an array.
    pub fn is_multi_valued(&self) -> bool {
        self.max_vals > 1
    }

    /// Describe the operand this operator expects, for error messages.
    pub fn expected_value_description(&self) -> String {
        if self.boolean {
            return "a single boolean value: 0 or 1".to_string();
        }
        if self.max_vals == 1 {
            return "a single value".to_string();
        }
        if self.max_vals == self.min_vals {
            return format!("a list of exactly {} values", self.max_vals);
        }
        format!("a list of {}-{} values", self.min_vals, self.max_vals)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The operator catalog, in precedence order. The first entry is the default.
pub static OPERATORS: [Operator; 12] = [
    Operator::new("eq", TargetOp::Exact, "field = value"),
    Operator::new("ne", TargetOp::Exact, "field <> value").negated(),
    Operator::new("lt", TargetOp::Lt, "field < value"),
    Operator::new("le", TargetOp::Lte, "field <= value"),
    Operator::new("gt", TargetOp::Gt, "field > value"),
    Operator::new("ge", TargetOp::Gte, "field >= value"),
    Operator::new(
        "like",
        TargetOp::IContains,
        "field contains a string (case insensitive)",
    ),
    Operator::new(
        "unlike",
        TargetOp::IContains,
        "field does not contain a string (case insensitive)",
    )
    .negated(),
    Operator::new("in", TargetOp::In, "field is equal to one of the given values").with_arity(1, 1000),
    Operator::new(
        "out",
        TargetOp::In,
        "field is not equal to any of the given values",
    )
    .negated()
    .with_arity(1, 1000),
    Operator::new(
        "between",
        TargetOp::Range,
        "field is in a range of two values (inclusive)",
    )
    .with_arity(2, 2),
    Operator::new("isnull", TargetOp::IsNull, "field is null").flag(),
];

/// All operators, in catalog order.
pub fn operators() -> &'static [Operator] {
    &OPERATORS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_operator_is_eq() {
        let op = Operator::default_operator();
        assert_eq!(op.name, "eq");
        assert_eq!(op.target, TargetOp::Exact);
        assert!(!op.negate);
    }

    #[test]
    fn test_lookup() {
        assert_eq!(Operator::lookup("between").map(|op| op.target), Some(TargetOp::Range));
        assert_eq!(Operator::lookup("unlike").map(|op| op.negate), Some(true));
        assert!(Operator::lookup("EQ").is_none());
        assert!(Operator::lookup("").is_none());
    }

    #[test]
    fn test_names_are_unique() {
        for (i, a) in OPERATORS.iter().enumerate() {
            for b in &OPERATORS[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn test_negating_operators_share_target_with_positive_twin() {
        let pairs = [("eq", "ne"), ("like", "unlike"), ("in", "out")];
        for (pos, neg) in pairs {
            let pos = Operator::lookup(pos).unwrap();
            let neg = Operator::lookup(neg).unwrap();
            assert_eq!(pos.target, neg.target);
            assert_eq!((pos.min_vals, pos.max_vals), (neg.min_vals, neg.max_vals));
            assert!(!pos.negate);
            assert!(neg.negate);
        }
    }

    #[test]
    fn test_expected_value_description() {
        let describe = |name: &str| Operator::lookup(name).unwrap().expected_value_description();
        assert_eq!(describe("eq"), "a single value");
        assert_eq!(describe("isnull"), "a single boolean value: 0 or 1");
        assert_eq!(describe("between"), "a list of exactly 2 values");
        assert_eq!(describe("in"), "a list of 1-1000 values");
    }

    #[test]
    fn test_target_names() {
        assert_eq!(TargetOp::IContains.to_string(), "icontains");
        assert_eq!(TargetOp::Lte.as_str(), "lte");
        assert_eq!(operators().len(), 12);
    }
}
