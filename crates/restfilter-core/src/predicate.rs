//! Composable boolean predicates over a data source.
//!
//! A [`Predicate`] is built per request and handed to a
//! [`DataSource`](crate::DataSource); it is never evaluated by this crate.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use serde::Serialize;

use crate::operator::TargetOp;

/// Operand of a lookup, after parsing and conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Operand {
    /// A single value.
    Scalar(String),
    /// A list of values (for `in` and `range`).
    List(Vec<String>),
}

impl Operand {
    /// Create a scalar operand.
    pub fn scalar(value: impl Into<String>) -> Self {
        Operand::Scalar(value.into())
    }

    /// Create a list operand.
    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Operand::List(values.into_iter().map(Into::into).collect())
    }

    /// Number of values carried.
    pub fn len(&self) -> usize {
        match self {
            Operand::Scalar(_) => 1,
            Operand::List(values) => values.len(),
        }
    }

    /// Whether this is an empty list.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the scalar value, if this is a scalar.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Operand::Scalar(s) => Some(s),
            Operand::List(_) => None,
        }
    }

    /// Get the list values, if this is a list.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Operand::Scalar(_) => None,
            Operand::List(values) => Some(values),
        }
    }

    /// Apply `f` to the scalar, or to every element of the list.
    pub fn map<F>(self, f: F) -> Self
    where
        F: Fn(&str) -> String,
    {
        match self {
            Operand::Scalar(s) => Operand::Scalar(f(&s)),
            Operand::List(values) => Operand::List(values.iter().map(|v| f(v)).collect()),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Scalar(s) => write!(f, "{:?}", s),
            Operand::List(values) => {
                f.write_str("[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:?}", v)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A single "accessor op operand" comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lookup {
    /// Dotted accessor path in the store.
    pub path: String,
    /// Comparison primitive.
    pub op: TargetOp,
    /// Converted operand.
    pub operand: Operand,
}

/// A boolean expression over the rows of a data source.
///
/// An empty `And` matches every row; an empty `Or` matches none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Predicate {
    /// Leaf comparison.
    Lookup(Lookup),
    /// All children must match.
    And(Vec<Predicate>),
    /// At least one child must match.
    Or(Vec<Predicate>),
    /// The child must not match.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Create a leaf lookup.
    pub fn lookup(path: impl Into<String>, op: TargetOp, operand: Operand) -> Self {
        Predicate::Lookup(Lookup {
            path: path.into(),
            op,
            operand,
        })
    }

    /// Conjunction of `predicates`, flattening nested conjunctions.
    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        let mut out = Vec::new();
        for p in predicates {
            match p {
                Predicate::And(children) => out.extend(children),
                other => out.push(other),
            }
        }
        Predicate::And(out)
    }

    /// Disjunction of `predicates`, flattening nested disjunctions.
    pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        let mut out = Vec::new();
        for p in predicates {
            match p {
                Predicate::Or(children) => out.extend(children),
                other => out.push(other),
            }
        }
        Predicate::Or(out)
    }

    /// Negate, collapsing double negation.
    pub fn negate(self) -> Self {
        match self {
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }

    /// Whether this predicate matches every row by construction.
    pub fn is_always_true(&self) -> bool {
        matches!(self, Predicate::And(children) if children.is_empty())
    }

    /// Whether this predicate matches no row by construction.
    pub fn is_always_false(&self) -> bool {
        matches!(self, Predicate::Or(children) if children.is_empty())
    }

    /// Visit every leaf lookup, depth first.
    pub fn lookups(&self) -> Vec<&Lookup> {
        let mut out = Vec::new();
        self.collect_lookups(&mut out);
        out
    }

    fn collect_lookups<'a>(&'a self, out: &mut Vec<&'a Lookup>) {
        match self {
            Predicate::Lookup(lookup) => out.push(lookup),
            Predicate::And(children) | Predicate::Or(children) => {
                for child in children {
                    child.collect_lookups(out);
                }
            }
            Predicate::Not(inner) => inner.collect_lookups(out),
        }
    }
}

impl BitAnd for Predicate {
    type Output = Predicate;

    fn bitand(self, rhs: Predicate) -> Predicate {
        Predicate::all([self, rhs])
    }
}

impl BitOr for Predicate {
    type Output = Predicate;

    fn bitor(self, rhs: Predicate) -> Predicate {
        Predicate::any([self, rhs])
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        self.negate()
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Lookup(l) => write!(f, "{} {} {}", l.path, l.op, l.operand),
            Predicate::And(children) if children.is_empty() => f.write_str("TRUE"),
            Predicate::Or(children) if children.is_empty() => f.write_str("FALSE"),
            Predicate::And(children) => write_joined(f, children, " AND "),
            Predicate::Or(children) => write_joined(f, children, " OR "),
            Predicate::Not(inner) => write!(f, "NOT ({})", inner),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Predicate], sep: &str) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        match child {
            Predicate::And(c) | Predicate::Or(c) if c.len() > 1 => write!(f, "({})", child)?,
            _ => write!(f, "{}", child)?,
        }
    }
    Ok(())
}
