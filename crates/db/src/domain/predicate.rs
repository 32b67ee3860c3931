//! Structured predicate built from a parsed domain.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use super::DomainError;
use super::literal::Literal;

/// Comparison operator of a domain leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Like,
    NotLike,
    ILike,
    NotILike,
    EqLike,
    EqILike,
}

impl Operator {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Like => "like",
            Self::NotLike => "not like",
            Self::ILike => "ilike",
            Self::NotILike => "not ilike",
            Self::EqLike => "=like",
            Self::EqILike => "=ilike",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "=" | "==" => Self::Eq,
            "!=" | "<>" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "in" => Self::In,
            "not in" => Self::NotIn,
            "like" => Self::Like,
            "not like" => Self::NotLike,
            "ilike" => Self::ILike,
            "not ilike" => Self::NotILike,
            "=like" => Self::EqLike,
            "=ilike" => Self::EqILike,
            _ => return Err(DomainError::UnsupportedOperator(s.to_string())),
        })
    }
}

/// A `(field, operator, value)` leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    /// Evaluate against a JSON record.
    #[must_use]
    pub fn matches(&self, record: &Value) -> bool {
        let actual = resolve(record, &self.field);
        let expected = &self.value;

        match self.operator {
            Operator::Eq => loose_eq(actual, expected),
            Operator::Ne => !loose_eq(actual, expected),
            Operator::Lt => compare(actual, expected) == Some(Ordering::Less),
            Operator::Le => matches!(
                compare(actual, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::Gt => compare(actual, expected) == Some(Ordering::Greater),
            Operator::Ge => matches!(
                compare(actual, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::In => contains_any(actual, expected),
            Operator::NotIn => !contains_any(actual, expected),
            Operator::Like => like(actual, expected, false),
            Operator::NotLike => !like(actual, expected, false),
            Operator::ILike => like(actual, expected, true),
            Operator::NotILike => !like(actual, expected, true),
            Operator::EqLike => pattern(actual, expected, false),
            Operator::EqILike => pattern(actual, expected, true),
        }
    }
}

/// One element of a normalized domain, in prefix order.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    And,
    Or,
    Not,
    /// `(1, '=', 1)` or `(0, '=', 1)`
    Constant(bool),
    Leaf(Condition),
}

impl Term {
    const fn arity(&self) -> usize {
        match self {
            Self::And | Self::Or => 2,
            Self::Not => 1,
            Self::Constant(_) | Self::Leaf(_) => 0,
        }
    }

    fn from_literal(item: &Literal) -> Result<Self, DomainError> {
        if let Some(op) = item.as_str() {
            return match op {
                "&" => Ok(Self::And),
                "|" => Ok(Self::Or),
                "!" => Ok(Self::Not),
                other => Err(DomainError::Malformed(format!(
                    "unknown domain operator `{other}`"
                ))),
            };
        }

        let parts = match item {
            Literal::List(parts) | Literal::Tuple(parts) if parts.len() == 3 => parts,
            other => {
                return Err(DomainError::Malformed(format!(
                    "expected a 3-element leaf, got {}",
                    other.to_json()
                )));
            }
        };

        match (&parts[0], &parts[1], &parts[2]) {
            (Literal::Int(lhs @ (0 | 1)), Literal::Str(op), Literal::Int(1)) if op == "=" => {
                Ok(Self::Constant(*lhs == 1))
            }
            (Literal::Str(field), Literal::Str(op), value) => Ok(Self::Leaf(Condition {
                field: field.clone(),
                operator: op.parse()?,
                value: value.to_json(),
            })),
            _ => Err(DomainError::Malformed(format!(
                "invalid leaf {}",
                item.to_json()
            ))),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::And => Value::from("&"),
            Self::Or => Value::from("|"),
            Self::Not => Value::from("!"),
            Self::Constant(true) => serde_json::json!([1, "=", 1]),
            Self::Constant(false) => serde_json::json!([0, "=", 1]),
            Self::Leaf(c) => serde_json::json!([c.field, c.operator.as_str(), c.value]),
        }
    }
}

/// Executable predicate over JSON records.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    terms: Vec<Term>,
}

impl Domain {
    /// Build a normalized domain from a parsed literal.
    ///
    /// The top level must be a list or tuple. Consecutive operands are joined
    /// with an implicit `&`. An empty domain matches every record.
    ///
    /// # Errors
    /// Returns [`DomainError::Malformed`] for structural problems and
    /// [`DomainError::UnsupportedOperator`] for unknown comparison operators.
    pub fn from_literal(literal: &Literal) -> Result<Self, DomainError> {
        let items = match literal {
            Literal::List(items) | Literal::Tuple(items) => items,
            other => {
                return Err(DomainError::Malformed(format!(
                    "domain must be a list, got {}",
                    other.to_json()
                )));
            }
        };

        if items.is_empty() {
            return Ok(Self {
                terms: vec![Term::Constant(true)],
            });
        }

        let mut body: Vec<Term> = Vec::with_capacity(items.len());
        let mut implicit_ands = 0usize;
        let mut expected = 1usize;
        for item in items {
            if expected == 0 {
                implicit_ands += 1;
                expected = 1;
            }
            let term = Term::from_literal(item)?;
            expected = expected + term.arity() - 1;
            body.push(term);
        }

        if expected != 0 {
            return Err(DomainError::Malformed(format!(
                "{expected} operand(s) missing"
            )));
        }

        let mut terms = Vec::with_capacity(implicit_ands + body.len());
        terms.extend(std::iter::repeat_n(Term::And, implicit_ands));
        terms.extend(body);
        Ok(Self { terms })
    }

    /// Normalized terms in prefix order.
    #[must_use]
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Check whether `record` satisfies the domain.
    ///
    /// Terms are reduced right to left on an operand stack.
    #[must_use]
    pub fn matches(&self, record: &Value) -> bool {
        let mut stack: Vec<bool> = Vec::with_capacity(self.terms.len());
        for term in self.terms.iter().rev() {
            let value = match term {
                Term::And | Term::Or => {
                    let (Some(lhs), Some(rhs)) = (stack.pop(), stack.pop()) else {
                        return false;
                    };
                    if matches!(term, Term::And) {
                        lhs && rhs
                    } else {
                        lhs || rhs
                    }
                }
                Term::Not => match stack.pop() {
                    Some(operand) => !operand,
                    None => return false,
                },
                Term::Constant(value) => *value,
                Term::Leaf(condition) => condition.matches(record),
            };
            stack.push(value);
        }
        matches!(stack.as_slice(), [true])
    }

    /// Normalized domain as a JSON array.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Array(self.terms.iter().map(Term::to_json).collect())
    }
}

static NULL: Value = Value::Null;

fn resolve<'a>(record: &'a Value, path: &str) -> &'a Value {
    path.split('.')
        .try_fold(record, |current, key| current.get(key))
        .unwrap_or(&NULL)
}

#[inline]
const fn is_falsy_null(v: &Value) -> bool {
    matches!(v, Value::Null | Value::Bool(false))
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ if is_falsy_null(a) && is_falsy_null(b) => true,
        _ => a == b,
    }
}

/// Equality with x2many membership: an array field equals a scalar it contains.
fn loose_eq(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Array(_), Value::Array(_)) => actual == expected,
        (Value::Array(items), scalar) if is_falsy_null(scalar) => items.is_empty(),
        (Value::Array(items), scalar) => items.iter().any(|item| scalar_eq(item, scalar)),
        _ => scalar_eq(actual, expected),
    }
}

fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn contains_any(actual: &Value, expected: &Value) -> bool {
    let candidates = match expected {
        Value::Array(items) => items.as_slice(),
        scalar => std::slice::from_ref(scalar),
    };
    match actual {
        Value::Array(items) => items
            .iter()
            .any(|item| candidates.iter().any(|c| scalar_eq(item, c))),
        scalar => candidates.iter().any(|c| scalar_eq(scalar, c)),
    }
}

/// Substring match: the value is wrapped as `%value%`, inner `%` and `_` stay wildcards.
fn like(actual: &Value, expected: &Value, insensitive: bool) -> bool {
    let Value::String(needle) = expected else {
        return false;
    };
    pattern(actual, &Value::String(format!("%{needle}%")), insensitive)
}

/// SQL `LIKE` match of the whole value: `%` any run, `_` one character.
fn pattern(actual: &Value, expected: &Value, insensitive: bool) -> bool {
    let (Value::String(text), Value::String(pat)) = (actual, expected) else {
        return false;
    };
    let fold = |s: &str| -> Vec<char> {
        if insensitive {
            s.to_lowercase().chars().collect()
        } else {
            s.chars().collect()
        }
    };
    sql_like(&fold(text), &fold(pat))
}

fn sql_like(text: &[char], pat: &[char]) -> bool {
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pat.get(p) {
            Some('%') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some('_') => {
                t += 1;
                p += 1;
            }
            Some(c) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((bp, bt)) => {
                    p = bp + 1;
                    t = bt + 1;
                    backtrack = Some((bp, bt + 1));
                }
                None => return false,
            },
        }
    }
    pat[p..].iter().all(|c| *c == '%')
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::literal::parse_literal;

    fn domain(text: &str) -> Domain {
        Domain::from_literal(&parse_literal(text).unwrap()).unwrap()
    }

    #[test]
    fn implicit_and_is_inserted() {
        let d = domain("[('a', '=', 1), ('b', '=', 2), ('c', '=', 3)]");
        assert_eq!(
            d.to_json(),
            json!(["&", "&", ["a", "=", 1], ["b", "=", 2], ["c", "=", 3]])
        );
    }

    #[test]
    fn explicit_operators_are_kept() {
        let d = domain("['|', ('a', '=', 1), '!', ('b', '=', 2)]");
        assert_eq!(d.terms().len(), 4);
        assert!(d.matches(&json!({ "a": 1, "b": 2 })));
        assert!(d.matches(&json!({ "a": 0, "b": 3 })));
        assert!(!d.matches(&json!({ "a": 0, "b": 2 })));
    }

    #[test]
    fn empty_and_constant_domains() {
        assert!(domain("[]").matches(&json!({})));
        assert!(domain("[(1, '=', 1)]").matches(&json!({})));
        assert!(!domain("[(0, '=', 1)]").matches(&json!({})));
    }

    #[test]
    fn rejects_bad_structure() {
        let missing = Domain::from_literal(&parse_literal("['&', ('a', '=', 1)]").unwrap());
        assert!(matches!(missing, Err(DomainError::Malformed(_))));

        let short_leaf = Domain::from_literal(&parse_literal("[('a', '=')]").unwrap());
        assert!(matches!(short_leaf, Err(DomainError::Malformed(_))));

        let not_list = Domain::from_literal(&parse_literal("'a'").unwrap());
        assert!(matches!(not_list, Err(DomainError::Malformed(_))));

        let unknown = Domain::from_literal(&parse_literal("[('a', 'between', 1)]").unwrap());
        assert_eq!(
            unknown,
            Err(DomainError::UnsupportedOperator("between".to_string()))
        );
    }

    #[test]
    fn comparison_operators() {
        let record = json!({ "amount": 10, "name": "Beta", "partner": { "country": "BE" } });

        assert!(domain("[('amount', '>', 5)]").matches(&record));
        assert!(domain("[('amount', '<=', 10.0)]").matches(&record));
        assert!(!domain("[('amount', '<', 10)]").matches(&record));
        assert!(domain("[('amount', '<>', 11)]").matches(&record));
        assert!(domain("[('name', '>=', 'Alpha')]").matches(&record));
        assert!(domain("[('partner.country', '=', 'BE')]").matches(&record));
        assert!(!domain("[('amount', '>', 'x')]").matches(&record));
    }

    #[test]
    fn false_equals_missing() {
        let record = json!({ "done": null, "tags": [] });
        assert!(domain("[('done', '=', False)]").matches(&record));
        assert!(domain("[('missing', '=', False)]").matches(&record));
        assert!(domain("[('tags', '=', False)]").matches(&record));
        assert!(!domain("[('done', '!=', False)]").matches(&record));
    }

    #[test]
    fn membership_operators() {
        let record = json!({ "state": "draft", "tag_ids": [3, 4] });
        assert!(domain("[('state', 'in', ['draft', 'sent'])]").matches(&record));
        assert!(domain("[('state', 'not in', ('done',))]").matches(&record));
        assert!(domain("[('tag_ids', 'in', [4])]").matches(&record));
        assert!(domain("[('tag_ids', '=', 3)]").matches(&record));
        assert!(!domain("[('tag_ids', 'in', [5, 6])]").matches(&record));
    }

    #[test]
    fn like_operators() {
        let record = json!({ "name": "Dead Man's Switch" });
        assert!(domain("[('name', 'like', 'Man')]").matches(&record));
        assert!(!domain("[('name', 'like', 'man')]").matches(&record));
        assert!(domain("[('name', 'ilike', 'man')]").matches(&record));
        assert!(domain("[('name', 'not ilike', 'alarm')]").matches(&record));
        assert!(domain("[('name', '=like', 'Dead%')]").matches(&record));
        assert!(!domain("[('name', '=like', 'Dead')]").matches(&record));
        assert!(domain("[('name', '=ilike', 'dead_man%switch')]").matches(&record));
        assert!(!domain("[('missing', 'like', 'x')]").matches(&record));
        assert!(domain("[('name', 'like', 'Dead%Switch')]").matches(&record));
        assert!(domain("[('name', 'ilike', 'man_s')]").matches(&record));
        assert!(!domain("[('name', 'not like', 'Dead%Switch')]").matches(&record));
    }

    #[test]
    fn long_flat_domain_is_evaluated() {
        let leaves = 100_000;
        let text = format!("[{}]", vec!["('a', '=', 1)"; leaves].join(", "));
        let d = domain(&text);

        assert_eq!(d.terms().len(), 2 * leaves - 1);
        assert!(d.terms()[..leaves - 1].iter().all(|t| matches!(t, Term::And)));
        assert!(d.matches(&json!({ "a": 1 })));
        assert!(!d.matches(&json!({ "a": 2 })));
    }

    #[test]
    fn deep_negation_chain_is_evaluated() {
        let text = format!("[{}('a', '=', 1)]", "'!', ".repeat(100_001));
        assert!(!domain(&text).matches(&json!({ "a": 1 })));
        assert!(domain(&text).matches(&json!({ "a": 2 })));
    }

    #[test]
    fn sql_like_patterns() {
        let chars = |s: &str| s.chars().collect::<Vec<_>>();
        assert!(sql_like(&chars("abc"), &chars("a%")));
        assert!(sql_like(&chars("abc"), &chars("%c")));
        assert!(sql_like(&chars("abc"), &chars("a_c")));
        assert!(sql_like(&chars("aXbXc"), &chars("a%b%c")));
        assert!(sql_like(&chars(""), &chars("%")));
        assert!(!sql_like(&chars("abc"), &chars("a_")));
    }
}
