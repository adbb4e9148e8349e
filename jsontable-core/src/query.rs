/// Encoded query builder
///
/// Builds filter predicates in the service's encoded-query text form,
/// e.g. `active=true^priority<=2^ORDERBYnumber`.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a single clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    In,
    NotIn,
    Like,
    NotLike,
    StartsWith,
    EndsWith,
    Gt,
    Ge,
    Lt,
    Le,
    IsEmpty,
    IsNotEmpty,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::StartsWith => "STARTSWITH",
            Operator::EndsWith => "ENDSWITH",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::IsEmpty => "ISEMPTY",
            Operator::IsNotEmpty => "ISNOTEMPTY",
        }
    }

    /// Unary operators render without a value
    pub fn takes_value(&self) -> bool {
        !matches!(self, Operator::IsEmpty | Operator::IsNotEmpty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Join {
    And,
    Or,
    NewQuery,
}

impl Join {
    fn separator(&self) -> &'static str {
        match self {
            Join::And => "^",
            Join::Or => "^OR",
            Join::NewQuery => "^NQ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Term {
    Clause {
        join: Join,
        field: String,
        op: Operator,
        value: String,
    },
    OrderBy {
        field: String,
        descending: bool,
    },
    Raw(String),
}

/// Immutable filter predicate over table fields.
///
/// A query without terms is "empty" and places no restriction on a read;
/// this is different from a query whose predicate happens to match nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct EncodedQuery {
    terms: Vec<Term>,
}

impl EncodedQuery {
    /// Create the empty query
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// True when `query` places no restriction: absent, or present with no terms
    pub fn is_unrestricted(query: Option<&EncodedQuery>) -> bool {
        query.map_or(true, EncodedQuery::is_empty)
    }

    /// AND a clause onto the query
    pub fn and(self, field: impl Into<String>, op: Operator, value: impl Into<String>) -> Self {
        self.push(Join::And, field.into(), op, value.into())
    }

    /// OR a clause with the preceding clause
    pub fn or(self, field: impl Into<String>, op: Operator, value: impl Into<String>) -> Self {
        self.push(Join::Or, field.into(), op, value.into())
    }

    /// Start a new query whose results are unioned with the previous ones
    pub fn new_query(self, field: impl Into<String>, op: Operator, value: impl Into<String>) -> Self {
        self.push(Join::NewQuery, field.into(), op, value.into())
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.and(field, Operator::Eq, value)
    }

    pub fn ne(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.and(field, Operator::Ne, value)
    }

    pub fn like(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.and(field, Operator::Like, value)
    }

    pub fn starts_with(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.and(field, Operator::StartsWith, value)
    }

    /// Field value is one of `values`
    pub fn is_in<I, S>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let list = join_values(values);
        self.push(Join::And, field.into(), Operator::In, list)
    }

    /// Field value is none of `values`
    pub fn not_in<I, S>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let list = join_values(values);
        self.push(Join::And, field.into(), Operator::NotIn, list)
    }

    pub fn field_empty(self, field: impl Into<String>) -> Self {
        self.push(Join::And, field.into(), Operator::IsEmpty, String::new())
    }

    pub fn field_not_empty(self, field: impl Into<String>) -> Self {
        self.push(Join::And, field.into(), Operator::IsNotEmpty, String::new())
    }

    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.terms.push(Term::OrderBy {
            field: field.into(),
            descending: false,
        });
        self
    }

    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.terms.push(Term::OrderBy {
            field: field.into(),
            descending: true,
        });
        self
    }

    fn push(mut self, join: Join, field: String, op: Operator, value: String) -> Self {
        self.terms.push(Term::Clause {
            join,
            field,
            op,
            value,
        });
        self
    }
}

fn join_values<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| v.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// `^` separates terms, so a literal caret inside a value is doubled
fn escape(value: &str) -> String {
    value.replace('^', "^^")
}

impl fmt::Display for EncodedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            match term {
                Term::Clause {
                    join,
                    field,
                    op,
                    value,
                } => {
                    if i > 0 {
                        f.write_str(join.separator())?;
                    }
                    write!(f, "{}{}", field, op.as_str())?;
                    if op.takes_value() {
                        f.write_str(&escape(value))?;
                    }
                }
                Term::OrderBy { field, descending } => {
                    if i > 0 {
                        f.write_str("^")?;
                    }
                    let keyword = if *descending { "ORDERBYDESC" } else { "ORDERBY" };
                    write!(f, "{}{}", keyword, field)?;
                }
                Term::Raw(raw) => {
                    if i > 0 {
                        f.write_str("^")?;
                    }
                    f.write_str(raw)?;
                }
            }
        }
        Ok(())
    }
}

/// Accepts an already-encoded query verbatim. Blank input is the empty query.
impl FromStr for EncodedQuery {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(EncodedQuery::from(s.to_string()))
    }
}

impl From<String> for EncodedQuery {
    fn from(s: String) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return EncodedQuery::new();
        }
        EncodedQuery {
            terms: vec![Term::Raw(trimmed.to_string())],
        }
    }
}

impl From<EncodedQuery> for String {
    fn from(query: EncodedQuery) -> Self {
        query.to_string()
    }
}
