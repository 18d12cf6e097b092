//! Condition algebra for WHERE clauses.
//!
//! - [`Clause`]: one `column operator value` condition
//! - [`ClauseGroup`]: an ordered AND/OR combination of clauses, composites and
//!   nested groups
//! - [`CompositeClause`]: two groups joined by one explicit operator, for
//!   mixing AND and OR at a single level
//!
//! Every bound value renders as a `(?)` placeholder and is pushed to the
//! resulting [`QueryPart`] in the same left-to-right order.
//!
//! ```ignore
//! let cond = CompositeClause::and(
//!     ClauseGroup::or().add(Clause::eq("a", 1)).add(Clause::eq("b", 2)),
//!     ClauseGroup::and().add(Clause::eq("c", 3)),
//! );
//! // ((a = (?) OR b = (?)) AND (c = (?)))  params: [1, 2, 3]
//! ```

use crate::part::QueryPart;
use crate::value::{Value, ValueMap};

/// Boolean connective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
}

impl Logic {
    fn separator(self) -> &'static str {
        match self {
            Logic::And => " AND ",
            Logic::Or => " OR ",
        }
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
    Glob,
    In,
    NotIn,
    Between,
    NotBetween,
    IsNull,
    IsNotNull,
}

impl Operator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::Glob => "GLOB",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT BETWEEN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    None,
    Single(Value),
    List(Vec<Value>),
    Pair(Value, Value),
}

/// A single `column operator value` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    key: String,
    operator: Operator,
    operand: Operand,
    case_insensitive: bool,
}

impl Clause {
    fn single(key: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            operator,
            operand: Operand::Single(value.into()),
            case_insensitive: false,
        }
    }

    fn list<I, V>(key: impl Into<String>, operator: Operator, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            key: key.into(),
            operator,
            operand: Operand::List(values.into_iter().map(Into::into).collect()),
            case_insensitive: false,
        }
    }

    fn pair(
        key: impl Into<String>,
        operator: Operator,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Self {
            key: key.into(),
            operator,
            operand: Operand::Pair(from.into(), to.into()),
            case_insensitive: false,
        }
    }

    fn unary(key: impl Into<String>, operator: Operator) -> Self {
        Self {
            key: key.into(),
            operator,
            operand: Operand::None,
            case_insensitive: false,
        }
    }

    /// `key = value`. A `NULL` value renders `key IS NULL`.
    pub fn eq(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::single(key, Operator::Eq, value)
    }

    /// `key != value`. A `NULL` value renders `key IS NOT NULL`.
    pub fn ne(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::single(key, Operator::Ne, value)
    }

    pub fn lt(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::single(key, Operator::Lt, value)
    }

    pub fn lte(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::single(key, Operator::Lte, value)
    }

    pub fn gt(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::single(key, Operator::Gt, value)
    }

    pub fn gte(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::single(key, Operator::Gte, value)
    }

    pub fn like(key: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::single(key, Operator::Like, pattern)
    }

    pub fn not_like(key: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::single(key, Operator::NotLike, pattern)
    }

    /// Case-sensitive Unix glob match.
    pub fn glob(key: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::single(key, Operator::Glob, pattern)
    }

    /// `key IN (...)`. An empty list renders `1=0`.
    pub fn in_list<I, V>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::list(key, Operator::In, values)
    }

    /// `key NOT IN (...)`. An empty list renders `1=1`.
    pub fn not_in<I, V>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::list(key, Operator::NotIn, values)
    }

    pub fn between(key: impl Into<String>, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Self::pair(key, Operator::Between, from, to)
    }

    pub fn not_between(
        key: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Self::pair(key, Operator::NotBetween, from, to)
    }

    pub fn is_null(key: impl Into<String>) -> Self {
        Self::unary(key, Operator::IsNull)
    }

    pub fn is_not_null(key: impl Into<String>) -> Self {
        Self::unary(key, Operator::IsNotNull)
    }

    /// Compare with `COLLATE NOCASE`.
    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn render(&self) -> QueryPart {
        let mut part = QueryPart::new(self.key.as_str());
        if self.case_insensitive {
            part.push(" COLLATE NOCASE");
        }

        match (&self.operand, self.operator) {
            (Operand::Single(Value::Null), Operator::Eq) => {
                part.push(" IS NULL");
            }
            (Operand::Single(Value::Null), Operator::Ne) => {
                part.push(" IS NOT NULL");
            }
            (Operand::Single(v), op) => {
                part.push(" ").push(op.as_sql()).push(" ").push_bind(v.clone());
            }
            (Operand::List(values), op) if values.is_empty() => {
                return QueryPart::new(if op == Operator::NotIn { "1=1" } else { "1=0" });
            }
            (Operand::List(values), op) => {
                part.push(" ")
                    .push(op.as_sql())
                    .push(" ")
                    .push_bind_list(values.iter().cloned());
            }
            (Operand::Pair(from, to), op) => {
                part.push(" ")
                    .push(op.as_sql())
                    .push(" ")
                    .push_bind(from.clone())
                    .push(" AND ")
                    .push_bind(to.clone());
            }
            (Operand::None, op) => {
                part.push(" ").push(op.as_sql());
            }
        }
        part
    }
}

/// A member of a [`ClauseGroup`].
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Clause(Clause),
    Composite(CompositeClause),
    Group(ClauseGroup),
}

impl Condition {
    fn render(&self) -> QueryPart {
        match self {
            Condition::Clause(c) => c.render(),
            Condition::Composite(c) => c.render(),
            Condition::Group(g) => g.render().wrap(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Condition::Clause(_) => false,
            Condition::Composite(c) => c.is_empty(),
            Condition::Group(g) => g.is_empty(),
        }
    }

    fn collect_keys<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Clause(c) => out.push(c.key()),
            Condition::Composite(c) => {
                c.left.collect_keys(out);
                c.right.collect_keys(out);
            }
            Condition::Group(g) => g.collect_keys(out),
        }
    }
}

/// Anything that can be appended to a [`ClauseGroup`].
///
/// Maps and `(key, value)` pairs become one equality clause per entry, in
/// iteration order.
pub trait IntoConditions {
    fn into_conditions(self) -> Vec<Condition>;
}

impl IntoConditions for Condition {
    fn into_conditions(self) -> Vec<Condition> {
        vec![self]
    }
}

impl IntoConditions for Clause {
    fn into_conditions(self) -> Vec<Condition> {
        vec![Condition::Clause(self)]
    }
}

impl IntoConditions for Vec<Clause> {
    fn into_conditions(self) -> Vec<Condition> {
        self.into_iter().map(Condition::Clause).collect()
    }
}

impl<const N: usize> IntoConditions for [Clause; N] {
    fn into_conditions(self) -> Vec<Condition> {
        self.into_iter().map(Condition::Clause).collect()
    }
}

impl IntoConditions for CompositeClause {
    fn into_conditions(self) -> Vec<Condition> {
        vec![Condition::Composite(self)]
    }
}

impl IntoConditions for ClauseGroup {
    fn into_conditions(self) -> Vec<Condition> {
        vec![Condition::Group(self)]
    }
}

impl IntoConditions for ValueMap {
    fn into_conditions(self) -> Vec<Condition> {
        self.into_iter()
            .map(|(k, v)| Condition::Clause(Clause::eq(k, v)))
            .collect()
    }
}

impl IntoConditions for serde_json::Map<String, serde_json::Value> {
    fn into_conditions(self) -> Vec<Condition> {
        ValueMap::from(self).into_conditions()
    }
}

impl<K: Into<String>, V: Into<Value>> IntoConditions for Vec<(K, V)> {
    fn into_conditions(self) -> Vec<Condition> {
        self.into_iter()
            .map(|(k, v)| Condition::Clause(Clause::eq(k, v)))
            .collect()
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> IntoConditions for [(K, V); N] {
    fn into_conditions(self) -> Vec<Condition> {
        self.into_iter()
            .map(|(k, v)| Condition::Clause(Clause::eq(k, v)))
            .collect()
    }
}

/// Ordered AND/OR combination of conditions.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct ClauseGroup {
    logic: Logic,
    members: Vec<Condition>,
}

impl Default for ClauseGroup {
    fn default() -> Self {
        Self::and()
    }
}

impl ClauseGroup {
    pub fn new(logic: Logic) -> Self {
        Self {
            logic,
            members: Vec::new(),
        }
    }

    /// Empty AND group.
    pub fn and() -> Self {
        Self::new(Logic::And)
    }

    /// Empty OR group.
    pub fn or() -> Self {
        Self::new(Logic::Or)
    }

    /// Append conditions (consuming).
    pub fn add(mut self, item: impl IntoConditions) -> Self {
        self.push(item);
        self
    }

    /// Append conditions in place.
    pub fn push(&mut self, item: impl IntoConditions) -> &mut Self {
        self.members.extend(item.into_conditions());
        self
    }

    /// Combine two groups. Members of a group with the same logic are appended
    /// directly; a group with different logic is nested.
    pub fn merge(mut self, other: ClauseGroup) -> Self {
        if other.is_empty() {
            return self;
        }
        if self.is_empty() {
            return other;
        }
        if other.logic == self.logic {
            self.members.extend(other.members);
        } else {
            self.members.push(Condition::Group(other));
        }
        self
    }

    pub fn logic(&self) -> Logic {
        self.logic
    }

    pub fn members(&self) -> &[Condition] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True when nothing in the group would render.
    pub fn is_empty(&self) -> bool {
        self.members.iter().all(Condition::is_empty)
    }

    /// Column keys referenced anywhere in the group, in render order.
    pub fn keys(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_keys(&mut out);
        out
    }

    fn collect_keys<'a>(&'a self, out: &mut Vec<&'a str>) {
        for member in &self.members {
            member.collect_keys(out);
        }
    }

    /// Render members joined by the group's operator. Nested groups are
    /// parenthesized; an empty group renders an empty part.
    pub fn render(&self) -> QueryPart {
        QueryPart::join(
            self.members.iter().map(Condition::render),
            self.logic.separator(),
        )
    }
}

/// Two groups joined by one operator: `((left) OP (right))`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeClause {
    left: ClauseGroup,
    join: Logic,
    right: ClauseGroup,
}

impl CompositeClause {
    pub fn new(left: ClauseGroup, join: Logic, right: ClauseGroup) -> Self {
        Self { left, join, right }
    }

    pub fn and(left: ClauseGroup, right: ClauseGroup) -> Self {
        Self::new(left, Logic::And, right)
    }

    pub fn or(left: ClauseGroup, right: ClauseGroup) -> Self {
        Self::new(left, Logic::Or, right)
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }

    /// Both sides are always parenthesized. When one side is empty only the
    /// other is rendered.
    pub fn render(&self) -> QueryPart {
        QueryPart::join(
            [self.left.render().wrap(), self.right.render().wrap()],
            self.join.separator(),
        )
        .wrap()
    }
}
