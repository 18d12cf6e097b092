//! SQL fragments paired with their bound parameters.
//!
//! A [`QueryPart`] is the unit every builder appends to. Each bound value is
//! written as a `?` placeholder at the same moment the value is pushed, so the
//! placeholders in `content` and the entries of `params` always line up left
//! to right. Appending part B to part A yields `A.params ++ B.params`.

use crate::value::Value;

/// A SQL fragment and its ordered parameters.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use]
pub struct QueryPart {
    content: String,
    params: Vec<Value>,
}

impl QueryPart {
    /// Start a part with raw SQL (no parameters).
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            content: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.content.push_str(sql);
        self
    }

    /// Append a `(?)` placeholder and bind its value.
    pub fn push_bind(&mut self, value: impl Into<Value>) -> &mut Self {
        self.content.push_str("(?)");
        self.params.push(value.into());
        self
    }

    /// Append `(?, ?, ...)` and bind every value.
    ///
    /// Callers must not pass an empty list: `()` is not valid SQL. The clause
    /// layer renders empty `IN` lists as constant predicates instead.
    pub fn push_bind_list<I, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.content.push('(');
        for (i, v) in values.into_iter().enumerate() {
            if i > 0 {
                self.content.push_str(", ");
            }
            self.content.push('?');
            self.params.push(v.into());
        }
        self.content.push(')');
        self
    }

    /// Append another part, keeping its parameters after ours.
    pub fn append(&mut self, other: QueryPart) -> &mut Self {
        self.content.push_str(&other.content);
        self.params.extend(other.params);
        self
    }

    /// Wrap the fragment in parentheses. Empty parts stay empty.
    pub fn wrap(self) -> Self {
        if self.is_empty() {
            return self;
        }
        Self {
            content: format!("({})", self.content),
            params: self.params,
        }
    }

    /// Join non-empty parts with `sep`, preserving parameter order.
    pub fn join(parts: impl IntoIterator<Item = QueryPart>, sep: &str) -> Self {
        let mut out = QueryPart::empty();
        for part in parts.into_iter().filter(|p| !p.is_empty()) {
            if !out.is_empty() {
                out.push(sep);
            }
            out.append(part);
        }
        out
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.content, self.params)
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Number of `?` placeholders in the fragment.
    pub fn placeholder_count(&self) -> usize {
        self.content.matches('?').count()
    }
}
