//! Typed equality predicates.
//!
//! Every table exposes an enum of its columns, so a predicate can only name
//! columns that exist. Terms are AND-combined; an empty predicate matches
//! every row. Values are always bound as parameters.

use std::fmt::Debug;

use sqlx::{QueryBuilder, Sqlite};

/// A column of a mapped table.
pub trait Column: Copy + Debug + PartialEq + Send + Sync + 'static {
    fn name(self) -> &'static str;
}

/// A table the predicate helpers can select from, count and delete on.
pub trait Table {
    type Column: Column;

    const TABLE: &'static str;

    /// Comma separated column list used for `SELECT` and `RETURNING`.
    const COLUMNS: &'static str;
}

/// A value compared against a column.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Bool(bool),
    Null,
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&String> for FieldValue {
    fn from(v: &String) -> Self {
        FieldValue::Text(v.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Integer(i64::from(v))
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}

impl FieldValue {
    /// Appends the value as a bound parameter.
    pub fn push_bind(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            FieldValue::Text(s) => qb.push_bind(s.clone()),
            FieldValue::Integer(i) => qb.push_bind(*i),
            FieldValue::Bool(b) => qb.push_bind(*b),
            FieldValue::Null => qb.push_bind(None::<String>),
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
struct Term<C> {
    column: C,
    op: Op,
    value: FieldValue,
}

/// Conjunction of column comparisons.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate<C: Column> {
    terms: Vec<Term<C>>,
}

impl<C: Column> Default for Predicate<C> {
    fn default() -> Self {
        Self::all()
    }
}

impl<C: Column> Predicate<C> {
    /// Matches every row.
    pub fn all() -> Self {
        Self { terms: Vec::new() }
    }

    pub fn eq(column: C, value: impl Into<FieldValue>) -> Self {
        Self::all().and(column, value)
    }

    /// Adds `column = value` (or `IS NULL` for [`FieldValue::Null`]).
    pub fn and(mut self, column: C, value: impl Into<FieldValue>) -> Self {
        self.terms.push(Term {
            column,
            op: Op::Eq,
            value: value.into(),
        });
        self
    }

    /// Adds `column <> value` (or `IS NOT NULL` for [`FieldValue::Null`]).
    pub fn and_not(mut self, column: C, value: impl Into<FieldValue>) -> Self {
        self.terms.push(Term {
            column,
            op: Op::Ne,
            value: value.into(),
        });
        self
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.terms.len()
    }

    #[cfg(test)]
    fn value_of(&self, column: C) -> Option<&FieldValue> {
        self.terms
            .iter()
            .find(|t| t.op == Op::Eq && t.column == column)
            .map(|t| &t.value)
    }

    /// Appends ` WHERE ...` to `qb`; nothing when the predicate is empty.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        for (i, term) in self.terms.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            qb.push(term.column.name());
            match (term.op, &term.value) {
                (Op::Eq, FieldValue::Null) => {
                    qb.push(" IS NULL");
                }
                (Op::Ne, FieldValue::Null) => {
                    qb.push(" IS NOT NULL");
                }
                (Op::Eq, value) => {
                    qb.push(" = ");
                    value.push_bind(qb);
                }
                (Op::Ne, value) => {
                    qb.push(" <> ");
                    value.push_bind(qb);
                }
            }
        }
    }
}

impl<C: Column, V: Into<FieldValue>> FromIterator<(C, V)> for Predicate<C> {
    fn from_iter<I: IntoIterator<Item = (C, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::all(), |pred, (column, value)| pred.and(column, value))
    }
}

/// `SELECT <columns> FROM <table> WHERE ...`
pub fn select<T: Table>(predicate: &Predicate<T::Column>) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM {}", T::COLUMNS, T::TABLE));
    predicate.push_where(&mut qb);
    qb
}

/// `SELECT COUNT(*) FROM <table> WHERE ...`
pub fn count<T: Table>(predicate: &Predicate<T::Column>) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", T::TABLE));
    predicate.push_where(&mut qb);
    qb
}

/// `DELETE FROM <table> WHERE ...`
pub fn delete<T: Table>(predicate: &Predicate<T::Column>) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new(format!("DELETE FROM {}", T::TABLE));
    predicate.push_where(&mut qb);
    qb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Col {
        Id,
        Provider,
        Uid,
        ExtraData,
    }

    impl Column for Col {
        fn name(self) -> &'static str {
            match self {
                Col::Id => "id",
                Col::Provider => "provider",
                Col::Uid => "uid",
                Col::ExtraData => "extra_data",
            }
        }
    }

    struct Links;

    impl Table for Links {
        type Column = Col;
        const TABLE: &'static str = "links";
        const COLUMNS: &'static str = "id, provider, uid, extra_data";
    }

    #[test]
    fn empty_predicate_has_no_where_clause() {
        let qb = select::<Links>(&Predicate::all());
        assert_eq!(qb.sql(), "SELECT id, provider, uid, extra_data FROM links");
    }

    #[test]
    fn every_term_is_combined() {
        let pred = Predicate::eq(Col::Provider, "google")
            .and(Col::Uid, "123")
            .and(Col::Id, 7);
        let qb = count::<Links>(&pred);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM links WHERE provider = ? AND uid = ? AND id = ?"
        );
        assert_eq!(pred.len(), 3);
    }

    #[test]
    fn collected_pairs_are_all_kept() {
        let pred: Predicate<Col> = [(Col::Provider, "github"), (Col::Uid, "99")]
            .into_iter()
            .collect();
        assert_eq!(pred.len(), 2);
        assert_eq!(
            pred.value_of(Col::Uid),
            Some(&FieldValue::Text("99".to_string()))
        );
        assert_eq!(pred.value_of(Col::Id), None);
    }

    #[test]
    fn null_and_negation_render() {
        let pred = Predicate::eq(Col::ExtraData, None::<String>)
            .and_not(Col::Provider, "google")
            .and_not(Col::Uid, FieldValue::Null);
        let qb = delete::<Links>(&pred);
        assert_eq!(
            qb.sql(),
            "DELETE FROM links WHERE extra_data IS NULL AND provider <> ? AND uid IS NOT NULL"
        );
    }
}
