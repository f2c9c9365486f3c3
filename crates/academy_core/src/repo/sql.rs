//! Typed SQL builders for the relational store.
//!
//! # Responsibility
//! - Map table/column names onto a fixed allow-list.
//! - Build statement text plus the ordered values bound to it.
//!
//! # Invariants
//! - Values only ever travel as bound parameters, never as statement text.
//! - Identifiers in statement text come from `Table::columns()` only.

use crate::repo::sqlite_manager::{RepoError, RepoResult};
use rusqlite::types::Value;
use std::fmt::{Display, Formatter};

const STUDENT_COLUMNS: &[&str] = &["student_id", "name", "surname", "age"];
const ADVISOR_COLUMNS: &[&str] = &["advisor_id", "name", "surname", "age"];
const LINK_COLUMNS: &[&str] = &["student_id", "advisor_id"];

/// Tables known to the relational store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Students,
    Advisors,
    StudentAdvisor,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Self::Students => "students",
            Self::Advisors => "advisors",
            Self::StudentAdvisor => "student_advisor",
        }
    }

    /// Columns in declaration order; positional inserts follow this order.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Students => STUDENT_COLUMNS,
            Self::Advisors => ADVISOR_COLUMNS,
            Self::StudentAdvisor => LINK_COLUMNS,
        }
    }

    /// Resolves a caller-supplied column name against the allow-list.
    pub fn column(self, name: &str) -> RepoResult<&'static str> {
        self.columns()
            .iter()
            .copied()
            .find(|column| *column == name)
            .ok_or_else(|| RepoError::UnknownColumn {
                table: self.name(),
                column: name.to_string(),
            })
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered `column = value` pairs.
///
/// Used both as an AND-conjunction filter and as an assignment list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnValues {
    entries: Vec<(String, Value)>,
}

/// AND-conjunction of equality conditions. Empty means "no filter".
pub type Conditions = ColumnValues;

/// Column assignments for `UPDATE ... SET`.
pub type Assignments = ColumnValues;

impl ColumnValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `column = value`. Order is preserved in the built statement.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.push((column.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .iter()
            .map(|(column, value)| (column.as_str(), value))
    }
}

/// Statement text plus the values bound to its `?` placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

pub fn insert(table: Table) -> String {
    let columns = table.columns();
    let placeholders = (1..=columns.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({placeholders});",
        table.name(),
        columns.join(", ")
    )
}

pub fn sample(table: Table) -> String {
    format!(
        "SELECT {} FROM {} ORDER BY RANDOM() LIMIT ?1;",
        table.columns().join(", "),
        table.name()
    )
}

pub fn load_all(table: Table) -> String {
    format!(
        "SELECT {} FROM {} ORDER BY rowid;",
        table.columns().join(", "),
        table.name()
    )
}

pub fn count_where(table: Table, column: &str) -> RepoResult<String> {
    let column = table.column(column)?;
    Ok(format!(
        "SELECT COUNT({column}) FROM {} WHERE {column} = ?1;",
        table.name()
    ))
}

pub fn delete_where(table: Table, column: &str) -> RepoResult<String> {
    let column = table.column(column)?;
    Ok(format!("DELETE FROM {} WHERE {column} = ?1;", table.name()))
}

/// `SELECT <columns|all> FROM <table> [WHERE a = ? AND b = ?]`.
pub fn select(table: Table, columns: &[&str], conditions: &Conditions) -> RepoResult<BuiltQuery> {
    let projection = if columns.is_empty() {
        table.columns().join(", ")
    } else {
        columns
            .iter()
            .map(|column| table.column(column))
            .collect::<RepoResult<Vec<_>>>()?
            .join(", ")
    };

    let mut sql = format!("SELECT {projection} FROM {}", table.name());
    let mut params = Vec::with_capacity(conditions.len());
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&bind_list(table, conditions, " AND ", 1, &mut params)?);
    }
    sql.push_str(" ORDER BY rowid;");

    Ok(BuiltQuery { sql, params })
}

/// `UPDATE <table> SET a = ?, b = ? WHERE c = ? AND d = ?`.
///
/// Both lists must be non-empty; an unconditional update is not expressible.
pub fn update(
    table: Table,
    assignments: &Assignments,
    conditions: &Conditions,
) -> RepoResult<BuiltQuery> {
    if assignments.is_empty() {
        return Err(RepoError::InvalidQuery(
            "update requires at least one assignment".to_string(),
        ));
    }
    if conditions.is_empty() {
        return Err(RepoError::InvalidQuery(
            "update requires at least one condition".to_string(),
        ));
    }

    let mut params = Vec::with_capacity(assignments.len() + conditions.len());
    let set_clause = bind_list(table, assignments, ", ", 1, &mut params)?;
    let where_clause = bind_list(table, conditions, " AND ", params.len() + 1, &mut params)?;

    Ok(BuiltQuery {
        sql: format!(
            "UPDATE {} SET {set_clause} WHERE {where_clause};",
            table.name()
        ),
        params,
    })
}

fn bind_list(
    table: Table,
    pairs: &ColumnValues,
    separator: &str,
    first_index: usize,
    params: &mut Vec<Value>,
) -> RepoResult<String> {
    let mut fragments = Vec::with_capacity(pairs.len());
    for (offset, (column, value)) in pairs.iter().enumerate() {
        let column = table.column(column)?;
        fragments.push(format!("{column} = ?{}", first_index + offset));
        params.push(value.clone());
    }
    Ok(fragments.join(separator))
}
