//! Relational store manager over SQLite.
//!
//! # Responsibility
//! - Own the single SQLite connection for the manager lifetime.
//! - Provide generic row-level operations over the allow-listed tables.
//! - Implement the insert-if-absent policy for the relational backend.
//!
//! # Invariants
//! - Primary-key and uniqueness conflicts on insert are swallowed
//!   (`Ok(false)`); every other failure propagates.
//! - Each operation is one auto-committed statement.
//! - Values are always bound; see `repo::sql`.

use crate::db::schema::apply_schema;
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::link::StudentAdvisorLink;
use crate::model::person::{AdvisorId, StudentId};
use crate::repo::sql::{self, Assignments, Conditions, Table};
use crate::repo::store::{AcademyStore, Entity, StoreResult};
use log::{debug, info};
use rusqlite::types::Value;
use rusqlite::{ffi, params, params_from_iter, Connection, ErrorCode, Params};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// One result row, values in projection order.
pub type SqlRow = Vec<Value>;

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from relational store operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Column name outside the table's allow-list.
    UnknownColumn {
        table: &'static str,
        column: String,
    },
    /// Positional insert with the wrong number of values.
    ArityMismatch {
        table: &'static str,
        expected: usize,
        actual: usize,
    },
    InvalidQuery(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UnknownColumn { table, column } => {
                write!(f, "unknown column `{column}` in table `{table}`")
            }
            Self::ArityMismatch {
                table,
                expected,
                actual,
            } => write!(
                f,
                "table `{table}` takes {expected} values per row, got {actual}"
            ),
            Self::InvalidQuery(message) => write!(f, "invalid query: {message}"),
            Self::InvalidData(message) => write!(f, "invalid stored data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UnknownColumn { .. } => None,
            Self::ArityMismatch { .. } => None,
            Self::InvalidQuery(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Inserts a link only while the student is below quota, in one statement.
const LINK_IF_BELOW_QUOTA_SQL: &str = "INSERT OR IGNORE INTO student_advisor (student_id, advisor_id)
    SELECT ?1, ?2
    WHERE (SELECT COUNT(*) FROM student_advisor WHERE student_id = ?1) < ?3;";

/// SQLite-backed relational store manager.
pub struct SqliteManager {
    conn: Connection,
}

impl SqliteManager {
    /// Opens (creating if needed) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Closes the connection, surfacing close errors instead of dropping them.
    pub fn close(self) -> RepoResult<()> {
        self.conn.close().map_err(|(_, err)| err.into())
    }

    /// Ensures the `students`, `advisors` and `student_advisor` tables exist.
    ///
    /// Safe to call repeatedly; later calls do nothing.
    pub fn create_schema(&mut self) -> RepoResult<()> {
        let applied = apply_schema(&mut self.conn)?;
        info!("event=schema_ensure module=sqlite status=ok applied={applied}");
        Ok(())
    }

    /// Inserts one row, values positional in `table.columns()` order.
    ///
    /// Returns `Ok(false)` when the row already exists (primary-key or
    /// uniqueness conflict). Foreign-key failures are errors.
    pub fn insert_record(&self, table: Table, values: &[Value]) -> RepoResult<bool> {
        let expected = table.columns().len();
        if values.len() != expected {
            return Err(RepoError::ArityMismatch {
                table: table.name(),
                expected,
                actual: values.len(),
            });
        }

        match self
            .conn
            .execute(&sql::insert(table), params_from_iter(values.iter()))
        {
            Ok(_) => Ok(true),
            Err(err) if is_uniqueness_violation(&err) => {
                debug!("event=insert_record module=sqlite status=skipped reason=conflict table={table}");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Returns up to `n` distinct rows drawn uniformly from the whole table.
    pub fn sample_random_rows(&self, table: Table, n: usize) -> RepoResult<Vec<SqlRow>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        self.collect_rows(&sql::sample(table), [limit])
    }

    /// Counts rows where `column = value`.
    pub fn count_relations(
        &self,
        table: Table,
        column: &str,
        value: impl Into<Value>,
    ) -> RepoResult<u64> {
        let value: Value = value.into();
        let count: i64 = self
            .conn
            .query_row(&sql::count_where(table, column)?, [value], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count {count}")))
    }

    /// Deletes rows where `column = key`; returns the number removed.
    pub fn delete_by_key(
        &self,
        table: Table,
        column: &str,
        key: impl Into<Value>,
    ) -> RepoResult<usize> {
        let key: Value = key.into();
        let removed = self
            .conn
            .execute(&sql::delete_where(table, column)?, [key])?;
        debug!("event=delete_by_key module=sqlite status=ok table={table} removed={removed}");
        Ok(removed)
    }

    /// Returns every row in insertion order.
    pub fn load_all(&self, table: Table) -> RepoResult<Vec<SqlRow>> {
        self.collect_rows(&sql::load_all(table), [])
    }

    /// Projects `columns` (all when empty) from rows matching every condition.
    pub fn search(
        &self,
        table: Table,
        columns: &[&str],
        conditions: &Conditions,
    ) -> RepoResult<Vec<SqlRow>> {
        let query = sql::select(table, columns, conditions)?;
        self.collect_rows(&query.sql, params_from_iter(query.params.iter()))
    }

    /// Applies `assignments` to rows matching every condition.
    ///
    /// Returns the number of rows changed.
    pub fn update(
        &self,
        table: Table,
        assignments: &Assignments,
        conditions: &Conditions,
    ) -> RepoResult<usize> {
        let query = sql::update(table, assignments, conditions)?;
        let changed = self
            .conn
            .execute(&query.sql, params_from_iter(query.params.iter()))?;
        debug!("event=update module=sqlite status=ok table={table} changed={changed}");
        Ok(changed)
    }

    fn collect_rows<P: Params>(&self, sql: &str, params: P) -> RepoResult<Vec<SqlRow>> {
        let mut stmt = self.conn.prepare(sql)?;
        let width = stmt.column_count();
        let mut rows = stmt.query(params)?;
        let mut out = Vec::new();

        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for index in 0..width {
                values.push(row.get::<_, Value>(index)?);
            }
            out.push(values);
        }

        Ok(out)
    }
}

impl AcademyStore for SqliteManager {
    fn insert_if_absent(&self, entity: Entity<'_>) -> StoreResult<bool> {
        let (table, values) = match entity {
            Entity::Student(student) => (
                Table::Students,
                [
                    Value::Integer(student.id),
                    Value::Text(student.name.clone()),
                    Value::Text(student.surname.clone()),
                    Value::Integer(i64::from(student.age)),
                ],
            ),
            Entity::Advisor(advisor) => (
                Table::Advisors,
                [
                    Value::Integer(advisor.id),
                    Value::Text(advisor.name.clone()),
                    Value::Text(advisor.surname.clone()),
                    Value::Integer(i64::from(advisor.age)),
                ],
            ),
        };
        Ok(self.insert_record(table, &values)?)
    }

    fn sample_advisor_ids(&self, n: usize) -> StoreResult<Vec<AdvisorId>> {
        let rows = self.sample_random_rows(Table::Advisors, n)?;
        let ids = rows
            .iter()
            .map(|row| match row.first() {
                Some(Value::Integer(id)) => Ok(*id),
                other => Err(RepoError::InvalidData(format!(
                    "advisors.advisor_id is not an integer: {other:?}"
                ))),
            })
            .collect::<RepoResult<Vec<_>>>()?;
        Ok(ids)
    }

    fn advisor_link_count(&self, student_id: StudentId) -> StoreResult<u64> {
        Ok(self.count_relations(Table::StudentAdvisor, "student_id", student_id)?)
    }

    fn link_if_below_quota(&self, link: StudentAdvisorLink, quota: u32) -> StoreResult<bool> {
        let inserted = self
            .conn
            .execute(
                LINK_IF_BELOW_QUOTA_SQL,
                params![link.student_id, link.advisor_id, i64::from(quota)],
            )
            .map_err(RepoError::from)?;
        Ok(inserted == 1)
    }
}

fn is_uniqueness_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => {
            failure.code == ErrorCode::ConstraintViolation
                && matches!(
                    failure.extended_code,
                    ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE
                )
        }
        _ => false,
    }
}
