//! Versioned relational schema for the academy tables.
//!
//! Steps run in ascending `version` order inside one transaction. The
//! highest applied step is recorded in `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use log::debug;
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const STEPS: &[SchemaStep] = &[SchemaStep {
    version: 1,
    name: "academy_tables",
    sql: include_str!("0001_academy.sql"),
}];

/// Highest schema version this build can create.
pub fn latest_schema_version() -> u32 {
    STEPS.iter().map(|step| step.version).max().unwrap_or(0)
}

/// Version recorded in the database, 0 for a fresh one.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Brings the schema up to `latest_schema_version`.
///
/// Returns how many steps ran. A database stamped with a newer version is
/// rejected untouched.
pub fn apply_schema(conn: &mut Connection) -> DbResult<usize> {
    let found = schema_version(conn)?;
    let supported = latest_schema_version();
    if found > supported {
        return Err(DbError::SchemaTooNew { found, supported });
    }

    let pending = STEPS
        .iter()
        .filter(|step| step.version > found)
        .collect::<Vec<_>>();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        debug!(
            "event=schema_step module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;
    Ok(pending.len())
}
