pub mod schema;

use crate::error::AppError;
use rusqlite::Connection;
use std::path::Path;

/// Opens (and if needed creates) the database at `path` with the full schema
pub fn init_database(path: &Path) -> Result<Connection, AppError> {
    // Make sure the directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(path)?;
    schema::init_schema(&conn)?;
    log::debug!("Database ready at {}", path.display());

    Ok(conn)
}
