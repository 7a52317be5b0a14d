//! SQLite-backed store.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

use crate::models::{NewTrailer, Provider, Trailer};
use crate::rows::{
    assignments, placeholders, provider_from_row, provider_values, timestamp, trailer_from_row,
    trailer_values, PROVIDER_COLUMNS, SCHEMA, TRAILER_COLUMNS,
};
use crate::store::{ProviderStore, TrailerStore};
use fleetsync_common::{CompanyId, Error, ProviderId, Result, TrailerId};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Convert a SQLite error, separating constraint violations from other failures.
fn db_error(err: rusqlite::Error) -> Error {
    match &err {
        rusqlite::Error::SqliteFailure(failure, message)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            Error::Conflict(message.clone().unwrap_or_else(|| err.to_string()))
        }
        _ => Error::Persistence(err.to_string()),
    }
}

/// SQLite store.
///
/// The connection sits behind a mutex and every call runs on the blocking
/// thread pool. Tables are created on open.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create a database file. `":memory:"` opens a private in-memory database.
    ///
    /// # Errors
    /// - Database open or schema creation failure
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(db_error)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(db_error)?;
        conn.execute_batch(SCHEMA).map_err(db_error)?;

        info!(path = %path.display(), "Store opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    /// Run `f` against the connection on the blocking pool.
    async fn call<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(|e| e.into_inner());
            f(&guard)
        })
        .await
        .map_err(|e| Error::Persistence(format!("Store task failed: {}", e)))?
    }
}

fn select_trailer(
    conn: &Connection,
    clause: &str,
    params: impl rusqlite::Params,
) -> Result<Option<Trailer>> {
    let sql = format!("SELECT {} FROM trailers WHERE {}", TRAILER_COLUMNS, clause);
    conn.query_row(&sql, params, trailer_from_row)
        .optional()
        .map_err(db_error)
}

#[async_trait]
impl TrailerStore for SqliteStore {
    async fn find_by_external_id(
        &self,
        company_id: &CompanyId,
        external_id: &str,
    ) -> Result<Option<Trailer>> {
        let company_id = company_id.to_string();
        let external_id = external_id.to_string();
        self.call(move |conn| {
            select_trailer(
                conn,
                "company_id = ?1 AND external_id = ?2",
                params![company_id, external_id],
            )
        })
        .await
    }

    async fn get_trailer(&self, id: &TrailerId) -> Result<Option<Trailer>> {
        let id = id.to_string();
        self.call(move |conn| select_trailer(conn, "id = ?1", params![id]))
            .await
    }

    async fn create(&self, trailer: NewTrailer) -> Result<Trailer> {
        let trailer = trailer.into_trailer(TrailerId::generate(), Utc::now());
        self.call(move |conn| {
            let sql = format!(
                "INSERT INTO trailers ({}) VALUES ({})",
                TRAILER_COLUMNS,
                placeholders(TRAILER_COLUMNS.split(',').count())
            );
            conn.execute(&sql, params_from_iter(trailer_values(&trailer)))
                .map_err(db_error)?;
            debug!(id = %trailer.id, unit = %trailer.unit_number, "Created trailer");
            Ok(trailer)
        })
        .await
    }

    async fn update(&self, mut trailer: Trailer) -> Result<Trailer> {
        trailer.updated_at = Utc::now();
        self.call(move |conn| {
            let sql = format!(
                "UPDATE trailers SET {} WHERE id = ?1",
                assignments(TRAILER_COLUMNS)
            );
            let changed = conn
                .execute(&sql, params_from_iter(trailer_values(&trailer)))
                .map_err(db_error)?;
            if changed == 0 {
                return Err(Error::NotFound(format!("Trailer {} not found", trailer.id)));
            }
            Ok(trailer)
        })
        .await
    }

    async fn list_by_provider(&self, provider_id: &ProviderId) -> Result<Vec<Trailer>> {
        let provider_id = provider_id.to_string();
        self.call(move |conn| {
            let sql = format!(
                "SELECT {} FROM trailers WHERE provider_id = ?1 ORDER BY unit_number",
                TRAILER_COLUMNS
            );
            let mut stmt = conn.prepare(&sql).map_err(db_error)?;
            let rows = stmt
                .query_map(params![provider_id], trailer_from_row)
                .map_err(db_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_error)
        })
        .await
    }

    async fn delete_by_provider(&self, provider_id: &ProviderId) -> Result<u64> {
        let provider_id = provider_id.to_string();
        self.call(move |conn| {
            let removed = conn
                .execute("DELETE FROM trailers WHERE provider_id = ?1", params![provider_id])
                .map_err(db_error)?;
            Ok(removed as u64)
        })
        .await
    }
}

#[async_trait]
impl ProviderStore for SqliteStore {
    async fn get_provider(&self, id: &ProviderId) -> Result<Option<Provider>> {
        let id = id.to_string();
        self.call(move |conn| {
            let sql = format!("SELECT {} FROM providers WHERE id = ?1", PROVIDER_COLUMNS);
            conn.query_row(&sql, params![id], provider_from_row)
                .optional()
                .map_err(db_error)
        })
        .await
    }

    async fn insert_provider(&self, provider: Provider) -> Result<Provider> {
        self.call(move |conn| {
            let sql = format!(
                "INSERT INTO providers ({}) VALUES ({})",
                PROVIDER_COLUMNS,
                placeholders(PROVIDER_COLUMNS.split(',').count())
            );
            conn.execute(&sql, params_from_iter(provider_values(&provider)))
                .map_err(db_error)?;
            Ok(provider)
        })
        .await
    }

    async fn update_provider(&self, mut provider: Provider) -> Result<Provider> {
        provider.updated_at = Utc::now();
        self.call(move |conn| {
            let sql = format!(
                "UPDATE providers SET {} WHERE id = ?1",
                assignments(PROVIDER_COLUMNS)
            );
            let changed = conn
                .execute(&sql, params_from_iter(provider_values(&provider)))
                .map_err(db_error)?;
            if changed == 0 {
                return Err(Error::NotFound(format!("Provider {} not found", provider.id)));
            }
            debug!(
                id = %provider.id,
                updated_at = %timestamp(&provider.updated_at),
                "Updated provider"
            );
            Ok(provider)
        })
        .await
    }

    async fn delete_provider(&self, id: &ProviderId) -> Result<()> {
        let id = id.clone();
        self.call(move |conn| {
            let removed = conn
                .execute("DELETE FROM providers WHERE id = ?1", params![id.as_str()])
                .map_err(db_error)?;
            if removed == 0 {
                return Err(Error::NotFound(format!("Provider {} not found", id)));
            }
            Ok(())
        })
        .await
    }
}
