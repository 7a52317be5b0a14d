//! Mapping between SQLite rows and typed records.
//!
//! Columns are snake_case and timestamps are RFC 3339 text. This is the
//! only place where column names meet struct fields.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::Row;
use std::error::Error as StdError;

use crate::models::{Provider, Trailer};
use fleetsync_common::{CompanyId, ProviderId, TenantId, TrailerId};

pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS providers (
    id TEXT PRIMARY KEY,
    company_id TEXT NOT NULL,
    tenant_id TEXT NOT NULL,
    type TEXT NOT NULL,
    name TEXT NOT NULL,
    credentials_encrypted TEXT NOT NULL,
    status TEXT NOT NULL,
    last_error TEXT,
    last_trailer_count INTEGER,
    last_sync_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS trailers (
    id TEXT PRIMARY KEY,
    external_id TEXT NOT NULL,
    company_id TEXT NOT NULL,
    tenant_id TEXT NOT NULL,
    provider_id TEXT NOT NULL,
    unit_number TEXT NOT NULL,
    vin TEXT,
    make TEXT,
    model TEXT,
    year INTEGER,
    plate TEXT,
    last_latitude REAL,
    last_longitude REAL,
    last_address TEXT,
    last_gps_update TEXT,
    last_sync TEXT,
    gps_status TEXT NOT NULL,
    gps_enabled INTEGER NOT NULL,
    status TEXT NOT NULL,
    manual_location_override INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (tenant_id, unit_number),
    UNIQUE (company_id, external_id)
);

CREATE INDEX IF NOT EXISTS idx_trailers_provider ON trailers(provider_id);
CREATE INDEX IF NOT EXISTS idx_providers_company ON providers(company_id);
"#;

pub(crate) const PROVIDER_COLUMNS: &str = "id, company_id, tenant_id, type, name, \
    credentials_encrypted, status, last_error, last_trailer_count, last_sync_at, \
    created_at, updated_at";

pub(crate) const TRAILER_COLUMNS: &str = "id, external_id, company_id, tenant_id, \
    provider_id, unit_number, vin, make, model, year, plate, last_latitude, \
    last_longitude, last_address, last_gps_update, last_sync, gps_status, gps_enabled, \
    status, manual_location_override, created_at, updated_at";

/// `?1, ?2, ... ?n`
pub(crate) fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{}", i)).collect::<Vec<_>>().join(", ")
}

/// `col_b = ?2, col_c = ?3, ...` for every column but the first (the key).
pub(crate) fn assignments(columns: &str) -> String {
    columns
        .split(',')
        .map(str::trim)
        .enumerate()
        .skip(1)
        .map(|(i, col)| format!("{} = ?{}", col, i + 1))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn opt_text(value: Option<String>) -> Value {
    value.map(Value::Text).unwrap_or(Value::Null)
}

fn opt_timestamp(ts: Option<DateTime<Utc>>) -> Value {
    opt_text(ts.as_ref().map(timestamp))
}

/// Parameter values in `PROVIDER_COLUMNS` order.
pub(crate) fn provider_values(p: &Provider) -> Vec<Value> {
    vec![
        Value::Text(p.id.to_string()),
        Value::Text(p.company_id.to_string()),
        Value::Text(p.tenant_id.to_string()),
        Value::Text(p.kind.as_str().to_string()),
        Value::Text(p.name.clone()),
        Value::Text(p.credentials_encrypted.clone()),
        Value::Text(p.status.as_str().to_string()),
        opt_text(p.last_error.clone()),
        p.last_trailer_count.map(Value::Integer).unwrap_or(Value::Null),
        opt_timestamp(p.last_sync_at),
        Value::Text(timestamp(&p.created_at)),
        Value::Text(timestamp(&p.updated_at)),
    ]
}

/// Parameter values in `TRAILER_COLUMNS` order.
pub(crate) fn trailer_values(t: &Trailer) -> Vec<Value> {
    vec![
        Value::Text(t.id.to_string()),
        Value::Text(t.external_id.clone()),
        Value::Text(t.company_id.to_string()),
        Value::Text(t.tenant_id.to_string()),
        Value::Text(t.provider_id.to_string()),
        Value::Text(t.unit_number.clone()),
        opt_text(t.vin.clone()),
        opt_text(t.make.clone()),
        opt_text(t.model.clone()),
        t.year.map(|y| Value::Integer(y.into())).unwrap_or(Value::Null),
        opt_text(t.plate.clone()),
        t.last_latitude.map(Value::Real).unwrap_or(Value::Null),
        t.last_longitude.map(Value::Real).unwrap_or(Value::Null),
        opt_text(t.last_address.clone()),
        opt_timestamp(t.last_gps_update),
        opt_timestamp(t.last_sync),
        Value::Text(t.gps_status.as_str().to_string()),
        Value::Integer(t.gps_enabled.into()),
        Value::Text(t.status.as_str().to_string()),
        Value::Integer(t.manual_location_override.into()),
        Value::Text(timestamp(&t.created_at)),
        Value::Text(timestamp(&t.updated_at)),
    ]
}

/// Read a text column and convert it, reporting failures against that column.
fn parsed<T, E>(
    row: &Row<'_>,
    column: &str,
    parse: impl FnOnce(String) -> Result<T, E>,
) -> rusqlite::Result<T>
where
    E: StdError + Send + Sync + 'static,
{
    let raw: String = row.get(column)?;
    parse(raw).map_err(|e| {
        let index = row.as_ref().column_index(column).unwrap_or_default();
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e))
    })
}

fn parse_ts(raw: String) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(&raw).map(|ts| ts.with_timezone(&Utc))
}

fn opt_ts(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(column)? {
        Some(raw) => parse_ts(raw).map(Some).map_err(|e| {
            let index = row.as_ref().column_index(column).unwrap_or_default();
            rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e))
        }),
        None => Ok(None),
    }
}

pub(crate) fn provider_from_row(row: &Row<'_>) -> rusqlite::Result<Provider> {
    Ok(Provider {
        id: parsed(row, "id", |s| ProviderId::new(s))?,
        company_id: parsed(row, "company_id", |s| CompanyId::new(s))?,
        tenant_id: parsed(row, "tenant_id", |s| TenantId::new(s))?,
        kind: parsed(row, "type", |s| s.parse())?,
        name: row.get("name")?,
        credentials_encrypted: row.get("credentials_encrypted")?,
        status: parsed(row, "status", |s| s.parse())?,
        last_error: row.get("last_error")?,
        last_trailer_count: row.get("last_trailer_count")?,
        last_sync_at: opt_ts(row, "last_sync_at")?,
        created_at: parsed(row, "created_at", parse_ts)?,
        updated_at: parsed(row, "updated_at", parse_ts)?,
    })
}

pub(crate) fn trailer_from_row(row: &Row<'_>) -> rusqlite::Result<Trailer> {
    Ok(Trailer {
        id: parsed(row, "id", |s| TrailerId::new(s))?,
        external_id: row.get("external_id")?,
        company_id: parsed(row, "company_id", |s| CompanyId::new(s))?,
        tenant_id: parsed(row, "tenant_id", |s| TenantId::new(s))?,
        provider_id: parsed(row, "provider_id", |s| ProviderId::new(s))?,
        unit_number: row.get("unit_number")?,
        vin: row.get("vin")?,
        make: row.get("make")?,
        model: row.get("model")?,
        year: row.get("year")?,
        plate: row.get("plate")?,
        last_latitude: row.get("last_latitude")?,
        last_longitude: row.get("last_longitude")?,
        last_address: row.get("last_address")?,
        last_gps_update: opt_ts(row, "last_gps_update")?,
        last_sync: opt_ts(row, "last_sync")?,
        gps_status: parsed(row, "gps_status", |s| s.parse())?,
        gps_enabled: row.get::<_, i64>("gps_enabled")? != 0,
        status: parsed(row, "status", |s| s.parse())?,
        manual_location_override: row.get::<_, i64>("manual_location_override")? != 0,
        created_at: parsed(row, "created_at", parse_ts)?,
        updated_at: parsed(row, "updated_at", parse_ts)?,
    })
}
