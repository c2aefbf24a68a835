// [libs/infra/db/src/repositories/rowmap.rs]
/*!
 * =================================================================
 * APARATO: ROW MAPPING TOOLKIT (V3.1 - TYPE BRIDGE)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: PUENTE DE TIPOS SQLITE <-> DOMINIO RUST
 *
 * Los instantes se persisten como RFC3339 UTC de precisión fija (Z,
 * microsegundos), de modo que el orden lexicográfico en SQL coincide
 * con el orden temporal.
 * =================================================================
 */

use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Row, Value};

use crate::errors::DbError;

/// Serializa un instante a su forma persistida canónica.
pub fn fmt_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Forma persistida opcional; NULL cuando ausente.
pub fn fmt_opt_instant(instant: Option<DateTime<Utc>>) -> Value {
    match instant {
        Some(value) => Value::Text(fmt_instant(value)),
        None => Value::Null,
    }
}

pub fn opt_text_value(text: Option<&str>) -> Value {
    match text {
        Some(value) => Value::Text(value.to_string()),
        None => Value::Null,
    }
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|fault| DbError::MappingError(format!("bad instant {:?}: {}", raw, fault)))
}

pub fn int_at(row: &Row, index: i32) -> Result<i64, DbError> {
    match row.get_value(index)? {
        Value::Integer(value) => Ok(value),
        other => Err(DbError::MappingError(format!(
            "column {} is not an integer: {:?}",
            index, other
        ))),
    }
}

pub fn opt_int_at(row: &Row, index: i32) -> Result<Option<i64>, DbError> {
    match row.get_value(index)? {
        Value::Null => Ok(None),
        Value::Integer(value) => Ok(Some(value)),
        other => Err(DbError::MappingError(format!(
            "column {} is not a nullable integer: {:?}",
            index, other
        ))),
    }
}

pub fn text_at(row: &Row, index: i32) -> Result<String, DbError> {
    match row.get_value(index)? {
        Value::Text(value) => Ok(value),
        other => Err(DbError::MappingError(format!(
            "column {} is not text: {:?}",
            index, other
        ))),
    }
}

pub fn opt_text_at(row: &Row, index: i32) -> Result<Option<String>, DbError> {
    match row.get_value(index)? {
        Value::Null => Ok(None),
        Value::Text(value) => Ok(Some(value)),
        other => Err(DbError::MappingError(format!(
            "column {} is not nullable text: {:?}",
            index, other
        ))),
    }
}

pub fn bool_at(row: &Row, index: i32) -> Result<bool, DbError> {
    Ok(int_at(row, index)? != 0)
}

pub fn instant_at(row: &Row, index: i32) -> Result<DateTime<Utc>, DbError> {
    let raw = text_at(row, index)?;
    parse_instant(&raw)
}

pub fn opt_instant_at(row: &Row, index: i32) -> Result<Option<DateTime<Utc>>, DbError> {
    match opt_text_at(row, index)? {
        None => Ok(None),
        Some(raw) => parse_instant(&raw).map(Some),
    }
}

/// Cantidades del dominio son u64; el ledger las guarda como INTEGER.
pub fn amount_at(row: &Row, index: i32) -> Result<u64, DbError> {
    let raw = int_at(row, index)?;
    u64::try_from(raw)
        .map_err(|_| DbError::MappingError(format!("negative amount in column {}", index)))
}
