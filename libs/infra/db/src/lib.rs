// [libs/infra/db/src/lib.rs]
/*!
 * =================================================================
 * APARATO: CUSTOS PERSISTENCE ADAPTER (V3.0 - TACTICAL LEDGER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ACCESO ACID AL LEDGER DE COMPROMISOS
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;

pub use client::LedgerClient;
pub use errors::DbError;
