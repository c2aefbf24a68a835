// [libs/domain/lifecycle/src/lib.rs]
/*!
 * =================================================================
 * APARATO: COMMITMENT LIFECYCLE CORE (V3.0 - INVARIANT GUARD)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: TRANSICIONES LEGALES, PLANES DE MUTACIÓN Y
 *                  CONSTRUCCIÓN DE PETICIONES DE CAMBIO
 * =================================================================
 */

pub mod change_builder;
pub mod conversion;
pub mod state_machine;

pub use change_builder::ChangeRequestBuilder;
pub use state_machine::{GuardRefusal, RENEWAL_WINDOW_DAYS};
