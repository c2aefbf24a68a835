// [libs/infra/liquid/src/lib.rs]
/*!
 * =================================================================
 * APARATO: LIQUID GATEWAY (V3.0 - ACCEPTANCE CHANNEL)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: DIÁLOGO DE ACEPTACIÓN CON LOS DRIVERS DE BACKEND
 * =================================================================
 */

pub mod conduit;
pub mod errors;
pub mod registry;

pub use conduit::{HttpConduit, LiquidConduit, ScriptedConduit};
pub use errors::LiquidError;
pub use registry::LiquidGateway;
