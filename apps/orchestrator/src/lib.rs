// [apps/orchestrator/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR LIBRARY ROOT (V3.0 - LIFECYCLE COMMAND)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L4)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DE MÓDULOS DEL ORQUESTADOR
 * =================================================================
 */

pub mod bootstrap;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub mod prelude {
    pub use crate::bootstrap::OrchestratorKernel;
    pub use crate::errors::LifecycleError;
    pub use crate::state::AppState;
}
