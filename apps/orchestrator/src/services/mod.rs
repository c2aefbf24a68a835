// [apps/orchestrator/src/services/mod.rs]
/*!
 * =================================================================
 * APARATO: SERVICE STRATA REGISTRY (V3.0 - LIFECYCLE COMMAND)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: REGISTRO NOMINAL DE SERVICIOS DEL ORQUESTADOR
 * =================================================================
 */

pub mod audit_trail;
pub mod chronos;
pub mod event_bus;
pub mod lifecycle;
pub mod transfer_pool;

pub use chronos::{ChronosSweep, TimeAuthority};
pub use event_bus::EventBus;
pub use lifecycle::CommitmentLifecycleService;
