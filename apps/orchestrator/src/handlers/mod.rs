// [apps/orchestrator/src/handlers/mod.rs]
/*!
 * =================================================================
 * APARATO: HANDLER STRATA REGISTRY (V3.0 - API ADAPTERS)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: REGISTRO NOMINAL DE ADAPTADORES HTTP
 * =================================================================
 */

pub mod commitment;
