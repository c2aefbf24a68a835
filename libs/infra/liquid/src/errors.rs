// [libs/infra/liquid/src/errors.rs]
/*!
 * =================================================================
 * APARATO: LIQUID ERROR CATALOG (V3.0 - SEMANTIC FAULTS)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN DE FALLOS DEL CANAL DE ACEPTACIÓN
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LiquidError {
    /// El driver no respondió dentro del presupuesto del llamante.
    /// Se presenta como 5xx; ningún commit parcial puede escapar.
    #[error("[L3_LIQUID_NET_FAULT]: DRIVER_UNREACHABLE -> {0}")]
    Unreachable(String),

    /// El driver respondió fuera del contrato de protocolo.
    #[error("[L3_LIQUID_PROTO_FAULT]: MALFORMED_RESPONSE -> {0}")]
    MalformedResponse(String),

    /// El tipo de servicio no está registrado en la pasarela.
    #[error("[L3_LIQUID_REGISTRY_FAULT]: UNKNOWN_SERVICE_TYPE -> {0}")]
    UnknownServiceType(String),
}
