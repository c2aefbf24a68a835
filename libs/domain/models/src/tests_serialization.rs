// [libs/domain/models/src/tests_serialization.rs]
/*!
 * =================================================================
 * APARATO: DOMAIN SERIALIZATION TEST (V3.0 - INTEGRATION LEVEL)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-MODELS)
 * RESPONSABILIDAD: CERTIFICACIÓN DE PARIDAD JSON DEL PROTOCOLO LIQUID
 * =================================================================
 */
