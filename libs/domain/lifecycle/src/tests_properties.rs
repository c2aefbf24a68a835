// [libs/domain/lifecycle/src/tests_properties.rs]
/*!
 * =================================================================
 * APARATO: LIFECYCLE PROPERTY SUITE (V3.0 - PROVING GROUNDS)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-LIFECYCLE)
 * RESPONSABILIDAD: INVARIANTES BAJO ENTRADAS GENERADAS
 * =================================================================
 */
