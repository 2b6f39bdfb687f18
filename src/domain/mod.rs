// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each aggregate has its own subdirectory with value objects, errors and the
// aggregate itself. Orders additionally own their lifecycle events, the
// transition table and the workflow service that drives them.
//
// ============================================================================

pub mod order;
pub mod customer;
