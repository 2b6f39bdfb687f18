// ============================================================================
// Customer Domain
// ============================================================================
//
// Just enough customer model to resolve an identity token to an internal
// customer id: the entity, its national identifier and validation errors.
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod aggregate;

pub use value_objects::*;
pub use errors::*;
pub use aggregate::*;
