// ============================================================================
// Order Domain - Kitchen order lifecycle
// ============================================================================
//
// - Value objects (LineItem, OrderStatus)
// - Aggregate (Order with item management and status primitives)
// - Events (lifecycle event kinds, payloads, wire form)
// - Commands (CreateOrder)
// - Errors (OrderError taxonomy)
// - Transitions (the lifecycle graph as a table)
// - Workflow (load → transition → persist → publish)
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod transitions;
pub mod workflow;

pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use transitions::*;
pub use workflow::*;
