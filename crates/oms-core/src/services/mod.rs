//! Orchestration services.
//!
//! Each service wraps one entity family: load fresh state, evaluate the
//! lifecycle or computation, commit with optimistic concurrency, then
//! perform post-commit coupling (task enqueue, event publish). Guards and
//! lifecycle rules live in `oms-state`; nothing here mutates an entity
//! outside a committed write.

/// Invoice record queries.
pub mod invoice;
/// Order creation, queries, and lifecycle transitions.
pub mod order;
/// Payment creation, processing, and refunds.
pub mod payment;
/// Return creation, queries, and lifecycle transitions.
pub mod returns;

pub use invoice::{InvoiceFilter, InvoiceService};
pub use order::{OrderFilter, OrderService};
pub use payment::{PaymentFilter, PaymentService};
pub use returns::{ReturnFilter, ReturnService};
