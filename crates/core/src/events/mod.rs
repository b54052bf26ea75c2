//! Ledger events module.
//!
//! Provides the event types produced by the transaction executor and the sink
//! trait used to hand them to whoever is listening.

mod ledger_event;
mod sink;

pub use ledger_event::*;
pub use sink::*;
