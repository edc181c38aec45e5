//! Checkout domain: aggregates, pricing rules and the events they raise.
pub mod aggregates;
pub mod events;
pub mod pricing;
pub mod value_objects;
