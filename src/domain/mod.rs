//! Domain types and the ports through which the application layer talks to
//! credential and payment collaborators.

pub mod identity;
pub mod ports;
pub mod pricing;
pub mod transaction;
