//! # drop-node
//!
//! The dropwire node binary's library: wires the `drop-core` session engine
//! to a concrete TCP transport collaborator, persists configuration, and
//! exposes the interactive command surface.

pub mod cli;
pub mod infrastructure;
