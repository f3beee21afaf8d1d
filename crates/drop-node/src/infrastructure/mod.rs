//! Infrastructure for the node binary: the TCP transport collaborator and
//! config file persistence.

pub mod config;
pub mod transport;
