//! Domain layer for the ragd retrieval-augmented question-answering service.
//!
//! Holds the entities (jobs, chunks, retrieval results), the service-wide
//! [`Error`] type, and the ports (traits) that the provider and
//! infrastructure layers implement. This crate performs no I/O.

pub mod entities;
pub mod error;
pub mod ports;
pub mod utils;

pub use error::{Error, Result};
