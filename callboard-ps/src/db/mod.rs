//! Service-local database helpers

pub mod entities;
