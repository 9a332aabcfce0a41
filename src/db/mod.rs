//! Database module for the forum hub
//!
//! The hub talks to user persistence only through [`UserStore`];
//! [`DbOperations`] is the PostgreSQL implementation.

pub mod models;
pub mod operations;

pub use models::NewUser;
pub use operations::{DbOperations, UserStore};

#[cfg(test)]
pub use operations::MockUserStore;
