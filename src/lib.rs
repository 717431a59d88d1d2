//! Muster - party, role and permission registry for disaster management
//!
//! Muster exposes three MongoDB-backed record types over a small versioned
//! REST API:
//!
//! - **Party**: an organizational or individual entity participating in
//!   disaster management, optionally nested under a parent party
//! - **Role**: a named bundle of permissions assignable to a party
//! - **Permission**: an atomic grant of an action on a resource, identified
//!   by a derived wildcard key
//!
//! Generic CRUD behavior lives in [`actions`]; record types specialize it
//! only through validation and normalization hooks.

pub mod actions;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod types;
pub mod validation;

pub use config::{Args, Enums};
pub use server::{run, serve, AppState};
pub use types::{MusterError, Result};
