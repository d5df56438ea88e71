//! SQLite-backed persisted state.
//!
//! Holds the small key-value record that survives process restarts: the last
//! reconciled manifest's version identity and document.

pub mod connection;
pub mod migrations;
pub mod version;

pub use connection::StateDb;
pub use version::VersionState;
