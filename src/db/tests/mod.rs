//! Repository tests shared between backends
//!
//! `reports.rs` holds backend-agnostic test functions taking `&dyn ReportRepo`.
//! They are instantiated twice:
//!
//! - against an in-memory SQLite pool on every `cargo test`
//! - against a testcontainers PostgreSQL schema, marked `#[ignore]`
//!
//! ```bash
//! cargo test                                   # SQLite only
//! cargo test --features database-postgres -- --ignored
//! ```

mod reports;
