//! # Tabula Architecture
//!
//! Tabula is a **UI-agnostic list-view engine** for content types whose records carry
//! arbitrary, typed metadata. An operator picks which fields show up as columns for a
//! content type; tabula then renders each cell according to the field's type, turns
//! column sorts and filters into query constraints the host executes, and exports the
//! same filtered rows as a delimited table.
//!
//! Tabula owns no content. Records, users, terms and attachments live in the host,
//! which also executes queries and persists settings (see [`host`]).
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (cli/, wired by main.rs)                               │
//! │  - Parses arguments, prints tables, handles terminal I/O    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Admin API (api.rs)                                         │
//! │  - Session, capability and token checks                     │
//! │  - Structured success/failure responses                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  list/ + export/                                            │
//! │  - Headers, cells, sortable columns, filter controls        │
//! │  - Export of the filtered record set                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  columns/ + render/ + query/                                │
//! │  - Sanitize and persist configurations                      │
//! │  - Value rendering per field type                           │
//! │  - Sort and filter translation to query descriptors         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  fields/ + settings + catalog                               │
//! │  - Field type registry and capabilities                     │
//! │  - Display-setting schemas                                  │
//! │  - Field-key resolution against the host catalogue          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: No I/O Assumptions in Core
//!
//! From `api.rs` inward, code:
//! - Takes regular Rust arguments and returns regular Rust types
//! - **Never** writes to stdout/stderr or exits the process
//! - **Never** installs a tracing subscriber
//!
//! Rendering and sanitizing never fail: malformed values render the generic
//! fallback, missing values render the placeholder, and invalid configuration is
//! dropped on save.
//!
//! ## Module Overview
//!
//! - [`api`]: The admin facade
//! - [`catalog`]: Field-key resolution and available-field listings
//! - [`columns`]: Configuration sanitizing and persistence
//! - [`config`]: Operator preferences
//! - [`export`]: Delimited export of list rows
//! - [`fields`]: Field type registry and field-key parsing
//! - [`host`]: Host collaborator traits and in-memory/file implementations
//! - [`list`]: List-view controller
//! - [`model`]: Column definitions and configurations
//! - [`query`]: Sort/filter translation into query descriptors
//! - [`render`]: Value renderer
//! - [`settings`]: Per-type display-setting schemas
//! - [`error`]: Error types
//! - `cli`: Argument parsing and printing for the binary (not part of the lib API)

pub mod api;
pub mod catalog;
pub mod columns;
pub mod config;
pub mod error;
pub mod export;
pub mod fields;
#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures;
pub mod host;
pub mod list;
pub mod model;
pub mod query;
pub mod render;
pub mod settings;
