//! # eventtable
//!
//! Concurrent in-memory tables for a streaming query engine:
//! - Compiled predicates and SET clauses, bound to a table's schema once
//! - Add / delete / update / atomic upsert under a single-writer lock
//! - Lock-free-for-writers snapshots through copy-on-write storage handles
//! - Checksummed snapshot blobs for checkpoint and restore
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Streaming Queries                        │
//! │        (join probes, insert / delete / update / upsert)      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ compile once, execute per batch
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    InMemoryTable                             │
//! │            (Single Writer / Multi Reader)                    │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐                ┌─────────────────┐
//!   │    Operators    │───────────────▶│   EventHolder   │
//!   │ (scan/pk/index) │                │ (list/indexed)  │
//!   └─────────────────┘                └────────┬────────┘
//!                                               │ Arc clone
//!                                               ▼
//!                                      ┌─────────────────┐
//!                                      │ SnapshotService │
//!                                      │ (blob codec)    │
//!                                      └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod context;
pub mod error;

pub mod event;
pub mod expression;
pub mod holder;
pub mod operator;
pub mod schema;
pub mod snapshot;
pub mod table;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{ConfigReader, TableConfig};
pub use context::AppContext;
pub use error::{Result, TableError};
pub use event::{Row, StateEvent, Value};
pub use expression::{Expression, UpdateSet, Variable};
pub use operator::{CompiledCondition, CompiledUpdateSet, RowBuilder};
pub use schema::{AttributeType, MatchingMeta, StreamDefinition, TableDefinition};
pub use snapshot::{SnapshotService, Snapshotable, StateSnapshot};
pub use table::{InMemoryTable, Table};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of eventtable
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
