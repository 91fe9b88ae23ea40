//! nmtscope - JVM Native Memory Tracking history
//!
//! nmtscope periodically runs `jcmd <pid> VM.native_memory summary` against a
//! Java process, keeps every snapshot as a timestamped file, and answers
//! time-windowed queries over that history while evicting anything older than
//! the retention horizon.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐   every N seconds   ┌────────────────────────┐
//! │  CollectionTrigger   │ ──────────────────▶ │    ReportGenerator     │
//! └──────────────────────┘                     │  jcmd → .nmt_*.tmp     │
//!                                              │  rename → nmt_P_T.txt  │
//!                                              └───────────┬────────────┘
//!                                                          │
//!                                               report directory (index)
//!                                                          │
//! ┌──────────────────────┐   GET /api/nmt      ┌───────────▼────────────┐
//! │      HTTP API        │ ──────────────────▶ │      ReportStore       │
//! │  begin/end checks    │                     │  walk → decode → evict │
//! └──────────────────────┘                     │  → window → parse      │
//!                                              └────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`report`]: naming codec, NMT text parser, generator and store
//! - [`collector`]: periodic collection trigger
//! - [`api`]: HTTP query endpoint
//! - [`config`]: Configuration management

pub mod api;
pub mod collector;
pub mod config;
pub mod error;
pub mod report;

pub use config::NmtScopeConfig;
pub use error::{DecodeError, Error, GenerationError, Result};
