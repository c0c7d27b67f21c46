//! # Tag Resolver
//!
//! Resolves free-text sensor descriptions ("kiln 6 shell temperature") to
//! historian tag paths, with a calibrated confidence and a clarifying
//! question when the answer is ambiguous.
//!
//! The ranking and orchestration logic lives in [`tag_resolver_core`]. This
//! crate supplies the outside world: configuration, the lazily loaded
//! file-backed catalog, the historian HTTP client, the on-disk result
//! cache, and the `tagr` CLI commands.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────────┐   ┌───────────────┐
//! │  tagr (CLI)  │──▶│ Resolver (core) │──▶│ response JSON │
//! └──────────────┘   └────────┬────────┘   └───────────────┘
//!                             │
//!        ┌────────────────────┼─────────────────────┐
//!        ▼                    ▼                     ▼
//!  ┌─────────────┐   ┌─────────────────┐    ┌─────────────┐
//!  │ LazyCatalog │   │ HistorianClient │    │  FileCache  │
//!  │ JSON + vecs │   │  search + meta  │    │ TTL entries │
//!  └─────────────┘   └─────────────────┘    └─────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`catalog`] | Load-once catalog and vector index provider |
//! | [`historian`] | Live tag search and metadata over HTTP |
//! | [`file_cache`] | On-disk resolution cache |
//! | [`resolve_cmd`] | Resolver wiring and `tagr resolve` |
//! | [`search_cmd`] | `tagr search` |
//! | [`vectors_cmd`] | `tagr vectors build` |
//! | [`logging`] | Tracing subscriber setup |

pub mod catalog;
pub mod config;
pub mod file_cache;
pub mod historian;
pub mod logging;
pub mod resolve_cmd;
pub mod search_cmd;
pub mod vectors_cmd;
