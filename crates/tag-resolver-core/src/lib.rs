//! # Tag Resolver Core
//!
//! Shared, runtime-agnostic logic for Tag Resolver: tokenization, the local
//! tag catalog and inverted index, the hashed embedding and vector
//! fallback, candidate gathering, multi-field scoring, confidence routing,
//! and the resolution orchestrator.
//!
//! This crate contains no tokio, filesystem I/O, or HTTP dependencies.
//! Everything that talks to the outside world is reached through the
//! collaborator traits in [`backend`], which the application crate
//! implements.
//!
//! ## Data Flow
//!
//! ```text
//! description ─▶ tokenize ─▶ cache? ─▶ gather ─▶ enrich ─▶ score ─▶ confidence ─▶ response
//!                                       │
//!                     live search ◀─────┤
//!                     keyword index ◀───┤  (strategy chain, first non-empty wins)
//!                     substring scan ◀──┤
//!                     vector index ◀────┘
//! ```

pub mod backend;
pub mod catalog;
pub mod confidence;
pub mod embedding;
pub mod gather;
pub mod models;
pub mod resolve;
pub mod scoring;
pub mod strategy;
pub mod tokenize;
pub mod vector;
