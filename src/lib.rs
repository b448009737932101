//! Reconcile installed PostgreSQL component versions against upstream
//! releases.
//!
//! Given a catalog of tracked components (the server plus its extensions),
//! the mapping of installed extension versions, and the server's own version
//! string, the engine resolves each component's latest upstream version
//! through alias chains and GitHub release lookups, normalizes release tags
//! into comparable versions, and classifies every component as current,
//! outdated, not installed, or unknown.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │   Catalog   │────▶│  Reconcile   │────▶│   Report    │
//! │  (specs)    │     │  (resolve)   │     │  (render)   │
//! └─────────────┘     └──────────────┘     └─────────────┘
//!                            │
//!                            ▼
//!                     ┌──────────────┐     ┌─────────────┐
//!                     │ ReleaseSource│     │   Version   │
//!                     │  (GitHub)    │     │ (norm, cmp) │
//!                     └──────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`catalog`]: component specs, alias graph validation, built-in catalog
//! - [`reconcile`]: the reconciliation engine and its memoizing resolver
//! - [`registry`]: the [`registry::ReleaseSource`] trait and its GitHub
//!   implementation
//! - [`report`]: text-table rendering of reconciliation records
//! - [`version`]: tag normalization and numeric version comparison

pub mod catalog;
pub mod reconcile;
pub mod registry;
pub mod report;
pub mod version;
