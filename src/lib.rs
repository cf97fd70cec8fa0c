//! # skymark
//!
//! A long-running agent that mirrors a Bluesky account's liked posts into a
//! self-hosted bookmarking service, exactly once per post.
//!
//! ## Architecture
//!
//! One delivery cycle flows strictly forward:
//!
//! ```text
//! Fetch → Normalize → Dedup → Enrich (thread) → Deliver → Commit seen
//! ```
//!
//! - [`fetcher`]: paginates the liked-posts feed to the full current window
//! - [`normalizer`]: flattens the five embed shapes into one annotated record
//!   and extracts an author's own continuation thread
//! - [`pipeline`]: orchestrates a cycle and owns the at-most-once guarantee
//! - [`daemon`]: drives cycles on a fixed interval until shutdown
//!
//! The seen-set in the durable store is the dedup ledger: a post URI is added
//! if and only if the bookmarking endpoint confirmed delivery, so a failed
//! delivery is retried on the next cycle simply by still being absent.
//!
//! ## Quick start
//!
//! ```bash
//! # Sign in once (prompts for the emailed code if required)
//! skymark login
//!
//! # Inspect what would be delivered
//! skymark once --dry-run
//!
//! # Poll every five minutes
//! skymark run --interval 5m
//! ```

/// Application context and error handling.
///
/// [`AppContext`](app::AppContext) wires together store, Bluesky client and
/// bookmarker, and drives one cycle end to end.
pub mod app;

/// Bluesky XRPC client, session handling, and the lexicon wire model.
pub mod bsky;

/// Command-line interface using clap.
pub mod cli;

/// TOML configuration loaded from `~/.config/skymark/config.toml`.
pub mod config;

/// Poll scheduler: interval loop, graceful shutdown on SIGINT/SIGTERM.
pub mod daemon;

/// Signed HTTP delivery to the bookmarking endpoint.
pub mod delivery;

/// Core value objects: [`NormalizedPost`](domain::NormalizedPost) and
/// [`DeliveryPayload`](domain::DeliveryPayload).
pub mod domain;

/// Feed pagination against the source.
pub mod fetcher;

/// Embed normalization and self-thread extraction.
pub mod normalizer;

/// Delivery pipeline, the orchestration and correctness core.
pub mod pipeline;

/// Durable key/value and set store backed by SQLite.
pub mod store;
