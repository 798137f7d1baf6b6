//! # Gator
//!
//! A command-line RSS feed aggregator.
//!
//! ## Architecture
//!
//! ```text
//! argv → CommandRegistry → (auth middleware) → handler → stores / FeedFetcher
//! ```
//!
//! - [`cli`]: argv parsing, the command registry, auth middleware and handlers
//! - [`fetcher`]: one-shot HTTP GET of a feed URL
//! - [`normalizer`]: RSS XML parsing and HTML entity decoding
//! - [`store`]: user and feed persistence
//!
//! ## Quick Start
//!
//! ```bash
//! gator register alice
//! gator addfeed "Rust Blog" https://blog.rust-lang.org/feed.xml
//! gator following
//! gator agg https://blog.rust-lang.org/feed.xml
//! ```

/// Application context, session and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the session,
/// stores and feed fetcher that every handler receives.
pub mod app;

/// Command-line interface.
///
/// - [`Cli`](cli::Cli): clap argv parser
/// - [`CommandRegistry`](cli::CommandRegistry): name → handler dispatch
/// - [`commands`](cli::commands): login, register, reset, users, agg, feeds,
///   addfeed, follow, following, unfollow
pub mod cli;

/// JSON config file at `~/.gatorconfig.json` holding `db_url` and the
/// logged-in user name.
pub mod config;

/// Core domain models.
///
/// - [`User`](domain::User), [`Feed`](domain::Feed), [`FeedFollow`](domain::FeedFollow)
/// - [`ParsedFeed`](domain::ParsedFeed): a fetched channel, never persisted
pub mod domain;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait returning a response body
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
/// - [`FeedFetcher`](fetcher::FeedFetcher): fetch + parse pipeline
pub mod fetcher;

/// RSS 2.0 parsing with HTML entity decoding of text fields.
pub mod normalizer;

/// SQLite persistence layer.
///
/// - [`UserStore`](store::UserStore) and [`FeedStore`](store::FeedStore): storage traits
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation of both
pub mod store;
