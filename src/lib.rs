//! # Confluence Ledger
//!
//! Weekly metadata snapshots of Confluence spaces.
//!
//! Every run pages through the configured spaces, enriches each page with
//! child, content, activity and workflow lookups, and writes the combined
//! rows as CSV: a current snapshot, an immutable-per-week snapshot, and an
//! append-only history ledger. Old weekly snapshots are moved to an archive
//! folder once a retention limit is exceeded.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────┐   ┌───────────┐   ┌──────────────┐
//! │ Paginator │──▶│ Enricher │──▶│ Normalize │──▶│ SnapshotStore│
//! │  listing  │   │ 4 lookups│   │  CSV row  │   │ current/week │
//! └───────────┘   └──────────┘   └───────────┘   │   /history   │
//!                                                └──────┬───────┘
//!                                                       ▼
//!                                                ┌──────────────┐
//!                                                │  Retention   │
//!                                                │  (archive)   │
//!                                                └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export CONFLUENCE_EMAIL=me@example.com CONFLUENCE_API_TOKEN=...
//! cledger run                   # extract, snapshot, prune
//! cledger run --dry-run         # extract and report only
//! cledger snapshots             # list artifacts
//! cledger prune                 # apply retention only
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and credentials |
//! | [`models`] | Wire types, enrichment results, canonical record |
//! | [`client`] | Content API trait and HTTP implementation |
//! | [`paginate`] | Listing traversal |
//! | [`enrich`] | Per-item fetch-or-default lookups |
//! | [`workflow`] | Workflow status and parameter resolution |
//! | [`markup`] | Image/table estimates from body markup |
//! | [`normalize`] | Canonical record construction |
//! | [`snapshot`] | CSV artifacts and week ids |
//! | [`retention`] | Weekly snapshot archiving |
//! | [`pipeline`] | Orchestration |
//! | [`progress`] | Progress reporting |
//! | [`status`] | Artifact overview |

pub mod client;
pub mod config;
pub mod enrich;
pub mod markup;
pub mod models;
pub mod normalize;
pub mod paginate;
pub mod pipeline;
pub mod progress;
pub mod retention;
pub mod snapshot;
pub mod status;
pub mod workflow;
