//! Trip Ledger Application Layer
//!
//! Composes the access policy, the snapshot cache, the split calculator
//! and the settlement ledger into the services callers use:
//!
//! - [`LedgerService`]: expense writes and settlement queries
//! - [`TripService`]: trip lifecycle, membership writes and invitations
//! - [`SettlementLedger`]: settlement recalculation and reads
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use app_ledger::{LedgerService, SnapshotLoader, TracingNotifier};
//! use infra_cache::TripSnapshotCache;
//!
//! let store = Arc::new(PostgresLedgerStore::new(pool));
//! let cache = TripSnapshotCache::new(config.cache_store().await?, config.cache_ttl());
//! let snapshots = SnapshotLoader::new(store.clone(), cache);
//! let ledger = LedgerService::new(store, snapshots, Arc::new(TracingNotifier));
//!
//! let expense = ledger.create_expense(&principal, trip_id, input).await?;
//! ```

pub mod config;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod service;
pub mod snapshots;
pub mod telemetry;
pub mod trips;

pub use config::{InvalidConfig, LedgerConfig};
pub use error::{ErrorKind, LedgerError};
pub use ledger::SettlementLedger;
pub use notify::{ChannelNotifier, LedgerEvent, Notifier, NotifyError, TracingNotifier};
pub use service::{LedgerService, SettlementDetail, SettlementRow, SettlementSummary};
pub use snapshots::SnapshotLoader;
pub use telemetry::init_tracing;
pub use trips::{NewTrip, TripService};
