//! Order Dispatch Module
//!
//! - **manager**: OrdersManager, the order lifecycle engine
//! - **storage**: redb persistence for orders, indices and position reports
//! - **matcher**: provider scoring and ranking
//! - **tracker**: per-subscriber Track polling loop
//! - **money** / **eta**: price, fee and arrival-time arithmetic
//!
//! # Architecture
//!
//! ```text
//! Request → OrdersManager → Storage (redb, locked txn)
//!               │    │                 │
//!               │    └─ Matcher ─→ ProviderDirectory
//!               │
//!               └─ LedgerService ─→ (queue) ─→ LedgerWorker ─→ LedgerRecorder
//!                                                     └─→ Storage.set_ledger_ref
//! ```

pub mod eta;
pub mod manager;
pub mod matcher;
pub mod money;
pub mod storage;
pub mod tracker;

pub use manager::{ManagerError, ManagerResult, OrdersManager};
pub use matcher::{ProviderMatcher, ScoredProvider};
pub use storage::{OrderStorage, StorageError};
pub use tracker::{LocationTracker, TrackSubscription};
