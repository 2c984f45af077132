//! # Cashbook Core
//!
//! A bookkeeping engine for freelancers and small businesses: clients,
//! projects, one-off and scheduled transactions, with the derived ledger
//! entries, rollups and reports built on top of them.
//!
//! ## Features
//!
//! - **Reconciliation**: completing a project or paying a scheduled item posts
//!   exactly one linked ledger transaction, retryable after partial failures
//! - **Aggregation**: monthly, daily and per-category rollups with zero-filled
//!   buckets
//! - **Alerts**: overdue and upcoming scheduled items
//! - **Reports**: a paginated printable document and a multi-sheet workbook
//!   generated from the same totals
//! - **Live stats**: a session that keeps sidebar figures fresh from polling
//!   and change notifications
//! - **Storage abstraction**: database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use cashbook_core::{Client, Ledger, MemoryStorage, Project, ProjectStatus};
//! use bigdecimal::BigDecimal;
//!
//! # async fn run() -> cashbook_core::LedgerResult<()> {
//! let mut ledger = Ledger::new(MemoryStorage::new(), "account-1");
//! let client = ledger.create_client(Client::new("account-1", "Acme")).await?;
//! let project = Project::new("account-1", client.id.clone(), "Website", BigDecimal::from(1500));
//! ledger.save_project(project.clone()).await?;
//! ledger.set_project_status(&project.id, ProjectStatus::Completed).await?;
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod config;
pub mod events;
pub mod ledger;
pub mod reconciliation;
pub mod reports;
pub mod session;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use alerts::*;
pub use config::*;
pub use events::*;
pub use ledger::*;
pub use reconciliation::*;
pub use reports::*;
pub use session::*;
pub use traits::*;
pub use types::*;
pub use utils::{init_tracing, FixedClock, MemoryStorage, SystemClock};

// Re-export transaction patterns for convenience
pub use ledger::transaction::patterns;
