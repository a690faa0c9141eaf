//! Repository functions for the ledger tables
//!
//! Every function takes a `&mut PgConnection`, so the same query runs
//! against a pooled connection for reads and inside an open transaction for
//! writes. Row types mirror the table columns; conversion to domain types
//! happens in the adapter.

pub mod expense;
pub mod invitation;
pub mod settlement;
pub mod trip;

pub use expense::{ContributionRow, DbExpenseCategory, DbSplitKind, ExpenseRow, SplitRow};
pub use invitation::{DbInvitationStatus, InvitationRow};
pub use settlement::SettlementRow;
pub use trip::{MemberRow, TripRow};
