//! Core Kernel - Foundational types shared by every trip ledger crate
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - Money with cent-precise decimal arithmetic and a single rounding mode
//! - Date ranges used to derive trip status
//! - Strongly-typed identifiers
//! - Port infrastructure (errors, health checks)

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod ports;

pub use money::{Money, MoneyError, round_cents, CENT_TOLERANCE, PERCENT_TOLERANCE};
pub use temporal::{DateRange, RangePosition, TemporalError};
pub use identifiers::{TripId, MemberId, ExpenseId, SplitId, SettlementId, UserId, InvitationId};
pub use ports::{PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
