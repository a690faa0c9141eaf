//! Ledger notifications
//!
//! Services announce every successful write through a [`Notifier`].
//! Dispatch is fire-and-forget: a notifier that cannot deliver reports an
//! error, the service logs it at `warn` and carries on.

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use core_kernel::{ExpenseId, MemberId, Money, TripId, UserId};

/// A completed write worth telling someone about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    TripCreated { trip_id: TripId, owner_id: UserId },
    TripUpdated { trip_id: TripId },
    TripDeleted { trip_id: TripId },
    InvitationSent { trip_id: TripId, email: String },
    InvitationRejected { trip_id: TripId, email: String },
    InvitationCancelled { trip_id: TripId, email: String },
    MemberJoined { trip_id: TripId, member_id: MemberId, email: String },
    MemberRemoved { trip_id: TripId, member_id: MemberId },
    ExpenseRecorded { trip_id: TripId, expense_id: ExpenseId, amount: Money },
    ExpenseUpdated { trip_id: TripId, expense_id: ExpenseId },
    ExpenseDeleted { trip_id: TripId, expense_id: ExpenseId },
    SettlementsRecalculated { trip_id: TripId, members: usize, total: Money },
}

impl LedgerEvent {
    pub fn trip_id(&self) -> TripId {
        match self {
            LedgerEvent::TripCreated { trip_id, .. }
            | LedgerEvent::TripUpdated { trip_id }
            | LedgerEvent::TripDeleted { trip_id }
            | LedgerEvent::InvitationSent { trip_id, .. }
            | LedgerEvent::InvitationRejected { trip_id, .. }
            | LedgerEvent::InvitationCancelled { trip_id, .. }
            | LedgerEvent::MemberJoined { trip_id, .. }
            | LedgerEvent::MemberRemoved { trip_id, .. }
            | LedgerEvent::ExpenseRecorded { trip_id, .. }
            | LedgerEvent::ExpenseUpdated { trip_id, .. }
            | LedgerEvent::ExpenseDeleted { trip_id, .. }
            | LedgerEvent::SettlementsRecalculated { trip_id, .. } => *trip_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::TripCreated { .. } => "trip_created",
            LedgerEvent::TripUpdated { .. } => "trip_updated",
            LedgerEvent::TripDeleted { .. } => "trip_deleted",
            LedgerEvent::InvitationSent { .. } => "invitation_sent",
            LedgerEvent::InvitationRejected { .. } => "invitation_rejected",
            LedgerEvent::InvitationCancelled { .. } => "invitation_cancelled",
            LedgerEvent::MemberJoined { .. } => "member_joined",
            LedgerEvent::MemberRemoved { .. } => "member_removed",
            LedgerEvent::ExpenseRecorded { .. } => "expense_recorded",
            LedgerEvent::ExpenseUpdated { .. } => "expense_updated",
            LedgerEvent::ExpenseDeleted { .. } => "expense_deleted",
            LedgerEvent::SettlementsRecalculated { .. } => "settlements_recalculated",
        }
    }
}

/// Why an event could not be handed over
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Notification queue is full")]
    QueueFull,

    #[error("Notification receiver has been dropped")]
    Closed,
}

/// Outbound notification port
///
/// `notify` must not block; implementations hand the event off and return.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &LedgerEvent) -> Result<(), NotifyError>;
}

/// Sends an event and logs delivery failures
pub(crate) fn dispatch(notifier: &dyn Notifier, event: LedgerEvent) {
    if let Err(e) = notifier.notify(&event) {
        warn!(
            event = event.name(),
            trip_id = %event.trip_id(),
            error = %e,
            "Notification dispatch failed"
        );
    }
}

/// Writes every event to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, event: &LedgerEvent) -> Result<(), NotifyError> {
        info!(event = event.name(), trip_id = %event.trip_id(), "Ledger event");
        Ok(())
    }
}

/// Forwards events to a bounded tokio channel
///
/// Events are dropped when the channel is full.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::Sender<LedgerEvent>,
}

impl ChannelNotifier {
    /// Creates a notifier and the receiving end of its queue
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<LedgerEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: &LedgerEvent) -> Result<(), NotifyError> {
        self.sender.try_send(event.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => NotifyError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => NotifyError::Closed,
        })
    }
}
