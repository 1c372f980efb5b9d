//! Order status transition policy
//!
//! `updateOrder` consults a [`TransitionPolicy`] before writing a new status.
//! The default is permissive (staff may correct mistakes in any direction);
//! a stricter machine can be injected through
//! [`OrdersManager::with_policy`](super::OrdersManager::with_policy).

use shared::error::{AppError, ErrorCode};
use shared::models::OrderStatus;
use std::fmt::Debug;

pub trait TransitionPolicy: Send + Sync + Debug {
    /// `Ok(())` if `from → to` is allowed
    fn check(&self, from: OrderStatus, to: OrderStatus) -> Result<(), AppError>;
}

/// Any status may follow any other
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveTransitions;

impl TransitionPolicy for PermissiveTransitions {
    fn check(&self, _from: OrderStatus, _to: OrderStatus) -> Result<(), AppError> {
        Ok(())
    }
}

/// Kitchen flow only moves forward: Pending → Processing → Delivered.
/// Cancellation is allowed from any outstanding status.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardOnlyTransitions;

impl ForwardOnlyTransitions {
    fn rank(status: OrderStatus) -> u8 {
        match status {
            OrderStatus::Pending => 0,
            OrderStatus::Processing => 1,
            OrderStatus::Delivered => 2,
            OrderStatus::Paid => 3,
            OrderStatus::Cancelled => 4,
        }
    }
}

impl TransitionPolicy for ForwardOnlyTransitions {
    fn check(&self, from: OrderStatus, to: OrderStatus) -> Result<(), AppError> {
        let allowed = from == to
            || (from.is_outstanding() && to == OrderStatus::Cancelled)
            || (from.is_outstanding() && Self::rank(to) > Self::rank(from));
        if allowed {
            Ok(())
        } else {
            Err(AppError::with_message(
                ErrorCode::InvalidState,
                format!("Transition {:?} -> {:?} not allowed", from, to),
            ))
        }
    }
}
