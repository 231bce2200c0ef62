//! Maps `Box<dyn Error>` from trait boundaries to typed `CartError`.
//!
//! The collaborator traits in `cart_traits` return boxed errors; this module
//! narrows them, downcasting `cart_hardware::HwError` when that feature is on.

use crate::error::CartError;

/// Map a trait-boundary error to a typed `CartError`.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> CartError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<cart_hardware::error::HwError>() {
            return match hw {
                cart_hardware::error::HwError::Io(io) => CartError::Io(io.to_string()),
                other => CartError::HardwareFault(other.to_string()),
            };
        }
    }

    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        return CartError::Io(io.to_string());
    }
    CartError::Hardware(e.to_string())
}

/// Log a failed collaborator call and carry on. Device hiccups never stop the
/// controller loop.
pub(crate) fn log_failure(op: &'static str, result: Result<(), cart_traits::BoxError>) {
    if let Err(e) = result {
        let mapped = map_hw_error(e.as_ref());
        tracing::warn!(op, error = %mapped, "collaborator call failed");
    }
}
