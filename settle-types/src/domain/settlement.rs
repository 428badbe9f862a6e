//! Status classification tables used by webhook ingestion and the
//! settlement reconciler.
//!
//! Membership sets are closed on purpose: provider vocabularies must not be
//! inferred by string matching beyond these tables.

/// Classification of a normalized status string.
///
/// `Other` updates the transaction's raw status string but triggers no
/// order/charge cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Paid,
    Failed,
    Other,
}

impl StatusClass {
    /// Classifies a normalized status into exactly one bucket.
    pub fn classify(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "paid" | "approved" | "succeeded" => StatusClass::Paid,
            "failed" | "cancelled" | "canceled" | "rejected" => StatusClass::Failed,
            _ => StatusClass::Other,
        }
    }
}

/// Maps a PagBank status through its closed vocabulary table.
///
/// Anything outside the table passes through lowercased, which the reconciler
/// then treats as `Other`.
pub fn map_pagbank_status(status: &str) -> String {
    match status.to_ascii_uppercase().as_str() {
        "PAID" | "COMPLETED" => "paid".to_string(),
        "CANCELED" | "DECLINED" | "FAILED" => "failed".to_string(),
        other => other.to_ascii_lowercase(),
    }
}

/// Maps a Stripe event type to a normalized status.
///
/// Returns `None` for event types the engine does not settle on; callers fall
/// back to the payment intent's own `status` field.
pub fn map_stripe_event(event_type: &str) -> Option<&'static str> {
    match event_type {
        "payment_intent.succeeded" => Some("paid"),
        "payment_intent.payment_failed" => Some("failed"),
        "payment_intent.canceled" => Some("canceled"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paid_set() {
        for s in ["paid", "approved", "succeeded", "APPROVED"] {
            assert_eq!(StatusClass::classify(s), StatusClass::Paid);
        }
    }

    #[test]
    fn test_failed_set() {
        for s in ["failed", "cancelled", "canceled", "rejected"] {
            assert_eq!(StatusClass::classify(s), StatusClass::Failed);
        }
    }

    #[test]
    fn test_everything_else_is_other() {
        for s in ["pending", "requires_action", "in_process", ""] {
            assert_eq!(StatusClass::classify(s), StatusClass::Other);
        }
    }

    #[test]
    fn test_pagbank_table() {
        assert_eq!(map_pagbank_status("PAID"), "paid");
        assert_eq!(map_pagbank_status("COMPLETED"), "paid");
        assert_eq!(map_pagbank_status("CANCELED"), "failed");
        assert_eq!(map_pagbank_status("DECLINED"), "failed");
        assert_eq!(map_pagbank_status("FAILED"), "failed");
        assert_eq!(map_pagbank_status("PENDING"), "pending");
        assert_eq!(map_pagbank_status("WAITING"), "waiting");
    }

    #[test]
    fn test_stripe_event_table() {
        assert_eq!(map_stripe_event("payment_intent.succeeded"), Some("paid"));
        assert_eq!(
            map_stripe_event("payment_intent.payment_failed"),
            Some("failed")
        );
        assert_eq!(map_stripe_event("payment_intent.canceled"), Some("canceled"));
        assert_eq!(map_stripe_event("charge.refunded"), None);
    }
}
