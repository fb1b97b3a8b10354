//! Order-lifecycle events delivered by the exchange abstraction.
//!
//! Events arrive on the strategy's logical thread strictly between ticks,
//! in delivery order. The shadow-record and in-flight-cancel mechanisms in
//! the tracking service exist to tolerate acknowledgments that arrive after
//! the tick that triggered them.

use serde::{Deserialize, Serialize};

use crate::decimal::{Price, Size};
use crate::order::ClientOrderId;

/// Asynchronous order-lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    /// Creation acknowledged by the venue; the order is now cancellable.
    Created { cloid: ClientOrderId },
    /// A (possibly partial) fill.
    Filled {
        cloid: ClientOrderId,
        amount: Size,
        price: Price,
    },
    /// Cancellation confirmed.
    Canceled { cloid: ClientOrderId },
    /// Passive expiry on the venue.
    Expired { cloid: ClientOrderId },
    /// Placement rejected or the order failed on the venue.
    Failed { cloid: ClientOrderId, reason: String },
    /// Fully filled; terminal.
    Completed { cloid: ClientOrderId },
}

impl OrderEvent {
    /// The order this event refers to.
    pub fn cloid(&self) -> &ClientOrderId {
        match self {
            Self::Created { cloid }
            | Self::Filled { cloid, .. }
            | Self::Canceled { cloid }
            | Self::Expired { cloid }
            | Self::Failed { cloid, .. }
            | Self::Completed { cloid } => cloid,
        }
    }

    /// True for events after which the order no longer rests on the venue.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Canceled { .. } | Self::Expired { .. } | Self::Failed { .. } | Self::Completed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderSide;
    use rust_decimal_macros::dec;

    #[test]
    fn cloid_accessor_covers_all_variants() {
        let id = ClientOrderId::generate(OrderSide::Buy, 1);
        let events = vec![
            OrderEvent::Created { cloid: id.clone() },
            OrderEvent::Filled {
                cloid: id.clone(),
                amount: Size::new(dec!(1)),
                price: Price::new(dec!(100)),
            },
            OrderEvent::Canceled { cloid: id.clone() },
            OrderEvent::Expired { cloid: id.clone() },
            OrderEvent::Failed {
                cloid: id.clone(),
                reason: "rejected".into(),
            },
            OrderEvent::Completed { cloid: id.clone() },
        ];
        for ev in &events {
            assert_eq!(ev.cloid(), &id);
        }
    }

    #[test]
    fn serde_round_trip() {
        let event = OrderEvent::Filled {
            cloid: ClientOrderId::from_string("buy_1_abc".into()),
            amount: Size::new(dec!(0.25)),
            price: Price::new(dec!(1999.5)),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: OrderEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn terminal_classification() {
        let id = ClientOrderId::generate(OrderSide::Sell, 1);
        assert!(!OrderEvent::Created { cloid: id.clone() }.is_terminal());
        assert!(!OrderEvent::Filled {
            cloid: id.clone(),
            amount: Size::new(dec!(1)),
            price: Price::new(dec!(100)),
        }
        .is_terminal());
        assert!(OrderEvent::Completed { cloid: id.clone() }.is_terminal());
        assert!(OrderEvent::Expired { cloid: id }.is_terminal());
    }
}
