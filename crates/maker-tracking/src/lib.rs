//! Order tracking service.
//!
//! Owns every order the strategy has placed. Keeps two views of each limit
//! order: the *active* view, removed as soon as the order leaves the venue,
//! and a *shadow* view that lingers for a grace window so lifecycle events
//! arriving after removal still resolve to a trading context. Also owns the
//! in-flight-cancel table, the sole gate preventing duplicate cancel
//! submissions and cancels before creation acknowledgment.
//!
//! No locking: the tick handler and the event listener run on one logical
//! thread. A multi-threaded port must serialize access per strategy
//! instance.

mod tracker;

pub use tracker::{
    OrderTracker, TrackedOrderRecord, IN_FLIGHT_CANCEL_EXPIRY_MS, SHADOW_KEEP_ALIVE_MS,
};
