//! Change notification for the pilot store.
//!
//! Every committed store mutation publishes exactly once on the store's
//! [`SubscriptionBus`]. Observers register zero-argument listeners, or attach a
//! [`ChangeStream`] when they live on another thread.

/// Listener registry and ordered fan-out.
pub mod bus;
/// Channel-backed change stream.
pub mod stream;

pub use bus::{Listener, ListenerId, Subscription, SubscriptionBus};
pub use stream::{ChangeNotice, ChangeStream};
