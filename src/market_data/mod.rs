pub mod provider;
pub mod session;
pub mod stream;
pub mod websocket;

pub use provider::{HttpQuoteClient, QuoteProvider, TickFeed, TickSubscription};
pub use session::{LiveSession, SessionId, SessionManager, SubscriptionState};
pub use stream::IndicatorStream;
pub use websocket::{parse_price_update, VolumeEstimator, WebSocketTickFeed};
