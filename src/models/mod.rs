pub mod outcome;
pub mod quote;
pub mod tick;

pub use outcome::{filter_by_sentiment, EventOutcome, EventType};
pub use quote::Quote;
pub use tick::PriceTick;
