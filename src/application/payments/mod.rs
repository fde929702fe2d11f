//! Payment-side application services: webhook ingestion, refunds and
//! payouts.

pub mod dispatcher;
pub mod events;
pub mod payouts;
pub mod refunds;

pub use dispatcher::{HandlerOutcome, WebhookDispatcher};
pub use events::WebhookEvent;
pub use payouts::{CurrencyBalance, PayoutInfo, PayoutService};
pub use refunds::RefundOrchestrator;
