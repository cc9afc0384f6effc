//! Ticket availability monitoring and automated checkout.
//!
//! The pipeline is layered the way a purchase flows:
//!
//! * [`session`] keeps one authenticated cookie jar per task and detects
//!   session loss.
//! * [`probe`] answers "can tickets be bought right now" through tiered
//!   strategies and fails closed when none is definitive.
//! * [`seats`] turns a scraped seat map into a concrete seat set.
//! * [`checkout`] drives the purchase funnel to exactly one
//!   [`PurchaseResult`](protocol::PurchaseResult).
//! * [`scheduler`] ticks each task on a timer and guarantees at most one
//!   confirmed purchase per match.
//!
//! Site-specific URLs, selectors and phrases live in [`site::SiteProfile`] so
//! the pipeline itself carries no hard-coded markup.

pub mod audit;
pub mod checkout;
pub mod clock;
pub mod error;
pub mod finder;
pub mod html;
pub mod pipeline;
pub mod probe;
pub mod retry;
pub mod scheduler;
pub mod seats;
pub mod session;
pub mod settings;
pub mod site;
pub mod target;

pub use audit::{AuditLog, AuditRecord};
pub use checkout::{CheckoutOrchestrator, CheckoutStage, Payer};
pub use error::{Result, SeatwatchError};
pub use finder::EventFinder;
pub use pipeline::Pipeline;
pub use probe::Prober;
pub use retry::{Backoff, RetryPolicy};
pub use scheduler::{Scheduler, TickOutcome};
pub use seats::{SeatCandidate, select_seats};
pub use session::{Credentials, SessionClient};
pub use settings::Settings;
pub use site::{Site, SiteProfile};
pub use target::{EventRef, EventTarget, SeatPreference, TargetMatch, parse_event_url};

pub use seatwatch_protocol as protocol;
