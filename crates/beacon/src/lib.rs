//! Beacon event-ingestion SDK for Rust.
//!
//! Events are validated when recorded, queued in memory, and sent in
//! batches to `POST {host}/event/batch/`. Failed batches are retried with
//! exponential backoff when the failure looks transient.
//!
//! # Example
//!
//! ```rust,ignore
//! use beacon::Beacon;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), beacon::Error> {
//!     let client = Beacon::builder("key_xxx")
//!         .flush_at(50)
//!         .flush_interval(Duration::from_secs(5))
//!         .build()?;
//!
//!     client.track("signup", "usr_123")
//!         .property("plan", "pro")
//!         .send()?;
//!
//!     client.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod builders;
mod client;
mod config;
mod error;
mod event;
mod payload;
mod queue;
mod retry;
mod scheduler;
mod transport;
pub mod types;
pub mod validation;

pub use builders::{AlertBuilder, IdentifyBuilder, TrackBuilder, UserId};
pub use client::{Beacon, SendableAlert, SendableIdentify, SendableTrack};
pub use config::{
    BeaconBuilder, Config, DEFAULT_FLUSH_AT, DEFAULT_FLUSH_INTERVAL, DEFAULT_HOST,
    DEFAULT_RETRY_BASE_DELAY, DEFAULT_RETRY_COUNT,
};
pub use error::{Error, ValidationError};
pub use event::Event;
pub use queue::{Delivery, DeliveryResult};
pub use retry::{is_retryable, RetryPolicy};
pub use types::{BatchResponse, EventType, Payload};
