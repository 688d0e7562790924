//! # Brass Transport
//!
//! Building blocks shared by every Brass transport.
//!
//! | Module | Provides | Used by |
//! |--------|----------|---------|
//! | [`flood`] | [`FloodSemaphore`] token buffer | every outbound send |
//! | [`backoff`] | quadratic reconnect [`Backoff`] | connection loops |
//! | [`split`] | newline and length splitting | every outbound send |
//! | `http_client` | [`PageFetcher`] (feature `http-client`) | URL engine, plugins |
//!
//! ## Outbound path
//!
//! ```text
//! text ──▶ split_message ──▶ FloodSemaphore::acquire (per line) ──▶ wire
//!                                   ▲
//!                    drain ticker ──┘ (every anti-flood period)
//! ```

pub mod backoff;
pub mod flood;
pub mod split;

#[cfg(feature = "http-client")]
pub mod http_client;

pub use backoff::Backoff;
pub use flood::{DEFAULT_FLOOD_CAPACITY, FloodSemaphore};
pub use split::{MAX_LINE_BYTES, split_message};

#[cfg(feature = "http-client")]
pub use http_client::{FetchConfig, FetchError, Page, PageFetcher};
