//! Carbon-intensity data and charging-impact accounting for leaf.
//!
//! The crate is layered leaves first:
//!
//! - [`store`] - atomic key to blob storage under one cache root
//! - [`cache`] - JSON encode/decode over the store, plus freshness policies
//! - [`client`] - fetch-or-cache access to current and forecast intensity
//! - [`accumulator`] - session and lifetime grams from watt samples
//! - [`advisor`] - "when to charge" advice from the forecast head
//!
//! # Example
//!
//! ```ignore
//! use leaf_carbon::{DiskStore, HttpFetcher, IntensityClient, Scope, TypedCache};
//!
//! let cache = TypedCache::new(DiskStore::open(cache_dir)?);
//! let client = IntensityClient::new(HttpFetcher::default(), cache);
//! let reading = client.current(Scope::National)?;
//! println!("{} gCO2/kWh ({})", reading.intensity(), reading.band);
//! ```

pub mod accumulator;
pub mod advisor;
pub mod api;
pub mod cache;
pub mod client;
pub mod error;
pub mod reading;
pub mod region;
pub mod store;

pub use accumulator::{ImpactAccumulator, SessionTotals, WattSample};
pub use advisor::{advise, Advice};
pub use api::Endpoints;
pub use cache::{CachedEnvelope, Freshness, FreshnessPolicy, TypedCache};
pub use client::{Fetcher, HttpFetcher, IntensityClient, RawResponse};
pub use error::{AdvisorError, CacheError, FetchError, StorageError};
pub use reading::{Band, CarbonReading};
pub use region::{Region, Scope};
pub use store::DiskStore;
