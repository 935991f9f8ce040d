//! Label API fetching.
//!
//! This module provides the paginated, retrying client for the
//! openFDA drug-label endpoint.

pub mod client;
pub mod transport;

pub use client::{FetchConfig, LabelFetcher};
pub use transport::{PageTransport, ReqwestTransport};

#[cfg(test)]
pub(crate) mod testing;
