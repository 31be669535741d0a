//! Upload-side client of a remote shuffle service.
//!
//! Map tasks stream partitioned records to shuffle servers that are addressed
//! by a logical server id. [`ServerIdAwareWriteClient`] makes sure the server
//! reached is the one expected, follows the server once to its new address
//! when the old one stops answering, and acquires its physical connection
//! from either a pooled or an unpooled [`WriteClientFactory`].
//!
//! [`ShuffleFileStorage`] is the local file storage used on the server-side
//! persistence path.

mod client;
mod common;
mod config;
mod errors;
mod metrics;
mod storage;
pub mod utils;

pub use client::*;
pub use common::*;
pub use config::*;
pub use errors::*;
pub use metrics::*;
pub use storage::*;
pub use utils::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
