//! the test_utils folder here will share utils or test components between
//! unit tests of the client and storage modules
mod common;
mod mock_server;

pub use common::*;
pub use mock_server::*;
