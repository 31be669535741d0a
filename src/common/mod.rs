//! Value types shared by the write client and storage layers.
mod app_task;
mod server_detail;

pub use app_task::*;
pub use server_detail::*;

#[cfg(test)]
mod server_detail_test;
