//! User Directory Adapters
//!
//! Implementations of [`UserDirectoryPort`](crate::application::ports::UserDirectoryPort):
//!
//! - [`InMemoryUserDirectory`]: server-side stand-in for the account store
//! - [`HttpUserDirectory`]: client-side adapter over the subscription API

mod http;
mod memory;

pub use http::HttpUserDirectory;
pub use memory::InMemoryUserDirectory;
