//! JSON file codec for the marquee catalog.
//!
//! [`JsonCodec`] plugs into [`marquee_core::catalog::Catalog`] and stores the
//! whole catalog as a single JSON object keyed by happening id. Writes are
//! atomic; reads treat a missing or empty file as an empty catalog.

mod codec;
mod encode;
mod file;

pub mod error;

pub use codec::JsonCodec;
pub use encode::{from_slice, to_vec};
pub use error::{Error, Result};
