//! Core types for the Marquee happening catalog.
//!
//! Happenings and the people attending them, the per-happening notification
//! fabric, the [`Catalog`](catalog::Catalog) store, the [`Codec`](codec::Codec)
//! persistence abstraction, and the off-path delivery scheduler.
//!
//! This crate knows nothing about any concrete encoding; see `marquee-json`.

pub mod catalog;
pub mod codec;
pub mod delivery;
pub mod error;
pub mod happening;
pub mod id;
pub mod notify;
pub mod person;
pub mod schedule;

pub use error::{Error, Result};
