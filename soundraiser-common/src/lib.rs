//! # Soundraiser Common Library
//!
//! Shared code for the Soundraiser services:
//! - Smart link data model (links, outbound targets, view events)
//! - Error taxonomy shared by stores and handlers
//! - Configuration loading and resolution

pub mod config;
pub mod error;
pub mod models;

pub use error::{Error, Result};
pub use models::{LinkRecord, OutboundTarget, SitemapEntry, ViewEvent};
