//! URL handling module for MCQ Harvest
//!
//! This module provides the two URL-shaped types the harvester works with:
//!
//! - `Locator`: a validated absolute http/https address of a page to scrape
//! - `Route`: a relay template that rewrites a locator into the address
//!   actually requested over the network

mod locator;
mod route;

pub use locator::Locator;
pub use route::Route;
