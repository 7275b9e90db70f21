//! Static screens: crop calendar, market prices and weather.
//!
//! Each owns its data locally and renders through the same `Section`
//! primitives as analysis reports.

pub mod calendar;
pub mod market;
pub mod weather;
