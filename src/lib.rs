//! Campus lecture timetable aggregation.
//!
//! Fetches every branch's daily timetable page for a date range, extracts
//! normalized lecture records, and caches the result per query shape.

pub mod app;
pub mod cli;
pub mod config;
pub mod lectures;
pub mod lms;
pub mod logging;
pub mod scraper;
pub mod state;
pub mod utils;
pub mod web;
