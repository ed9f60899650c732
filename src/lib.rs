#![doc(test(attr(deny(warnings))))]

//! Expense Core manages a three-level category hierarchy stored as
//! materialized paths and aggregates expenses over it: per-category
//! breakdowns, drill-down navigation and time histograms.

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod seed;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Expense Core tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init();
    }
}
