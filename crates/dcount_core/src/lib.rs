//! Exact distinct counting over dictionary-encoded dimension columns.
//!
//! A [`DistinctCountAccumulator`](accumulator::DistinctCountAccumulator) folds
//! the dictionary ids of each scanned row into a borrowed
//! [`MembershipSet`](membership::MembershipSet), and derives a count from it
//! according to the current [`NullHandling`](null_handling::NullHandling)
//! mode.

pub mod accumulator;
pub mod config;
pub mod dictionary;
pub mod membership;
pub mod null_handling;
pub mod scan;
pub mod selector;
