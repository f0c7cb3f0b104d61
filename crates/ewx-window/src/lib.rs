//! ewx-window
//!
//! Event-window extraction: fetch a padded series around an event, check the
//! event against the instrument's trading hours, cut the window, split it at
//! the event and summarise the move.
//!
//! Every stage is pure except [`fetch`], which awaits the provider once.
//! Stages fail with [`WindowError`]; none of them retry.

mod engine;
mod types;

pub use engine::{fetch, partition, slice_window, summarize, validate_trading_window};
pub use types::*;
