#![forbid(unsafe_code)]
#![warn(unused, missing_debug_implementations, rust_2018_idioms)]

//! # Tradecore-Persistence
//!
//! The time-series store interface (spec.md §6) plus the two event-driven
//! writers that sit between the EventBus and it: [`TradingPersistence`]
//! (signals/orders/positions, §4.7) and [`IndicatorPersistence`]
//! (computed indicator values, §4.9). Also carries the legacy
//! data-collection CSV layout via [`CsvCollector`].
//!
//! Ported in structure from the teacher's
//! `barter::portfolio::repository::InMemoryRepository` — plain
//! collections behind a lock, a narrow trait boundary — generalised to an
//! async `Store` trait since a production backend talks to a real TSDB
//! over the network.

mod csv_collector;
mod error;
mod in_memory;
mod indicator;
mod null;
mod rows;
mod store;
mod trading;

pub use csv_collector::CsvCollector;
pub use error::PersistenceError;
pub use in_memory::InMemoryStore;
pub use indicator::IndicatorPersistence;
pub use null::NullStore;
pub use rows::{IndicatorRow, OrderRow, OrderbookRow, PositionRow, PriceRow, SignalRow};
pub use store::Store;
pub use trading::TradingPersistence;
