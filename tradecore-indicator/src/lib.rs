#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Tradecore-Indicator
//!
//! The Streaming Indicator Engine (spec.md §4.2): per-symbol ring buffers
//! of ticks and orderbook snapshots, a variant registry for parameterised
//! indicator definitions, and event-/time-driven computation that publishes
//! `indicator.updated` onto the [`tradecore_bus::EventBus`].
//!
//! Grounded on the teacher's `jackbot-ta` crate for the ring-buffer/running-
//! average idiom and on
//! `examples/original_source/.../streaming_indicator_engine/core/types.py`
//! for the variant registry shape (`IndicatorRegistry`,
//! `indicator_registration`).

mod calculations;
mod engine;
mod error;
mod registry;
mod ring_buffer;
mod window;

pub use calculations::PricePoint;
pub use engine::{IndicatorEngine, IndicatorEngineConfig};
pub use error::IndicatorError;
pub use registry::{IndicatorDescriptor, IndicatorRegistry, ParameterSpec};
pub use ring_buffer::{RingBuffer, DEFAULT_CAPACITY};
pub use window::{normalize_to_micros, WindowSpec};
