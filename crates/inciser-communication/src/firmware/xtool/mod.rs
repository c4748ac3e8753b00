//! xTool D1 firmware support
//!
//! Layers, leaf first: [`response_parser`] tokenizes device lines,
//! [`channel`] enforces the flow-control window, [`position`] polls the real
//! head position, [`motion`] builds synchronous moves and timed burns on top,
//! and [`startup`] brings a fresh connection into a known state.

pub mod channel;
pub mod motion;
pub mod position;
pub mod response_parser;
pub mod startup;
