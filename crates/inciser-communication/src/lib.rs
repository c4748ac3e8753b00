//! # Inciser Communication
//!
//! Line-oriented links to the engraver and the xTool firmware layer built on
//! top of them: response tokenizer, flow-controlled command channel, position
//! polling and motion primitives.

pub mod communication;
pub mod firmware;

pub use communication::{
    serial::{list_ports, open_first_available, SerialLink, SerialPortInfo},
    simulator::SimulatedLaser,
    ConnectionParams, Link,
};

pub use firmware::xtool::{
    channel::{CommandChannel, DrainMode},
    motion::{MotionConfig, MotionController},
    position::PositionTracker,
    response_parser::{parse_response, XToolResponse},
    startup::{open_channel, INIT_SEQUENCE},
};
