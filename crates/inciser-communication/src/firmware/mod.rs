//! Firmware implementations
//!
//! Only the xTool dialect is supported: GRBL-like, but acknowledges `?`,
//! lacks `G4` dwell and sometimes glues acknowledgments together.

pub mod xtool;
