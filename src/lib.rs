// Backlash compensation for G-code streams
//
// Reads G-code line by line, tracks each axis' direction of travel and
// inserts a small corrective move whenever an axis reverses.

pub mod config;
pub mod gcode;
pub mod lash;
pub mod runtime;
