// Backlash compensation core
//
// Provides:
// - Per-axis ideal position and direction tracking
// - Absolute/incremental positioning mode
// - Reversal detection and nudge synthesis for G0/G1 moves

pub mod axis;
pub mod compensate;
pub mod modal;

pub use axis::{Axis, AxisKind, AxisSet, Direction};
pub use compensate::{Compensation, MotionError, compensate};
pub use modal::{ModalState, Positioning};
