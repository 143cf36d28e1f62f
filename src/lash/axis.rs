// Per-axis direction tracking
//
// Each axis remembers the last commanded (uncorrected) position and which
// way it last travelled. A reversal is only detected once a direction has
// been established by real motion.

use std::ops::{Index, IndexMut};

use tracing::warn;

use crate::config::{AXIS_LETTERS, LashConfig};

/// The compensable axes
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisKind {
    X = 0,
    Y = 1,
    Z = 2,
    /// Rotary axis, no wraparound handling
    A = 3,
}

impl AxisKind {
    pub const ALL: [AxisKind; 4] = [AxisKind::X, AxisKind::Y, AxisKind::Z, AxisKind::A];

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'X' => Some(AxisKind::X),
            'Y' => Some(AxisKind::Y),
            'Z' => Some(AxisKind::Z),
            'A' => Some(AxisKind::A),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        AXIS_LETTERS[self as usize]
    }
}

/// Direction of the axis' most recent real motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// No motion seen since start or last reset
    #[default]
    Unknown,
    Positive,
    Negative,
}

impl Direction {
    /// Direction of travel from `from` to `to`; `Unknown` if they are equal
    pub fn of_travel(from: f64, to: f64) -> Self {
        if to > from {
            Direction::Positive
        } else if to < from {
            Direction::Negative
        } else {
            Direction::Unknown
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Direction::Positive => Direction::Negative,
            Direction::Negative => Direction::Positive,
            Direction::Unknown => Direction::Unknown,
        }
    }

    /// `magnitude` signed by this direction. `None` while direction is unknown.
    pub fn signed(self, magnitude: f64) -> Option<f64> {
        match self {
            Direction::Positive => Some(magnitude),
            Direction::Negative => Some(-magnitude),
            Direction::Unknown => None,
        }
    }
}

/// State of one axis
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    kind: AxisKind,
    lash: f64,
    ideal_position: f64,
    direction: Direction,
}

impl Axis {
    /// Create an axis with the given backlash.
    ///
    /// Negative (or NaN) lash means "no compensation" and is stored as 0.
    pub fn new(kind: AxisKind, lash: f64) -> Self {
        let clamped = lash.max(0.0);
        if clamped != lash {
            warn!(
                "{} lash {} is not a positive distance, compensation disabled for this axis",
                kind.letter(),
                lash
            );
        }
        Self {
            kind,
            lash: clamped,
            ideal_position: 0.0,
            direction: Direction::Unknown,
        }
    }

    pub fn kind(&self) -> AxisKind {
        self.kind
    }

    pub fn lash(&self) -> f64 {
        self.lash
    }

    pub fn ideal_position(&self) -> f64 {
        self.ideal_position
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether this axis has any backlash to take up
    pub fn compensates(&self) -> bool {
        self.lash > 0.0
    }

    /// Forget position and direction (after homing or an offset reset)
    pub fn reset(&mut self) {
        self.direction = Direction::Unknown;
        self.ideal_position = 0.0;
    }

    /// True unless moving to `target` travels against the established direction.
    ///
    /// Unknown direction and zero-length moves never count as a reversal.
    pub fn is_same_direction(&self, target: f64) -> bool {
        match self.direction {
            Direction::Unknown => true,
            Direction::Positive => target >= self.ideal_position,
            Direction::Negative => target <= self.ideal_position,
        }
    }

    /// Store the new uncorrected position. Does not touch direction.
    pub fn record_motion(&mut self, target: f64) {
        self.ideal_position = target;
    }

    /// Establish direction from the first real move after start/reset.
    /// No-op once a direction is known or when the move has zero length.
    pub fn establish_direction(&mut self, target: f64) {
        if self.direction == Direction::Unknown {
            self.direction = Direction::of_travel(self.ideal_position, target);
        }
    }

    /// Flip direction after a detected reversal
    pub fn reverse(&mut self) {
        self.direction = self.direction.reversed();
    }
}

/// One `Axis` per `AxisKind`, indexed by kind
#[derive(Debug, Clone, PartialEq)]
pub struct AxisSet {
    axes: [Axis; 4],
}

impl AxisSet {
    pub fn new(lash: &LashConfig) -> Self {
        Self {
            axes: [
                Axis::new(AxisKind::X, lash.x),
                Axis::new(AxisKind::Y, lash.y),
                Axis::new(AxisKind::Z, lash.z),
                Axis::new(AxisKind::A, lash.a),
            ],
        }
    }

    pub fn reset_all(&mut self) {
        for axis in &mut self.axes {
            axis.reset();
        }
    }
}

impl Index<AxisKind> for AxisSet {
    type Output = Axis;

    fn index(&self, kind: AxisKind) -> &Axis {
        &self.axes[kind as usize]
    }
}

impl IndexMut<AxisKind> for AxisSet {
    fn index_mut(&mut self, kind: AxisKind) -> &mut Axis {
        &mut self.axes[kind as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_lash_clamped() {
        let axis = Axis::new(AxisKind::Z, -0.2);
        assert_eq!(axis.lash(), 0.0);
        assert!(!axis.compensates());

        let nan = Axis::new(AxisKind::A, f64::NAN);
        assert_eq!(nan.lash(), 0.0);
    }

    #[test]
    fn test_unknown_direction_never_reverses() {
        let axis = Axis::new(AxisKind::X, 0.1);
        assert!(axis.is_same_direction(-100.0));
        assert!(axis.is_same_direction(100.0));
    }

    #[test]
    fn test_direction_established_from_first_move() {
        let mut axis = Axis::new(AxisKind::X, 0.1);
        axis.establish_direction(-3.0);
        axis.record_motion(-3.0);
        assert_eq!(axis.direction(), Direction::Negative);

        // Further negative is same direction, back up is a reversal
        assert!(axis.is_same_direction(-4.0));
        assert!(!axis.is_same_direction(-2.0));
    }

    #[test]
    fn test_zero_length_move_is_not_reversal() {
        let mut axis = Axis::new(AxisKind::Y, 0.1);
        axis.establish_direction(0.0);
        assert_eq!(axis.direction(), Direction::Unknown);

        axis.establish_direction(2.0);
        axis.record_motion(2.0);
        assert!(axis.is_same_direction(2.0));
    }

    #[test]
    fn test_reset_forgets_direction_and_position() {
        let mut axis = Axis::new(AxisKind::X, 0.1);
        axis.establish_direction(5.0);
        axis.record_motion(5.0);
        axis.reset();
        assert_eq!(axis.direction(), Direction::Unknown);
        assert_eq!(axis.ideal_position(), 0.0);
    }

    #[test]
    fn test_signed_magnitude() {
        assert_eq!(Direction::Positive.signed(0.1), Some(0.1));
        assert_eq!(Direction::Negative.signed(0.1), Some(-0.1));
        assert_eq!(Direction::Unknown.signed(0.1), None);
        assert_eq!(Direction::Unknown.reversed(), Direction::Unknown);
    }

    #[test]
    fn test_axis_set_indexing() {
        let set = AxisSet::new(&LashConfig::new(0.1, 0.0, 0.3, 0.0));
        assert_eq!(set[AxisKind::X].lash(), 0.1);
        assert_eq!(set[AxisKind::Z].lash(), 0.3);
        for kind in AxisKind::ALL {
            assert_eq!(set[kind].kind(), kind);
            assert_eq!(AxisKind::from_letter(kind.letter()), Some(kind));
        }
        assert_eq!(AxisKind::from_letter('B'), None);
    }
}
