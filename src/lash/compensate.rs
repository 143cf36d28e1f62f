// Backlash compensation for one straight-line move
//
// For every configured axis in the move, decide whether the axis reverses.
// Reversing axes get one combined incremental "nudge" of `lash` in the new
// direction, written before the real move:
//
//   G91            <- only if the controller is in G90 at that point
//   G1 X-0.10      <- nudge, same motion code as the real move
//   G90            <- restore
//   G1 X1.00       <- real move, original phrasing
//
// The nudge is relative and never references work coordinates.

use tracing::debug;

use super::axis::{AxisKind, AxisSet};
use super::modal::{ModalState, Positioning};
use crate::gcode::{Command, MotionKind, Word};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MotionError {
    #[error("axis word {letter} has no value")]
    MissingValue { letter: char },

    #[error("axis {letter} appears more than once in one move")]
    DuplicateAxis { letter: char },
}

/// What to write for one move
#[derive(Debug, Clone, PartialEq)]
pub struct Compensation {
    /// Synthetic commands, one per output line, written before the real move's line
    pub preamble: Vec<Command>,
    /// Arguments of the real move, axis words re-rendered at output precision
    pub arguments: Vec<Word>,
    /// Axes that reversed and the signed nudge applied to each
    pub nudges: Vec<(AxisKind, f64)>,
}

impl Compensation {
    pub fn is_nudged(&self) -> bool {
        !self.nudges.is_empty()
    }
}

/// Update axis state for one move and build any compensation for it.
///
/// `modal` is the mode the move's coordinates are read in. `emit_mode` is the
/// mode the controller will be in where the preamble lands (the start of the
/// input line), which decides whether the nudge needs G91/G90 around it.
pub fn compensate(
    axes: &mut AxisSet,
    modal: &ModalState,
    emit_mode: Positioning,
    kind: MotionKind,
    words: &[Word],
) -> Result<Compensation, MotionError> {
    let mut seen = [false; AxisKind::ALL.len()];
    let mut nudges: Vec<(AxisKind, f64)> = Vec::new();
    let mut arguments = Vec::with_capacity(words.len());

    for word in words {
        // Only coordinates are re-rendered; F, E, S... keep their source text
        let Some(axis_kind) = AxisKind::from_letter(word.letter) else {
            arguments.push(word.clone());
            continue;
        };
        arguments.push(word.formatted());

        let value = word
            .value
            .ok_or(MotionError::MissingValue { letter: word.letter })?;
        if std::mem::replace(&mut seen[axis_kind as usize], true) {
            return Err(MotionError::DuplicateAxis { letter: word.letter });
        }

        let axis = &mut axes[axis_kind];
        let target = if modal.is_absolute() {
            value
        } else {
            axis.ideal_position() + value
        };

        if axis.compensates() {
            if axis.is_same_direction(target) {
                axis.establish_direction(target);
            } else {
                axis.reverse();
                if let Some(nudge) = axis.direction().signed(axis.lash()) {
                    debug!(
                        "{} reverses at {} -> {}, nudge {}",
                        axis_kind.letter(),
                        axis.ideal_position(),
                        target,
                        nudge
                    );
                    nudges.push((axis_kind, nudge));
                }
            }
        }

        axis.record_motion(target);
    }

    nudges.sort_by_key(|(axis_kind, _)| *axis_kind as usize);

    Ok(Compensation {
        preamble: build_preamble(kind, emit_mode, &nudges),
        arguments,
        nudges,
    })
}

fn build_preamble(kind: MotionKind, emit_mode: Positioning, nudges: &[(AxisKind, f64)]) -> Vec<Command> {
    if nudges.is_empty() {
        return Vec::new();
    }

    let nudge = Command::g(
        kind.code(),
        nudges
            .iter()
            .map(|&(axis_kind, value)| Word::new(axis_kind.letter(), value))
            .collect(),
    );

    match emit_mode {
        Positioning::Absolute => vec![Command::g(91, vec![]), nudge, Command::g(90, vec![])],
        Positioning::Incremental => vec![nudge],
    }
}
