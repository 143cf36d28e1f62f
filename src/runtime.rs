// Line-by-line compensation loop
//
// Each input line is parsed, its codes dispatched in order (mode switches,
// homing/offset resets, moves) and written back out on one line. Nudges for
// a move are written as extra lines in front of the line holding the move.

use std::io::{BufRead, Write};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::LashConfig;
use crate::gcode::{Code, CodeNumber, Command, MotionKind, ParseError, Word, parse_line};
use crate::lash::{AxisKind, AxisSet, MotionError, ModalState, Positioning, compensate};

/// Errors that stop a compensation run. None of these are recoverable:
/// carrying on could send the machine somewhere it was not told to go.
#[derive(Debug, thiserror::Error)]
pub enum LashError {
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: ParseError,
    },

    #[error("line {line}: {source}")]
    Motion {
        line: usize,
        #[source]
        source: MotionError,
    },

    #[error("line {line}: more than one G0/G1 move in a single block")]
    MultipleMotions { line: usize },

    #[error("line {line}: axis words with no active G0/G1 motion mode")]
    NoMotionMode { line: usize },

    #[error("line {line}: unsupported directive '{directive}'")]
    UnsupportedDirective { line: usize, directive: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LashError>;

/// Per-axis counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AxisCounts {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub a: usize,
}

impl AxisCounts {
    fn bump(&mut self, kind: AxisKind) {
        match kind {
            AxisKind::X => self.x += 1,
            AxisKind::Y => self.y += 1,
            AxisKind::Z => self.z += 1,
            AxisKind::A => self.a += 1,
        }
    }
}

/// What a run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub lines: usize,
    /// Nudge moves inserted (one per compensated move, however many axes)
    pub nudges: usize,
    pub resets: usize,
    pub reversals: AxisCounts,
}

/// Motion mode that applies to axis words without their own G0/G1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActiveMotion {
    /// Before any move, or after G80
    Unset,
    Straight(MotionKind),
    /// Arcs, G38 moves, canned cycles: not tracked
    Other,
}

pub struct Runtime {
    axes: AxisSet,
    modal: ModalState,
    motion_mode: ActiveMotion,
    summary: RunSummary,
}

impl Runtime {
    pub fn new(lash: &LashConfig) -> Self {
        Self {
            axes: AxisSet::new(lash),
            modal: ModalState::new(),
            motion_mode: ActiveMotion::Unset,
            summary: RunSummary::default(),
        }
    }

    pub fn axes(&self) -> &AxisSet {
        &self.axes
    }

    pub fn modal(&self) -> &ModalState {
        &self.modal
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Transform one input line into the output lines that replace it.
    ///
    /// The last returned line is the input line itself (re-rendered); any
    /// lines before it are inserted compensation.
    pub fn process_line(&mut self, line_no: usize, line: &str) -> Result<Vec<String>> {
        let codes = parse_line(line).map_err(|source| LashError::Parse {
            line: line_no,
            source,
        })?;

        // Inserted lines run before this line, so they see the mode the line starts in
        let emit_mode = self.modal.positioning();
        let mut output = Vec::new();
        let mut rendered = Vec::with_capacity(codes.len());
        let mut motions = 0;

        for code in codes {
            match code {
                Code::Command(cmd) => match MotionKind::from_command(&cmd) {
                    Some(kind) => {
                        count_motion(line_no, &mut motions)?;
                        self.motion_mode = ActiveMotion::Straight(kind);
                        let arguments =
                            self.compensate_move(line_no, kind, emit_mode, &cmd.arguments, &mut output)?;
                        rendered.push(cmd.with_arguments(arguments).to_string());
                    }
                    None => {
                        self.on_directive(line_no, &cmd)?;
                        // `G90 X2`: the axis words are a move in the active mode, not G90's
                        let split = if owns_axis_words(&cmd) {
                            None
                        } else {
                            cmd.arguments.iter().position(|word| AxisKind::from_letter(word.letter).is_some())
                        };
                        match split {
                            Some(at) => {
                                let mut head = cmd.arguments.clone();
                                let tail = head.split_off(at);
                                rendered.push(cmd.with_arguments(head).to_string());
                                let block = self.bare_block(line_no, emit_mode, tail, &mut motions, &mut output)?;
                                rendered.push(block);
                            }
                            None => rendered.push(cmd.to_string()),
                        }
                    }
                },
                Code::Arguments(words) => {
                    let block = self.bare_block(line_no, emit_mode, words, &mut motions, &mut output)?;
                    rendered.push(block);
                }
                other => rendered.push(other.to_string()),
            }
        }

        output.push(rendered.join(" "));
        self.summary.lines += 1;
        Ok(output)
    }

    /// Render argument words that carry no G0/G1 of their own
    fn bare_block(
        &mut self,
        line_no: usize,
        emit_mode: Positioning,
        words: Vec<Word>,
        motions: &mut usize,
        output: &mut Vec<String>,
    ) -> Result<String> {
        if !has_axis_word(&words) {
            return Ok(Code::Arguments(words).to_string());
        }

        match self.motion_mode {
            ActiveMotion::Straight(kind) => {
                count_motion(line_no, motions)?;
                let arguments = self.compensate_move(line_no, kind, emit_mode, &words, output)?;
                Ok(Code::Arguments(arguments).to_string())
            }
            ActiveMotion::Other => Ok(Code::Arguments(words).to_string()),
            ActiveMotion::Unset => Err(LashError::NoMotionMode { line: line_no }),
        }
    }

    /// Run compensation for one move, appending any inserted lines to `output`
    fn compensate_move(
        &mut self,
        line_no: usize,
        kind: MotionKind,
        emit_mode: Positioning,
        words: &[Word],
        output: &mut Vec<String>,
    ) -> Result<Vec<Word>> {
        let comp = compensate(&mut self.axes, &self.modal, emit_mode, kind, words).map_err(|source| {
            LashError::Motion {
                line: line_no,
                source,
            }
        })?;

        if comp.is_nudged() {
            self.summary.nudges += 1;
            for &(axis, _) in &comp.nudges {
                self.summary.reversals.bump(axis);
            }
            output.extend(comp.preamble.iter().map(|cmd| cmd.to_string()));
        }

        Ok(comp.arguments)
    }

    /// Handle non-motion commands that change compensation state
    fn on_directive(&mut self, line_no: usize, cmd: &Command) -> Result<()> {
        if cmd.letter != 'G' {
            return Ok(());
        }

        match cmd.number {
            CodeNumber { major: 28, minor: None } => self.reset_axes(line_no, "homing"),
            CodeNumber { major: 10, minor: None } => {
                match cmd.argument('L').and_then(|word| word.value) {
                    Some(l) if l == 20.0 => self.reset_axes(line_no, "offset reset"),
                    _ => {
                        return Err(LashError::UnsupportedDirective {
                            line: line_no,
                            directive: cmd.to_string(),
                        });
                    }
                }
            }
            CodeNumber { major: 90, minor: None } => self.modal.set_absolute(),
            CodeNumber { major: 91, minor: None } => self.modal.set_incremental(),
            CodeNumber { major: 80, minor: None } => self.motion_mode = ActiveMotion::Unset,
            // Other motion-group codes: later bare blocks are not straight moves
            CodeNumber { major: 2 | 3 | 33 | 38 | 73 | 76 | 81..=89, .. } => {
                self.motion_mode = ActiveMotion::Other
            }
            _ => {}
        }
        Ok(())
    }

    fn reset_axes(&mut self, line_no: usize, reason: &str) {
        debug!("Line {}: {}, resetting all axes", line_no, reason);
        self.axes.reset_all();
        self.summary.resets += 1;
    }

    /// Compensate a whole stream, writing each output line as soon as it is produced
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<RunSummary> {
        for (idx, line) in input.lines().enumerate() {
            let line = line?;
            for out in self.process_line(idx + 1, &line)? {
                writeln!(output, "{}", out)?;
            }
        }
        output.flush()?;
        Ok(self.summary)
    }
}

fn count_motion(line_no: usize, motions: &mut usize) -> Result<()> {
    *motions += 1;
    if *motions > 1 {
        return Err(LashError::MultipleMotions { line: line_no });
    }
    Ok(())
}

/// Commands whose axis words are their own parameters rather than a move
/// in the active motion mode (arcs, homing, offsets, canned cycles, G53)
fn owns_axis_words(cmd: &Command) -> bool {
    cmd.letter == 'G'
        && matches!(
            cmd.number.major,
            2 | 3 | 4 | 10 | 28 | 30 | 33 | 38 | 52 | 53 | 73 | 76 | 80..=89 | 92
        )
}

fn has_axis_word(words: &[Word]) -> bool {
    words.iter().any(|word| AxisKind::from_letter(word.letter).is_some())
}

/// Compensate `input` into `output` with the given lash values
pub fn run<R: BufRead, W: Write>(lash: &LashConfig, input: R, output: W) -> Result<RunSummary> {
    info!(
        "Compensating backlash: X={} Y={} Z={} A={}",
        lash.x, lash.y, lash.z, lash.a
    );
    let mut runtime = Runtime::new(lash);
    runtime.run(input, output)
}
