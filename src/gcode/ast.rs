// Structured G-code: what one input line turns into after tokenizing.
//
// Every parsed token keeps its source text so untouched codes render back
// exactly as they were written. Words rebuilt by the compensator are
// rendered with a fixed number of decimals instead.

use std::fmt;

use crate::config::OUTPUT_PRECISION;

/// A single letter/number pair, e.g. `X12.5` or a bare flag like `X` in `G28 X`
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    /// Upper-cased letter, used for matching
    pub letter: char,
    pub value: Option<f64>,
    text: String,
}

impl Word {
    /// Word as it appeared in the source line
    pub fn parsed(letter: char, value: Option<f64>, text: impl Into<String>) -> Self {
        Self {
            letter: letter.to_ascii_uppercase(),
            value,
            text: text.into(),
        }
    }

    /// Synthesized word, rendered at output precision
    pub fn new(letter: char, value: f64) -> Self {
        let letter = letter.to_ascii_uppercase();
        Self {
            letter,
            value: Some(value),
            text: format!("{}{}", letter, format_value(value)),
        }
    }

    /// Same word re-rendered at output precision. Flags are left alone.
    pub fn formatted(&self) -> Self {
        match self.value {
            Some(value) => Self::new(self.letter, value),
            None => self.clone(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Render a coordinate with exactly `OUTPUT_PRECISION` decimals.
///
/// Values that round to zero are printed without a sign so `-0.001`
/// comes out as `0.00`, not `-0.00`.
pub fn format_value(value: f64) -> String {
    let scale = 10f64.powi(OUTPUT_PRECISION as i32);
    let value = if (value * scale).round() == 0.0 { 0.0 } else { value };
    format!("{:.*}", OUTPUT_PRECISION, value)
}

/// Numeric part of a command word: `G91` is 91, `G91.1` is 91 minor 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeNumber {
    pub major: u32,
    pub minor: Option<u32>,
}

impl CodeNumber {
    pub const fn new(major: u32) -> Self {
        Self { major, minor: None }
    }

    pub const fn with_minor(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor: Some(minor),
        }
    }
}

impl fmt::Display for CodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.minor {
            Some(minor) => write!(f, "{}.{}", self.major, minor),
            None => write!(f, "{}", self.major),
        }
    }
}

/// A G/M/T/O command word and the argument words that follow it
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub letter: char,
    pub number: CodeNumber,
    text: String,
    pub arguments: Vec<Word>,
}

impl Command {
    pub fn parsed(letter: char, number: CodeNumber, text: impl Into<String>) -> Self {
        Self {
            letter: letter.to_ascii_uppercase(),
            number,
            text: text.into(),
            arguments: Vec::new(),
        }
    }

    /// Build a G command from scratch, e.g. `Command::g(91, vec![])`
    pub fn g(major: u32, arguments: Vec<Word>) -> Self {
        let number = CodeNumber::new(major);
        Self {
            letter: 'G',
            number,
            text: format!("G{}", number),
            arguments,
        }
    }

    /// Same command word (original spelling) carrying different arguments
    pub fn with_arguments(&self, arguments: Vec<Word>) -> Self {
        Self {
            letter: self.letter,
            number: self.number,
            text: self.text.clone(),
            arguments,
        }
    }

    /// True for exactly `G<major>`, without a minor number
    pub fn is_g(&self, major: u32) -> bool {
        self.letter == 'G' && self.number == CodeNumber::new(major)
    }

    pub fn argument(&self, letter: char) -> Option<&Word> {
        let letter = letter.to_ascii_uppercase();
        self.arguments.iter().find(|word| word.letter == letter)
    }

    /// Command word as written in the source, e.g. `G01`
    pub fn code_text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)?;
        for word in &self.arguments {
            write!(f, " {}", word)?;
        }
        Ok(())
    }
}

/// One element of a parsed line
#[derive(Debug, Clone, PartialEq)]
pub enum Code {
    Command(Command),
    /// Argument words with no command word in front of them (modal continuation)
    Arguments(Vec<Word>),
    LineNumber(Word),
    /// Comment text including its delimiters
    Comment(String),
    /// `%` program delimiter
    Percent,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::Command(cmd) => write!(f, "{}", cmd),
            Code::Arguments(words) => {
                let mut first = true;
                for word in words {
                    if !first {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", word)?;
                    first = false;
                }
                Ok(())
            }
            Code::LineNumber(word) => write!(f, "{}", word),
            Code::Comment(text) => f.write_str(text),
            Code::Percent => f.write_str("%"),
        }
    }
}

/// Straight-line motion commands the compensator rewrites
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionKind {
    /// G0
    Rapid,
    /// G1
    Linear,
}

impl MotionKind {
    pub fn from_command(cmd: &Command) -> Option<Self> {
        if cmd.is_g(0) {
            Some(MotionKind::Rapid)
        } else if cmd.is_g(1) {
            Some(MotionKind::Linear)
        } else {
            None
        }
    }

    pub fn code(self) -> u32 {
        match self {
            MotionKind::Rapid => 0,
            MotionKind::Linear => 1,
        }
    }
}
