// G-code line model
//
// Provides:
// - Structured representation of one G-code line (commands, arguments, comments)
// - Line tokenizer that keeps the original token text for pass-through
// - Rendering back to text, with fixed-precision formatting for rewritten words

pub mod ast;
pub mod parser;

pub use ast::{Code, CodeNumber, Command, MotionKind, Word};
pub use parser::{ParseError, parse_line};
