// G-code line tokenizer
//
// Word format: [letter][number], e.g. G1, X-12.5, F300. Whitespace between
// words is optional (`G1X1Y2` is accepted). Comments are `( ... )` or
// `;` to end of line.
//
// G, M, T and O words open a new command; any other word is an argument of
// the most recent command on the line. Argument words seen before any
// command form a bare `Code::Arguments` block.

use super::ast::{Code, CodeNumber, Command, Word};

/// Letters that start a command rather than an argument
const COMMAND_LETTERS: [char; 4] = ['G', 'M', 'T', 'O'];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected character '{ch}' at column {column}")]
    UnexpectedChar { ch: char, column: usize },

    #[error("invalid number '{text}' at column {column}")]
    InvalidNumber { text: String, column: usize },

    #[error("unterminated comment starting at column {column}")]
    UnterminatedComment { column: usize },

    #[error("invalid command code '{text}' at column {column}")]
    InvalidCode { text: String, column: usize },
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Block under construction: either a command collecting arguments or a
/// bare run of argument words
enum Pending {
    Command(Command),
    Arguments(Vec<Word>),
}

struct LineBuilder {
    codes: Vec<Code>,
    pending: Option<Pending>,
    /// Comments seen while a block was open, emitted right after it
    deferred: Vec<Code>,
}

impl LineBuilder {
    fn new() -> Self {
        Self {
            codes: Vec::new(),
            pending: None,
            deferred: Vec::new(),
        }
    }

    fn flush(&mut self) {
        match self.pending.take() {
            Some(Pending::Command(cmd)) => self.codes.push(Code::Command(cmd)),
            Some(Pending::Arguments(words)) => self.codes.push(Code::Arguments(words)),
            None => {}
        }
        self.codes.append(&mut self.deferred);
    }

    fn push_standalone(&mut self, code: Code) {
        if self.pending.is_some() {
            self.deferred.push(code);
        } else {
            self.codes.push(code);
        }
    }

    fn push_argument(&mut self, word: Word) {
        match &mut self.pending {
            Some(Pending::Command(cmd)) => cmd.arguments.push(word),
            Some(Pending::Arguments(words)) => words.push(word),
            None => self.pending = Some(Pending::Arguments(vec![word])),
        }
    }

    fn finish(mut self) -> Vec<Code> {
        self.flush();
        self.codes
    }
}

/// Parse one line of G-code into its codes, in source order.
///
/// An empty or whitespace-only line yields an empty list.
pub fn parse_line(line: &str) -> Result<Vec<Code>> {
    let mut builder = LineBuilder::new();
    let mut chars = line.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        let column = start + 1;

        if ch.is_whitespace() {
            continue;
        }

        match ch {
            '(' => {
                let end = line[start..]
                    .find(')')
                    .map(|offset| start + offset)
                    .ok_or(ParseError::UnterminatedComment { column })?;
                builder.push_standalone(Code::Comment(line[start..=end].to_string()));
                // Skip past the closing paren
                while let Some(&(idx, _)) = chars.peek() {
                    if idx > end {
                        break;
                    }
                    chars.next();
                }
            }
            ';' => {
                builder.push_standalone(Code::Comment(line[start..].to_string()));
                break;
            }
            '%' => builder.push_standalone(Code::Percent),
            c if c.is_ascii_alphabetic() => {
                let mut end = start + c.len_utf8();
                while let Some(&(idx, next)) = chars.peek() {
                    if next.is_ascii_digit() || matches!(next, '.' | '+' | '-') {
                        end = idx + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }

                let text = &line[start..end];
                let number = &text[c.len_utf8()..];
                let letter = c.to_ascii_uppercase();

                if COMMAND_LETTERS.contains(&letter) {
                    let number = parse_code_number(number).ok_or_else(|| {
                        ParseError::InvalidCode {
                            text: text.to_string(),
                            column,
                        }
                    })?;
                    builder.flush();
                    builder.pending = Some(Pending::Command(Command::parsed(letter, number, text)));
                    continue;
                }

                let value = if number.is_empty() {
                    None
                } else {
                    let value = number
                        .parse::<f64>()
                        .ok()
                        .filter(|value| value.is_finite())
                        .ok_or_else(|| ParseError::InvalidNumber {
                            text: text.to_string(),
                            column,
                        })?;
                    Some(value)
                };
                let word = Word::parsed(letter, value, text);

                if letter == 'N' {
                    builder.flush();
                    builder.codes.push(Code::LineNumber(word));
                } else {
                    builder.push_argument(word);
                }
            }
            other => return Err(ParseError::UnexpectedChar { ch: other, column }),
        }
    }

    Ok(builder.finish())
}

/// `1`, `01`, `91.1` -> code numbers. Signs, exponents and empty text are rejected.
fn parse_code_number(text: &str) -> Option<CodeNumber> {
    let (major, minor) = match text.split_once('.') {
        Some((major, minor)) => (major, Some(minor)),
        None => (text, None),
    };

    if major.is_empty() || !major.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let major = major.parse::<u32>().ok()?;

    match minor {
        None => Some(CodeNumber::new(major)),
        Some(minor) if !minor.is_empty() && minor.bytes().all(|b| b.is_ascii_digit()) => {
            Some(CodeNumber::with_minor(major, minor.parse::<u32>().ok()?))
        }
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(code: &Code) -> &Command {
        match code {
            Code::Command(cmd) => cmd,
            other => panic!("Expected command, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_simple_move() {
        let codes = parse_line("G1 X10 Y-2.5 F300").unwrap();
        assert_eq!(codes.len(), 1);

        let cmd = command(&codes[0]);
        assert!(cmd.is_g(1));
        assert_eq!(cmd.arguments.len(), 3);
        assert_eq!(cmd.argument('x').and_then(|w| w.value), Some(10.0));
        assert_eq!(cmd.argument('Y').and_then(|w| w.value), Some(-2.5));
        assert_eq!(cmd.argument('F').and_then(|w| w.value), Some(300.0));
    }

    #[test]
    fn test_parse_without_spaces() {
        let codes = parse_line("G01X1Y2").unwrap();
        let cmd = command(&codes[0]);
        assert_eq!(cmd.code_text(), "G01");
        assert!(cmd.is_g(1));
        assert_eq!(cmd.arguments[0].text(), "X1");
        assert_eq!(cmd.arguments[1].text(), "Y2");
    }

    #[test]
    fn test_parse_multiple_commands_on_line() {
        let codes = parse_line("N10 G90 G0 Z5 M3 S1000").unwrap();
        assert_eq!(codes.len(), 4);
        assert!(matches!(&codes[0], Code::LineNumber(w) if w.value == Some(10.0)));
        assert!(command(&codes[1]).is_g(90));
        assert!(command(&codes[2]).is_g(0));
        let spindle = command(&codes[3]);
        assert_eq!(spindle.letter, 'M');
        assert_eq!(spindle.argument('S').and_then(|w| w.value), Some(1000.0));
    }

    #[test]
    fn test_parse_bare_arguments() {
        let codes = parse_line("X2 Y3").unwrap();
        match &codes[0] {
            Code::Arguments(words) => assert_eq!(words.len(), 2),
            other => panic!("Expected bare arguments, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_comments() {
        let codes = parse_line("G1 X1 (rough pass) ; trailing").unwrap();
        assert_eq!(codes.len(), 3);
        assert_eq!(codes[1], Code::Comment("(rough pass)".to_string()));
        assert_eq!(codes[2], Code::Comment("; trailing".to_string()));
    }

    #[test]
    fn test_comment_inside_block_keeps_arguments_together() {
        let codes = parse_line("G1 X1 (note) Y2").unwrap();
        assert_eq!(codes.len(), 2);
        assert_eq!(command(&codes[0]).arguments.len(), 2);
        assert_eq!(codes[1], Code::Comment("(note)".to_string()));
    }

    #[test]
    fn test_parse_flag_word() {
        let codes = parse_line("G28 X").unwrap();
        let cmd = command(&codes[0]);
        assert_eq!(cmd.argument('X').map(|w| w.value), Some(None));
    }

    #[test]
    fn test_parse_empty_and_percent() {
        assert!(parse_line("   ").unwrap().is_empty());
        assert_eq!(parse_line("%").unwrap(), vec![Code::Percent]);
    }

    #[test]
    fn test_parse_minor_code() {
        let codes = parse_line("G91.1").unwrap();
        let cmd = command(&codes[0]);
        assert_eq!(cmd.number, CodeNumber::with_minor(91, 1));
        assert!(!cmd.is_g(91));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_line("G1 X1 #5"),
            Err(ParseError::UnexpectedChar { ch: '#', column: 7 })
        );
        assert_eq!(
            parse_line("G1 X1.2.3"),
            Err(ParseError::InvalidNumber {
                text: "X1.2.3".to_string(),
                column: 4
            })
        );
        assert_eq!(
            parse_line("G1 (oops"),
            Err(ParseError::UnterminatedComment { column: 4 })
        );
        assert!(matches!(parse_line("G X1"), Err(ParseError::InvalidCode { .. })));

        // Overflows to infinity
        let huge = format!("G1 X{}", "9".repeat(400));
        assert!(matches!(
            parse_line(&huge),
            Err(ParseError::InvalidNumber { column: 4, .. })
        ));
        assert!(matches!(parse_line("G-1"), Err(ParseError::InvalidCode { .. })));
    }
}
