use std::{iter::Peekable, str::Chars};

/// Splits a script on `;`, ignoring semicolons that sit inside quotes or
/// comments. Statements come out trimmed, with comments removed, and empty
/// fragments are skipped.
pub fn statements(sql: &str) -> Statements<'_> {
    Statements {
        chars: sql.chars().peekable(),
        state: State::Code,
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    Code,
    SingleQuote,
    DoubleQuote,
    Backtick,
    LineComment,
    BlockComment,
}

pub struct Statements<'a> {
    chars: Peekable<Chars<'a>>,
    state: State,
}

impl Statements<'_> {
    fn next_is(&mut self, expected: char) -> bool {
        self.chars.next_if_eq(&expected).is_some()
    }
}

impl Iterator for Statements<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut buf = String::new();

        while let Some(c) = self.chars.next() {
            match self.state {
                State::Code => match c {
                    ';' => {
                        let statement = buf.trim();
                        if !statement.is_empty() {
                            return Some(statement.to_owned());
                        }
                        buf.clear();
                    }
                    '\'' => {
                        self.state = State::SingleQuote;
                        buf.push(c);
                    }
                    '"' => {
                        self.state = State::DoubleQuote;
                        buf.push(c);
                    }
                    '`' => {
                        self.state = State::Backtick;
                        buf.push(c);
                    }
                    '#' => self.state = State::LineComment,
                    '-' if self.next_is('-') => self.state = State::LineComment,
                    '/' if self.next_is('*') => self.state = State::BlockComment,
                    _ => buf.push(c),
                },
                State::SingleQuote | State::DoubleQuote => {
                    buf.push(c);
                    let closing = if self.state == State::SingleQuote { '\'' } else { '"' };
                    if c == '\\' {
                        if let Some(escaped) = self.chars.next() {
                            buf.push(escaped);
                        }
                    } else if c == closing {
                        self.state = State::Code;
                    }
                }
                State::Backtick => {
                    buf.push(c);
                    if c == '`' {
                        self.state = State::Code;
                    }
                }
                State::LineComment => {
                    if c == '\n' {
                        buf.push(c);
                        self.state = State::Code;
                    }
                }
                State::BlockComment => {
                    if c == '*' && self.next_is('/') {
                        buf.push(' ');
                        self.state = State::Code;
                    }
                }
            }
        }

        // unterminated quotes and comments are not an error, whatever was
        // buffered is still a statement
        let statement = buf.trim();
        (!statement.is_empty()).then(|| statement.to_owned())
    }
}
