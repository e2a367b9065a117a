//! Splits a source buffer into atoms: undifferentiated lexical units
//! whose classification (name, literal, operator) is the parser's job.

/// Smallest lexical unit. An empty `text` signals end of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub text: String,
    pub line: u32,
}

impl Atom {
    pub fn empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Lazy scanner over the whole source buffer with single-atom lookahead:
/// `peek` followed by `next` yields the same atom, and each position is
/// scanned exactly once.
pub struct Tokenizer {
    data: Vec<u8>,
    offset: usize,
    line: u32,
    peeked: Option<Atom>,
}

impl Tokenizer {
    pub fn new(source: &str) -> Self {
        Tokenizer {
            data: source.as_bytes().to_vec(),
            offset: 0,
            line: 1,
            peeked: None,
        }
    }

    /// Consume and return the next atom.
    pub fn next(&mut self) -> Atom {
        match self.peeked.take() {
            Some(atom) => atom,
            None => self.scan(),
        }
    }

    /// Return the next atom without consuming it.
    pub fn peek(&mut self) -> Atom {
        if let Some(atom) = &self.peeked {
            return atom.clone();
        }
        let atom = self.scan();
        self.peeked = Some(atom.clone());
        atom
    }

    // Scanning rules, in priority order on each step: comments,
    // whitespace, two-character operators, single-character operators,
    // then a maximal run of anything else as one atom. Note that ':' is
    // not an operator, so a label declaration "name:" arrives as a
    // single atom.
    fn scan(&mut self) -> Atom {
        let mut text = String::new();
        let mut line = self.line;
        let mut single_comment = false;
        let mut multi_comment = false;
        while self.offset < self.data.len() {
            let c = self.data[self.offset] as char;
            if text.is_empty() {
                line = self.line;
            }
            if single_comment {
                // Consume until newline.
                if c == '\n' {
                    single_comment = false;
                }
            } else if multi_comment {
                // Consume until "*/". An unterminated block comment
                // silently consumes to end of input.
                if c == '/' && 1 <= self.offset && self.data[self.offset - 1] == b'*' {
                    multi_comment = false;
                }
            } else if c == ' ' || c == '\t' || c == '\n' || c == '\r' {
                if !text.is_empty() {
                    break;
                }
            } else if c == '/' && self.data.get(self.offset + 1) == Some(&b'/') {
                if !text.is_empty() {
                    break;
                }
                single_comment = true;
            } else if c == '/' && self.data.get(self.offset + 1) == Some(&b'*') {
                if !text.is_empty() {
                    break;
                }
                multi_comment = true;
            } else if let Some(op) = self.two_char_op() {
                if text.is_empty() {
                    text.push_str(op);
                    self.offset += 2;
                }
                break;
            } else if is_punctuator(c) {
                if text.is_empty() {
                    text.push(c);
                    self.offset += 1;
                }
                break;
            } else {
                text.push(c);
            }
            if c == '\n' {
                self.line += 1;
            }
            self.offset += 1;
        }
        let line = if text.is_empty() { self.line } else { line };
        Atom { text, line }
    }

    fn two_char_op(&self) -> Option<&'static str> {
        let a = *self.data.get(self.offset)? as char;
        let b = *self.data.get(self.offset + 1)? as char;
        match (a, b) {
            ('|', '|') => Some("||"),
            ('&', '&') => Some("&&"),
            ('=', '=') => Some("=="),
            ('!', '=') => Some("!="),
            ('<', '=') => Some("<="),
            ('>', '=') => Some(">="),
            ('<', '<') => Some("<<"),
            ('>', '>') => Some(">>"),
            _ => None,
        }
    }
}

fn is_punctuator(c: char) -> bool {
    matches!(
        c,
        '+' | '-'
            | '*'
            | '/'
            | '%'
            | '&'
            | '|'
            | '^'
            | '='
            | '<'
            | '>'
            | '!'
            | '~'
            | ','
            | ';'
            | '['
            | ']'
            | '('
            | ')'
            | '{'
            | '}'
    )
}
