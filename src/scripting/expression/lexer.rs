//! Tokenizer for instruction text

/// Multi-character punctuators come first so the longest match wins
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "?.", "??", "=>", "==", "!=", "<=", ">=", "&&", "||", "(", ")", "[", "]", "{",
    "}", ",", ".", "?", ":", "+", "-", "*", "/", "%", "!", "<", ">", "=", ";",
];

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    Regex { pattern: String, flags: String },
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Character offset into the instruction
    pub offset: usize,
}

impl Token {
    pub fn is_punct(&self, p: &str) -> bool {
        matches!(self.kind, TokenKind::Punct(q) if q == p)
    }

    /// Short description for error messages
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::Str(s) => format!("string '{}'", s),
            TokenKind::Ident(name) => format!("'{}'", name),
            TokenKind::Regex { pattern, .. } => format!("regex /{}/", pattern),
            TokenKind::Punct(p) => format!("'{}'", p),
            TokenKind::Eof => "end of expression".to_string(),
        }
    }
}

/// A tokenizing failure at a character offset
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub offset: usize,
}

/// Splits `source` into tokens, ending with `TokenKind::Eof`
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let Some(c) = self.peek(0) else {
                self.tokens.push(Token {
                    kind: TokenKind::Eof,
                    offset: start,
                });
                return Ok(self.tokens);
            };

            let kind = if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|d| d.is_ascii_digit())) {
                self.number()?
            } else if c == '"' || c == '\'' || c == '`' {
                self.string(c)?
            } else if is_ident_start(c) {
                self.ident()
            } else if c == '/' && self.regex_allowed() {
                self.regex()?
            } else {
                self.punct()?
            };
            self.tokens.push(Token { kind, offset: start });
        }
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn error(&self, message: impl Into<String>, offset: usize) -> LexError {
        LexError {
            message: message.into(),
            offset,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek(0).is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// A `/` starts a regex unless it follows something that ends an operand
    fn regex_allowed(&self) -> bool {
        match self.tokens.last().map(|t| &t.kind) {
            None => true,
            Some(TokenKind::Punct(p)) => !matches!(*p, ")" | "]" | "}"),
            Some(TokenKind::Ident(name)) => name == "typeof",
            Some(_) => false,
        }
    }

    fn number(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        if self.peek(0) == Some('0') && matches!(self.peek(1), Some('x' | 'X')) {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek(0).is_some_and(|c| c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let digits: String = self.chars[digits_start..self.pos].iter().collect();
            return i64::from_str_radix(&digits, 16)
                .map(|n| TokenKind::Number(n as f64))
                .map_err(|_| self.error("invalid hexadecimal number", start));
        }

        while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek(0) == Some('.') {
            self.pos += 1;
            while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(0), Some('e' | 'E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.peek(0), Some('+' | '-')) {
                self.pos += 1;
            }
            if self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
                while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            } else {
                self.pos = mark;
            }
        }
        if self.peek(0).is_some_and(is_ident_start) {
            return Err(self.error("identifier directly after number", self.pos));
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| self.error(format!("invalid number '{}'", text), start))
    }

    fn string(&mut self, quote: char) -> Result<TokenKind, LexError> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        loop {
            let Some(c) = self.peek(0) else {
                return Err(self.error("unterminated string", start));
            };
            self.pos += 1;
            match c {
                c if c == quote => return Ok(TokenKind::Str(value)),
                '\\' => value.push(self.escape(start)?),
                '$' if quote == '`' && self.peek(0) == Some('{') => {
                    return Err(self.error("template substitutions are not supported", self.pos - 1));
                }
                '\n' if quote != '`' => return Err(self.error("unterminated string", start)),
                c => value.push(c),
            }
        }
    }

    fn escape(&mut self, string_start: usize) -> Result<char, LexError> {
        let Some(c) = self.peek(0) else {
            return Err(self.error("unterminated string", string_start));
        };
        self.pos += 1;
        let escaped = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '0' => '\0',
            'x' => self.hex_escape(2)?,
            'u' => {
                if self.peek(0) == Some('{') {
                    self.pos += 1;
                    let start = self.pos;
                    while self.peek(0).is_some_and(|c| c != '}') {
                        self.pos += 1;
                    }
                    let digits: String = self.chars[start..self.pos].iter().collect();
                    self.pos += 1;
                    u32::from_str_radix(&digits, 16)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| self.error("invalid unicode escape", start))?
                } else {
                    self.hex_escape(4)?
                }
            }
            other => other,
        };
        Ok(escaped)
    }

    fn hex_escape(&mut self, len: usize) -> Result<char, LexError> {
        let start = self.pos;
        let end = (self.pos + len).min(self.chars.len());
        let digits: String = self.chars[start..end].iter().collect();
        self.pos = end;
        u32::from_str_radix(&digits, 16)
            .ok()
            .filter(|_| digits.len() == len)
            .and_then(char::from_u32)
            .ok_or_else(|| self.error("invalid escape sequence", start))
    }

    fn ident(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek(0).is_some_and(is_ident_part) {
            self.pos += 1;
        }
        TokenKind::Ident(self.chars[start..self.pos].iter().collect())
    }

    fn regex(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        self.pos += 1;
        let mut pattern = String::new();
        let mut in_class = false;
        loop {
            let Some(c) = self.peek(0) else {
                return Err(self.error("unterminated regular expression", start));
            };
            self.pos += 1;
            match c {
                '\\' => {
                    pattern.push(c);
                    match self.peek(0) {
                        Some(next) => {
                            pattern.push(next);
                            self.pos += 1;
                        }
                        None => return Err(self.error("unterminated regular expression", start)),
                    }
                }
                '[' => {
                    in_class = true;
                    pattern.push(c);
                }
                ']' => {
                    in_class = false;
                    pattern.push(c);
                }
                '/' if !in_class => break,
                '\n' => return Err(self.error("unterminated regular expression", start)),
                c => pattern.push(c),
            }
        }
        let mut flags = String::new();
        while self.peek(0).is_some_and(is_ident_part) {
            flags.push(self.chars[self.pos]);
            self.pos += 1;
        }
        Ok(TokenKind::Regex { pattern, flags })
    }

    fn punct(&mut self) -> Result<TokenKind, LexError> {
        let rest = &self.chars[self.pos..];
        for p in PUNCTUATORS {
            let len = p.chars().count();
            if rest.len() >= len && rest[..len].iter().copied().eq(p.chars()) {
                // `a?.5:b` is a conditional, not optional chaining
                if *p == "?." && rest.get(2).is_some_and(|c| c.is_ascii_digit()) {
                    continue;
                }
                self.pos += len;
                return Ok(TokenKind::Punct(p));
            }
        }
        Err(self.error(format!("unexpected character '{}'", rest[0]), self.pos))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn member_chain_and_call() {
        assert_eq!(
            kinds("task.due.format('YYYY')"),
            vec![
                TokenKind::Ident("task".into()),
                TokenKind::Punct("."),
                TokenKind::Ident("due".into()),
                TokenKind::Punct("."),
                TokenKind::Ident("format".into()),
                TokenKind::Punct("("),
                TokenKind::Str("YYYY".into()),
                TokenKind::Punct(")"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn regex_versus_division() {
        let tokens = kinds("x.replace(/^[^\\[\\]]+\\[.\\] */, '')");
        assert!(tokens.contains(&TokenKind::Regex {
            pattern: "^[^\\[\\]]+\\[.\\] *".into(),
            flags: String::new(),
        }));
        assert_eq!(
            kinds("a / 2"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Punct("/"),
                TokenKind::Number(2.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn regex_flags_and_slash_in_class() {
        assert_eq!(
            kinds("/a[/]b/gi")[0],
            TokenKind::Regex {
                pattern: "a[/]b".into(),
                flags: "gi".into(),
            }
        );
    }

    #[test]
    fn optional_chaining_versus_conditional() {
        assert!(kinds("a?.b").contains(&TokenKind::Punct("?.")));
        let conditional = kinds("a?.5:1");
        assert_eq!(conditional[1], TokenKind::Punct("?"));
        assert_eq!(conditional[2], TokenKind::Number(0.5));
    }

    #[test]
    fn string_escapes() {
        assert_eq!(kinds(r#""a\"b\nA""#)[0], TokenKind::Str("a\"b\nA".into()));
        assert_eq!(kinds("'it\\'s'")[0], TokenKind::Str("it's".into()));
        assert_eq!(kinds("`plain`")[0], TokenKind::Str("plain".into()));
    }

    #[test]
    fn numbers() {
        assert_eq!(kinds("1.5e3")[0], TokenKind::Number(1500.0));
        assert_eq!(kinds("0x1F")[0], TokenKind::Number(31.0));
        assert_eq!(kinds(".25")[0], TokenKind::Number(0.25));
    }

    #[test]
    fn offsets_count_characters() {
        let tokens = tokenize("'é' + x").unwrap();
        assert_eq!(tokens[1].offset, 4);
        assert_eq!(tokens[2].offset, 6);
    }

    #[test]
    fn errors() {
        assert_eq!(tokenize("'open").unwrap_err().offset, 0);
        assert_eq!(tokenize("a # b").unwrap_err().offset, 2);
        assert!(tokenize("`${x}`").is_err());
        assert!(tokenize("/abc").is_err());
    }
}
