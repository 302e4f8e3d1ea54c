use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Unexpected token at line {line}: {message}")]
    UnexpectedToken { line: usize, message: String },
    #[error("Unterminated string starting at line {0}")]
    UnterminatedString(usize),
    #[error("Trailing input at line {0} after the top-level expression")]
    TrailingInput(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SExp {
    Atom(String),
    List(Vec<SExp>),
}

impl SExp {
    pub fn atom(s: impl Into<String>) -> Self {
        SExp::Atom(s.into())
    }

    /// `(head items...)`
    pub fn tagged(head: &str, items: impl IntoIterator<Item = SExp>) -> Self {
        let mut list = vec![SExp::atom(head)];
        list.extend(items);
        SExp::List(list)
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExp::Atom(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExp]> {
        match self {
            SExp::List(items) => Some(items),
            _ => None,
        }
    }

    /// First atom of a list, the form's keyword.
    pub fn head(&self) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.first())
            .and_then(SExp::as_atom)
    }

    /// Everything after the head.
    pub fn args(&self) -> &[SExp] {
        match self {
            SExp::List(items) if !items.is_empty() => &items[1..],
            _ => &[],
        }
    }

    pub fn get(&self, key: &str) -> Option<&SExp> {
        if let SExp::List(items) = self {
            for item in items {
                if let SExp::List(sublist) = item {
                    if let Some(first) = sublist.first() {
                        if first.as_atom() == Some(key) {
                            if sublist.len() == 2 {
                                return Some(&sublist[1]);
                            } else if sublist.len() > 2 {
                                return Some(item);
                            }
                        }
                    }
                }
            }
        }
        None
    }

    pub fn get_all(&self, key: &str) -> Vec<&SExp> {
        let mut results = Vec::new();
        if let SExp::List(items) = self {
            for item in items {
                if item.head() == Some(key) {
                    results.push(item);
                }
            }
        }
        results
    }

    /// Multi-line rendering: a list whose items are all atoms stays on one
    /// line, anything nested breaks one child per line with two-space indent.
    pub fn to_pretty_string(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0);
        out.push('\n');
        out
    }

    fn write_pretty(&self, out: &mut String, depth: usize) {
        match self {
            SExp::Atom(_) => out.push_str(&self.to_string()),
            SExp::List(items) => {
                if items.iter().all(|i| matches!(i, SExp::Atom(_))) {
                    out.push_str(&self.to_string());
                    return;
                }
                out.push('(');
                for (i, item) in items.iter().enumerate() {
                    if i == 0 && matches!(item, SExp::Atom(_)) {
                        out.push_str(&item.to_string());
                        continue;
                    }
                    if i > 0 && matches!(item, SExp::Atom(_)) && matches!(items[i - 1], SExp::Atom(_)) {
                        out.push(' ');
                        out.push_str(&item.to_string());
                        continue;
                    }
                    out.push('\n');
                    out.push_str(&"  ".repeat(depth + 1));
                    item.write_pretty(out, depth + 1);
                }
                out.push(')');
            }
        }
    }
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s.chars()
            .any(|c| c.is_whitespace() || c == '(' || c == ')' || c == '"' || c == ';')
}

impl fmt::Display for SExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExp::Atom(s) => {
                if needs_quotes(s) {
                    write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
                } else {
                    write!(f, "{}", s)
                }
            }
            SExp::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

pub struct SExpParser {
    input: Vec<char>,
    pos: usize,
    line: usize,
}

impl SExpParser {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    /// Parse exactly one top-level expression.
    pub fn parse(&mut self) -> Result<SExp, ParseError> {
        self.skip_trivia();
        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }
        let sexp = self.parse_sexp()?;
        self.skip_trivia();
        if !self.is_eof() {
            return Err(ParseError::TrailingInput(self.line));
        }
        Ok(sexp)
    }

    fn parse_sexp(&mut self) -> Result<SExp, ParseError> {
        self.skip_trivia();

        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }

        match self.peek() {
            '(' => self.parse_list(),
            ')' => Err(ParseError::UnexpectedToken {
                line: self.line,
                message: "unbalanced ')'".to_string(),
            }),
            _ => self.parse_atom(),
        }
    }

    fn parse_list(&mut self) -> Result<SExp, ParseError> {
        self.expect_char('(')?;
        let mut items = Vec::new();

        loop {
            self.skip_trivia();

            if self.is_eof() {
                return Err(ParseError::UnexpectedEof);
            }

            if self.peek() == ')' {
                self.advance();
                break;
            }

            items.push(self.parse_sexp()?);
        }

        Ok(SExp::List(items))
    }

    fn parse_atom(&mut self) -> Result<SExp, ParseError> {
        if self.peek() == '"' {
            self.parse_string()
        } else {
            self.parse_symbol()
        }
    }

    fn parse_string(&mut self) -> Result<SExp, ParseError> {
        let start_line = self.line;
        self.expect_char('"')?;
        let mut s = String::new();
        let mut escaped = false;

        while !self.is_eof() {
            let ch = self.peek();
            self.advance();

            if escaped {
                match ch {
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    'r' => s.push('\r'),
                    _ => s.push(ch),
                }
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                return Ok(SExp::Atom(s));
            } else {
                s.push(ch);
            }
        }

        Err(ParseError::UnterminatedString(start_line))
    }

    fn parse_symbol(&mut self) -> Result<SExp, ParseError> {
        let mut s = String::new();

        while !self.is_eof() {
            let ch = self.peek();
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == ';' || ch == '"' {
                break;
            }
            s.push(ch);
            self.advance();
        }

        if s.is_empty() {
            Err(ParseError::UnexpectedToken {
                line: self.line,
                message: "empty symbol".to_string(),
            })
        } else {
            Ok(SExp::Atom(s))
        }
    }

    /// Whitespace and `;` line comments.
    fn skip_trivia(&mut self) {
        while !self.is_eof() {
            let ch = self.peek();
            if ch.is_whitespace() {
                self.advance();
            } else if ch == ';' {
                while !self.is_eof() && self.peek() != '\n' {
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn peek(&self) -> char {
        if self.pos < self.input.len() {
            self.input[self.pos]
        } else {
            '\0'
        }
    }

    fn advance(&mut self) {
        if self.pos < self.input.len() {
            if self.input[self.pos] == '\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }

        let ch = self.peek();
        if ch == expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                line: self.line,
                message: format!("expected '{}', found '{}'", expected, ch),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_atom() {
        let mut parser = SExpParser::new("hello");
        let result = parser.parse().unwrap();
        assert_eq!(result, SExp::Atom("hello".to_string()));
    }

    #[test]
    fn test_parse_string() {
        let mut parser = SExpParser::new("\"hello world\"");
        let result = parser.parse().unwrap();
        assert_eq!(result, SExp::Atom("hello world".to_string()));
    }

    #[test]
    fn test_parse_nested_with_comments() {
        let src = "; design header\n(design (net VCC U1:1) ; trailing\n d)";
        let result = SExpParser::new(src).parse().unwrap();
        assert_eq!(result.head(), Some("design"));
        assert_eq!(result.args().len(), 2);
        assert_eq!(result.args()[0].head(), Some("net"));
        assert_eq!(result.args()[0].args()[1].as_atom(), Some("U1:1"));
    }

    #[test]
    fn test_unbalanced_input() {
        assert_eq!(SExpParser::new("(a (b c)").parse(), Err(ParseError::UnexpectedEof));
        assert_eq!(SExpParser::new("(a) b").parse(), Err(ParseError::TrailingInput(1)));
        assert!(matches!(
            SExpParser::new("\n)").parse(),
            Err(ParseError::UnexpectedToken { line: 2, .. })
        ));
        assert_eq!(
            SExpParser::new("(a \"open").parse(),
            Err(ParseError::UnterminatedString(1))
        );
    }

    #[test]
    fn test_get() {
        let sexp = SExpParser::new("((key value) other stuff)").parse().unwrap();
        let value = sexp.get("key").unwrap();
        assert_eq!(value.as_atom(), Some("value"));
    }

    #[test]
    fn test_display_quotes_when_needed() {
        let sexp = SExp::tagged("value", [SExp::atom("600R @100MHz"), SExp::atom("10k")]);
        assert_eq!(sexp.to_string(), "(value \"600R @100MHz\" 10k)");
        let back = SExpParser::new(&sexp.to_string()).parse().unwrap();
        assert_eq!(back, sexp);
    }

    #[test]
    fn test_pretty_layout() {
        let sexp = SExp::tagged(
            "nets",
            [SExp::tagged("net", [SExp::atom("GND"), SExp::tagged("node", [SExp::atom("U1")])])],
        );
        assert_eq!(
            sexp.to_pretty_string(),
            "(nets\n  (net GND\n    (node U1)))\n"
        );
    }
}
