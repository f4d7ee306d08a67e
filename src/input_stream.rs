//! Source scanner with cursor, line tracking and lexical primitives
//!
//! Offsets are byte positions into the source text. Lines are counted as the
//! scanner steps over end-of-line sequences while positioning at the next
//! symbol; text consumed by a token is not rescanned for line breaks.

use std::fmt;

/// Comment markers recognized by the scanner
///
/// A comment runs from its marker to the end of the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerConfig {
    pub comment_markers: Vec<String>,
}

impl ScannerConfig {
    pub fn new<S: Into<String>>(markers: impl IntoIterator<Item = S>) -> Self {
        ScannerConfig {
            comment_markers: markers.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        ScannerConfig::new(["//", ";", "#"])
    }
}

/// Cursor over the source text used by pass 1
#[derive(Clone)]
pub struct InputStream<'a> {
    source: &'a str,
    config: &'a ScannerConfig,
    position: usize,
    line: usize,
}

impl<'a> InputStream<'a> {
    pub fn new(source: &'a str, config: &'a ScannerConfig) -> Self {
        InputStream {
            source,
            config,
            position: 0,
            line: 1,
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Byte offset of the cursor
    pub fn position(&self) -> usize {
        self.position
    }

    /// Current line, starting at 1
    pub fn line(&self) -> usize {
        self.line
    }

    /// Restore cursor and line (for backtracking)
    pub fn reset(&mut self, position: usize, line: usize) {
        self.position = position.min(self.source.len());
        self.line = line;
    }

    pub fn is_eof(&self) -> bool {
        self.position >= self.source.len()
    }

    pub fn remaining(&self) -> &'a str {
        &self.source[self.position..]
    }

    pub fn current(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    pub fn advance(&mut self, len: usize) {
        self.position = (self.position + len).min(self.source.len());
    }

    /// Step over spaces and tabs
    pub fn skip_whitespace(&mut self) {
        let skipped = self
            .remaining()
            .bytes()
            .take_while(|&b| b == b' ' || b == b'\t')
            .count();
        self.position += skipped;
    }

    /// Step over one end-of-line sequence, counting it as a single line
    ///
    /// `\n`, `\r`, `\r\n` and `\n\r` each form one line break.
    pub fn skip_eol(&mut self) -> bool {
        let bytes = self.remaining().as_bytes();
        match bytes.first() {
            Some(&first @ (b'\n' | b'\r')) => {
                let pair = matches!(bytes.get(1), Some(&(b'\n' | b'\r')))
                    && bytes.get(1) != Some(&first);
                self.position += if pair { 2 } else { 1 };
                self.line += 1;
                true
            }
            _ => false,
        }
    }

    /// Move to the next `\n` (or `\r`), or to the end of the source
    pub fn find_eol(&mut self) {
        let rest = self.remaining();
        self.position += rest.find(['\n', '\r']).unwrap_or(rest.len());
    }

    /// Skip a comment if one starts at the cursor
    pub fn skip_comments(&mut self) -> bool {
        let rest = self.remaining();
        let at_comment = self
            .config
            .comment_markers
            .iter()
            .any(|marker| !marker.is_empty() && rest.starts_with(marker.as_str()));
        if at_comment {
            self.find_eol();
        }
        at_comment
    }

    /// Skip whitespace, line breaks and comments until a printable symbol
    ///
    /// Returns false if the end of the source is reached first.
    pub fn position_to_next_symbol(&mut self) -> bool {
        loop {
            self.skip_whitespace();
            if self.skip_eol() || self.skip_comments() {
                continue;
            }
            match self.current() {
                None => return false,
                Some(ch) if ch > ' ' => return true,
                // other control characters
                Some(ch) => self.advance(ch.len_utf8()),
            }
        }
    }

    /// Length of `literal` if the source at the cursor starts with it
    pub fn match_literal(&self, literal: &str, case_sensitive: bool) -> Option<usize> {
        let rest = self.remaining();
        if literal.is_empty() || rest.len() < literal.len() {
            return None;
        }
        let matched = if case_sensitive {
            rest.starts_with(literal)
        } else {
            rest.as_bytes()[..literal.len()].eq_ignore_ascii_case(literal.as_bytes())
        };
        matched.then_some(literal.len())
    }

    /// Scan a floating point literal at the cursor
    ///
    /// Accepts an optional sign, digits with an optional decimal point and an
    /// optional exponent. Returns the value and the number of bytes consumed.
    pub fn scan_number(&self) -> Option<(f64, usize)> {
        let bytes = self.remaining().as_bytes();
        let digits_from = |start: usize| {
            bytes[start..]
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .count()
        };

        let mut end = 0;
        if matches!(bytes.first(), Some(b'+' | b'-')) {
            end += 1;
        }
        let integer = digits_from(end);
        end += integer;
        let mut fraction = 0;
        if bytes.get(end) == Some(&b'.') {
            fraction = digits_from(end + 1);
            if integer > 0 || fraction > 0 {
                end += 1 + fraction;
            }
        }
        if integer == 0 && fraction == 0 {
            return None;
        }
        if matches!(bytes.get(end), Some(b'e' | b'E')) {
            let mut exp = end + 1;
            if matches!(bytes.get(exp), Some(b'+' | b'-')) {
                exp += 1;
            }
            let exp_digits = digits_from(exp);
            if exp_digits > 0 {
                end = exp + exp_digits;
            }
        }

        let text = &self.remaining()[..end];
        text.parse::<f64>().ok().map(|value| (value, end))
    }

    /// Line and column of a byte offset (for error messages)
    pub fn line_col(&self, pos: usize) -> (usize, usize) {
        line_col(self.source, pos)
    }
}

/// Line and column of a byte offset, both starting at 1
pub fn line_col(source: &str, pos: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    let mut prev = None;

    for (i, ch) in source.char_indices() {
        if i >= pos {
            break;
        }
        match ch {
            '\n' | '\r' => {
                // second half of a \r\n or \n\r pair
                if matches!(prev, Some(p) if (p == '\n' || p == '\r') && p != ch) {
                    prev = None;
                    continue;
                }
                line += 1;
                col = 1;
            }
            _ => col += 1,
        }
        prev = Some(ch);
    }

    (line, col)
}

impl fmt::Debug for InputStream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InputStream(pos={}, line={}, remaining={:?})",
            self.position,
            self.line,
            self.remaining().chars().take(20).collect::<String>()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream<'a>(source: &'a str, config: &'a ScannerConfig) -> InputStream<'a> {
        InputStream::new(source, config)
    }

    #[test]
    fn test_skip_whitespace_only_space_and_tab() {
        let config = ScannerConfig::default();
        let mut input = stream(" \t\x0cx", &config);
        input.skip_whitespace();
        assert_eq!(input.position(), 2);
    }

    #[test]
    fn test_eol_pairs_count_once() {
        let config = ScannerConfig::default();
        let mut input = stream("\r\n\n\r\n\nx", &config);
        assert!(input.position_to_next_symbol());
        assert_eq!(input.current(), Some('x'));
        // \r\n, \n\r, \n, \n
        assert_eq!(input.line(), 5);
    }

    #[test]
    fn test_comments_run_to_end_of_line() {
        let config = ScannerConfig::default();
        let mut input = stream("  // note\n# other\n; last\n  word", &config);
        assert!(input.position_to_next_symbol());
        assert_eq!(input.remaining(), "word");
        assert_eq!(input.line(), 4);
    }

    #[test]
    fn test_configured_markers() {
        let config = ScannerConfig::new(["//"]);
        let mut input = stream("; not a comment", &config);
        assert!(input.position_to_next_symbol());
        assert_eq!(input.current(), Some(';'));
    }

    #[test]
    fn test_end_of_source() {
        let config = ScannerConfig::default();
        let mut input = stream("   \n  // trailing", &config);
        assert!(!input.position_to_next_symbol());
        assert!(input.is_eof());
    }

    #[test]
    fn test_match_literal() {
        let config = ScannerConfig::default();
        let input = stream("Material foo", &config);
        assert_eq!(input.match_literal("Material", true), Some(8));
        assert_eq!(input.match_literal("material", true), None);
        assert_eq!(input.match_literal("MATERIAL", false), Some(8));
        assert_eq!(input.match_literal("Material foo bar", true), None);
        assert_eq!(input.match_literal("", true), None);
    }

    #[test]
    fn test_scan_number() {
        let config = ScannerConfig::default();
        let cases = [
            ("3.14xyz", Some((3.14, 4))),
            ("-2", Some((-2.0, 2))),
            (".5 ", Some((0.5, 2))),
            ("7.", Some((7.0, 2))),
            ("1e3,", Some((1000.0, 3))),
            ("1e", Some((1.0, 1))),
            ("2.5E-1", Some((0.25, 6))),
            ("+", None),
            (".", None),
            ("abc", None),
        ];
        for (text, expected) in cases {
            assert_eq!(stream(text, &config).scan_number(), expected, "scanning {:?}", text);
        }
    }

    #[test]
    fn test_reset() {
        let config = ScannerConfig::default();
        let mut input = stream("a\nb", &config);
        input.advance(1);
        input.position_to_next_symbol();
        assert_eq!((input.position(), input.line()), (2, 2));
        input.reset(0, 1);
        assert_eq!(input.current(), Some('a'));
        assert_eq!(input.line(), 1);
    }

    #[test]
    fn test_line_col() {
        assert_eq!(line_col("line1\nline2\r\nline3", 0), (1, 1));
        assert_eq!(line_col("line1\nline2\r\nline3", 4), (1, 5));
        assert_eq!(line_col("line1\nline2\r\nline3", 6), (2, 1));
        assert_eq!(line_col("line1\nline2\r\nline3", 13), (3, 1));
    }
}
