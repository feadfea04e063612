//! Line model with conditional-compilation regions resolved.

use anyhow::bail;
use fixflow_types::PreprocessorConfiguration;

/// One physical line. `end` excludes the line break, `next` is where the following line
/// starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    pub start: usize,
    pub end: usize,
    pub next: usize,
    /// Compiled under the tree's configuration.
    pub active: bool,
    /// A `#...` preprocessor line.
    pub directive: bool,
    /// Lexical state carried in from the previous active line.
    pub starts_in: Carry,
}

/// Constructs that may span line breaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Carry {
    #[default]
    Code,
    /// Inside `/* ... */`.
    BlockComment,
    /// Inside `@"..."`.
    Verbatim,
}

impl Line {
    pub fn text<'t>(&self, source: &'t str) -> &'t str {
        &source[self.start..self.end]
    }

    pub fn line_break<'t>(&self, source: &'t str) -> &'t str {
        &source[self.end..self.next]
    }

    pub fn is_blank(&self, source: &str) -> bool {
        self.text(source).trim().is_empty()
    }

    /// Active code, not a directive.
    pub fn is_code(&self) -> bool {
        self.active && !self.directive
    }

    /// The line's text with literals and comments blanked, continuing whatever construct
    /// the previous line left open.
    pub fn code(&self, source: &str) -> String {
        lex(self.text(source), self.starts_in).0
    }
}

/// Syntax view produced by [`crate::TextProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTree {
    lines: Vec<Line>,
}

struct Region {
    opened_on: usize,
    parent_active: bool,
    taken: bool,
    current: bool,
}

impl Region {
    fn active(&self) -> bool {
        self.parent_active && self.current
    }
}

impl TextTree {
    /// Split `source` into lines and evaluate `#if` / `#elif` / `#else` / `#endif`
    /// against `configuration`. Unbalanced directives are an error.
    pub fn parse(source: &str, configuration: &PreprocessorConfiguration) -> anyhow::Result<Self> {
        let mut lines = Vec::new();
        let mut regions: Vec<Region> = Vec::new();
        let mut offset = 0;
        let mut carry = Carry::Code;

        for (number, raw) in source.split_inclusive('\n').enumerate() {
            let number = number + 1;
            let content = raw.strip_suffix('\n').unwrap_or(raw);
            let content = content.strip_suffix('\r').unwrap_or(content);
            let active = regions.last().is_none_or(Region::active);
            let trimmed = content.trim_start();
            // `#` inside a comment or verbatim string is not a directive.
            let directive = carry == Carry::Code && trimmed.starts_with('#');

            // A directive line belongs to the region enclosing the one it opens or closes.
            let mut line_active = active;
            if directive {
                let (keyword, rest) = split_directive(trimmed);
                match keyword {
                    "if" => {
                        let current = eval(rest, configuration);
                        regions.push(Region {
                            opened_on: number,
                            parent_active: active,
                            taken: current,
                            current,
                        });
                    }
                    "elif" => {
                        let Some(region) = regions.last_mut() else {
                            bail!("line {number}: `#elif` without `#if`");
                        };
                        region.current = !region.taken && eval(rest, configuration);
                        region.taken |= region.current;
                        line_active = region.parent_active;
                    }
                    "else" => {
                        let Some(region) = regions.last_mut() else {
                            bail!("line {number}: `#else` without `#if`");
                        };
                        region.current = !region.taken;
                        region.taken = true;
                        line_active = region.parent_active;
                    }
                    "endif" => {
                        let Some(region) = regions.pop() else {
                            bail!("line {number}: `#endif` without `#if`");
                        };
                        line_active = region.parent_active;
                    }
                    _ => {}
                }
            }

            let starts_in = carry;
            if line_active && !directive {
                carry = lex(content, carry).1;
            }
            lines.push(Line {
                start: offset,
                end: offset + content.len(),
                next: offset + raw.len(),
                active: line_active,
                directive,
                starts_in,
            });
            offset += raw.len();
        }

        if let Some(open) = regions.last() {
            bail!("unterminated `#if` opened on line {}", open.opened_on);
        }
        Ok(Self { lines })
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Index of the line containing byte `offset`.
    pub fn line_at(&self, offset: usize) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| l.start <= offset && offset < l.next.max(l.start + 1))
    }

    /// `\r\n` when the first line break is one, `\n` otherwise.
    pub fn newline<'t>(&self, source: &'t str) -> &'t str {
        match self.lines.iter().map(|l| l.line_break(source)).find(|b| !b.is_empty()) {
            Some("\r\n") => "\r\n",
            _ => "\n",
        }
    }
}

fn split_directive(trimmed: &str) -> (&str, &str) {
    let body = trimmed.trim_start_matches('#').trim_start();
    let end = body
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(body.len());
    (&body[..end], body[end..].trim())
}

/// `A`, `!A`, `true`, `false`, joined by `&&` and `||` (no parentheses). A trailing
/// `//` comment is ignored.
fn eval(expr: &str, configuration: &PreprocessorConfiguration) -> bool {
    let expr = expr.split("//").next().unwrap_or("");
    expr.split("||").any(|conj| {
        conj.split("&&").all(|atom| {
            let atom = atom.trim();
            match atom.strip_prefix('!') {
                Some(negated) => !symbol(negated.trim(), configuration),
                None => symbol(atom, configuration),
            }
        })
    })
}

fn symbol(name: &str, configuration: &PreprocessorConfiguration) -> bool {
    match name {
        "true" => true,
        "false" => false,
        _ => configuration.defines(name),
    }
}

/// `line` with string/char literals and comments blanked to spaces, starting outside
/// any literal or comment. Byte offsets are preserved.
pub fn code_view(line: &str) -> String {
    lex(line, Carry::Code).0
}

/// Blank literals and comments in one line starting in `carry`. Returns the view and the
/// state the next line starts in; regular literals and `//` comments end with the line.
fn lex(line: &str, carry: Carry) -> (String, Carry) {
    #[derive(PartialEq)]
    enum State {
        Code,
        Str,
        Chr,
        Verbatim,
        LineComment,
        BlockComment,
    }

    let bytes = line.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut state = match carry {
        Carry::Code => State::Code,
        Carry::BlockComment => State::BlockComment,
        Carry::Verbatim => State::Verbatim,
    };
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        match state {
            State::Code => match (b, next) {
                (b'/', Some(b'/')) => {
                    state = State::LineComment;
                    out.push(b' ');
                }
                (b'/', Some(b'*')) => {
                    state = State::BlockComment;
                    out.extend_from_slice(b"  ");
                    i += 2;
                    continue;
                }
                (b'@', Some(b'"')) => {
                    state = State::Verbatim;
                    out.extend_from_slice(b"@\"");
                    i += 2;
                    continue;
                }
                (b'@', Some(b'$')) if bytes.get(i + 2) == Some(&b'"') => {
                    state = State::Verbatim;
                    out.extend_from_slice(b"@$\"");
                    i += 3;
                    continue;
                }
                (b'"', _) => {
                    state = State::Str;
                    out.push(b'"');
                }
                (b'\'', _) => {
                    state = State::Chr;
                    out.push(b'\'');
                }
                _ => out.push(b),
            },
            State::Str | State::Chr => {
                let close = if state == State::Str { b'"' } else { b'\'' };
                if b == b'\\' && next.is_some() {
                    out.extend_from_slice(b"  ");
                    i += 2;
                    continue;
                }
                if b == close {
                    state = State::Code;
                    out.push(b);
                } else {
                    out.push(b' ');
                }
            }
            State::Verbatim => match (b, next) {
                (b'"', Some(b'"')) => {
                    out.extend_from_slice(b"  ");
                    i += 2;
                    continue;
                }
                (b'"', _) => {
                    state = State::Code;
                    out.push(b'"');
                }
                _ => out.push(b' '),
            },
            State::BlockComment => {
                if b == b'*' && next == Some(b'/') {
                    state = State::Code;
                    out.extend_from_slice(b"  ");
                    i += 2;
                    continue;
                }
                out.push(b' ');
            }
            State::LineComment => out.push(b' '),
        }
        i += 1;
    }
    let carry = match state {
        State::BlockComment => Carry::BlockComment,
        State::Verbatim => Carry::Verbatim,
        _ => Carry::Code,
    };
    // Only ASCII bytes are ever replaced, and always every byte of a character.
    let view = String::from_utf8(out).unwrap_or_else(|_| " ".repeat(line.len()));
    (view, carry)
}

pub fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

pub fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Identifier starting at byte `at`, if any.
pub fn ident_at(text: &str, at: usize) -> Option<&str> {
    let rest = text.get(at..)?;
    let mut chars = rest.char_indices();
    let (_, first) = chars.next()?;
    if !is_ident_start(first) {
        return None;
    }
    let end = chars
        .find(|(_, c)| !is_ident_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Offsets where `name` occurs as a whole identifier in `code`.
pub fn ident_occurrences<'a>(code: &'a str, name: &'a str) -> impl Iterator<Item = usize> + 'a {
    code.match_indices(name).filter_map(move |(at, _)| {
        let before = code[..at].chars().next_back();
        let after = code[at + name.len()..].chars().next();
        let bounded = !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char);
        bounded.then_some(at)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn active_lines(source: &str, symbols: &[&str]) -> Vec<bool> {
        let cfg = PreprocessorConfiguration::from_symbols(
            symbols.iter().map(|s| s.to_string()).collect(),
        );
        TextTree::parse(source, &cfg)
            .expect("parse")
            .lines()
            .iter()
            .map(|l| l.active)
            .collect()
    }

    #[test]
    fn regions_follow_symbols() {
        let src = "a\n#if DEBUG\nb\n#elif TRACE\nc\n#else\nd\n#endif\ne\n";
        assert_eq!(
            active_lines(src, &[]),
            vec![true, true, false, true, false, true, true, true, true]
        );
        assert_eq!(
            active_lines(src, &["DEBUG"]),
            vec![true, true, true, true, false, true, false, true, true]
        );
        assert_eq!(
            active_lines(src, &["TRACE"]),
            vec![true, true, false, true, true, true, false, true, true]
        );
    }

    #[test]
    fn nested_regions_inside_inactive_stay_inactive() {
        let src = "#if A\n#if !B\nx\n#else\ny\n#endif\n#endif\n";
        assert_eq!(
            active_lines(src, &[]),
            vec![true, false, false, false, false, false, true]
        );
        assert_eq!(
            active_lines(src, &["A"]),
            vec![true, true, true, true, false, true, true]
        );
    }

    #[test]
    fn unbalanced_directives_fail() {
        let base = PreprocessorConfiguration::base();
        let err = TextTree::parse("#endif\n", &base).expect_err("stray endif");
        assert!(err.to_string().contains("line 1"));
        let err = TextTree::parse("x\n#if A\ny\n", &base).expect_err("unterminated");
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn offsets_and_newlines() {
        let src = "ab\r\ncd";
        let tree = TextTree::parse(src, &PreprocessorConfiguration::base()).expect("parse");
        let lines = tree.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(src), "ab");
        assert_eq!(lines[0].line_break(src), "\r\n");
        assert_eq!(lines[1].start, 4);
        assert_eq!(lines[1].next, 6);
        assert_eq!(tree.newline(src), "\r\n");
        assert_eq!(tree.line_at(5), Some(1));
    }

    #[test]
    fn code_view_blanks_literals_and_comments() {
        let line = r#"x = "this.y \" z"; // this.w"#;
        let view = code_view(line);
        assert_eq!(view.len(), line.len());
        assert!(!view.contains("this"));
        assert!(view.starts_with("x = \""));
        assert_eq!(code_view("'\"' + a"), "' ' + a");
    }

    #[test]
    fn block_comments_and_verbatim_strings_are_blanked() {
        assert_eq!(code_view("a /* this.x */ b"), "a              b");
        assert_eq!(code_view(r#"s = @"C:\this.x"" y";"#), r#"s = @"             ";"#);
        assert_eq!(code_view(r#"s = @$"{this.x}";"#), r#"s = @$"        ";"#);
    }

    #[test]
    fn open_constructs_carry_across_lines() {
        let src = "a /* start\nthis.x\n# not a directive\nend */ this.y\ns = @\"one\nthis.z\"; this.w\n";
        let tree = TextTree::parse(src, &PreprocessorConfiguration::base()).expect("parse");
        let views: Vec<String> = tree.lines().iter().map(|l| l.code(src)).collect();
        assert_eq!(
            views,
            vec![
                "a         ".to_string(),
                "      ".to_string(),
                "                 ".to_string(),
                "       this.y".to_string(),
                "s = @\"   ".to_string(),
                "      \"; this.w".to_string(),
            ]
        );
        assert!(tree.lines().iter().all(|l| !l.directive));
        assert_eq!(tree.lines()[1].starts_in, Carry::BlockComment);
        assert_eq!(tree.lines()[5].starts_in, Carry::Verbatim);
    }

    #[test]
    fn inactive_lines_do_not_open_comments() {
        let src = "#if DEBUG\n/* unterminated\n#endif\nthis.x\n";
        let tree = TextTree::parse(src, &PreprocessorConfiguration::base()).expect("parse");
        assert_eq!(tree.lines()[3].starts_in, Carry::Code);
        assert_eq!(tree.lines()[3].code(src), "this.x");
    }

    #[test]
    fn identifiers() {
        assert_eq!(ident_at("this.name = 1", 5), Some("name"));
        assert_eq!(ident_at("1abc", 0), None);
        let found: Vec<usize> = ident_occurrences("name = names + name", "name").collect();
        assert_eq!(found, vec![0, 15]);
    }
}
