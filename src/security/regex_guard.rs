//! Safety screening for caller-supplied regular expressions.
//!
//! Every pattern that reaches the log search engine comes from an untrusted
//! remote caller, so it is screened before it is ever compiled or run. The
//! structural checks reject the well-known catastrophic-backtracking shapes;
//! they are best-effort heuristics, not a proof of linear-time matching. The
//! real backstop is downstream: screened patterns are only ever applied to
//! single lines capped at [`MAX_LINE_LENGTH`] characters.

use regex::Regex;
use thiserror::Error;

/// Longest accepted pattern. Bounds the cost of the structural scans
/// themselves and caps worst-case engine work per line.
pub const MAX_PATTERN_LENGTH: usize = 200;

/// Longest line a screened pattern is ever matched against. Enforced by the
/// log search engine, documented here because it is what makes the
/// heuristics above survivable when they miss a pathological pattern.
pub const MAX_LINE_LENGTH: usize = 10_000;

/// Why a pattern was refused. Always a value the caller can act on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternRejection {
    #[error("pattern is {0} characters long (limit {MAX_PATTERN_LENGTH})")]
    TooLong(usize),

    #[error("pattern is structurally unsafe: {0}")]
    Unsafe(&'static str),

    #[error("invalid expression: {0}")]
    Invalid(String),
}

/// A pattern that passed screening and compiled. Constructing one through
/// [`screen_pattern`] is the only way to get a live matcher for caller input.
#[derive(Debug, Clone)]
pub struct ScreenedPattern {
    regex: Regex,
}

impl PartialEq for ScreenedPattern {
    fn eq(&self, other: &Self) -> bool {
        self.regex.as_str() == other.regex.as_str()
    }
}

impl Eq for ScreenedPattern {}

impl ScreenedPattern {
    pub fn as_regex(&self) -> &Regex {
        &self.regex
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Screen a caller-supplied pattern, compiling it only if the structural
/// checks pass.
pub fn screen_pattern(pattern: &str) -> Result<ScreenedPattern, PatternRejection> {
    let length = pattern.chars().count();
    if length > MAX_PATTERN_LENGTH {
        return Err(PatternRejection::TooLong(length));
    }

    if has_nested_quantifiers(pattern) {
        return Err(PatternRejection::Unsafe(
            "a quantified group contains another quantifier (e.g. `(a+)+`)",
        ));
    }

    if has_wildcard_run(pattern) {
        return Err(PatternRejection::Unsafe(
            "three or more consecutive `.*`/`.+` wildcards",
        ));
    }

    if has_quantified_alternation(pattern) {
        return Err(PatternRejection::Unsafe(
            "a quantified group contains an alternation (e.g. `(a|b)+`)",
        ));
    }

    let regex = Regex::new(pattern).map_err(|err| PatternRejection::Invalid(err.to_string()))?;
    Ok(ScreenedPattern { regex })
}

/// Per-character scanner state shared by the structural checks: tracks
/// escapes and character classes so metacharacters inside `[...]` or after
/// `\` are not misread as structure.
struct Scan<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    in_class: bool,
}

impl<'a> Scan<'a> {
    fn new(pattern: &'a str) -> Self {
        Self {
            chars: pattern.chars().peekable(),
            in_class: false,
        }
    }

    /// Next structurally significant character, skipping escaped characters
    /// and the contents of character classes.
    fn next_significant(&mut self) -> Option<char> {
        loop {
            let c = self.chars.next()?;
            match c {
                '\\' => {
                    self.chars.next();
                }
                '[' if !self.in_class => self.in_class = true,
                ']' if self.in_class => self.in_class = false,
                _ if self.in_class => {}
                _ => return Some(c),
            }
        }
    }

    fn peek_is_quantifier(&mut self) -> bool {
        matches!(self.chars.peek(), Some(&('+' | '*' | '?' | '{')))
    }

    /// Skip a group-modifier `?` right after `(` (as in `(?:` / `(?P<`) so
    /// it is not counted as a quantifier.
    fn skip_group_modifier(&mut self) {
        if self.chars.peek() == Some(&'?') {
            self.chars.next();
        }
    }
}

/// A quantified group containing another quantified sub-expression, the
/// classic `(a+)+` shape.
fn has_nested_quantifiers(pattern: &str) -> bool {
    let mut scan = Scan::new(pattern);
    // One flag per open group: does it contain a quantifier?
    let mut groups: Vec<bool> = Vec::new();

    while let Some(c) = scan.next_significant() {
        match c {
            '(' => {
                groups.push(false);
                scan.skip_group_modifier();
            }
            ')' => {
                let inner_quantified = groups.pop().unwrap_or(false);
                if inner_quantified && scan.peek_is_quantifier() {
                    return true;
                }
            }
            // A quantifier anywhere inside a group quantifies every group
            // enclosing it, so mark them all.
            '+' | '*' | '?' | '{' => {
                for group in &mut groups {
                    *group = true;
                }
            }
            _ => {}
        }
    }
    false
}

/// Three or more back-to-back unbounded wildcards (`.*.*.*`, `.+.+.+`, or a
/// mix), which multiply backtracking positions on long lines.
fn has_wildcard_run(pattern: &str) -> bool {
    let bytes = pattern.as_bytes();
    let mut run = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            run = 0;
            continue;
        }
        if bytes[i] == b'.' && matches!(bytes.get(i + 1), Some(&(b'*' | b'+'))) {
            run += 1;
            if run >= 3 {
                return true;
            }
            i += 2;
        } else {
            run = 0;
            i += 1;
        }
    }
    false
}

/// A quantified group whose body contains a top-level alternation, the
/// `(a|b)+` shape.
fn has_quantified_alternation(pattern: &str) -> bool {
    let mut scan = Scan::new(pattern);
    // One flag per open group: does it contain a top-level `|`?
    let mut groups: Vec<bool> = Vec::new();

    while let Some(c) = scan.next_significant() {
        match c {
            '(' => {
                groups.push(false);
                scan.skip_group_modifier();
            }
            '|' => {
                if let Some(top) = groups.last_mut() {
                    *top = true;
                }
            }
            ')' => {
                let has_alternation = groups.pop().unwrap_or(false);
                if has_alternation && matches!(scan.chars.peek(), Some(&('+' | '*' | '{'))) {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}
