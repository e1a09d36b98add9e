//! Shell-style glob patterns for output names
//!
//! Supported syntax:
//! - `*` matches any run of characters except `/`
//! - `?` matches one character except `/`
//! - `[abc]`, `[a-z]`, `[^a-z]` / `[!a-z]` character classes
//! - `\x` matches `x` literally
//!
//! Patterns are compiled once; a syntax error is reported by [`Pattern::new`].

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("unterminated character class")]
    UnclosedClass,

    #[error("empty character class")]
    EmptyClass,

    #[error("bad range in character class")]
    BadRange,

    #[error("trailing backslash")]
    TrailingEscape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClassItem {
    Char(char),
    Range(char, char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyOne,
    Star,
    Class { negated: bool, items: Vec<ClassItem> },
}

impl Token {
    fn matches(&self, c: char) -> bool {
        match self {
            Token::Literal(l) => *l == c,
            Token::AnyOne => c != '/',
            Token::Star => false,
            Token::Class { negated, items } => {
                let hit = items.iter().any(|item| match *item {
                    ClassItem::Char(x) => x == c,
                    ClassItem::Range(lo, hi) => lo <= c && c <= hi,
                });
                hit != *negated
            }
        }
    }
}

/// A compiled glob pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    tokens: Vec<Token>,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let mut tokens = Vec::new();
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            let token = match c {
                '*' => {
                    // Consecutive stars are one star
                    if tokens.last() == Some(&Token::Star) {
                        continue;
                    }
                    Token::Star
                }
                '?' => Token::AnyOne,
                '\\' => Token::Literal(chars.next().ok_or(PatternError::TrailingEscape)?),
                '[' => {
                    let negated = matches!(chars.peek(), Some('^') | Some('!'));
                    if negated {
                        chars.next();
                    }
                    let mut items = Vec::new();
                    loop {
                        let lo = match chars.next() {
                            None => return Err(PatternError::UnclosedClass),
                            Some(']') if items.is_empty() => return Err(PatternError::EmptyClass),
                            Some(']') => break,
                            Some('-') => return Err(PatternError::BadRange),
                            Some('\\') => chars.next().ok_or(PatternError::TrailingEscape)?,
                            Some(c) => c,
                        };
                        if chars.peek() == Some(&'-') {
                            chars.next();
                            let hi = match chars.next() {
                                None => return Err(PatternError::UnclosedClass),
                                Some(']') | Some('-') => return Err(PatternError::BadRange),
                                Some('\\') => chars.next().ok_or(PatternError::TrailingEscape)?,
                                Some(c) => c,
                            };
                            if hi < lo {
                                return Err(PatternError::BadRange);
                            }
                            items.push(ClassItem::Range(lo, hi));
                        } else {
                            items.push(ClassItem::Char(lo));
                        }
                    }
                    Token::Class { negated, items }
                }
                c => Token::Literal(c),
            };
            tokens.push(token);
        }

        Ok(Self { tokens })
    }

    /// True if the whole of `text` matches the pattern.
    pub fn matches(&self, text: &str) -> bool {
        let text: Vec<char> = text.chars().collect();
        let (mut p, mut t) = (0, 0);
        // Resume point after the most recent star: (pattern index, text index)
        let mut resume: Option<(usize, usize)> = None;

        while t < text.len() {
            match self.tokens.get(p) {
                Some(Token::Star) => {
                    resume = Some((p + 1, t));
                    p += 1;
                    continue;
                }
                Some(token) if token.matches(text[t]) => {
                    p += 1;
                    t += 1;
                    continue;
                }
                _ => {}
            }

            match resume {
                // Let the star swallow one more character, never a separator
                Some((rp, rt)) if text[rt] != '/' => {
                    resume = Some((rp, rt + 1));
                    p = rp;
                    t = rt + 1;
                }
                _ => return false,
            }
        }

        self.tokens[p..].iter().all(|token| *token == Token::Star)
    }
}
