//! Symbol name patterns.
//!
//! A pattern is either a bare name (`handle_*`) matched against a
//! symbol's own name, or a dotted `Class.member` pair matched
//! against a method and its enclosing class. `*` is the only
//! metacharacter and always matches the whole name.

use std::fmt;

/// Wildcard character recognised in patterns.
pub const WILDCARD: char = '*';

/// One user supplied symbol pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPattern
{
    /// Matches any top-level symbol or method by its own name.
    Plain(String),

    /// Matches methods only; an empty half means "any".
    Dotted
    {
        container: String,
        member: String,
    },
}

impl QueryPattern
{
    /// Parse a pattern, splitting at the first `.`.
    pub fn parse(raw: &str) -> Self
    {
        match raw.split_once('.')
        {
            Some((container, member)) => Self::Dotted {
                container: container.to_string(),
                member: member.to_string(),
            },
            None => Self::Plain(raw.to_string()),
        }
    }

    /// Decide whether a candidate with `name`, defined inside
    /// `class_name` (None for top-level), satisfies this pattern.
    pub fn matches(
        &self,
        name: &str,
        class_name: Option<&str>,
    ) -> bool
    {
        match self
        {
            Self::Plain(pattern) => glob_match(pattern, name),
            Self::Dotted { container, member } =>
            {
                let Some(class_name) = class_name
                else
                {
                    return false;
                };
                half_matches(container, class_name) && half_matches(member, name)
            }
        }
    }
}

impl fmt::Display for QueryPattern
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        match self
        {
            Self::Plain(p) => f.write_str(p),
            Self::Dotted { container, member } => write!(f, "{container}.{member}"),
        }
    }
}

/// Set of patterns, OR'd together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternSet
{
    patterns: Vec<QueryPattern>,
}

impl PatternSet
{
    /// Build from raw strings as typed by the user.
    pub fn new<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: raw
                .into_iter()
                .map(|s| QueryPattern::parse(s.as_ref()))
                .collect(),
        }
    }

    /// True if any pattern accepts the candidate.
    pub fn matches(
        &self,
        name: &str,
        class_name: Option<&str>,
    ) -> bool
    {
        self.patterns
            .iter()
            .any(|p| p.matches(name, class_name))
    }
}

/// Empty halves of a dotted pattern accept anything.
fn half_matches(
    pattern: &str,
    text: &str,
) -> bool
{
    pattern.is_empty() || glob_match(pattern, text)
}

/// Anchored glob where `*` matches any run of characters
/// (including none). Without `*` this is plain equality.
pub fn glob_match(
    pattern: &str,
    text: &str,
) -> bool
{
    if !pattern.contains(WILDCARD)
    {
        return pattern == text;
    }

    let p: Vec<char> = pattern
        .chars()
        .collect();
    let t: Vec<char> = text
        .chars()
        .collect();

    // Greedy scan with single backtrack point (last '*').
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut resume = 0usize;

    while ti < t.len()
    {
        if pi < p.len() && p[pi] == WILDCARD
        {
            star = Some(pi);
            resume = ti;
            pi += 1;
        }
        else if pi < p.len() && p[pi] == t[ti]
        {
            pi += 1;
            ti += 1;
        }
        else if let Some(s) = star
        {
            pi = s + 1;
            resume += 1;
            ti = resume;
        }
        else
        {
            return false;
        }
    }

    // Only trailing stars may remain.
    p[pi..]
        .iter()
        .all(|&c| c == WILDCARD)
}
