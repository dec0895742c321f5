//! Label-wise patterns shared by the server name and ALPN criteria.
//!
//! A pattern is split on `.` into labels. A value matches when it has the
//! same number of labels and each label is equal to the pattern's, or the
//! pattern label is `*`, which stands for exactly one non-empty label.
//!
//! | Pattern         | Matches           | Does not match                  |
//! |-----------------|-------------------|---------------------------------|
//! | `example.com`   | `example.com`     | `www.example.com`               |
//! | `*.example.com` | `www.example.com` | `example.com`, `a.b.example.com` |
//! | `h3`            | `h3`              | `h3-29`                         |
//! | `*`             | `h3`, `localhost` | `http/1.1`, `example.com`       |

use std::fmt;

use thiserror::Error;

/// How literal labels are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMode {
    /// ASCII case-insensitive (host names)
    Insensitive,
    /// Byte-exact (protocol identifiers)
    Sensitive,
}

/// Reason a pattern was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern is empty")]
    Empty,
    #[error("pattern contains an empty label")]
    EmptyLabel,
    #[error("wildcard must be a whole label")]
    PartialWildcard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Label {
    Any,
    Literal(String),
}

/// A compiled match pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    labels: Vec<Label>,
}

impl Pattern {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// Returns `PatternError` for an empty pattern, an empty label (as in
    /// `a..b` or `example.com.`), or a `*` mixed with other characters.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }

        let labels = pattern
            .split('.')
            .map(|label| match label {
                "" => Err(PatternError::EmptyLabel),
                "*" => Ok(Label::Any),
                l if l.contains('*') => Err(PatternError::PartialWildcard),
                l => Ok(Label::Literal(l.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            source: pattern.to_string(),
            labels,
        })
    }

    /// Pattern as written
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Test `value` against this pattern
    #[must_use]
    pub fn matches(&self, value: &str, case: CaseMode) -> bool {
        let mut values = value.split('.');

        for label in &self.labels {
            let Some(v) = values.next() else {
                return false;
            };
            let ok = match label {
                Label::Any => !v.is_empty(),
                Label::Literal(l) => match case {
                    CaseMode::Insensitive => l.eq_ignore_ascii_case(v),
                    CaseMode::Sensitive => l == v,
                },
            };
            if !ok {
                return false;
            }
        }

        values.next().is_none()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
