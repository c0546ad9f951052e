//! Composite identifiers used as row/column labels.
//!
//! A [`Label`] is an ordered tuple of one or more [`KeyPart`]s. A foreground
//! process may be keyed by its numeric id alone (`(10005,)`), by name and id
//! (`("s+orm", 10005)`), and an IO sector by region and sector
//! (`("reg2", "transport")`). Labels compare structurally, so the same type
//! serves processes, sectors, stressors and impact categories.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// One scalar component of a label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPart {
    Int(i64),
    Text(String),
}

impl KeyPart {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            KeyPart::Int(v) => Some(*v),
            KeyPart::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            KeyPart::Int(_) => None,
            KeyPart::Text(s) => Some(s),
        }
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Int(v) => write!(f, "{}", v),
            KeyPart::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for KeyPart {
    fn from(v: i64) -> Self {
        KeyPart::Int(v)
    }
}

impl From<i32> for KeyPart {
    fn from(v: i32) -> Self {
        KeyPart::Int(v as i64)
    }
}

impl From<&str> for KeyPart {
    fn from(s: &str) -> Self {
        KeyPart::Text(s.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(s: String) -> Self {
        KeyPart::Text(s)
    }
}

/// Ordered composite identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(SmallVec<[KeyPart; 3]>);

impl Label {
    pub fn new<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<KeyPart>,
    {
        Label(parts.into_iter().map(Into::into).collect())
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    /// The sector component of the label: its last key part.
    ///
    /// For `("reg1", "food")` this is `food`; for single-field labels it is
    /// the only field.
    pub fn sector(&self) -> Option<&KeyPart> {
        self.0.last()
    }

    /// True when the sector component is the text `name`.
    pub fn has_sector(&self, name: &str) -> bool {
        matches!(self.sector(), Some(KeyPart::Text(s)) if s == name)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() == 1 {
            return write!(f, "{}", self.0[0]);
        }
        write!(f, "(")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", part)?;
        }
        write!(f, ")")
    }
}

impl From<KeyPart> for Label {
    fn from(part: KeyPart) -> Self {
        Label::new([part])
    }
}

impl From<i64> for Label {
    fn from(v: i64) -> Self {
        Label::new([v])
    }
}

impl From<i32> for Label {
    fn from(v: i32) -> Self {
        Label::new([v])
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label::new([s])
    }
}

impl<A, B> From<(A, B)> for Label
where
    A: Into<KeyPart>,
    B: Into<KeyPart>,
{
    fn from((a, b): (A, B)) -> Self {
        Label(SmallVec::from_iter([a.into(), b.into()]))
    }
}

impl<A, B, C> From<(A, B, C)> for Label
where
    A: Into<KeyPart>,
    B: Into<KeyPart>,
    C: Into<KeyPart>,
{
    fn from((a, b, c): (A, B, C)) -> Self {
        Label(SmallVec::from_iter([a.into(), b.into(), c.into()]))
    }
}
