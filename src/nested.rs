//! Nested path engine: address, project, and edit values deep inside a
//! JSON tree.
//!
//! A path is a dot-separated sequence of fragments: a bare or quoted string
//! names an object key, an integer (negative allowed) names a list index
//! counted from the end, and a bracketed group (`[...]` or `(...)`) fans
//! out over every element of a list, applying its inner path to each. An
//! empty group (`[]`) selects the elements themselves. Groups terminate
//! their sequence: nothing may follow one, a rule enforced when the path is
//! parsed, before any data is touched.
//!
//! ```
//! use recordpipe::nested::{Missing, Nested};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), recordpipe::NestedError> {
//! let path: Nested = "a.c.[d]".parse()?;
//! let data = json!({"a": {"b": 3, "c": [{"d": 4}, {"d": 5}]}});
//! assert_eq!(path.select(&data, Missing::Raise)?, json!([4, 5]));
//! assert_eq!(path.copy(&data, Missing::Raise)?, json!({"a": {"c": [{"d": 4}, {"d": 5}]}}));
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::mem;
use std::str::FromStr;

use serde_json::Value;

use crate::error::NestedError;
use crate::record::value_kind;

/// One step of a nested path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// An object key.
    Key(String),
    /// A list index; negative values count from the end.
    Index(i64),
    /// A fan-out over every element of a list, applying the inner path to
    /// each. Always the last fragment of its sequence.
    Wildcard(Vec<Fragment>),
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fragment::Key(key) if needs_quoting(key) => write!(f, "\"{key}\""),
            Fragment::Key(key) => f.write_str(key),
            Fragment::Index(index) => write!(f, "{index}"),
            Fragment::Wildcard(inner) => write!(f, "[{}]", render(inner)),
        }
    }
}

/// Policy for locations a path names but the data does not have: a missing
/// key, an out-of-range index, or a container of the wrong kind.
///
/// The default behavior ([`Missing::Raise`]) is a typed [`NestedError`].
/// The tolerant policies substitute a stand-in value in `copy`/`select`;
/// in `edit` there is nothing to write through, so the location is skipped.
#[derive(Clone, Copy, Default)]
pub enum Missing<'a> {
    /// Fail with the error describing what was missing.
    #[default]
    Raise,
    /// Substitute [`Value::Null`].
    Null,
    /// Substitute the value produced by the callback, which receives the
    /// path fragments that remain below the unreachable location.
    With(&'a dyn Fn(&[Fragment]) -> Value),
}

impl Missing<'_> {
    fn substitute(&self, rest: &[Fragment]) -> Option<Value> {
        match self {
            Missing::Raise => None,
            Missing::Null => Some(Value::Null),
            Missing::With(f) => Some(f(rest)),
        }
    }
}

impl fmt::Debug for Missing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Raise => f.write_str("Raise"),
            Missing::Null => f.write_str("Null"),
            Missing::With(_) => f.write_str("With(..)"),
        }
    }
}

/// A parsed, validated nested path.
///
/// Parse once with [`Nested::parse`] (or `str::parse`), then traverse any
/// number of values with it. An empty path addresses the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nested {
    fragments: Vec<Fragment>,
}

impl Nested {
    /// Build a path from already-constructed fragments, validating that no
    /// fragment follows a wildcard group at any nesting depth.
    pub fn new(fragments: Vec<Fragment>) -> Result<Self, NestedError> {
        validate(&fragments)?;
        Ok(Self { fragments })
    }

    /// Parse a path from its string form.
    pub fn parse(key: &str) -> Result<Self, NestedError> {
        let mut parser = Parser::new(key);
        let fragments = parser.sequence(None)?;
        Ok(Self { fragments })
    }

    /// The path's fragments in order.
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Number of top-level fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Whether the path is empty (addresses the root).
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Canonical string form; reparsing it yields an equal path. Keys that
    /// would be misread bare (reserved characters, integer lookalikes) come
    /// out quoted.
    pub fn to_str(&self) -> String {
        render(&self.fragments)
    }

    /// Apply `f` in place to every value the path addresses.
    pub fn edit(
        &self,
        data: &mut Value,
        mut f: impl FnMut(Value) -> Value,
        missing: Missing<'_>,
    ) -> Result<(), NestedError> {
        edit_at(&self.fragments, data, &mut f, missing)
    }

    /// Non-destructive [`Nested::edit`]: clone the tree, apply `f` to the
    /// addressed values in the clone, and return it.
    pub fn edited(
        &self,
        data: &Value,
        f: impl FnMut(Value) -> Value,
        missing: Missing<'_>,
    ) -> Result<Value, NestedError> {
        let mut out = data.clone();
        self.edit(&mut out, f, missing)?;
        Ok(out)
    }

    /// Project the tree down to only the traversed paths, preserving the
    /// surrounding shape (object keys and list nesting).
    pub fn copy(&self, data: &Value, missing: Missing<'_>) -> Result<Value, NestedError> {
        get_at(&self.fragments, data, false, missing)
    }

    /// Extract the addressed values without the surrounding shape: a
    /// wildcard path yields one flat array of matched leaves, a plain path
    /// yields the leaf itself.
    pub fn select(&self, data: &Value, missing: Missing<'_>) -> Result<Value, NestedError> {
        get_at(&self.fragments, data, true, missing)
    }
}

impl fmt::Display for Nested {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str())
    }
}

impl FromStr for Nested {
    type Err = NestedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Nested::parse(s)
    }
}

fn render(fragments: &[Fragment]) -> String {
    let parts: Vec<String> = fragments.iter().map(Fragment::to_string).collect();
    parts.join(".")
}

/// A bare fragment with this spelling would parse as an integer index.
fn looks_like_index(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn needs_quoting(key: &str) -> bool {
    key.is_empty()
        || looks_like_index(key)
        || key.contains(['.', '[', ']', '(', ')', '"', '\''])
}

fn validate(fragments: &[Fragment]) -> Result<(), NestedError> {
    for (i, fragment) in fragments.iter().enumerate() {
        if let Fragment::Wildcard(inner) = fragment {
            if i + 1 != fragments.len() {
                return Err(NestedError::Parse {
                    key: render(fragments),
                    position: 0,
                    message: "no fragment may follow a wildcard group".to_string(),
                });
            }
            validate(inner)?;
        }
    }
    Ok(())
}

struct Parser<'s> {
    src: &'s str,
    chars: std::iter::Peekable<std::str::CharIndices<'s>>,
}

impl<'s> Parser<'s> {
    fn new(src: &'s str) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    /// Byte offset of the next character, or the end of input.
    fn pos(&mut self) -> usize {
        self.chars.peek().map(|&(i, _)| i).unwrap_or(self.src.len())
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        self.chars.next()
    }

    fn error(&self, position: usize, message: impl Into<String>) -> NestedError {
        NestedError::Parse {
            key: self.src.to_string(),
            position,
            message: message.into(),
        }
    }

    /// Parse a dot-separated fragment sequence up to `close` (a bracketed
    /// group) or the end of input (the whole path).
    fn sequence(&mut self, close: Option<char>) -> Result<Vec<Fragment>, NestedError> {
        let mut fragments = Vec::new();
        if let Some(want) = close {
            // empty group: every element, path ends here
            if self.peek() == Some(want) {
                self.bump();
                return Ok(fragments);
            }
        }
        loop {
            let fragment = self.fragment()?;
            let was_wildcard = matches!(fragment, Fragment::Wildcard(_));
            fragments.push(fragment);
            match (self.peek(), close) {
                (Some('.'), _) => {
                    if was_wildcard {
                        let pos = self.pos();
                        return Err(self.error(pos, "no fragment may follow a wildcard group"));
                    }
                    self.bump();
                }
                (Some(c), Some(want)) if c == want => {
                    self.bump();
                    return Ok(fragments);
                }
                (None, None) => return Ok(fragments),
                (None, Some(want)) => {
                    let pos = self.pos();
                    return Err(
                        self.error(pos, format!("unexpected end of path, expected '{want}'"))
                    );
                }
                (Some(c), _) => {
                    let pos = self.pos();
                    return Err(self.error(pos, format!("unexpected character '{c}'")));
                }
            }
        }
    }

    fn fragment(&mut self) -> Result<Fragment, NestedError> {
        let Some((start, first)) = self.bump() else {
            return Err(self.error(self.src.len(), "expected a path fragment"));
        };
        match first {
            '[' => Ok(Fragment::Wildcard(self.sequence(Some(']'))?)),
            '(' => Ok(Fragment::Wildcard(self.sequence(Some(')'))?)),
            quote @ ('"' | '\'') => {
                let mut key = String::new();
                loop {
                    match self.bump() {
                        Some((_, c)) if c == quote => return Ok(Fragment::Key(key)),
                        Some((_, c)) => key.push(c),
                        None => return Err(self.error(start, "unterminated quoted key")),
                    }
                }
            }
            '.' | ']' | ')' => Err(self.error(start, format!("unexpected '{first}'"))),
            _ => {
                let mut text = String::new();
                text.push(first);
                while let Some(c) = self.peek() {
                    match c {
                        '.' | ']' | ')' => break,
                        '[' | '(' | '"' | '\'' => {
                            let pos = self.pos();
                            return Err(self.error(
                                pos,
                                format!("unexpected character '{c}' inside a fragment"),
                            ));
                        }
                        _ => {
                            text.push(c);
                            self.bump();
                        }
                    }
                }
                if looks_like_index(&text) {
                    text.parse::<i64>().map(Fragment::Index).map_err(|_| {
                        self.error(start, format!("integer index '{text}' out of range"))
                    })
                } else {
                    Ok(Fragment::Key(text))
                }
            }
        }
    }
}

fn wrong_container(expected: &'static str, found: &Value, fragment: &Fragment) -> NestedError {
    NestedError::WrongContainer {
        expected,
        found: value_kind(found),
        fragment: fragment.to_string(),
    }
}

/// Resolve a possibly negative index against a list length.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    if index >= 0 {
        let idx = index as usize;
        (idx < len).then_some(idx)
    } else {
        let back = index.unsigned_abs() as usize;
        (back <= len).then(|| len - back)
    }
}

fn edit_at(
    fragments: &[Fragment],
    data: &mut Value,
    f: &mut dyn FnMut(Value) -> Value,
    missing: Missing<'_>,
) -> Result<(), NestedError> {
    let Some((this, rest)) = fragments.split_first() else {
        *data = f(mem::take(data));
        return Ok(());
    };
    match this {
        Fragment::Wildcard(inner) => match data {
            Value::Array(items) => {
                if inner.is_empty() {
                    for item in items {
                        *item = f(mem::take(item));
                    }
                } else {
                    for item in items {
                        edit_at(inner, item, f, missing)?;
                    }
                }
                Ok(())
            }
            other => match missing {
                Missing::Raise => Err(wrong_container("array", other, this)),
                _ => Ok(()),
            },
        },
        Fragment::Index(index) => match data {
            Value::Array(items) => match resolve_index(*index, items.len()) {
                Some(idx) => edit_at(rest, &mut items[idx], f, missing),
                None => match missing {
                    Missing::Raise => Err(NestedError::IndexOutOfRange {
                        index: *index,
                        len: items.len(),
                    }),
                    _ => Ok(()),
                },
            },
            other => match missing {
                Missing::Raise => Err(wrong_container("array", other, this)),
                _ => Ok(()),
            },
        },
        Fragment::Key(key) => match data {
            Value::Object(map) => match map.get_mut(key) {
                Some(slot) => edit_at(rest, slot, f, missing),
                None => match missing {
                    Missing::Raise => Err(NestedError::KeyNotFound { key: key.clone() }),
                    _ => Ok(()),
                },
            },
            other => match missing {
                Missing::Raise => Err(wrong_container("object", other, this)),
                _ => Ok(()),
            },
        },
    }
}

fn get_at(
    fragments: &[Fragment],
    data: &Value,
    flat: bool,
    missing: Missing<'_>,
) -> Result<Value, NestedError> {
    let Some((this, rest)) = fragments.split_first() else {
        return Ok(data.clone());
    };
    match this {
        Fragment::Wildcard(inner) => {
            let branches = match data {
                Value::Array(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        out.push(get_at(inner, item, flat, missing)?);
                    }
                    out
                }
                other => match missing.substitute(rest) {
                    Some(stand_in) => vec![get_at(inner, &stand_in, flat, missing)?],
                    None => return Err(wrong_container("array", other, this)),
                },
            };
            if flat {
                // concatenate the per-element results into one flat array
                let mut flattened = Vec::new();
                for branch in branches {
                    match branch {
                        Value::Array(values) => flattened.extend(values),
                        leaf => flattened.push(leaf),
                    }
                }
                Ok(Value::Array(flattened))
            } else {
                Ok(Value::Array(branches))
            }
        }
        Fragment::Index(index) => {
            let below = match data {
                Value::Array(items) => match resolve_index(*index, items.len()) {
                    Some(idx) => get_at(rest, &items[idx], flat, missing)?,
                    None => match missing.substitute(rest) {
                        Some(stand_in) => get_at(rest, &stand_in, flat, missing)?,
                        None => {
                            return Err(NestedError::IndexOutOfRange {
                                index: *index,
                                len: items.len(),
                            });
                        }
                    },
                },
                other => match missing.substitute(rest) {
                    Some(stand_in) => get_at(rest, &stand_in, flat, missing)?,
                    None => return Err(wrong_container("array", other, this)),
                },
            };
            if flat {
                Ok(below)
            } else {
                Ok(Value::Array(vec![below]))
            }
        }
        Fragment::Key(key) => {
            let below = match data {
                Value::Object(map) => match map.get(key) {
                    Some(value) => get_at(rest, value, flat, missing)?,
                    None => match missing.substitute(rest) {
                        Some(stand_in) => get_at(rest, &stand_in, flat, missing)?,
                        None => return Err(NestedError::KeyNotFound { key: key.clone() }),
                    },
                },
                other => match missing.substitute(rest) {
                    Some(stand_in) => get_at(rest, &stand_in, flat, missing)?,
                    None => return Err(wrong_container("object", other, this)),
                },
            };
            if flat {
                Ok(below)
            } else {
                let mut wrapped = serde_json::Map::new();
                wrapped.insert(key.clone(), below);
                Ok(Value::Object(wrapped))
            }
        }
    }
}
