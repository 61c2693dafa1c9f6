use std::collections::HashMap;
use std::sync::RwLock;

use crate::models::{Identifier, Value};

use regex::Regex;

/// The boolean combinator of a composite criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeOp {
    And,
    Or,
    Not,
}

/// A query predicate over an element's live property values.
///
/// Evaluation never fails: a criterion applied to a value of the wrong
/// shape (a range over a string, a regex over a number) simply contributes
/// false.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    /// Any live value for `key` equals `value`.
    Exact { key: Identifier, value: Value },
    /// Any live numeric value for `key` lies in the interval. Defaults are
    /// min-inclusive, max-exclusive.
    Range {
        key: Identifier,
        min: Option<Value>,
        max: Option<Value>,
        include_min: bool,
        include_max: bool,
    },
    /// At least one live value for `key`.
    Exists { key: Identifier },
    /// No live value for `key`.
    NotExists { key: Identifier },
    /// Substring match on string values, or element containment on list and
    /// set values.
    Contains {
        key: Identifier,
        substring: Option<String>,
        element: Option<Value>,
        ignore_case: bool,
    },
    /// Full regex match on string values.
    Regex { key: Identifier, pattern: String },
    /// A short-circuiting boolean combination. `Not` takes exactly one
    /// child; evaluation treats any other arity as false.
    Composite { op: CompositeOp, children: Vec<Criterion> },
}

impl Criterion {
    pub fn exact(key: Identifier, value: impl Into<Value>) -> Self {
        Criterion::Exact {
            key,
            value: value.into(),
        }
    }

    /// A range with the default `[min, max)` bounds.
    pub fn range(key: Identifier, min: Option<Value>, max: Option<Value>) -> Self {
        Criterion::Range {
            key,
            min,
            max,
            include_min: true,
            include_max: false,
        }
    }

    pub fn range_with(
        key: Identifier,
        min: Option<Value>,
        max: Option<Value>,
        include_min: bool,
        include_max: bool,
    ) -> Self {
        Criterion::Range {
            key,
            min,
            max,
            include_min,
            include_max,
        }
    }

    pub fn exists(key: Identifier) -> Self {
        Criterion::Exists { key }
    }

    pub fn not_exists(key: Identifier) -> Self {
        Criterion::NotExists { key }
    }

    pub fn contains_substring(key: Identifier, substring: impl Into<String>, ignore_case: bool) -> Self {
        Criterion::Contains {
            key,
            substring: Some(substring.into()),
            element: None,
            ignore_case,
        }
    }

    pub fn contains_element(key: Identifier, element: impl Into<Value>) -> Self {
        Criterion::Contains {
            key,
            substring: None,
            element: Some(element.into()),
            ignore_case: false,
        }
    }

    pub fn regex(key: Identifier, pattern: impl Into<String>) -> Self {
        Criterion::Regex {
            key,
            pattern: pattern.into(),
        }
    }

    pub fn and(children: Vec<Criterion>) -> Self {
        Criterion::Composite {
            op: CompositeOp::And,
            children,
        }
    }

    pub fn or(children: Vec<Criterion>) -> Self {
        Criterion::Composite {
            op: CompositeOp::Or,
            children,
        }
    }

    pub fn not(child: Criterion) -> Self {
        Criterion::Composite {
            op: CompositeOp::Not,
            children: vec![child],
        }
    }

    /// The key this criterion constrains, if it is a leaf.
    pub fn key(&self) -> Option<&Identifier> {
        match self {
            Criterion::Exact { key, .. }
            | Criterion::Range { key, .. }
            | Criterion::Exists { key }
            | Criterion::NotExists { key }
            | Criterion::Contains { key, .. }
            | Criterion::Regex { key, .. } => Some(key),
            Criterion::Composite { .. } => None,
        }
    }

    /// Collects every key mentioned anywhere in the tree.
    pub fn collect_keys(&self, out: &mut Vec<Identifier>) {
        match self {
            Criterion::Composite { children, .. } => {
                for child in children {
                    child.collect_keys(out);
                }
            }
            _ => {
                if let Some(key) = self.key() {
                    out.push(key.clone());
                }
            }
        }
    }
}

/// Compiled-regex memo shared by every evaluation against one graph. A
/// pattern that fails to compile is remembered as such and always
/// evaluates to false.
#[derive(Debug, Default)]
pub(crate) struct RegexCache {
    compiled: RwLock<HashMap<String, Option<Regex>>>,
}

impl RegexCache {
    /// Whether `text` fully matches `pattern`.
    pub fn is_full_match(&self, pattern: &str, text: &str) -> bool {
        {
            let cache = self.compiled.read().unwrap();
            if let Some(entry) = cache.get(pattern) {
                return entry.as_ref().map_or(false, |re| re.is_match(text));
            }
        }

        let compiled = Regex::new(&format!(r"\A(?:{})\z", pattern)).ok();
        let matched = compiled.as_ref().map_or(false, |re| re.is_match(text));
        self.compiled
            .write()
            .unwrap()
            .insert(pattern.to_string(), compiled);
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::{Criterion, RegexCache};
    use crate::models::{Identifier, Value};

    #[test]
    fn should_collect_keys_recursively() {
        let name = Identifier::new("name").unwrap();
        let age = Identifier::new("age").unwrap();
        let criterion = Criterion::and(vec![
            Criterion::exact(name.clone(), "alice"),
            Criterion::not(Criterion::range(age.clone(), Some(Value::from(10i64)), None)),
        ]);

        let mut keys = Vec::new();
        criterion.collect_keys(&mut keys);
        assert_eq!(keys, vec![name, age]);
    }

    #[test]
    fn should_anchor_regex_matches() {
        let cache = RegexCache::default();
        assert!(cache.is_full_match("al.*", "alice"));
        assert!(!cache.is_full_match("al", "alice"));
        assert!(!cache.is_full_match("(unclosed", "anything"));
        // The broken pattern is memoized as unusable
        assert!(!cache.is_full_match("(unclosed", "anything"));
    }
}
