//! Ordered, keyed collections of nodes.
//!
//! [`Collection`] is the shared container behind file and page collections:
//! an insertion-ordered map from a string key to a cheaply clonable node.
//! Every derived operation (`filter_by`, `sort_by`, `not`, `slice`, ...)
//! returns a new collection; the receiver is never modified.

use indexmap::IndexMap;
use std::cmp::Ordering;

/// A node that can live in a [`Collection`].
pub trait Entry: Clone {
    /// Unique key within a collection.
    fn key(&self) -> String;
    /// String value of a named field, used for filtering and sorting.
    fn field(&self, name: &str) -> Option<String>;
}

impl<T: Entry> Entry for std::rc::Rc<T> {
    fn key(&self) -> String {
        (**self).key()
    }

    fn field(&self, name: &str) -> Option<String> {
        (**self).field(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Digit runs compare by value, letters case-insensitively (`2` < `10`).
    #[default]
    Natural,
    /// Plain byte-wise string comparison.
    Regular,
}

/// Comparison used by [`Collection::filter_by_op`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// `==`: exact match.
    Eq,
    /// `!=`: anything but an exact match (missing fields included).
    Ne,
    /// `*=`: the field is a comma-separated list containing the value.
    In,
}

#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: IndexMap<String, T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: IndexMap::new(),
        }
    }
}

impl<T: Entry> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(|item| (item.key(), item)).collect(),
        }
    }
}

impl<T: Entry> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap entries whose keys are already known.
    pub fn from_map(items: IndexMap<String, T>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.items.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    /// The underlying ordered map.
    pub fn as_map(&self) -> &IndexMap<String, T> {
        &self.items
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.items.values().cloned().collect()
    }

    pub fn first(&self) -> Option<T> {
        self.items.first().map(|(_, v)| v.clone())
    }

    pub fn last(&self) -> Option<T> {
        self.items.last().map(|(_, v)| v.clone())
    }

    pub fn nth(&self, n: usize) -> Option<T> {
        self.items.get_index(n).map(|(_, v)| v.clone())
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.items.get_index_of(key)
    }

    /// Neighbor before `key` in the current ordering.
    pub fn prev_of(&self, key: &str) -> Option<T> {
        let i = self.index_of(key)?;
        i.checked_sub(1).and_then(|p| self.nth(p))
    }

    /// Neighbor after `key` in the current ordering.
    pub fn next_of(&self, key: &str) -> Option<T> {
        let i = self.index_of(key)?;
        self.nth(i + 1)
    }

    /// Single lookup by key.
    pub fn find(&self, key: &str) -> Option<T> {
        self.items.get(key).cloned()
    }

    /// Sub-collection of every key that exists, in argument order.
    /// `None` when nothing matched.
    pub fn find_many(&self, keys: &[&str]) -> Option<Self> {
        let found: Self = keys.iter().filter_map(|k| self.find(k)).collect();
        (!found.is_empty()).then_some(found)
    }

    pub fn filter(&self, predicate: impl Fn(&T) -> bool) -> Self {
        Self {
            items: self
                .items
                .iter()
                .filter(|(_, v)| predicate(v))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Nodes whose `field` equals `value` exactly.
    pub fn filter_by(&self, field: &str, value: &str) -> Self {
        self.filter_by_op(field, FilterOp::Eq, value)
    }

    /// Nodes whose `field` is one of `values`, in encounter order.
    pub fn filter_by_any(&self, field: &str, values: &[&str]) -> Self {
        self.filter(|item| {
            item.field(field)
                .is_some_and(|v| values.iter().any(|candidate| *candidate == v))
        })
    }

    pub fn filter_by_op(&self, field: &str, op: FilterOp, value: &str) -> Self {
        self.filter(|item| {
            let actual = item.field(field);
            match op {
                FilterOp::Eq => actual.as_deref() == Some(value),
                FilterOp::Ne => actual.as_deref() != Some(value),
                FilterOp::In => actual.is_some_and(|list| {
                    list.split(',').map(str::trim).any(|entry| entry == value)
                }),
            }
        })
    }

    /// Collection without the given keys.
    pub fn not(&self, keys: &[&str]) -> Self {
        self.filter(|item| {
            let key = item.key();
            !keys.iter().any(|k| *k == key)
        })
    }

    /// Stable sort by a field value. Missing fields sort as empty strings.
    pub fn sort_by(&self, field: &str, direction: SortDirection, mode: SortMode) -> Self {
        let mut entries: Vec<(String, String, T)> = self
            .items
            .iter()
            .map(|(k, v)| (v.field(field).unwrap_or_default(), k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| {
            let ord = match mode {
                SortMode::Natural => natural_cmp(&a.0, &b.0),
                SortMode::Regular => a.0.cmp(&b.0),
            };
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
        Self {
            items: entries.into_iter().map(|(_, k, v)| (k, v)).collect(),
        }
    }

    /// Up to `limit` nodes starting at `offset`.
    pub fn slice(&self, offset: usize, limit: Option<usize>) -> Self {
        let limit = limit.unwrap_or(usize::MAX);
        Self {
            items: self
                .items
                .iter()
                .skip(offset)
                .take(limit)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    pub fn limit(&self, limit: usize) -> Self {
        self.slice(0, Some(limit))
    }

    pub fn offset(&self, offset: usize) -> Self {
        self.slice(offset, None)
    }

    /// Reversed order.
    pub fn flip(&self) -> Self {
        Self {
            items: self
                .items
                .iter()
                .rev()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Values of `field` for every node that has it.
    pub fn pluck(&self, field: &str) -> Vec<String> {
        self.items.values().filter_map(|v| v.field(field)).collect()
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = indexmap::map::Values<'a, String, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.values()
    }
}

/// Natural ordering: digit runs compare by numeric value, everything else
/// case-insensitively. Ties fall back to byte order so the result is total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();
    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let xs = take_digits(&mut ai);
                let ys = take_digits(&mut bi);
                let xt = xs.trim_start_matches('0');
                let yt = ys.trim_start_matches('0');
                let ord = xt.len().cmp(&yt.len()).then_with(|| xt.cmp(yt));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                let ord = x.to_lowercase().cmp(y.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                ai.next();
                bi.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    digits
}
