//! Named, identifiable catalog items and the directories that hold them.

use std::fmt;

use serde::{Serialize, ser::SerializeMap as _};

use crate::Error;

/// Something that can be looked up in a [`Directory`] by title or id.
pub trait Entry: fmt::Display {
    /// The display name.
    fn title(&self) -> &str;
    /// The stable identifier.
    fn id(&self) -> &str;
}

/// A metric, element or segment from a report suite's catalog.
///
/// Equality and serialization use the id: an item serializes as
/// `{"id": ...}`, which is the form the API expects inside a report
/// description.
#[derive(Debug, Clone)]
pub struct CatalogItem {
    title: String,
    id: String,
    owner: String,
    properties: serde_json::Map<String, serde_json::Value>,
}

impl CatalogItem {
    /// Create an item with no extra properties.
    pub fn new(title: impl Into<String>, id: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            id: id.into(),
            owner: owner.into(),
            properties: Default::default(),
        }
    }

    /// Build an item from one entry of a catalog payload, reading the title
    /// and id from the given keys. Every field of the entry is kept as a
    /// property.
    pub(crate) fn from_entry(
        entry: serde_json::Map<String, serde_json::Value>,
        title_key: &str,
        id_key: &str,
        owner: &str,
    ) -> Result<Self, Error> {
        let field = |key: &str| match entry.get(key) {
            Some(serde_json::Value::String(s)) => Ok(s.clone()),
            Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
            _ => Err(Error::invalid_data(format!(
                "catalog entry is missing '{key}'"
            ))),
        };

        Ok(Self {
            title: field(title_key)?,
            id: field(id_key)?,
            owner: owner.to_owned(),
            properties: entry,
        })
    }

    /// The id of the report suite this item belongs to.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// A raw property from the catalog payload.
    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    /// All raw properties from the catalog payload.
    pub fn properties(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.properties
    }

    /// The declared decimal precision of a metric. Zero if absent or not a
    /// whole number.
    pub fn decimals(&self) -> u32 {
        let whole = |f: f64| (f >= 0.0 && f.fract() == 0.0).then_some(f as u64);
        let decimals = match self.properties.get("decimals") {
            Some(serde_json::Value::Number(n)) => {
                n.as_u64().or_else(|| n.as_f64().and_then(whole))
            }
            Some(serde_json::Value::String(s)) => {
                let s = s.trim();
                s.parse().ok().or_else(|| s.parse().ok().and_then(whole))
            }
            _ => None,
        };

        decimals.map_or(0, |d| u32::try_from(d).unwrap_or(u32::MAX))
    }

    /// The vendor type tag, e.g. `number` or `currency`.
    pub fn kind(&self) -> Option<&str> {
        self.properties.get("type").and_then(|v| v.as_str())
    }

    /// The classification this item was reported under, if any.
    pub fn classification(&self) -> Option<&str> {
        self.properties
            .get("classification")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}

impl Entry for CatalogItem {
    fn title(&self) -> &str {
        &self.title
    }

    fn id(&self) -> &str {
        &self.id
    }
}

impl PartialEq for CatalogItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.owner == other.owner
    }
}

impl Eq for CatalogItem {}

impl fmt::Display for CatalogItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}: {} in {}>", self.title, self.id, self.owner)
    }
}

impl Serialize for CatalogItem {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("id", &self.id)?;
        map.end()
    }
}

/// A key for [`Directory::lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key<'a> {
    /// Positional access, bypassing name matching entirely.
    Index(usize),
    /// Match against title or id.
    Name(&'a str),
}

impl From<usize> for Key<'_> {
    fn from(i: usize) -> Self {
        Key::Index(i)
    }
}

impl<'a> From<&'a str> for Key<'a> {
    fn from(s: &'a str) -> Self {
        Key::Name(s)
    }
}

/// An ordered collection of entries, addressable by position, id or title.
/// Directories are never mutated after they are built.
#[derive(Debug, Clone)]
pub struct Directory<T = CatalogItem> {
    name: &'static str,
    items: Vec<T>,
}

impl<T: Entry> Directory<T> {
    /// Create a directory. The name is used in error messages, e.g.
    /// "metrics".
    pub fn new(name: &'static str, items: Vec<T>) -> Self {
        Self { name, items }
    }

    /// The name of the directory.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Look up an item either by position or by title/id.
    pub fn lookup<'k>(&self, key: impl Into<Key<'k>>) -> Result<&T, Error> {
        match key.into() {
            Key::Index(i) => self.items.get(i).ok_or_else(|| Error::NotFound {
                key: i.to_string(),
                directory: self.name,
            }),
            Key::Name(k) => self.get(k),
        }
    }

    /// Find the single item whose title or id equals `key`.
    pub fn get(&self, key: &str) -> Result<&T, Error> {
        let mut matches = self
            .items
            .iter()
            .filter(|item| item.title() == key || item.id() == key);

        let Some(first) = matches.next() else {
            return Err(Error::NotFound {
                key: key.to_owned(),
                directory: self.name,
            });
        };

        let rest: Vec<&T> = matches.collect();
        if rest.is_empty() {
            return Ok(first);
        }

        Err(Error::Ambiguous {
            key: key.to_owned(),
            matches: std::iter::once(first)
                .chain(rest)
                .map(ToString::to_string)
                .collect(),
        })
    }

    /// Positional access.
    pub fn at(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Iterate over the entries in order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the directory has no entries.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> std::ops::Index<usize> for Directory<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a Directory<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Entry> fmt::Display for Directory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "ID {:25} | Name: {}", item.id(), item.title())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn segments() -> Directory {
        Directory::new(
            "segments",
            vec![
                CatalogItem::new("abc", "123", "test"),
                CatalogItem::new("abc", "456", "test"),
                CatalogItem::new("Visits from Search", "s300_1", "test"),
            ],
        )
    }

    #[test]
    fn duplicate_title_is_ambiguous() {
        let dir = segments();
        assert_matches!(
            dir.get("abc"),
            Err(Error::Ambiguous { key, matches })
                if key == "abc" && matches == vec!["<abc: 123 in test>", "<abc: 456 in test>"]
        );
    }

    #[test]
    fn absent_key_is_not_found() {
        let dir = segments();
        assert_matches!(
            dir.get("pages"),
            Err(Error::NotFound { key, directory: "segments" }) if key == "pages"
        );
        assert_eq!(
            dir.get("pages").unwrap_err().to_string(),
            "Cannot find pages among the available segments"
        );
    }

    #[test]
    fn unique_title_or_id() -> anyhow::Result<()> {
        let dir = segments();
        assert_eq!(dir.get("Visits from Search")?.id(), "s300_1");
        assert_eq!(dir.get("456")?.id(), "456");
        Ok(())
    }

    #[test]
    fn index_bypasses_names() -> anyhow::Result<()> {
        let dir = segments();
        // Position 0 has a duplicated title, but positional access doesn't
        // care.
        assert_eq!(dir.lookup(0)?.id(), "123");
        assert_eq!(dir.lookup(1)?.id(), "456");
        assert_eq!(dir[2].title(), "Visits from Search");
        assert_matches!(dir.lookup(3), Err(Error::NotFound { .. }));
        assert_matches!(dir.lookup("abc"), Err(Error::Ambiguous { .. }));
        Ok(())
    }

    #[test]
    fn from_entry_keeps_properties() -> anyhow::Result<()> {
        let entry = json!({
            "id": "revenue",
            "name": "Revenue",
            "type": "currency",
            "decimals": 2,
        });
        let serde_json::Value::Object(entry) = entry else {
            unreachable!()
        };

        let item = CatalogItem::from_entry(entry, "name", "id", "omniture.api-gateway")?;
        assert_eq!(item.title(), "Revenue");
        assert_eq!(item.owner(), "omniture.api-gateway");
        assert_eq!(item.decimals(), 2);
        assert_eq!(item.kind(), Some("currency"));
        assert_eq!(serde_json::to_value(&item)?, json!({"id": "revenue"}));

        Ok(())
    }

    #[test]
    fn from_entry_numeric_id() -> anyhow::Result<()> {
        let serde_json::Value::Object(entry) = json!({"id": 7, "name": "Seven"}) else {
            unreachable!()
        };
        let item = CatalogItem::from_entry(entry, "name", "id", "rs")?;
        assert_eq!(item.id(), "7");
        assert_eq!(item.decimals(), 0);

        Ok(())
    }

    #[test]
    fn decimals_accept_whole_floats() -> anyhow::Result<()> {
        let decimals = |value: serde_json::Value| -> anyhow::Result<u32> {
            let entry = json!({"id": "revenue", "name": "Revenue", "decimals": value});
            let serde_json::Value::Object(entry) = entry else {
                unreachable!()
            };
            Ok(CatalogItem::from_entry(entry, "name", "id", "rs")?.decimals())
        };

        assert_eq!(decimals(json!(2))?, 2);
        assert_eq!(decimals(json!(2.0))?, 2);
        assert_eq!(decimals(json!("1"))?, 1);
        assert_eq!(decimals(json!("3.0"))?, 3);
        assert_eq!(decimals(json!(1.5))?, 0);
        assert_eq!(decimals(json!(-1))?, 0);
        assert_eq!(decimals(json!(5_000_000_000u64))?, u32::MAX);

        Ok(())
    }

    #[test]
    fn copies_are_independent() {
        let item = CatalogItem::new("ABC", "123", "test");
        let copy = item.clone();
        assert_eq!(item, copy);
        assert_eq!(copy.to_string(), "<ABC: 123 in test>");
    }

    #[test]
    fn display_table() {
        let dir = Directory::new(
            "metrics",
            vec![
                CatalogItem::new("ABC", "123", "test"),
                CatalogItem::new("DEF", "456", "test"),
            ],
        );
        assert_eq!(
            dir.to_string(),
            "ID 123                       | Name: ABC\nID 456                       | Name: DEF\n"
        );
    }
}
