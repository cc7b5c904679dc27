// ============================================================
// INSENSITIVE DICT
// ============================================================
// Ordered dictionary that normalises case, whitespace, hyphens
// and underscores in keys

use serde::Serialize;

/// An ordered map whose keys ignore case, whitespace, hyphens and
/// underscores.
///
/// `InsensitiveDict::from([("FIRST_NAME", 1)])` and
/// `InsensitiveDict::from([("first name", 1)])` hold the same entry.
/// Insertion order is preserved; inserting an equivalent key again
/// overwrites the value in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsensitiveDict<V> {
    entries: Vec<(String, V)>,
}

impl<V> InsensitiveDict<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Normalise a key: lowercase it and drop spaces, underscores and
    /// hyphens.
    pub fn make_key(original_key: &str) -> String {
        original_key
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect()
    }

    pub fn insert(&mut self, key: &str, value: V) {
        let key = Self::make_key(key);
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        let key = Self::make_key(key);
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let key = Self::make_key(key);
        self.entries
            .iter_mut()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Normalised keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> InsensitiveDict<V> {
    /// Look up each of `keys` and pair it (unnormalised) with the value
    /// found, if any.
    pub fn as_dict_with_keys(&self, keys: &[&str]) -> Vec<(String, Option<V>)> {
        keys.iter()
            .map(|key| (key.to_string(), self.get(key).cloned()))
            .collect()
    }
}

impl InsensitiveDict<String> {
    /// Like `from_iter`, but stores the original, unnormalised key as
    /// the value so it can be retrieved later.
    pub fn from_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        keys.into_iter().map(|key| (key, key.to_string())).collect()
    }
}

impl<V> Default for InsensitiveDict<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, V> FromIterator<(&'a str, V)> for InsensitiveDict<V> {
    fn from_iter<T: IntoIterator<Item = (&'a str, V)>>(iter: T) -> Self {
        let mut dict = Self::new();
        for (key, value) in iter {
            dict.insert(key, value);
        }
        dict
    }
}

impl<'a, V, const N: usize> From<[(&'a str, V); N]> for InsensitiveDict<V> {
    fn from(pairs: [(&'a str, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// An ordered set of strings deduplicated by their normalised key. The
/// first spelling of each key wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsensitiveSet {
    inner: InsensitiveDict<String>,
}

impl InsensitiveSet {
    pub fn new<'a>(items: impl IntoIterator<Item = &'a str>) -> Self {
        let mut inner = InsensitiveDict::new();
        for item in items {
            if !inner.contains(item) {
                inner.insert(item, item.to_string());
            }
        }
        Self { inner }
    }

    pub fn contains(&self, item: &str) -> bool {
        self.inner.contains(item)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.inner.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_key() {
        assert_eq!(InsensitiveDict::<()>::make_key("First Name"), "firstname");
        assert_eq!(InsensitiveDict::<()>::make_key("FIRST_NAME"), "firstname");
        assert_eq!(InsensitiveDict::<()>::make_key("first-name"), "firstname");
        assert_eq!(InsensitiveDict::<()>::make_key(""), "");
    }

    #[test]
    fn test_lookup_is_insensitive() {
        for key_in in ["foo", "F_O O"] {
            let dict = InsensitiveDict::from([(key_in, "bar")]);
            for lookup in ["foo", "f_o_o", "F O O"] {
                assert_eq!(dict.get(lookup), Some(&"bar"));
                assert!(dict.contains(lookup));
            }
            assert_eq!(dict.get("bar"), None);
        }
    }

    #[test]
    fn test_equivalent_keys_overwrite_in_place() {
        let mut dict = InsensitiveDict::new();
        dict.insert("Date of Birth", 1);
        dict.insert("TOWN", 2);
        dict.insert("date_of_birth", 3);

        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get("dateofbirth"), Some(&3));
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["dateofbirth", "town"]);
    }

    #[test]
    fn test_maintains_insertion_order() {
        let mut dict = InsensitiveDict::from([("B", ()), ("A", ()), ("C", ())]);
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);

        dict.insert("BB", ());
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["b", "a", "c", "bb"]);
    }

    #[test]
    fn test_as_dict_with_keys() {
        let dict = InsensitiveDict::from([("Date of Birth", "01/01/2001"), ("TOWN", "London")]);
        assert_eq!(
            dict.as_dict_with_keys(&["date_of_birth", "town"]),
            vec![
                ("date_of_birth".to_string(), Some("01/01/2001")),
                ("town".to_string(), Some("London")),
            ]
        );
    }

    #[test]
    fn test_from_keys_keeps_original_spelling() {
        let dict = InsensitiveDict::from_keys(["Phone Number", "name"]);
        assert_eq!(dict.get("phonenumber"), Some(&"Phone Number".to_string()));
    }

    #[test]
    fn test_insensitive_set_dedupes() {
        let set = InsensitiveSet::new(["foo", "F_O O", "Foo", "bar"]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["foo", "bar"]);
        assert!(set.contains("FOO"));
        assert!(!set.contains("baz"));
    }
}
