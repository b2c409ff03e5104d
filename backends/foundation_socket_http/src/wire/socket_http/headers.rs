//! Ordered, case-insensitive header multimap.
//!
//! Names keep the spelling of their first insertion and are rendered with
//! it; lookups ignore ASCII case. Values for one name stay in insertion
//! order.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    /// All values recorded under `name`, empty when absent.
    #[must_use]
    pub fn get(&self, name: &str) -> &[String] {
        match self.position(name) {
            Some(index) => &self.entries[index].1,
            None => &[],
        }
    }

    /// Values joined by `", "`, or `None` when the header is absent.
    #[must_use]
    pub fn get_line(&self, name: &str) -> Option<String> {
        self.position(name)
            .map(|index| self.entries[index].1.join(", "))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Replaces every value of `name` with `value`.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => self.entries[index].1 = vec![value],
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Adds `value` after any existing values of `name`.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => self.entries[index].1.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Removes `name`, returning its values.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name)
            .map(|index| self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// WHY: Header names are case-insensitive on the wire
    /// WHAT: Lookups match regardless of case and keep the first spelling
    #[test]
    fn test_case_insensitive_lookup() {
        let mut headers = Headers::new();
        headers.append("Set-Cookie", "a=1");
        headers.append("set-cookie", "b=2");

        assert_eq!(headers.get("SET-COOKIE"), ["a=1", "b=2"]);
        assert_eq!(headers.get_line("set-cookie").unwrap(), "a=1, b=2");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.iter().next().unwrap().0, "Set-Cookie");
    }

    #[test]
    fn test_insert_replaces_all_values() {
        let mut headers: Headers = [("Connection", "keep-alive"), ("connection", "upgrade")]
            .into_iter()
            .collect();
        headers.insert("CONNECTION", "close");

        assert_eq!(headers.get("connection"), ["close"]);
        assert_eq!(headers.remove("Connection"), Some(vec!["close".to_string()]));
        assert!(!headers.contains("connection"));
        assert!(headers.get("connection").is_empty());
        assert_eq!(headers.get_line("connection"), None);
    }

    #[test]
    fn test_order_is_preserved() {
        let headers: Headers = [("B", "1"), ("A", "2"), ("C", "3")].into_iter().collect();
        let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["B", "A", "C"]);
    }
}
