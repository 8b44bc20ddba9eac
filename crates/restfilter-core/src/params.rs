//! Ordered multimap of request query parameters.

/// Query parameters of one request.
///
/// Names keep the order of their first appearance; the values of a name keep
/// their original order, including repetitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: Vec<(String, Vec<String>)>,
}

impl QueryParams {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an `application/x-www-form-urlencoded` query string.
    ///
    /// A leading `?` is ignored.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Append one occurrence of `name`.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    /// The last value given for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).last().map(String::as_str)
    }

    /// Every value given for `name`, in order.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `name` was given at least once.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Parameter names, in first-appearance order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Iterate `(name, values)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no parameters were given.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = QueryParams::new();
        for (k, v) in iter {
            params.push(k, v);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_order_and_repetition() {
        let params = QueryParams::parse("?age=gt:18&name=like:smith&age=lt:65");
        let names: Vec<&str> = params.names().collect();
        assert_eq!(names, vec!["age", "name"]);
        assert_eq!(params.get_all("age"), ["gt:18", "lt:65"]);
        assert_eq!(params.get("age"), Some("lt:65"));
    }

    #[test]
    fn test_parse_decodes() {
        let params = QueryParams::parse("q=%22with+quotes%22&tags=in%3A%28a%2Cb%29");
        assert_eq!(params.get("q"), Some("\"with quotes\""));
        assert_eq!(params.get("tags"), Some("in:(a,b)"));
    }

    #[test]
    fn test_missing_name() {
        let params = QueryParams::parse("");
        assert!(params.is_empty());
        assert_eq!(params.get("q"), None);
        assert!(params.get_all("q").is_empty());
        assert!(!params.contains("q"));
    }

    #[test]
    fn test_from_iter() {
        let params: QueryParams = [("a", "1"), ("b", "2"), ("a", "3")].into_iter().collect();
        assert_eq!(params.len(), 2);
        let pairs: Vec<(&str, usize)> = params.iter().map(|(n, v)| (n, v.len())).collect();
        assert_eq!(pairs, vec![("a", 2), ("b", 1)]);
    }
}
