//! Filter configuration.

use serde::{Deserialize, Serialize};

/// Default name of the ordering parameter.
pub const DEFAULT_ORDERING_PARAM: &str = "ordering";

/// Default name of the free-text search parameter.
pub const DEFAULT_SEARCH_PARAM: &str = "q";

/// Default name of the field-projection parameter.
pub const DEFAULT_FIELDS_PARAM: &str = "fields";

/// Names of the reserved query parameters and the ignore-list.
///
/// When deserialized without `ignored_params`, the ignore-list is derived
/// from the parameter names actually configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawFilterConfig")]
pub struct FilterConfig {
    /// Parameter carrying the requested ordering.
    pub ordering_param: String,
    /// Parameter carrying the free-text query.
    pub search_param: String,
    /// Parameter carrying the field projection.
    pub fields_param: String,
    /// Parameter names never treated as filter fields.
    pub ignored_params: Vec<String>,
}

#[derive(Deserialize)]
#[serde(default)]
struct RawFilterConfig {
    ordering_param: String,
    search_param: String,
    fields_param: String,
    ignored_params: Option<Vec<String>>,
}

impl Default for RawFilterConfig {
    fn default() -> Self {
        Self {
            ordering_param: DEFAULT_ORDERING_PARAM.to_string(),
            search_param: DEFAULT_SEARCH_PARAM.to_string(),
            fields_param: DEFAULT_FIELDS_PARAM.to_string(),
            ignored_params: None,
        }
    }
}

impl From<RawFilterConfig> for FilterConfig {
    fn from(raw: RawFilterConfig) -> Self {
        let mut config = Self::with_params(raw.ordering_param, raw.search_param, raw.fields_param);
        if let Some(ignored) = raw.ignored_params {
            config.ignored_params = ignored;
        }
        config
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::with_params(DEFAULT_ORDERING_PARAM, DEFAULT_SEARCH_PARAM, DEFAULT_FIELDS_PARAM)
    }
}

impl FilterConfig {
    /// Build a configuration whose ignore-list covers the given parameter
    /// names plus `page`, `page_size`, `format` and `stream`.
    pub fn with_params(
        ordering_param: impl Into<String>,
        search_param: impl Into<String>,
        fields_param: impl Into<String>,
    ) -> Self {
        let ordering_param = ordering_param.into();
        let search_param = search_param.into();
        let fields_param = fields_param.into();

        let ignored_params = vec![
            ordering_param.clone(),
            fields_param.clone(),
            "page".to_string(),
            "page_size".to_string(),
            "format".to_string(),
            search_param.clone(),
            "stream".to_string(),
        ];

        Self {
            ordering_param,
            search_param,
            fields_param,
            ignored_params,
        }
    }

    /// Add a name to the ignore-list.
    pub fn with_ignored_param(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.ignored_params.contains(&name) {
            self.ignored_params.push(name);
        }
        self
    }

    /// Whether `name` is on the ignore-list.
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored_params.iter().any(|p| p == name)
    }
}
