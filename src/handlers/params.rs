// Query string helpers
//
// Query strings are decoded as ordered key/value pairs so repeated keys
// (`languages=de&languages=en`) keep their order.

use crate::error::GatewayError;

/// Ordered query parameters of one request
#[derive(Debug, Default)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First value of `name`, 422 when absent or blank
    pub fn required(&self, name: &str) -> Result<String, GatewayError> {
        self.values(name)
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(String::from)
            .ok_or_else(|| GatewayError::invalid_request(format!("Missing required query parameter '{}'", name)))
    }

    /// Every value of `name` in order, or `default` when the key is absent.
    ///
    /// Comma separated values are split so `languages=de,en` works too.
    pub fn list_or(&self, name: &str, default: &[&str]) -> Vec<String> {
        let values: Vec<String> = self
            .values(name)
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect();

        if values.is_empty() {
            default.iter().map(|v| v.to_string()).collect()
        } else {
            values
        }
    }

    /// Boolean flag, `default` when absent, 422 when not a boolean
    pub fn flag_or(&self, name: &str, default: bool) -> Result<bool, GatewayError> {
        let Some(raw) = self.values(name).next() else {
            return Ok(default);
        };

        match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(GatewayError::invalid_request(format!(
                "Query parameter '{}' must be a boolean, got '{}'",
                name, raw
            ))),
        }
    }
}

impl From<Vec<(String, String)>> for QueryParams {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::new(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_required() {
        let p = params(&[("video_id", "dQw4w9WgXcQ"), ("empty", "  ")]);
        assert_eq!(p.required("video_id").unwrap(), "dQw4w9WgXcQ");
        assert!(matches!(p.required("empty"), Err(GatewayError::InvalidRequest(_))));
        assert!(p.required("missing").is_err());
    }

    #[test]
    fn test_list_keeps_order_and_defaults() {
        let p = params(&[("languages", "de"), ("languages", "en,fr"), ("other", "x")]);
        assert_eq!(p.list_or("languages", &["en"]), vec!["de", "en", "fr"]);
        assert_eq!(p.list_or("source_languages", &["en"]), vec!["en"]);
    }

    #[test]
    fn test_flags() {
        let p = params(&[("preserve_formatting", "TRUE"), ("bad", "maybe")]);
        assert!(p.flag_or("preserve_formatting", false).unwrap());
        assert!(!p.flag_or("absent", false).unwrap());
        assert!(p.flag_or("bad", false).is_err());
    }
}
