use std::collections::HashMap;
use std::fmt;

pub const DEFAULT_MEDIA_WIDTH: i64 = 1920;
pub const DEFAULT_MIN_LENGTH_IN_SECONDS: i64 = 0;

/// Per-request knobs that influence the produced feed. Part of the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestParameters {
    pub width: i64,
    pub minimum_length_in_seconds: i64,
}

impl Default for RequestParameters {
    fn default() -> Self {
        Self {
            width: DEFAULT_MEDIA_WIDTH,
            minimum_length_in_seconds: DEFAULT_MIN_LENGTH_IN_SECONDS,
        }
    }
}

impl RequestParameters {
    /// Reads `width` and `minLength` from the query. Values that are not
    /// integers are ignored and the default is used instead.
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        Self {
            width: integer_parameter(query, "width", DEFAULT_MEDIA_WIDTH),
            minimum_length_in_seconds: integer_parameter(
                query,
                "minLength",
                DEFAULT_MIN_LENGTH_IN_SECONDS,
            ),
        }
    }

    /// Whether an episode of `seconds` length passes the minimum length filter.
    pub fn accepts_duration(&self, seconds: u64) -> bool {
        i64::try_from(seconds).map_or(true, |seconds| seconds >= self.minimum_length_in_seconds)
    }
}

fn integer_parameter(query: &HashMap<String, String>, name: &str, default: i64) -> i64 {
    query
        .get(name)
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

impl fmt::Display for RequestParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "width={}&minLength={}",
            self.width, self.minimum_length_in_seconds
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_without_query() {
        let parameters = RequestParameters::from_query(&HashMap::new());
        assert_eq!(parameters, RequestParameters::default());
        assert_eq!(parameters.width, 1920);
        assert_eq!(parameters.minimum_length_in_seconds, 0);
    }

    #[test]
    fn test_reads_width_and_min_length() {
        let parameters =
            RequestParameters::from_query(&query(&[("width", "1280"), ("minLength", "600")]));
        assert_eq!(parameters.width, 1280);
        assert_eq!(parameters.minimum_length_in_seconds, 600);
    }

    #[test]
    fn test_malformed_values_fall_back_to_defaults() {
        let parameters =
            RequestParameters::from_query(&query(&[("width", "wide"), ("minLength", "1.5")]));
        assert_eq!(parameters, RequestParameters::default());
    }

    #[test]
    fn test_accepts_duration() {
        let parameters = RequestParameters {
            width: 1920,
            minimum_length_in_seconds: 60,
        };
        assert!(!parameters.accepts_duration(59));
        assert!(parameters.accepts_duration(60));
        assert!(parameters.accepts_duration(u64::MAX));
        assert!(RequestParameters::default().accepts_duration(0));
    }

    #[test]
    fn test_display_is_stable() {
        let parameters = RequestParameters {
            width: 42,
            minimum_length_in_seconds: 7,
        };
        assert_eq!(parameters.to_string(), "width=42&minLength=7");
    }
}
