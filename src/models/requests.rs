//! Request DTOs for the matchday API
//!
//! Defines the query strings accepted by the endpoints.

use serde::Deserialize;

/// Query string of the refresh trigger (POST /resources/:id/refresh)
///
/// # Fields
/// - `wait`: refresh synchronously and answer with the new envelope
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshQuery {
    #[serde(default)]
    pub wait: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_query_defaults_to_background() {
        let query: RefreshQuery = serde_json::from_str("{}").unwrap();
        assert!(!query.wait);
    }

    #[test]
    fn test_refresh_query_wait() {
        let query: RefreshQuery = serde_json::from_str(r#"{"wait": true}"#).unwrap();
        assert!(query.wait);
    }
}
