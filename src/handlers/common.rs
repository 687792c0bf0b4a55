use crate::config::AppConfig;
use serde::Deserialize;
use utoipa::IntoParams;

/// Pagination parameters for list operations
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PaginationParams {
    /// Page number (1-indexed)
    pub page: Option<u64>,
    /// Page size, clamped to the configured maximum
    pub limit: Option<u64>,
}

impl PaginationParams {
    /// Resolves the effective page and page size against configured bounds.
    pub fn resolve(&self, config: &AppConfig) -> (u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .unwrap_or(config.api_default_page_size)
            .clamp(1, config.api_max_page_size);
        (page, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".to_string(),
            "a".repeat(64),
            3600,
            "127.0.0.1".to_string(),
            8080,
            "development".to_string(),
        )
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = test_config();
        let params = PaginationParams::default();
        assert_eq!(params.resolve(&config), (1, config.api_default_page_size));
    }

    #[test]
    fn limit_is_clamped_and_page_floored() {
        let config = test_config();
        let params = PaginationParams {
            page: Some(0),
            limit: Some(10_000),
        };
        assert_eq!(params.resolve(&config), (1, config.api_max_page_size));

        let params = PaginationParams {
            page: Some(3),
            limit: Some(0),
        };
        assert_eq!(params.resolve(&config), (3, 1));
    }
}
