use std::time::Duration;

pub const DEFAULT_REQUIRED_PREFIX: &str =
    "https://raw.githubusercontent.com/phyuany/algs.tech/refs/heads/main/_posts/";
/// Images under `img/` in the default posts are served from this site.
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://algs.tech";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; MarkdownCodelabsConverter/1.0)";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RECENT_LIMIT: usize = 50;

pub const REQUIRED_PREFIX_ENV: &str = "CODELABIFY_REQUIRED_PREFIX";
pub const IMAGE_BASE_URL_ENV: &str = "CODELABIFY_IMAGE_BASE_URL";

#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Source URLs must start with this string.
    pub required_prefix: String,
    pub fetch_timeout: Duration,
    pub user_agent: String,
    pub image_base_url: Option<String>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            required_prefix: DEFAULT_REQUIRED_PREFIX.to_owned(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            image_base_url: Some(DEFAULT_IMAGE_BASE_URL.to_owned()),
        }
    }
}

impl ConverterConfig {
    /// Set the image base from a flag value; an empty value turns rewriting off.
    pub fn with_image_base_url(mut self, value: &str) -> Self {
        let value = value.trim();
        self.image_base_url = (!value.is_empty()).then(|| value.to_owned());
        self
    }

    /// Apply `CODELABIFY_*` environment overrides on top of `self`.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(prefix) = non_empty(REQUIRED_PREFIX_ENV) {
            self.required_prefix = prefix;
        }
        if let Some(base) = non_empty(IMAGE_BASE_URL_ENV) {
            self.image_base_url = Some(base);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_match_service_constants() {
        let config = ConverterConfig::default();
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert!(config.required_prefix.starts_with("https://raw.githubusercontent.com/"));
        assert!(config.user_agent.contains("MarkdownCodelabsConverter"));
        assert_eq!(config.image_base_url.as_deref(), Some("https://algs.tech"));
    }

    #[test]
    fn empty_image_base_flag_disables_rewriting() {
        let config = ConverterConfig::default().with_image_base_url("");
        assert!(config.image_base_url.is_none());

        let config = ConverterConfig::default().with_image_base_url(" https://cdn.example ");
        assert_eq!(config.image_base_url.as_deref(), Some("https://cdn.example"));
    }

    #[test]
    fn overrides_ignore_blank_values() {
        let env = HashMap::from([
            (REQUIRED_PREFIX_ENV, " https://example.com/posts/ "),
            (IMAGE_BASE_URL_ENV, "   "),
        ]);
        let config = ConverterConfig::default()
            .with_overrides_from(|key| env.get(key).map(|v| (*v).to_owned()));

        assert_eq!(config.required_prefix, "https://example.com/posts/");
        assert_eq!(config.image_base_url.as_deref(), Some(DEFAULT_IMAGE_BASE_URL));
    }
}
