use std::sync::Arc;

use crate::app::cache_store::CacheStore;
use crate::app::config::ConverterConfig;
use crate::app::fetch::MarkdownFetcher;
use crate::error::ConvertError;
use crate::render::RenderOptions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub converted_id: String,
}

impl RedirectTarget {
    pub fn location(&self) -> String {
        format!("/view/{}", self.converted_id)
    }
}

/// Fetch → parse → render → store, cache-first.
///
/// Two concurrent conversions of the same URL can both miss the cache and
/// both write; the last upsert wins. There is no in-flight de-duplication.
pub struct Converter {
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn MarkdownFetcher>,
    config: ConverterConfig,
}

impl Converter {
    pub fn new(
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn MarkdownFetcher>,
        config: ConverterConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub async fn convert(&self, url: Option<&str>) -> Result<RedirectTarget, ConvertError> {
        let url = url.unwrap_or_default();
        if url.trim().is_empty() {
            return Err(ConvertError::MissingInput);
        }
        if !url.starts_with(&self.config.required_prefix) {
            return Err(ConvertError::Forbidden {
                required_prefix: self.config.required_prefix.clone(),
            });
        }

        if let Some(cached) = self.store.get_by_url(url).await? {
            tracing::info!(url, converted_id = %cached.converted_id, title = %cached.title, "cache hit");
            self.store.touch(&cached.converted_id).await?;
            return Ok(RedirectTarget {
                converted_id: cached.converted_id,
            });
        }

        tracing::info!(url, "cache miss; fetching markdown");
        let markdown = self.fetcher.fetch(url).await?;

        let doc = crate::markdown::parse(&markdown);
        if doc.steps.is_empty() {
            return Err(ConvertError::NoContent);
        }

        let options = RenderOptions {
            image_base_url: self.config.image_base_url.clone(),
        };
        let html = crate::render::render_codelab(&doc, &options);
        let title = doc.display_title();

        let converted_id = crate::id::generate(url);
        self.store.upsert(url, &converted_id, title, &html).await?;
        tracing::info!(url, %converted_id, title, steps = doc.steps.len(), "stored codelab");

        Ok(RedirectTarget { converted_id })
    }

    /// Cached HTML for `converted_id`, refreshing its access time on a hit.
    pub async fn view(&self, converted_id: &str) -> Result<Option<String>, ConvertError> {
        let record = self.store.get_by_id(converted_id).await?;
        Ok(record.map(|r| r.content))
    }
}
