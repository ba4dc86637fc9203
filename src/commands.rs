use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;

use crate::app::cache_store::{CacheStore as _, SqliteCacheStore};
use crate::app::config::ConverterConfig;
use crate::app::converter::Converter;
use crate::app::fetch::HttpFetcher;
use crate::cli::{ConvertArgs, ParseArgs, RecordsArgs, RenderArgs};
use crate::render::RenderOptions;

pub fn parse(args: ParseArgs) -> anyhow::Result<()> {
    let markdown = read_input(&args.file)?;
    let doc = crate::markdown::parse(&markdown);
    tracing::debug!(title = %doc.title, steps = doc.steps.len(), "parsed markdown");

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &doc).context("write parsed document json")?;
    stdout.write_all(b"\n").context("write newline")?;
    Ok(())
}

pub fn render(args: RenderArgs) -> anyhow::Result<()> {
    let markdown = read_input(&args.file)?;
    let doc = crate::markdown::parse(&markdown);
    if doc.steps.is_empty() {
        anyhow::bail!("no steps found in {} (the document needs `## ` headings)", args.file);
    }

    let config = ConverterConfig::default()
        .with_image_base_url(&args.image_base_url)
        .with_env_overrides();
    let options = RenderOptions {
        image_base_url: config.image_base_url,
    };
    let html = crate::render::render_codelab(&doc, &options);

    let out_path = PathBuf::from(&args.out);
    if let Some(parent) = out_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir: {}", parent.display()))?;
    }
    std::fs::write(&out_path, html)
        .with_context(|| format!("write codelab html: {}", out_path.display()))?;
    tracing::info!(out = %out_path.display(), steps = doc.steps.len(), "rendered codelab");
    Ok(())
}

pub async fn convert(args: ConvertArgs) -> anyhow::Result<()> {
    let store = SqliteCacheStore::open(&args.db)
        .with_context(|| format!("open cache db: {}", args.db))?;
    let config = ConverterConfig {
        required_prefix: args.required_prefix,
        ..ConverterConfig::default()
    }
    .with_image_base_url(&args.image_base_url)
    .with_env_overrides();
    let fetcher = HttpFetcher::new(config.fetch_timeout, config.user_agent.clone())?;
    let converter = Converter::new(Arc::new(store), Arc::new(fetcher), config);

    let target = converter
        .convert(Some(&args.url))
        .await
        .with_context(|| format!("convert {}", args.url))?;
    println!("{}", target.location());
    Ok(())
}

pub async fn records(args: RecordsArgs) -> anyhow::Result<()> {
    let store = SqliteCacheStore::open(&args.db)
        .with_context(|| format!("open cache db: {}", args.db))?;
    let records = store.list_recent(args.limit).await.context("list records")?;

    let mut stdout = std::io::stdout().lock();
    for record in records {
        writeln!(
            stdout,
            "{}\t{}\t{}\t{}",
            record.converted_id,
            record.created_at.to_rfc3339(),
            record.title,
            record.original_url
        )
        .context("write record")?;
    }
    Ok(())
}

fn read_input(file: &str) -> anyhow::Result<String> {
    if file == "-" {
        return std::io::read_to_string(std::io::stdin()).context("read markdown from stdin");
    }
    std::fs::read_to_string(file).with_context(|| format!("read markdown: {file}"))
}
