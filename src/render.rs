use std::sync::LazyLock;

use pulldown_cmark::{Options, Parser};
use regex::Regex;

use crate::formats::{CacheRecord, ParsedDocument, Step};

static IMG_DIR_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img src="[^"]*?img/"#).expect("img src regex"));

const ORIGINAL_URL_DISPLAY_CHARS: usize = 50;

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// When set, image sources under an `img/` directory are served from here.
    pub image_base_url: Option<String>,
}

pub fn render_codelab(doc: &ParsedDocument, options: &RenderOptions) -> String {
    let title = html_escape(doc.display_title());
    let total = doc.steps.len();

    let mut steps_html = String::new();
    let mut sidebar_html = String::new();
    for (index, step) in doc.steps.iter().enumerate() {
        steps_html.push_str(&render_step(step, index + 1, total, options));
        sidebar_html.push_str(&format!(
            "      <div class=\"sidebar-item{active}\" onclick=\"goToStep({n})\">\n        <div class=\"step-indicator\">{n}</div>\n        <div class=\"step-title\">{title}</div>\n      </div>\n",
            active = if index == 0 { " active" } else { "" },
            n = index + 1,
            title = html_escape(&step.title),
        ));
    }

    let mut sidebar_meta = String::new();
    if let Some(date) = doc.metadata.get("date") {
        sidebar_meta.push_str(&format!("📅 {}", html_escape(date)));
    }
    if let Some(categories) = doc.metadata.get("categories") {
        if !sidebar_meta.is_empty() {
            sidebar_meta.push_str("<br>");
        }
        sidebar_meta.push_str(&format!("🏷️ {}", html_escape(categories)));
    }

    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    out.push_str("  <meta charset=\"UTF-8\">\n");
    out.push_str(
        "  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    out.push_str(&format!("  <title>{title}</title>\n"));
    out.push_str("  <link rel=\"stylesheet\" href=\"https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/styles/default.min.css\">\n");
    out.push_str(&format!("  <style>\n{CODELAB_CSS}  </style>\n"));
    out.push_str("</head>\n<body>\n");
    out.push_str("  <div class=\"progress-bar\"><div class=\"progress-fill\" id=\"progressFill\"></div></div>\n");
    out.push_str("  <div class=\"container\">\n    <div class=\"sidebar\" id=\"sidebar\">\n");
    out.push_str(&format!(
        "      <div class=\"sidebar-header\">\n        <h1>{title}</h1>\n        <div class=\"sidebar-meta\">{sidebar_meta}</div>\n      </div>\n"
    ));
    out.push_str(&sidebar_html);
    out.push_str("    </div>\n    <div class=\"main-content\">\n");
    out.push_str(&steps_html);
    out.push_str("    </div>\n  </div>\n");
    out.push_str("  <script src=\"https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/highlight.min.js\"></script>\n");
    out.push_str(&format!(
        "  <script>\n    const totalSteps = {total};\n{CODELAB_JS}  </script>\n"
    ));
    out.push_str("</body>\n</html>\n");
    out
}

fn render_step(step: &Step, number: usize, total: usize, options: &RenderOptions) -> String {
    let mut body = markdown_to_html_fragment(&step.content);
    if let Some(base) = options.image_base_url.as_deref() {
        body = rewrite_image_sources(&body, base);
    }

    let display = if number == 1 { "block" } else { "none" };
    let prev = if number > 1 {
        "<button class=\"nav-btn prev-btn\" onclick=\"previousStep()\">Previous</button>"
    } else {
        ""
    };
    let next = if number < total {
        "<button class=\"nav-btn next-btn\" onclick=\"nextStep()\">Next</button>"
    } else {
        "<button class=\"nav-btn complete-btn\" onclick=\"completeLab()\">Finish</button>"
    };

    format!(
        r#"      <div class="step" data-step="{number}" style="display: {display};">
        <div class="step-header">
          <h2>{title}</h2>
          <div class="step-meta">
            <span class="duration">⏱️ {duration} min</span>
            <span class="step-number">Step {number} / {total}</span>
          </div>
        </div>
        <div class="step-content">
{body}        </div>
        <div class="step-navigation">{prev}{next}</div>
      </div>
"#,
        title = html_escape(&step.title),
        duration = step.duration,
    )
}

fn markdown_to_html_fragment(md: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(md, options);
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

/// Point every `<img src=".../img/...">` at `base`.
fn rewrite_image_sources(html: &str, base: &str) -> String {
    let replacement = format!("<img src=\"{}/img/", base.trim_end_matches('/'));
    IMG_DIR_SRC
        .replace_all(html, regex::NoExpand(&replacement))
        .into_owned()
}

pub fn render_home(required_prefix: &str) -> String {
    let prefix = html_escape(required_prefix);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Markdown to Codelabs</title>
  <style>
{PAGE_CSS}  </style>
</head>
<body>
  <div class="container">
    <h1>📚 Markdown to Codelabs</h1>
    <form action="/convert" method="POST">
      <label for="url">Markdown file URL:</label>
      <input type="url" id="url" name="url" placeholder="{prefix}..." required>
      <button type="submit">🚀 Convert</button>
    </form>
    <div class="example">
      <strong>Accepted sources:</strong><br>
      <code>{prefix}</code>
    </div>
    <p><a href="/views">All conversions</a></p>
  </div>
</body>
</html>
"#
    )
}

pub fn render_records(records: &[CacheRecord]) -> String {
    let mut rows = String::new();
    for record in records {
        rows.push_str(&format!(
            "      <tr>\n        <td><a href=\"{view}\" target=\"_blank\">{title}</a></td>\n        <td><a href=\"{url}\" target=\"_blank\">{short_url}</a></td>\n        <td><code>{id}</code></td>\n        <td>{created}</td>\n        <td>{accessed}</td>\n      </tr>\n",
            view = html_escape(&record.view_path()),
            title = html_escape(&record.title),
            url = html_escape(&record.original_url),
            short_url = html_escape(&truncate_chars(
                &record.original_url,
                ORIGINAL_URL_DISPLAY_CHARS
            )),
            id = html_escape(&record.converted_id),
            created = record.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            accessed = record.accessed_at.format("%Y-%m-%d %H:%M:%S UTC"),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Conversions - Markdown to Codelabs</title>
  <style>
{RECORDS_CSS}  </style>
</head>
<body>
  <div class="header">
    <h1>📊 Conversions</h1>
    <a href="/">← Home</a>
  </div>
  <p><strong>{count}</strong> conversion records</p>
  <table>
    <thead>
      <tr><th>Title</th><th>Original URL</th><th>Converted ID</th><th>Created</th><th>Last accessed</th></tr>
    </thead>
    <tbody>
{rows}    </tbody>
  </table>
</body>
</html>
"#,
        count = records.len(),
    )
}

pub fn render_not_found(converted_id: &str) -> String {
    render_message_page(
        "❌ Content not found",
        &format!(
            "No content exists for converted id \"{}\".",
            converted_id
        ),
    )
}

pub fn render_message_page(heading: &str, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>{heading}</title></head>
<body>
  <div style="text-align: center; padding: 50px; font-family: Arial, sans-serif;">
    <h2>{heading}</h2>
    <p>{message}</p>
    <a href="/" style="color: #1976d2;">Back to home</a>
  </div>
</body>
</html>
"#,
        heading = html_escape(heading),
        message = html_escape(message),
    )
}

fn truncate_chars(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &input[..cut]),
        None => input.to_owned(),
    }
}

pub fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

const CODELAB_CSS: &str = r#"    * { margin: 0; padding: 0; box-sizing: border-box; }
    body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; line-height: 1.6; color: #333; background: #f5f5f5; }
    .progress-bar { position: fixed; top: 0; left: 0; width: 100%; height: 4px; background: #e0e0e0; z-index: 1000; }
    .progress-fill { height: 100%; background: #1976d2; width: 0; transition: width 0.3s; }
    .container { display: flex; min-height: 100vh; }
    .sidebar { width: 300px; background: #fff; border-right: 1px solid #e0e0e0; position: fixed; height: 100vh; overflow-y: auto; box-shadow: 2px 0 10px rgba(0,0,0,0.1); }
    .sidebar-header { padding: 20px; background: #1976d2; color: white; }
    .sidebar-header h1 { font-size: 1.2em; margin-bottom: 10px; }
    .sidebar-meta { font-size: 0.9em; opacity: 0.9; }
    .sidebar-item { display: flex; align-items: center; padding: 15px 20px; cursor: pointer; border-bottom: 1px solid #f0f0f0; }
    .sidebar-item:hover { background: #f5f5f5; }
    .sidebar-item.active { background: #e3f2fd; border-right: 3px solid #1976d2; }
    .step-indicator { width: 30px; height: 30px; border-radius: 50%; background: #e0e0e0; display: flex; align-items: center; justify-content: center; margin-right: 15px; font-weight: bold; font-size: 0.9em; }
    .sidebar-item.active .step-indicator { background: #1976d2; color: white; }
    .step-title { flex: 1; font-size: 0.95em; }
    .main-content { flex: 1; margin-left: 300px; }
    .step { max-width: 800px; margin: 0 auto; background: white; min-height: 100vh; box-shadow: 0 0 20px rgba(0,0,0,0.1); }
    .step-header { background: linear-gradient(135deg, #1976d2, #1565c0); color: white; padding: 40px; }
    .step-header h2 { font-size: 2em; margin-bottom: 15px; }
    .step-meta { display: flex; gap: 20px; font-size: 0.9em; opacity: 0.9; }
    .step-content { padding: 40px; font-size: 1.1em; line-height: 1.8; }
    .step-content h1, .step-content h2, .step-content h3 { margin-top: 30px; margin-bottom: 15px; color: #1976d2; }
    .step-content p { margin-bottom: 15px; }
    .step-content ul, .step-content ol { margin: 15px 0; padding-left: 30px; }
    .step-content pre { background: #f8f9fa; border: 1px solid #e9ecef; border-radius: 8px; padding: 20px; margin: 20px 0; overflow-x: auto; }
    .step-content code { background: #f8f9fa; padding: 2px 6px; border-radius: 4px; font-family: 'Consolas', 'Monaco', monospace; }
    .step-content pre code { background: none; padding: 0; }
    .step-content img { max-width: 100%; height: auto; }
    .step-content table { width: 100%; border-collapse: collapse; margin: 20px 0; }
    .step-content th, .step-content td { border: 1px solid #ddd; padding: 12px; text-align: left; }
    .step-content blockquote { border-left: 4px solid #1976d2; padding-left: 20px; margin: 20px 0; color: #666; }
    .step-navigation { padding: 20px 40px 40px; display: flex; justify-content: space-between; }
    .nav-btn { padding: 12px 24px; border: none; border-radius: 6px; cursor: pointer; font-size: 1em; background: #1976d2; color: white; }
    .prev-btn { background: #e0e0e0; color: #333; }
    .complete-btn { background: #4caf50; margin-left: auto; }
    .next-btn { margin-left: auto; }
    @media (max-width: 768px) {
      .sidebar { transform: translateX(-100%); }
      .main-content { margin-left: 0; }
      .step-header, .step-content, .step-navigation { padding: 20px; }
    }
"#;

const CODELAB_JS: &str = r#"    let currentStep = 1;

    function updateProgress() {
      document.getElementById('progressFill').style.width = (currentStep / totalSteps) * 100 + '%';
    }

    function showStep(stepNumber) {
      document.querySelectorAll('.step').forEach(step => { step.style.display = 'none'; });
      const target = document.querySelector('[data-step="' + stepNumber + '"]');
      if (target) {
        target.style.display = 'block';
        window.scrollTo(0, 0);
      }
      document.querySelectorAll('.sidebar-item').forEach((item, index) => {
        item.classList.toggle('active', index === stepNumber - 1);
      });
      currentStep = stepNumber;
      updateProgress();
    }

    function nextStep() { if (currentStep < totalSteps) showStep(currentStep + 1); }
    function previousStep() { if (currentStep > 1) showStep(currentStep - 1); }
    function goToStep(stepNumber) { showStep(stepNumber); }
    function completeLab() { alert('🎉 All steps complete!'); }

    updateProgress();
    hljs.highlightAll();

    document.addEventListener('keydown', function (e) {
      if (e.key === 'ArrowRight') { e.preventDefault(); nextStep(); }
      else if (e.key === 'ArrowLeft') { e.preventDefault(); previousStep(); }
    });
"#;

const PAGE_CSS: &str = r#"    body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; max-width: 600px; margin: 50px auto; padding: 20px; background: #f5f5f5; }
    .container { background: white; padding: 40px; border-radius: 10px; box-shadow: 0 4px 20px rgba(0,0,0,0.1); }
    h1 { color: #1976d2; text-align: center; margin-bottom: 30px; }
    label { display: block; margin-bottom: 5px; font-weight: bold; }
    input[type="url"] { width: 100%; padding: 12px; border: 2px solid #ddd; border-radius: 6px; font-size: 16px; box-sizing: border-box; margin-bottom: 20px; }
    button { width: 100%; padding: 15px; background: #1976d2; color: white; border: none; border-radius: 6px; font-size: 16px; cursor: pointer; font-weight: bold; }
    .example { background: #f8f9fa; padding: 15px; border-radius: 6px; margin-top: 20px; font-size: 14px; word-break: break-all; }
"#;

const RECORDS_CSS: &str = r#"    body { font-family: Arial, sans-serif; margin: 20px; }
    table { width: 100%; border-collapse: collapse; margin-top: 20px; }
    th, td { border: 1px solid #ddd; padding: 12px; text-align: left; }
    th { background-color: #f2f2f2; }
    a { color: #1976d2; text-decoration: none; }
    .header { display: flex; justify-content: space-between; align-items: center; }
"#;
