use std::fs;

use predicates::prelude::*;

const POST_MD: &str = "---
title: Install Postgres
date: 2025-07-01
---
## Step One
Do this.
## Step Two
Do that.
";

#[test]
fn parse_prints_document_json() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let path = temp.path().join("post.md");
    fs::write(&path, POST_MD)?;

    let output = assert_cmd::cargo::cargo_bin_cmd!("codelabify")
        .args(["parse", "--file"])
        .arg(&path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let doc: serde_json::Value = serde_json::from_slice(&output)?;
    assert_eq!(doc["title"], "Install Postgres");
    assert_eq!(doc["metadata"]["date"], "2025-07-01");
    assert_eq!(doc["steps"][0]["title"], "Step One");
    assert_eq!(doc["steps"][0]["content"], "Do this.\n");
    assert_eq!(doc["steps"][1]["duration"], 5);
    Ok(())
}

#[test]
fn parse_reads_stdin() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("codelabify");
    cmd.args(["parse", "--file", "-"])
        .write_stdin("# From Stdin\n## Only\nbody\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"title\": \"From Stdin\""));
}

#[test]
fn render_writes_codelab_html() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let input = temp.path().join("post.md");
    let out = temp.path().join("out").join("codelab.html");
    fs::write(&input, POST_MD)?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("codelabify");
    cmd.args(["render", "--file"])
        .arg(&input)
        .arg("--out")
        .arg(&out)
        .assert()
        .success();

    let html = fs::read_to_string(&out)?;
    assert!(html.contains("<title>Install Postgres</title>"));
    assert!(html.contains("Step 2 / 2"));
    Ok(())
}

#[test]
fn render_without_steps_fails() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let input = temp.path().join("post.md");
    fs::write(&input, "# Title only\n")?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("codelabify");
    cmd.args(["render", "--file"])
        .arg(&input)
        .arg("--out")
        .arg(temp.path().join("codelab.html"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no steps found"));
    Ok(())
}

#[test]
fn convert_rejects_url_outside_prefix() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("codelabify");
    cmd.args(["convert", "--url", "https://evil.example/x.md", "--db"])
        .arg(temp.path().join("codelabs.db"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("url must start with"));
    Ok(())
}

#[test]
fn convert_honours_required_prefix_env() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("codelabify");
    cmd.env("CODELABIFY_REQUIRED_PREFIX", "https://only.example/posts/")
        .args([
            "convert",
            "--url",
            "https://raw.githubusercontent.com/phyuany/algs.tech/refs/heads/main/_posts/a.md",
            "--db",
        ])
        .arg(temp.path().join("codelabs.db"))
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "url must start with https://only.example/posts/",
        ));
    Ok(())
}

#[test]
fn render_rewrites_images_by_default() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let input = temp.path().join("post.md");
    fs::write(&input, "## Shot
![shot](../img/2025/shot.png)
")?;

    let out = temp.path().join("default.html");
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("codelabify");
    cmd.env_remove("CODELABIFY_IMAGE_BASE_URL")
        .args(["render", "--file"])
        .arg(&input)
        .arg("--out")
        .arg(&out)
        .assert()
        .success();
    assert!(fs::read_to_string(&out)?.contains("src=\"https://algs.tech/img/2025/shot.png\""));

    let out = temp.path().join("plain.html");
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("codelabify");
    cmd.env_remove("CODELABIFY_IMAGE_BASE_URL")
        .args(["render", "--image-base-url", "", "--file"])
        .arg(&input)
        .arg("--out")
        .arg(&out)
        .assert()
        .success();
    assert!(fs::read_to_string(&out)?.contains("src=\"../img/2025/shot.png\""));
    Ok(())
}

#[test]
fn rust_log_debug_emits_debug_line_to_stderr() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("codelabify");
    cmd.env("RUST_LOG", "debug")
        .args(["parse", "--file", "-"])
        .write_stdin("## s\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"));
}
