//! Line-oriented parser that turns a Markdown post into codelab steps.
//!
//! Front matter (`---` delimited `key: value` lines) supplies metadata and,
//! optionally, the title. The first `# ` heading is the title fallback. Every
//! `## ` heading starts a new step; the lines after it form the step body.

use std::sync::LazyLock;

use regex::Regex;

use crate::formats::{ParsedDocument, Step};

const FRONT_MATTER_DELIMITER: &str = "---";

static FRONT_MATTER_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9_]+):\s*(.+)$").expect("front matter regex"));
static TITLE_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#\s+").expect("title heading regex"));
static STEP_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^##\s+").expect("step heading regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Only blank lines seen so far.
    BeforeFrontMatter,
    InFrontMatter,
    Body,
}

#[derive(Debug)]
struct Parser {
    state: ParseState,
    doc: ParsedDocument,
    current_step: Option<Step>,
}

pub fn parse(markdown: &str) -> ParsedDocument {
    let mut parser = Parser {
        state: ParseState::BeforeFrontMatter,
        doc: ParsedDocument::default(),
        current_step: None,
    };
    for line in markdown.lines() {
        parser.feed(line);
    }
    parser.finish()
}

impl Parser {
    fn feed(&mut self, line: &str) {
        match self.state {
            ParseState::BeforeFrontMatter => {
                if line.trim().is_empty() {
                    return;
                }
                if is_delimiter(line) {
                    self.state = ParseState::InFrontMatter;
                    return;
                }
                self.state = ParseState::Body;
                self.feed_body(line);
            }
            ParseState::InFrontMatter => {
                if is_delimiter(line) {
                    self.state = ParseState::Body;
                    return;
                }
                self.feed_front_matter(line);
            }
            ParseState::Body => self.feed_body(line),
        }
    }

    fn feed_front_matter(&mut self, line: &str) {
        let Some((key, value)) = parse_front_matter_pair(line) else {
            return;
        };
        if key == "title" {
            self.doc.title = value.clone();
        }
        self.doc.metadata.insert(key, value);
    }

    fn feed_body(&mut self, line: &str) {
        if self.doc.title.is_empty() && TITLE_HEADING.is_match(line) {
            self.doc.title = TITLE_HEADING.replace(line, "").trim().to_owned();
            return;
        }

        if STEP_HEADING.is_match(line) {
            if let Some(step) = self.current_step.take() {
                self.doc.steps.push(step);
            }
            let title = STEP_HEADING.replace(line, "").trim().to_owned();
            self.current_step = Some(Step::new(title));
            return;
        }

        if let Some(step) = self.current_step.as_mut() {
            step.content.push_str(line);
            step.content.push('\n');
        }
    }

    fn finish(mut self) -> ParsedDocument {
        if let Some(step) = self.current_step.take() {
            self.doc.steps.push(step);
        }
        self.doc
    }
}

fn is_delimiter(line: &str) -> bool {
    line.trim() == FRONT_MATTER_DELIMITER
}

fn parse_front_matter_pair(line: &str) -> Option<(String, String)> {
    let caps = FRONT_MATTER_PAIR.captures(line)?;
    let key = caps.get(1)?.as_str().to_owned();
    let value = strip_matching_quotes(caps.get(2)?.as_str().trim());
    Some((key, value.to_owned()))
}

fn strip_matching_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
