//! Document handlers. Text documents are read as Markdown (plain text is
//! valid Markdown), so headings and paragraphs come from `pulldown-cmark`.
//! Binary formats such as PDF or DOCX only get byte-level facts.

use super::{Handler, Job, hash_file, write_report};
use crate::error::ProcessError;
use crate::result::Metrics;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use serde::Serialize;
use std::path::Path;

/// Longest summary excerpt, in characters.
const SUMMARY_CHARS: usize = 280;

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Heading {
    level: u8,
    text: String,
}

/// What the Markdown pass extracts from a text document.
#[derive(Debug, Default)]
struct Outline {
    headings: Vec<Heading>,
    paragraphs: Vec<String>,
}

fn outline(text: &str) -> Outline {
    let mut outline = Outline::default();
    let mut heading: Option<(u8, String)> = None;
    let mut paragraph: Option<String> = None;

    for event in Parser::new(text) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                heading = Some((level as u8, String::new()));
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, text)) = heading.take() {
                    outline.headings.push(Heading {
                        level,
                        text: text.trim().to_string(),
                    });
                }
            }
            Event::Start(Tag::Paragraph) => paragraph = Some(String::new()),
            Event::End(TagEnd::Paragraph) => {
                if let Some(text) = paragraph.take() {
                    outline.paragraphs.push(text.trim().to_string());
                }
            }
            Event::Text(t) | Event::Code(t) => {
                if let Some((_, buf)) = heading.as_mut() {
                    buf.push_str(&t);
                } else if let Some(buf) = paragraph.as_mut() {
                    buf.push_str(&t);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(buf) = paragraph.as_mut() {
                    buf.push(' ');
                }
            }
            _ => {}
        }
    }
    outline
}

/// Cut `text` at a word boundary so it fits in `max` characters.
fn excerpt(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    let trimmed = match cut.rfind(char::is_whitespace) {
        Some(i) if i > 0 => &cut[..i],
        _ => cut.as_str(),
    };
    format!("{}…", trimmed.trim_end())
}

fn read_text(path: &Path) -> Result<Option<String>, ProcessError> {
    Ok(String::from_utf8(std::fs::read(path)?).ok())
}

#[derive(Serialize)]
struct DocumentReport {
    file: String,
    bytes: u64,
    sha256: String,
    text: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    lines: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    words: Option<usize>,
    headings: Vec<Heading>,
}

/// JSON report with size and, for text documents, line, word, and heading
/// counts.
pub struct DocumentAnalyze;

impl Handler for DocumentAnalyze {
    fn name(&self) -> &'static str {
        "document-analyze"
    }

    fn fixed_extension(&self) -> Option<&'static str> {
        Some("json")
    }

    fn run(&self, job: &Job<'_>) -> Result<Metrics, ProcessError> {
        let text = read_text(job.input)?;
        let mut report = DocumentReport {
            file: job.input.display().to_string(),
            bytes: std::fs::metadata(job.input)?.len(),
            sha256: hash_file(job.input)?,
            text: text.is_some(),
            lines: None,
            words: None,
            headings: Vec::new(),
        };
        if let Some(text) = &text {
            report.lines = Some(text.lines().count());
            report.words = Some(text.split_whitespace().count());
            report.headings = outline(text).headings;
        }
        write_report(job.output, &report)?;

        let mut metrics = Metrics::new();
        if let (Some(lines), Some(words)) = (report.lines, report.words) {
            metrics.insert("lines".into(), lines.into());
            metrics.insert("words".into(), words.into());
            metrics.insert("headings".into(), report.headings.len().into());
        }
        Ok(metrics)
    }
}

#[derive(Serialize)]
struct DocumentMetadata {
    title: String,
    headings: Vec<String>,
    word_count: usize,
    summary: String,
}

/// Generate descriptive metadata (title, outline, excerpt) for a text
/// document.
pub struct DocumentSummary;

impl Handler for DocumentSummary {
    fn name(&self) -> &'static str {
        "document-summary"
    }

    fn fixed_extension(&self) -> Option<&'static str> {
        Some("json")
    }

    fn run(&self, job: &Job<'_>) -> Result<Metrics, ProcessError> {
        let Some(text) = read_text(job.input)? else {
            return Err(ProcessError::Handler(format!(
                "{} is not a text document; summaries need UTF-8 input",
                job.input.display()
            )));
        };
        let outline = outline(&text);
        let title = outline
            .headings
            .first()
            .map(|h| h.text.clone())
            .filter(|t| !t.is_empty())
            .or_else(|| {
                job.input
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
            })
            .unwrap_or_default();
        let metadata = DocumentMetadata {
            title,
            headings: outline.headings.into_iter().map(|h| h.text).collect(),
            word_count: text.split_whitespace().count(),
            summary: excerpt(&outline.paragraphs.join(" "), SUMMARY_CHARS),
        };
        write_report(job.output, &metadata)?;

        let mut metrics = Metrics::new();
        metrics.insert("word_count".into(), metadata.word_count.into());
        metrics.insert("title".into(), metadata.title.into());
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetType;
    use crate::options::{ProcessingMode, ProcessingOptions};
    use crate::result::MetricValue;
    use tempfile::TempDir;

    const NOTES: &str = "# Field Notes\n\nDucks were seen\nnear the pond.\n\n\
                         ## Tuesday\n\nMore `ducks`.\n";

    fn run(handler: &dyn Handler, input: &Path, output: &Path) -> Result<Metrics, ProcessError> {
        let options = ProcessingOptions::new(ProcessingMode::Analyze);
        handler.run(&Job {
            input,
            output,
            extension: "json",
            asset_type: AssetType::Document,
            options: &options,
        })
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn outline_collects_headings_and_paragraphs() {
        let outline = outline(NOTES);
        assert_eq!(
            outline.headings,
            vec![
                Heading { level: 1, text: "Field Notes".into() },
                Heading { level: 2, text: "Tuesday".into() },
            ]
        );
        assert_eq!(outline.paragraphs, vec!["Ducks were seen near the pond.", "More ducks."]);
    }

    #[test]
    fn excerpt_cuts_on_word_boundary() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("alpha beta gamma", 12), "alpha beta…");
    }

    #[test]
    fn analyze_counts_text() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("notes.md");
        let output = tmp.path().join("notes.json");
        std::fs::write(&input, NOTES).unwrap();

        let metrics = run(&DocumentAnalyze, &input, &output).unwrap();
        let report = read_json(&output);
        assert_eq!(report["text"], true);
        assert_eq!(report["lines"], 8);
        assert_eq!(report["headings"][1]["text"], "Tuesday");
        assert_eq!(metrics["headings"], MetricValue::Int(2));
    }

    #[test]
    fn analyze_binary_reports_bytes_only() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("scan.pdf");
        let output = tmp.path().join("scan.json");
        std::fs::write(&input, [0x25, 0x50, 0x44, 0x46, 0xff, 0xfe, 0x00]).unwrap();

        let metrics = run(&DocumentAnalyze, &input, &output).unwrap();
        let report = read_json(&output);
        assert_eq!(report["text"], false);
        assert_eq!(report["bytes"], 7);
        assert!(report.get("words").is_none());
        assert!(metrics.is_empty());
    }

    #[test]
    fn summary_uses_first_heading_as_title() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("notes.md");
        let output = tmp.path().join("notes.json");
        std::fs::write(&input, NOTES).unwrap();

        run(&DocumentSummary, &input, &output).unwrap();
        let meta = read_json(&output);
        assert_eq!(meta["title"], "Field Notes");
        assert_eq!(meta["headings"].as_array().unwrap().len(), 2);
        assert_eq!(meta["summary"], "Ducks were seen near the pond. More ducks.");
    }

    #[test]
    fn summary_falls_back_to_file_stem() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("readme.txt");
        let output = tmp.path().join("readme.json");
        std::fs::write(&input, "just some words").unwrap();

        let metrics = run(&DocumentSummary, &input, &output).unwrap();
        assert_eq!(metrics["title"], MetricValue::Text("readme".into()));
        assert_eq!(metrics["word_count"], MetricValue::Int(3));
    }

    #[test]
    fn summary_rejects_binary() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("doc.docx");
        let output = tmp.path().join("doc.json");
        std::fs::write(&input, [0x50, 0x4b, 0x03, 0x04, 0xff]).unwrap();

        let err = run(&DocumentSummary, &input, &output).unwrap_err();
        assert!(err.to_string().contains("not a text document"));
    }
}
