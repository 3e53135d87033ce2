//! Final report rendering.
//!
//! The builder reads every artifact in the store (lexicographic order)
//! and renders two views: a flat text transcription and a styled HTML
//! document. Its own output artifacts are excluded from the aggregation,
//! so rebuilding over an unchanged store is byte-identical.

use crate::errors::ReconError;
use crate::store::ArtifactStore;
use std::fmt::Write as _;

/// Name of the plain-text report artifact.
pub const TEXT_ARTIFACT: &str = "report.txt";

/// Name of the HTML report artifact.
pub const HTML_ARTIFACT: &str = "report.html";

/// Both renderings of the final report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Flat text: one delimited section per artifact.
    pub text: String,
    /// Styled document with one section per artifact.
    pub html: String,
}

/// Renders the consolidated report from an artifact store.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    title: String,
}

impl ReportBuilder {
    /// Creates a builder with the given report title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Builds both renderings without writing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn build(&self, store: &dyn ArtifactStore) -> Result<Report, ReconError> {
        let mut sections = Vec::new();
        for name in store.list().await? {
            if name == TEXT_ARTIFACT || name == HTML_ARTIFACT {
                continue;
            }
            let content = store.read(&name).await?;
            sections.push((name, content));
        }

        Ok(Report {
            text: render_text(&sections),
            html: render_html(&self.title, &sections),
        })
    }

    /// Builds both renderings and writes them back into the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub async fn render_into(&self, store: &dyn ArtifactStore) -> Result<Report, ReconError> {
        let report = self.build(store).await?;
        store.write(TEXT_ARTIFACT, &report.text).await?;
        store.write(HTML_ARTIFACT, &report.html).await?;
        Ok(report)
    }
}

/// One delimited header per artifact, content transcribed byte-for-byte.
fn render_text(sections: &[(String, String)]) -> String {
    let mut out = String::new();
    for (name, content) in sections {
        let _ = write!(out, "\n===== {name} =====\n{content}");
    }
    out
}

fn render_html(title: &str, sections: &[(String, String)]) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<html>\n<head>\n<title>{}</title>\n<style>\n\
         body {{ font-family: monospace; background: #0f172a; color: #e5e7eb; }}\n\
         h1, h2 {{ color: #38bdf8; }}\n\
         pre {{ background: #020617; padding: 10px; overflow-x: auto; }}\n\
         </style>\n</head>\n<body>\n<h1>{}</h1>\n",
        escape_html(title),
        escape_html(title)
    );
    for (name, content) in sections {
        let _ = write!(
            out,
            "<h2>{}</h2>\n<pre>{}</pre>\n",
            escape_html(name),
            escape_html(content)
        );
    }
    out.push_str("</body>\n</html>\n");
    out
}

/// Escapes text for embedding in HTML.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_text_report_matches_exact_format() {
        let store = MemStore::new();
        store.write("a.txt", "x").await.expect("write");
        store.write("b.txt", "y").await.expect("write");

        let report = ReportBuilder::new("Recon Report")
            .build(&store)
            .await
            .expect("build");

        assert_eq!(report.text, "\n===== a.txt =====\nx\n===== b.txt =====\ny");
    }

    #[tokio::test]
    async fn test_empty_store_yields_empty_text() {
        let store = MemStore::new();
        let report = ReportBuilder::new("Recon Report")
            .build(&store)
            .await
            .expect("build");
        assert_eq!(report.text, "");
    }

    #[tokio::test]
    async fn test_rebuild_over_unchanged_store_is_byte_identical() {
        let store = MemStore::new();
        store.write("a.txt", "x").await.expect("write");
        store.write("b.txt", "y").await.expect("write");

        let builder = ReportBuilder::new("Recon Report");
        let first = builder.render_into(&store).await.expect("first render");
        // The store now also holds report.txt / report.html; they must
        // not feed back into the second rendering.
        let second = builder.render_into(&store).await.expect("second render");

        assert_eq!(first.text, second.text);
        assert_eq!(first.html, second.html);
    }

    #[tokio::test]
    async fn test_html_escapes_content() {
        let store = MemStore::new();
        store
            .write("alive.txt", "<script>alert(1)</script>")
            .await
            .expect("write");

        let report = ReportBuilder::new("Recon Report")
            .build(&store)
            .await
            .expect("build");

        assert!(!report.html.contains("<script>alert"));
        assert!(report.html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[tokio::test]
    async fn test_html_lists_every_artifact_section() {
        let store = MemStore::new();
        store.write("ports.txt", "80\n443\n").await.expect("write");
        store.write("tech.txt", "nginx\n").await.expect("write");

        let report = ReportBuilder::new("Recon Report")
            .build(&store)
            .await
            .expect("build");

        assert!(report.html.contains("<h2>ports.txt</h2>"));
        assert!(report.html.contains("<h2>tech.txt</h2>"));
        let ports_at = report.html.find("ports.txt").expect("ports section");
        let tech_at = report.html.find("tech.txt").expect("tech section");
        assert!(ports_at < tech_at, "sections follow store order");
    }

    #[tokio::test]
    async fn test_render_into_writes_both_artifacts() {
        let store = MemStore::new();
        store.write("a.txt", "x").await.expect("write");

        ReportBuilder::new("Recon Report")
            .render_into(&store)
            .await
            .expect("render");

        assert!(store.contains(TEXT_ARTIFACT).await.expect("contains"));
        assert!(store.contains(HTML_ARTIFACT).await.expect("contains"));
    }
}
