//! Optional Grobid structure source.
//!
//! [Grobid](https://github.com/kermitt2/grobid) segments scholarly PDFs
//! into TEI XML with a real header model, so its title, abstract and
//! `<div><head>` divisions are usually better than heading-line guesses.
//! It is an external HTTP service, so it is only used when the caller
//! configures `grobid_url`; failures are fatal rather than silently
//! degrading to the heading pass, so a misconfigured URL is noticed.

use crate::error::RelworkError;
use crate::pipeline::clean::normalize_whitespace;
use crate::pipeline::headings::{Division, DocumentStructure};
use crate::sections::{ExtractedSection, SectionOrigin};
use roxmltree::{Document, Node};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const TEI_NS: &str = "http://www.tei-c.org/ns/1.0";
const FULLTEXT_ENDPOINT: &str = "api/processFulltextDocument";

/// Send a PDF to Grobid and parse the returned TEI into a structure.
pub async fn fetch_structure(
    pdf_path: &Path,
    grobid_url: &str,
    timeout_secs: u64,
) -> Result<DocumentStructure, RelworkError> {
    let url = format!("{}/{}", grobid_url.trim_end_matches('/'), FULLTEXT_ENDPOINT);
    info!("Requesting TEI structure from Grobid: {}", url);

    let fail = |reason: String| RelworkError::GrobidFailed {
        url: url.clone(),
        reason,
    };

    let bytes = tokio::fs::read(pdf_path)
        .await
        .map_err(|e| fail(format!("cannot read {}: {e}", pdf_path.display())))?;

    let file_name = pdf_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "paper.pdf".to_string());

    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("application/pdf")
        .map_err(|e| fail(e.to_string()))?;
    let form = reqwest::multipart::Form::new()
        .part("input", part)
        .text("consolidateHeader", "1")
        .text("consolidateCitations", "0");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| fail(e.to_string()))?;

    let response = client
        .post(&url)
        .multipart(form)
        .send()
        .await
        .map_err(|e| fail(e.to_string()))?;

    if !response.status().is_success() {
        return Err(fail(format!("HTTP {}", response.status())));
    }

    let tei = response.text().await.map_err(|e| fail(e.to_string()))?;
    debug!("Grobid returned {} bytes of TEI", tei.len());

    parse_tei(&tei).map_err(|e| fail(format!("invalid TEI: {e}")))
}

/// Parse a Grobid TEI document.
pub fn parse_tei(xml: &str) -> Result<DocumentStructure, roxmltree::Error> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();
    let mut structure = DocumentStructure::empty(SectionOrigin::Grobid);

    structure.title = root
        .descendants()
        .find(|n| is_tei(n, "titleStmt"))
        .and_then(|stmt| stmt.children().find(|n| is_tei(n, "title")))
        .map(|n| all_text(&n))
        .filter(|t| !t.is_empty())
        .map(|t| ExtractedSection::new(t, SectionOrigin::Grobid));

    structure.abstract_text = root
        .descendants()
        .find(|n| is_tei(n, "abstract"))
        .map(|n| all_text(&n))
        .filter(|t| !t.is_empty());

    for div in root.descendants().filter(|n| is_tei(n, "div")) {
        let Some(head) = div.children().find(|n| is_tei(n, "head")) else {
            continue;
        };
        let head_text = all_text(&head);
        if head_text.is_empty() {
            continue;
        }
        let body: Vec<String> = div
            .children()
            .filter(|n| n.is_element() && !is_tei(n, "head"))
            .map(|n| all_text(&n))
            .filter(|t| !t.is_empty())
            .collect();
        structure.divisions.push(Division {
            head: head_text,
            body: body.join(" "),
        });
    }

    debug!(
        "TEI parsed: title={}, abstract={}, {} divisions",
        structure.title.is_some(),
        structure.abstract_text.is_some(),
        structure.divisions.len()
    );

    Ok(structure)
}

fn is_tei(node: &Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.has_tag_name((TEI_NS, name))
}

/// Every text node below `node`, space-joined and whitespace-collapsed.
fn all_text(node: &Node<'_, '_>) -> String {
    let parts: Vec<&str> = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    normalize_whitespace(&parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEI: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader>
    <fileDesc>
      <titleStmt>
        <title level="a" type="main">Explaining Relationships Among Research Papers</title>
      </titleStmt>
    </fileDesc>
    <profileDesc>
      <abstract>
        <div><p>We generate related work
          sections with LLMs.</p></div>
      </abstract>
    </profileDesc>
  </teiHeader>
  <text>
    <body>
      <div><head n="1">Introduction</head><p>Citations matter.</p><p>We study them.</p></div>
      <div><p>Orphan paragraph without a heading.</p></div>
      <div><head n="6">Conclusions</head><p>We find Y.</p></div>
    </body>
  </text>
</TEI>"#;

    #[test]
    fn parses_title_abstract_and_divisions() {
        let s = parse_tei(TEI).unwrap();
        let title = s.title.unwrap();
        assert_eq!(title.text, "Explaining Relationships Among Research Papers");
        assert_eq!(title.origin, SectionOrigin::Grobid);
        assert_eq!(
            s.abstract_text.as_deref(),
            Some("We generate related work sections with LLMs.")
        );
        assert_eq!(s.origin, SectionOrigin::Grobid);

        // Abstract div has no head, orphan div has no head: only two divisions.
        assert_eq!(s.divisions.len(), 2);
        assert_eq!(s.divisions[0].head, "Introduction");
        assert_eq!(s.divisions[0].body, "Citations matter. We study them.");
        assert_eq!(s.divisions[1].text(), "Conclusions We find Y.");
    }

    #[test]
    fn find_division_matches_plural_heading() {
        let s = parse_tei(TEI).unwrap();
        let d = s.find_division(&["Conclusions", "Conclusion"]).unwrap();
        assert_eq!(d.head, "Conclusions");
    }

    #[test]
    fn rejects_malformed_xml() {
        assert!(parse_tei("<TEI><unclosed></TEI>").is_err());
    }

    #[test]
    fn elements_outside_tei_namespace_are_ignored() {
        let xml = r#"<TEI><titleStmt><title>No namespace</title></titleStmt></TEI>"#;
        let s = parse_tei(xml).unwrap();
        assert!(s.title.is_none());
    }
}
