//! arXiv API client.
//!
//! Issues a single search request against the arXiv Atom API and turns the
//! feed into [`PaperRecord`]s. Transport failures are absorbed into an empty
//! result and a malformed entry only costs that entry.
//!
//! API Details:
//! - Endpoint: GET /api/query
//! - Parameters: search_query, start, max_results, sortBy, sortOrder
//! - Response: Atom XML, one `<entry>` per paper

use crate::error::{OptionExt, Result, SurveyError};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// arXiv API base URL
pub const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// A paper parsed from one feed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    /// Abstract text
    pub summary: String,
    /// Entry `<id>`, the abs-page URL
    pub link: String,
    pub published_year: i32,
    pub authors: Vec<String>,
}

/// Sort key accepted by the arXiv API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortBy {
    #[default]
    #[serde(rename = "relevance")]
    Relevance,
    #[serde(rename = "submittedDate")]
    SubmittedDate,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevance => "relevance",
            SortBy::SubmittedDate => "submittedDate",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "relevance" => Ok(SortBy::Relevance),
            "submittedDate" => Ok(SortBy::SubmittedDate),
            other => Err(SurveyError::Validation(format!(
                "Unknown sort key '{}', expected relevance or submittedDate",
                other
            ))),
        }
    }
}

/// Query options for arXiv search
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Result-count cap sent as `max_results`
    pub max_results: u32,
    pub sort_by: SortBy,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            max_results: 20,
            sort_by: SortBy::Relevance,
        }
    }
}

/// arXiv API client
#[derive(Debug, Clone)]
pub struct ArxivClient {
    client: reqwest::Client,
    base_url: String,
}

impl ArxivClient {
    /// Create a client for the public arXiv endpoint
    pub fn new() -> Result<Self> {
        Self::with_base_url(ARXIV_API_URL)
    }

    /// Create a client for a custom endpoint (mirrors, tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("litsurvey/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SurveyError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Search arXiv and return every entry that parsed.
    ///
    /// Never fails: a timeout, connection error or error status is logged and
    /// reported as an empty list, which callers treat as "no papers found".
    pub async fn fetch(&self, query: &str, options: &QueryOptions) -> Vec<PaperRecord> {
        match self.try_fetch(query, options).await {
            Ok(papers) => papers,
            Err(e) => {
                warn!(query = query, error = %e, "arXiv fetch failed, treating as no results");
                Vec::new()
            }
        }
    }

    /// Same as [`ArxivClient::fetch`] but reports transport errors.
    pub async fn try_fetch(&self, query: &str, options: &QueryOptions) -> Result<Vec<PaperRecord>> {
        let url = self.build_search_url(query, options)?;

        info!(
            query = query,
            max_results = options.max_results,
            sort_by = %options.sort_by,
            "Starting arXiv query"
        );
        debug!(url = %url, "Fetching feed");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SurveyError::Api {
                code: status.as_u16() as i32,
                message: format!("arXiv API error: {}", status),
            });
        }

        let body = response.text().await?;
        let papers = parse_feed(&body);

        info!(count = papers.len(), "arXiv query complete");
        Ok(papers)
    }

    /// Build the search URL with the fixed parameter set
    fn build_search_url(&self, query: &str, options: &QueryOptions) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SurveyError::Config(format!("Invalid base URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("search_query", &format!("all:{}", query))
            .append_pair("start", "0")
            .append_pair("max_results", &options.max_results.to_string())
            .append_pair("sortBy", options.sort_by.as_str())
            .append_pair("sortOrder", "descending");

        Ok(url)
    }
}

/// Entry element whose text is being collected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Summary,
    Id,
    Published,
    AuthorName,
}

impl Field {
    fn from_tag(tag: &[u8], in_author: bool) -> Option<Self> {
        match (tag, in_author) {
            (b"name", true) => Some(Field::AuthorName),
            (_, true) => None,
            (b"title", false) => Some(Field::Title),
            (b"summary", false) => Some(Field::Summary),
            (b"id", false) => Some(Field::Id),
            (b"published", false) => Some(Field::Published),
            _ => None,
        }
    }

    fn tag(self) -> &'static [u8] {
        match self {
            Field::Title => b"title",
            Field::Summary => b"summary",
            Field::Id => b"id",
            Field::Published => b"published",
            Field::AuthorName => b"name",
        }
    }
}

/// Fields collected for one `<entry>`; every required one is optional until
/// the entry closes.
#[derive(Debug, Default)]
struct EntryDraft {
    title: Option<String>,
    summary: Option<String>,
    link: Option<String>,
    published: Option<String>,
    authors: Vec<String>,
}

impl EntryDraft {
    fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Title => self.title = Some(value),
            Field::Summary => self.summary = Some(value),
            Field::Id => self.link = Some(value),
            Field::Published => self.published = Some(value),
            Field::AuthorName => self.authors.push(value),
        }
    }

    fn finish(self) -> Result<PaperRecord> {
        let title = self.title.ok_or_parse("missing <title>")?;
        let summary = self.summary.ok_or_parse("missing <summary>")?;
        let link = self.link.ok_or_parse("missing <id>")?;
        let published = self.published.ok_or_parse("missing <published>")?;
        let published_year = parse_year(&published)?;

        Ok(PaperRecord {
            title,
            summary,
            link,
            published_year,
            authors: self.authors,
        })
    }
}

/// Year from a published date: the integer before the first `-`
pub fn parse_year(published: &str) -> Result<i32> {
    let head = published.split('-').next().unwrap_or_default();
    head.trim().parse::<i32>().map_err(|e| {
        SurveyError::Parse(format!("Invalid published date '{}': {}", published, e))
    })
}

/// Parse an arXiv Atom feed into paper records.
///
/// The document is cut at every `<entry>` start tag and each piece is read
/// on its own, so broken markup only costs the entry it sits in. Entries
/// missing `<title>`, `<summary>`, `<id>` or `<published>`, or with a
/// published date that has no integer year, are skipped too; the others are
/// kept in feed order.
pub fn parse_feed(xml: &str) -> Vec<PaperRecord> {
    let mut papers = Vec::new();
    let mut dropped = 0usize;

    for (index, chunk) in entry_chunks(xml).into_iter().enumerate() {
        match parse_entry(chunk) {
            Ok(paper) => papers.push(paper),
            Err(err) => {
                dropped += 1;
                debug!(index = index, error = %err, "Skipping entry");
            }
        }
    }

    if dropped > 0 {
        info!(kept = papers.len(), dropped = dropped, "Skipped malformed entries");
    }

    papers
}

/// Slices of `xml` each starting at an `<entry>` start tag and running to
/// the next one. Whatever precedes the first entry is discarded.
fn entry_chunks(xml: &str) -> Vec<&str> {
    let bytes = xml.as_bytes();
    let starts: Vec<usize> = xml
        .match_indices("<entry")
        .map(|(i, _)| i)
        .filter(|&i| {
            matches!(bytes.get(i + "<entry".len()), Some(b) if *b == b'>' || *b == b'/' || b.is_ascii_whitespace())
        })
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(xml.len());
            &xml[start..end]
        })
        .collect()
}

/// Read one entry chunk up to its closing `</entry>`
fn parse_entry(chunk: &str) -> Result<PaperRecord> {
    let mut reader = Reader::from_str(chunk);

    let mut draft = EntryDraft::default();
    let mut in_author = false;
    let mut field: Option<Field> = None;
    // Child elements open inside the current field, e.g. <sub> in a title
    let mut nested = 0usize;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let tag = name.as_ref();
                if field.is_some() {
                    nested += 1;
                } else if tag == b"author" {
                    in_author = true;
                } else if tag != b"entry" {
                    field = Field::from_tag(tag, in_author);
                    text.clear();
                }
            }
            Ok(Event::Empty(e)) if field.is_none() && e.name().as_ref() == b"entry" => {
                return draft.finish();
            }
            Ok(Event::Text(t)) if field.is_some() => {
                let s = t
                    .unescape()
                    .map_err(|e| SurveyError::Parse(format!("Bad character data: {}", e)))?;
                text.push_str(&s);
            }
            Ok(Event::CData(c)) if field.is_some() => {
                text.push_str(&String::from_utf8_lossy(&c));
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let tag = name.as_ref();
                match field {
                    Some(_) if nested > 0 => nested -= 1,
                    Some(f) if f.tag() == tag => {
                        draft.set(f, text.trim().to_string());
                        text.clear();
                        field = None;
                    }
                    Some(_) => {}
                    None if tag == b"author" => in_author = false,
                    None if tag == b"entry" => return draft.finish(),
                    None => {}
                }
            }
            Ok(Event::Eof) => {
                return Err(SurveyError::Parse("entry is not closed".to_string()));
            }
            Err(e) => {
                return Err(SurveyError::Parse(format!(
                    "Malformed entry at byte {}: {}",
                    reader.error_position(),
                    e
                )));
            }
            _ => {}
        }
    }
}
