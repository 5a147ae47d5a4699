//! arXiv search client and the tools exposing it to the analysis roles.
//!
//! Search failures never abort a run: network, HTTP and feed errors are
//! logged and reported back as a diagnostic, so a role can carry on with
//! whatever it already knows.

use crate::tools::registry::Tool;
use crate::types::{AppError, PaperRecord, Result};
use crate::utils::config::SearchConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

const USER_AGENT: &str = concat!("paper-panel/", env!("CARGO_PKG_VERSION"));
const ABSTRACT_PREVIEW_CHARS: usize = 300;

/// Result of a search query
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found(Vec<PaperRecord>),
    NoResults { diagnostic: String },
}

impl SearchOutcome {
    pub fn papers(&self) -> &[PaperRecord] {
        match self {
            SearchOutcome::Found(papers) => papers,
            SearchOutcome::NoResults { .. } => &[],
        }
    }
}

/// Result of an id lookup
#[derive(Debug, Clone, PartialEq)]
pub enum PaperLookup {
    Found(PaperRecord),
    NotFound { diagnostic: String },
}

/// Why a single fetch failed. Only transport-level failures are retried.
#[derive(Debug)]
enum FetchError {
    Timeout(String),
    Connect(String),
    Http(u16),
    Parse(String),
    /// arXiv answered with an error entry (e.g. malformed id)
    Api(String),
}

impl FetchError {
    fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Timeout(_) | FetchError::Connect(_))
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Timeout(e) => write!(f, "arXiv request timed out: {}", e),
            FetchError::Connect(e) => write!(f, "arXiv request failed: {}", e),
            FetchError::Http(status) => write!(f, "arXiv API returned HTTP {}", status),
            FetchError::Parse(e) => write!(f, "could not parse arXiv feed: {}", e),
            FetchError::Api(e) => write!(f, "arXiv API error: {}", e),
        }
    }
}

#[derive(Clone)]
pub struct ArxivClient {
    http: reqwest::Client,
    config: SearchConfig,
}

impl ArxivClient {
    pub fn new(config: SearchConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    fn clamp(&self, max_results: usize) -> usize {
        max_results.clamp(1, self.config.max_results.max(1))
    }

    /// Full-text search, most relevant first.
    pub async fn search(&self, query: &str, max_results: usize) -> SearchOutcome {
        let query = query.trim();
        if query.is_empty() {
            return SearchOutcome::NoResults {
                diagnostic: "empty search query".to_string(),
            };
        }
        let params = [
            ("search_query", format!("all:{}", query)),
            ("start", "0".to_string()),
            ("max_results", self.clamp(max_results).to_string()),
            ("sortBy", "relevance".to_string()),
            ("sortOrder", "descending".to_string()),
        ];
        self.run_search(&params, &format!("query '{}'", query)).await
    }

    /// Papers by an author, newest first.
    pub async fn search_by_author(&self, name: &str, max_results: usize) -> SearchOutcome {
        let name = name.trim();
        if name.is_empty() {
            return SearchOutcome::NoResults {
                diagnostic: "empty author name".to_string(),
            };
        }
        let params = [
            ("search_query", format!("au:{}", name)),
            ("start", "0".to_string()),
            ("max_results", self.clamp(max_results).to_string()),
            ("sortBy", "submittedDate".to_string()),
            ("sortOrder", "descending".to_string()),
        ];
        self.run_search(&params, &format!("author '{}'", name)).await
    }

    /// Fetch a single paper by arXiv id.
    pub async fn get(&self, id: &str) -> PaperLookup {
        let id = id.trim().trim_start_matches("arXiv:");
        if id.is_empty() {
            return PaperLookup::NotFound {
                diagnostic: "empty arXiv id".to_string(),
            };
        }
        let params = [
            ("id_list", id.to_string()),
            ("max_results", "1".to_string()),
        ];
        match self.fetch(&params).await {
            Ok(mut papers) if !papers.is_empty() => PaperLookup::Found(papers.remove(0)),
            Ok(_) => PaperLookup::NotFound {
                diagnostic: format!("no paper with id '{}'", id),
            },
            Err(e) => {
                tracing::warn!("arXiv lookup for '{}' failed: {}", id, e);
                PaperLookup::NotFound {
                    diagnostic: e.to_string(),
                }
            }
        }
    }

    async fn run_search(&self, params: &[(&str, String)], what: &str) -> SearchOutcome {
        match self.fetch(params).await {
            Ok(papers) if !papers.is_empty() => {
                tracing::info!("arXiv returned {} paper(s) for {}", papers.len(), what);
                SearchOutcome::Found(papers)
            }
            Ok(_) => SearchOutcome::NoResults {
                diagnostic: format!("no papers found for {}", what),
            },
            Err(e) => {
                tracing::warn!("arXiv search for {} failed: {}", what, e);
                SearchOutcome::NoResults {
                    diagnostic: e.to_string(),
                }
            }
        }
    }

    async fn fetch(
        &self,
        params: &[(&str, String)],
    ) -> std::result::Result<Vec<PaperRecord>, FetchError> {
        let mut attempt: u32 = 0;
        loop {
            match self.fetch_once(params).await {
                Err(e) if e.is_retryable() && attempt < self.config.retry_attempts => {
                    attempt += 1;
                    tracing::warn!(
                        "{} (retry {}/{} in {:?})",
                        e,
                        attempt,
                        self.config.retry_attempts,
                        self.config.retry_delay
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                other => return other,
            }
        }
    }

    async fn fetch_once(
        &self,
        params: &[(&str, String)],
    ) -> std::result::Result<Vec<PaperRecord>, FetchError> {
        let response = self
            .http
            .get(&self.config.api_base)
            .query(params)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }

        let body = response.text().await.map_err(classify)?;
        parse_feed(&body)
    }
}

fn classify(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(e.to_string())
    } else if e.is_connect() || e.is_request() {
        FetchError::Connect(e.to_string())
    } else {
        FetchError::Parse(e.to_string())
    }
}

// ============= Atom feed parsing =============

#[derive(Default)]
struct EntryBuilder {
    id: String,
    title: String,
    summary: String,
    published: String,
    updated: String,
    authors: Vec<String>,
    categories: BTreeSet<String>,
    primary_category: Option<String>,
    abs_url: Option<String>,
    pdf_url: Option<String>,
}

impl EntryBuilder {
    fn build(self) -> std::result::Result<PaperRecord, FetchError> {
        if self.id.contains("/api/errors") {
            return Err(FetchError::Api(collapse_whitespace(&self.summary)));
        }
        let id = self
            .id
            .split("/abs/")
            .nth(1)
            .unwrap_or(&self.id)
            .trim()
            .to_string();
        if id.is_empty() {
            return Err(FetchError::Parse("entry without id".to_string()));
        }
        Ok(PaperRecord {
            abs_url: self
                .abs_url
                .unwrap_or_else(|| format!("http://arxiv.org/abs/{}", id)),
            id,
            title: collapse_whitespace(&self.title),
            authors: self.authors,
            summary: collapse_whitespace(&self.summary),
            categories: self.categories,
            primary_category: self.primary_category,
            published: parse_date(&self.published),
            updated: parse_date(&self.updated),
            pdf_url: self.pdf_url,
        })
    }

    fn on_link(&mut self, e: &BytesStart<'_>) {
        let href = attr(e, b"href");
        let rel = attr(e, b"rel");
        let title = attr(e, b"title");
        let kind = attr(e, b"type");
        let Some(href) = href else { return };
        if title.as_deref() == Some("pdf") || kind.as_deref() == Some("application/pdf") {
            self.pdf_url.get_or_insert(href);
        } else if rel.as_deref() == Some("alternate") {
            self.abs_url.get_or_insert(href);
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    Updated,
    AuthorName,
}

fn local_name(raw: &[u8]) -> &[u8] {
    match raw.iter().position(|b| *b == b':') {
        Some(ix) => &raw[ix + 1..],
        None => raw,
    }
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Parse an arXiv Atom feed into paper records.
fn parse_feed(xml: &str) -> std::result::Result<Vec<PaperRecord>, FetchError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut papers = Vec::new();
    let mut entry: Option<EntryBuilder> = None;
    let mut field: Option<Field> = None;
    let mut saw_feed = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| FetchError::Parse(e.to_string()))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = e.name();
                let tag = local_name(name.as_ref());
                if tag == b"feed" {
                    saw_feed = true;
                } else if tag == b"entry" {
                    entry = Some(EntryBuilder::default());
                } else if let Some(b) = entry.as_mut() {
                    match tag {
                        b"link" => b.on_link(e),
                        b"category" => {
                            if let Some(term) = attr(e, b"term") {
                                b.categories.insert(term);
                            }
                        }
                        b"primary_category" => b.primary_category = attr(e, b"term"),
                        b"id" if !is_empty => field = Some(Field::Id),
                        b"title" if !is_empty => field = Some(Field::Title),
                        b"summary" if !is_empty => field = Some(Field::Summary),
                        b"published" if !is_empty => field = Some(Field::Published),
                        b"updated" if !is_empty => field = Some(Field::Updated),
                        b"name" if !is_empty => field = Some(Field::AuthorName),
                        _ => {}
                    }
                }
            }
            Event::Text(t) => {
                if let (Some(f), Some(b)) = (field, entry.as_mut()) {
                    let text = t
                        .unescape()
                        .map_err(|e| FetchError::Parse(e.to_string()))?;
                    match f {
                        Field::Id => b.id.push_str(&text),
                        Field::Title => b.title.push_str(&text),
                        Field::Summary => b.summary.push_str(&text),
                        Field::Published => b.published.push_str(&text),
                        Field::Updated => b.updated.push_str(&text),
                        Field::AuthorName => b.authors.push(text.trim().to_string()),
                    }
                }
            }
            Event::End(ref e) => {
                let name = e.name();
                if local_name(name.as_ref()) == b"entry" {
                    if let Some(b) = entry.take() {
                        papers.push(b.build()?);
                    }
                }
                field = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_feed {
        return Err(FetchError::Parse("response is not an Atom feed".to_string()));
    }
    Ok(papers)
}

// ============= Rendering for the roles =============

/// Render papers as a compact listing the roles can read and cite.
pub fn format_for_agent(papers: &[PaperRecord]) -> String {
    if papers.is_empty() {
        return "No papers found.".to_string();
    }

    let mut out = format!("Found {} paper(s):\n\n", papers.len());
    for (i, paper) in papers.iter().enumerate() {
        out.push_str(&format!("**Paper {}:**\n", i + 1));
        out.push_str(&format!("Title: {}\n", paper.title));
        out.push_str(&format!("ArXiv ID: {}\n", paper.id));
        out.push_str(&format!("Authors: {}\n", paper.author_line(3)));
        if let Some(date) = paper.published_date() {
            out.push_str(&format!("Published: {}\n", date));
        }
        if !paper.categories.is_empty() {
            let cats: Vec<&str> = paper.categories.iter().map(String::as_str).collect();
            out.push_str(&format!("Categories: {}\n", cats.join(", ")));
        }
        let preview: String = paper.summary.chars().take(ABSTRACT_PREVIEW_CHARS).collect();
        if preview.len() < paper.summary.len() {
            out.push_str(&format!("Abstract: {}...\n", preview));
        } else {
            out.push_str(&format!("Abstract: {}\n", preview));
        }
        out.push_str(&format!("URL: {}\n", paper.abs_url));
        if let Some(pdf) = &paper.pdf_url {
            out.push_str(&format!("PDF: {}\n", pdf));
        }
        out.push_str("\n---\n\n");
    }
    out
}

fn tool_payload(papers: &[PaperRecord], diagnostic: Option<&str>) -> Result<Value> {
    let listing = match diagnostic {
        Some(d) if papers.is_empty() => format!("No papers found ({}).", d),
        _ => format_for_agent(papers),
    };
    Ok(json!({
        "listing": listing,
        "papers": serde_json::to_value(papers)
            .map_err(|e| AppError::Internal(format!("Failed to encode papers: {}", e)))?,
        "diagnostic": diagnostic,
    }))
}

fn outcome_payload(outcome: SearchOutcome) -> Result<Value> {
    match outcome {
        SearchOutcome::Found(papers) => tool_payload(&papers, None),
        SearchOutcome::NoResults { diagnostic } => tool_payload(&[], Some(&diagnostic)),
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::Search(format!("Missing '{}' parameter", key)))
}

fn max_results_arg(args: &Value, default: usize) -> usize {
    args.get("max_results")
        .and_then(|v| v.as_u64())
        .map(|n| n as usize)
        .unwrap_or(default)
}

/// Full-text arXiv search
pub struct SearchArxivTool {
    client: Arc<ArxivClient>,
}

impl SearchArxivTool {
    pub fn new(client: Arc<ArxivClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for SearchArxivTool {
    fn name(&self) -> &str {
        "search_arxiv"
    }

    fn description(&self) -> &str {
        "Search arXiv for papers matching a query, most relevant first"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search terms, e.g. a framework or technique name"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of papers to return (default: 5)",
                    "default": 5
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let query = required_str(&args, "query")?;
        let outcome = self
            .client
            .search(query, max_results_arg(&args, 5))
            .await;
        outcome_payload(outcome)
    }
}

/// arXiv search by author name
pub struct SearchByAuthorTool {
    client: Arc<ArxivClient>,
}

impl SearchByAuthorTool {
    pub fn new(client: Arc<ArxivClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for SearchByAuthorTool {
    fn name(&self) -> &str {
        "search_arxiv_by_author"
    }

    fn description(&self) -> &str {
        "Find recent arXiv papers by an author, newest first"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "author": {
                    "type": "string",
                    "description": "Author name, e.g. 'Shunyu Yao'"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of papers to return (default: 5)",
                    "default": 5
                }
            },
            "required": ["author"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let author = required_str(&args, "author")?;
        let outcome = self
            .client
            .search_by_author(author, max_results_arg(&args, 5))
            .await;
        outcome_payload(outcome)
    }
}

/// Single paper lookup by arXiv id
pub struct GetPaperTool {
    client: Arc<ArxivClient>,
}

impl GetPaperTool {
    pub fn new(client: Arc<ArxivClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetPaperTool {
    fn name(&self) -> &str {
        "get_arxiv_paper"
    }

    fn description(&self) -> &str {
        "Fetch the full metadata and abstract of one arXiv paper by id"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "arxiv_id": {
                    "type": "string",
                    "description": "arXiv identifier, e.g. '2210.03629'"
                }
            },
            "required": ["arxiv_id"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let id = required_str(&args, "arxiv_id")?;
        match self.client.get(id).await {
            PaperLookup::Found(paper) => {
                let mut payload = tool_payload(std::slice::from_ref(&paper), None)?;
                // A single lookup shows the whole abstract
                payload["listing"] = json!(format!(
                    "Title: {}\nArXiv ID: {}\nAuthors: {}\nAbstract: {}\nURL: {}",
                    paper.title,
                    paper.id,
                    paper.authors.join(", "),
                    paper.summary,
                    paper.abs_url
                ));
                Ok(payload)
            }
            PaperLookup::NotFound { diagnostic } => tool_payload(&[], Some(&diagnostic)),
        }
    }
}

/// Papers carried in a tool result payload, if any.
pub fn papers_in_payload(payload: &Value) -> Vec<PaperRecord> {
    payload
        .get("papers")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query: search_query=all:ReAct</title>
  <id>http://arxiv.org/api/abc</id>
  <updated>2024-01-01T00:00:00-05:00</updated>
  <entry>
    <id>http://arxiv.org/abs/2210.03629v3</id>
    <updated>2023-03-10T01:00:32Z</updated>
    <published>2022-10-06T01:00:32Z</published>
    <title>ReAct: Synergizing Reasoning and
      Acting in Language Models</title>
    <summary>  While large language models have demonstrated impressive
      capabilities across tasks in language understanding.  </summary>
    <author><name>Shunyu Yao</name></author>
    <author><name>Jeffrey Zhao</name></author>
    <author><name>Dian Yu</name></author>
    <author><name>Nan Du</name></author>
    <link href="http://arxiv.org/abs/2210.03629v3" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2210.03629v3" rel="related" type="application/pdf"/>
    <arxiv:primary_category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.AI" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed_entry() {
        let papers = parse_feed(SAMPLE_FEED).unwrap();
        assert_eq!(papers.len(), 1);
        let p = &papers[0];
        assert_eq!(p.id, "2210.03629v3");
        assert_eq!(
            p.title,
            "ReAct: Synergizing Reasoning and Acting in Language Models"
        );
        assert_eq!(p.authors.len(), 4);
        assert_eq!(p.authors[0], "Shunyu Yao");
        assert!(p.summary.starts_with("While large language models"));
        assert_eq!(p.primary_category.as_deref(), Some("cs.CL"));
        assert!(p.categories.contains("cs.AI"));
        assert_eq!(p.pdf_url.as_deref(), Some("http://arxiv.org/pdf/2210.03629v3"));
        assert_eq!(p.abs_url, "http://arxiv.org/abs/2210.03629v3");
        assert_eq!(p.published_date().as_deref(), Some("2022-10-06"));
    }

    #[test]
    fn test_parse_empty_feed() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>empty</title></feed>"#;
        assert!(parse_feed(xml).unwrap().is_empty());
    }

    #[test]
    fn test_parse_api_error_entry() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
          <entry>
            <id>http://arxiv.org/api/errors#incorrect_id_format_for_xyz</id>
            <title>Error</title>
            <summary>incorrect id format for xyz</summary>
          </entry>
        </feed>"#;
        let err = parse_feed(xml).unwrap_err();
        assert!(matches!(err, FetchError::Api(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_parse_rejects_non_feed() {
        assert!(parse_feed("<html><body>rate limited</body></html>").is_err());
    }

    #[test]
    fn test_format_for_agent() {
        let papers = parse_feed(SAMPLE_FEED).unwrap();
        let listing = format_for_agent(&papers);
        assert!(listing.starts_with("Found 1 paper(s):"));
        assert!(listing.contains("ArXiv ID: 2210.03629v3"));
        assert!(listing.contains("Shunyu Yao, Jeffrey Zhao, Dian Yu et al. (4 authors)"));
        assert!(listing.contains("Categories: cs.AI, cs.CL"));
        assert_eq!(format_for_agent(&[]), "No papers found.");
    }

    #[test]
    fn test_abstract_truncated() {
        let mut papers = parse_feed(SAMPLE_FEED).unwrap();
        papers[0].summary = "x".repeat(400);
        let listing = format_for_agent(&papers);
        assert!(listing.contains(&format!("Abstract: {}...", "x".repeat(300))));
    }

    #[test]
    fn test_payload_roundtrips_papers() {
        let papers = parse_feed(SAMPLE_FEED).unwrap();
        let payload = tool_payload(&papers, None).unwrap();
        assert_eq!(papers_in_payload(&payload), papers);
        assert!(payload["diagnostic"].is_null());
    }

    #[tokio::test]
    async fn test_blank_query_skips_network() {
        let client = ArxivClient::new(SearchConfig {
            api_base: "http://127.0.0.1:9/unreachable".into(),
            ..SearchConfig::default()
        })
        .unwrap();
        assert!(matches!(
            client.search("   ", 5).await,
            SearchOutcome::NoResults { .. }
        ));
        assert!(matches!(client.get("").await, PaperLookup::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_query_argument() {
        let client = Arc::new(ArxivClient::new(SearchConfig::default()).unwrap());
        let tool = SearchArxivTool::new(client);
        let err = tool.execute(json!({})).await.unwrap_err();
        assert!(matches!(err, AppError::Search(_)));
        assert!(!err.is_fatal());
    }
}
