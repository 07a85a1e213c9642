//! Preprint fetcher (C5) — L1.
//!
//! Issues the six fixed category-scoped search queries against the arXiv
//! Atom API, parses entries, and dedups by preprint identifier, merging
//! `matched_queries` across queries that both hit the same paper.

use crate::types::FetchedPaper;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use curator_common::config::ArxivConfig;
use curator_common::retry::arxiv_backoff_delay;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tracing::{instrument, warn};

/// One entry of the fixed `ARXIV_QUERIES` table: category id, human name
/// (used in logging and in the L3 prompt), a URL-encoded `search_query`
/// expression, and the max result count for that category.
#[derive(Debug, Clone, Copy)]
pub struct ArxivQuery {
    pub category_id: i32,
    pub name: &'static str,
    pub search_query: &'static str,
    pub max_results: u32,
}

/// Carried verbatim (in spirit) from the original's `ARXIV_QUERIES`
/// constant: six category-scoped searches over `cat:`/`abs:` terms.
pub const ARXIV_QUERIES: &[ArxivQuery] = &[
    ArxivQuery {
        category_id: 1,
        name: "大規模言語モデル",
        search_query: "cat:cs.CL+AND+abs:%22large+language+model%22",
        max_results: 50,
    },
    ArxivQuery {
        category_id: 2,
        name: "強化学習",
        search_query: "cat:cs.LG+AND+abs:%22reinforcement+learning%22",
        max_results: 50,
    },
    ArxivQuery {
        category_id: 3,
        name: "コンピュータビジョン",
        search_query: "cat:cs.CV",
        max_results: 50,
    },
    ArxivQuery {
        category_id: 4,
        name: "AIエージェント",
        search_query: "abs:%22autonomous+agent%22+OR+abs:%22LLM+agent%22",
        max_results: 50,
    },
    ArxivQuery {
        category_id: 5,
        name: "マルチモーダル学習",
        search_query: "abs:%22multimodal+learning%22",
        max_results: 50,
    },
    ArxivQuery {
        category_id: 6,
        name: "ロボティクス",
        search_query: "cat:cs.RO",
        max_results: 50,
    },
];

/// `[yesterday 00:00 UTC, today 00:00 UTC)`, formatted `YYYYMMDD0000` per
/// §4.5 step 1.
pub fn fetch_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive().and_hms_opt(0, 0, 0).unwrap();
    let today = Utc.from_utc_datetime(&today);
    let yesterday = today - ChronoDuration::days(1);
    (yesterday, today)
}

fn format_window_bound(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%d0000").to_string()
}

pub struct ArxivFetcher {
    client: reqwest::Client,
    config: ArxivConfig,
}

/// Per-query hit count, logged (not only the deduplicated total) per the
/// supplemented-features section of the expanded spec.
#[derive(Debug, Clone)]
pub struct QueryStat {
    pub category_id: i32,
    pub name: &'static str,
    pub raw_hits: usize,
}

pub struct L1Output {
    pub papers: Vec<FetchedPaper>,
    pub query_stats: Vec<QueryStat>,
    /// Pre-dedup total across all queries — the original never propagates
    /// this to the batch log (§9 "true L1 raw count"); this rewrite does.
    pub raw_count: usize,
}

impl ArxivFetcher {
    pub fn new(config: ArxivConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build arXiv HTTP client");
        Self { client, config }
    }

    #[instrument(skip(self), fields(query_count = ARXIV_QUERIES.len()))]
    pub async fn collect_papers(&self, now: DateTime<Utc>) -> L1Output {
        let (start, end) = fetch_window(now);
        let start_s = format_window_bound(start);
        let end_s = format_window_bound(end);

        let mut dedup: HashMap<String, FetchedPaper> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        let mut query_stats = Vec::with_capacity(ARXIV_QUERIES.len());
        let mut raw_count = 0usize;

        for (i, query) in ARXIV_QUERIES.iter().enumerate() {
            let body = self.fetch_query(query, &start_s, &end_s).await;
            let entries = parse_atom(&body);
            raw_count += entries.len();
            query_stats.push(QueryStat {
                category_id: query.category_id,
                name: query.name,
                raw_hits: entries.len(),
            });

            for mut paper in entries {
                paper.matched_queries.insert(query.category_id);
                match dedup.get_mut(&paper.arxiv_id) {
                    Some(existing) => {
                        existing.matched_queries.extend(paper.matched_queries.iter().copied());
                    }
                    None => {
                        order.push(paper.arxiv_id.clone());
                        dedup.insert(paper.arxiv_id.clone(), paper);
                    }
                }
            }

            // Global rate discipline: sleep between queries, but not after
            // the last one.
            if i + 1 < ARXIV_QUERIES.len() {
                tokio::time::sleep(self.config.rate_limit()).await;
            }
        }

        let papers = order
            .into_iter()
            .filter_map(|id| dedup.remove(&id))
            .collect();

        L1Output {
            papers,
            query_stats,
            raw_count,
        }
    }

    /// Issues one query's GET, retrying on 503 with `rate_limit * 3^attempt`
    /// backoff up to `max_retries`. On other non-200 codes or retry
    /// exhaustion, returns empty Atom XML so the caller contributes zero
    /// papers for this category without failing the whole stage.
    async fn fetch_query(&self, query: &ArxivQuery, start: &str, end: &str) -> String {
        let url = format!(
            "{}?search_query={}+AND+submittedDate:[{}+TO+{}]&start=0&max_results={}&sortBy=submittedDate&sortOrder=descending",
            self.config.base_url, query.search_query, start, end, query.max_results
        );

        for attempt in 0..=self.config.max_retries {
            let call_start = std::time::Instant::now();
            let result = self.client.get(&url).send().await;
            let ok = result.is_ok();
            curator_common::metrics::record_external_call(
                "arxiv",
                call_start.elapsed().as_secs_f64(),
                ok,
            );

            match result {
                Ok(resp) if resp.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE => {
                    if attempt < self.config.max_retries {
                        curator_common::metrics::record_retry("arxiv");
                        let delay = arxiv_backoff_delay(self.config.rate_limit(), attempt);
                        warn!(category = query.category_id, attempt, ?delay, "arXiv 503, backing off");
                        tokio::time::sleep(delay).await;
                        continue;
                    } else {
                        warn!(category = query.category_id, "arXiv 503 after exhausting retries");
                        return empty_feed();
                    }
                }
                Ok(resp) if resp.status().is_success() => {
                    return resp.text().await.unwrap_or_else(|_| empty_feed());
                }
                Ok(resp) => {
                    warn!(category = query.category_id, status = %resp.status(), "arXiv returned unhandled status");
                    return empty_feed();
                }
                Err(e) => {
                    warn!(category = query.category_id, error = %e, "arXiv request failed");
                    return empty_feed();
                }
            }
        }

        empty_feed()
    }
}

fn empty_feed() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?><feed xmlns="http://www.w3.org/2005/Atom"></feed>"#
        .to_string()
}

/// Strips a trailing `vN` version suffix from an arXiv id, accepting both
/// the modern `YYYY.NNNNN` and legacy `archive/NNNNNNN` forms. A full
/// `.../abs/...` URL (legacy ids keep their internal `/`) is reduced to the
/// bare id first.
pub fn strip_version(raw: &str) -> String {
    let id = match raw.find("abs/") {
        Some(idx) => &raw[idx + 4..],
        None => raw,
    };
    match id.rfind('v') {
        Some(pos) if pos + 1 < id.len() && id[pos + 1..].chars().all(|c| c.is_ascii_digit()) => {
            id[..pos].to_string()
        }
        _ => id.to_string(),
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses an Atom feed body into normalized `FetchedPaper`s. A malformed
/// entry is skipped with a warning; a whole-document parse failure yields
/// zero papers for the query, per §4.5 edge cases.
fn parse_atom(body: &str) -> Vec<FetchedPaper> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text = true;

    let mut papers = Vec::new();
    let mut buf = Vec::new();

    let mut in_entry = false;
    let mut cur_id: Option<String> = None;
    let mut cur_title: Option<String> = None;
    let mut cur_summary: Option<String> = None;
    let mut cur_published: Option<String> = None;
    let mut cur_authors: Vec<String> = Vec::new();
    let mut cur_pdf_url: Option<String> = None;
    let mut cur_primary_category: Option<String> = None;
    let mut cur_categories: Vec<String> = Vec::new();
    let mut cur_author_name: Option<String> = None;

    #[derive(PartialEq)]
    enum TextTarget {
        None,
        Id,
        Title,
        Summary,
        Published,
        AuthorName,
    }
    let mut target = TextTarget::None;
    let mut parse_failed = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match name.as_str() {
                    "entry" => {
                        in_entry = true;
                        cur_id = None;
                        cur_title = None;
                        cur_summary = None;
                        cur_published = None;
                        cur_authors.clear();
                        cur_pdf_url = None;
                        cur_primary_category = None;
                        cur_categories.clear();
                    }
                    "id" if in_entry => target = TextTarget::Id,
                    "title" if in_entry => target = TextTarget::Title,
                    "summary" if in_entry => target = TextTarget::Summary,
                    "published" if in_entry => target = TextTarget::Published,
                    "name" if in_entry => target = TextTarget::AuthorName,
                    "link" if in_entry => {
                        let mut href = None;
                        let mut title_attr = None;
                        for attr in e.attributes().flatten() {
                            let key = String::from_utf8_lossy(attr.key.local_name().as_ref())
                                .to_string();
                            let value = attr
                                .decode_and_unescape_value(reader.decoder())
                                .unwrap_or_default()
                                .to_string();
                            match key.as_str() {
                                "href" => href = Some(value),
                                "title" => title_attr = Some(value),
                                _ => {}
                            }
                        }
                        if title_attr.as_deref() == Some("pdf") {
                            cur_pdf_url = href;
                        }
                    }
                    "category" if in_entry => {
                        for attr in e.attributes().flatten() {
                            let key = String::from_utf8_lossy(attr.key.local_name().as_ref())
                                .to_string();
                            if key == "term" {
                                let value = attr
                                    .decode_and_unescape_value(reader.decoder())
                                    .unwrap_or_default()
                                    .to_string();
                                cur_categories.push(value);
                            }
                        }
                    }
                    "primary_category" if in_entry => {
                        for attr in e.attributes().flatten() {
                            let key = String::from_utf8_lossy(attr.key.local_name().as_ref())
                                .to_string();
                            if key == "term" {
                                cur_primary_category = Some(
                                    attr.decode_and_unescape_value(reader.decoder())
                                        .unwrap_or_default()
                                        .to_string(),
                                );
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                match target {
                    TextTarget::Id => cur_id = Some(text),
                    TextTarget::Title => cur_title = Some(text),
                    TextTarget::Summary => cur_summary = Some(text),
                    TextTarget::Published => cur_published = Some(text),
                    TextTarget::AuthorName => cur_author_name = Some(text),
                    TextTarget::None => {}
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match name.as_str() {
                    "name" if in_entry => {
                        if let Some(n) = cur_author_name.take() {
                            cur_authors.push(n);
                        }
                    }
                    "entry" => {
                        in_entry = false;
                        match build_entry(
                            cur_id.take(),
                            cur_title.take(),
                            cur_summary.take(),
                            cur_published.take(),
                            std::mem::take(&mut cur_authors),
                            cur_pdf_url.take(),
                            cur_primary_category.take(),
                            std::mem::take(&mut cur_categories),
                        ) {
                            Ok(paper) => papers.push(paper),
                            Err(reason) => warn!(reason, "skipping malformed arXiv entry"),
                        }
                    }
                    _ => {}
                }
                target = TextTarget::None;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(error = %e, "atom feed parse failure, this query contributes zero papers");
                parse_failed = true;
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    if parse_failed {
        return Vec::new();
    }

    papers
}

#[allow(clippy::too_many_arguments)]
fn build_entry(
    id: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    authors: Vec<String>,
    pdf_url: Option<String>,
    primary_category: Option<String>,
    categories: Vec<String>,
) -> Result<FetchedPaper, &'static str> {
    let raw_id = id.ok_or("missing <id>")?;
    let arxiv_id = strip_version(&raw_id);
    let title = collapse_whitespace(&title.ok_or("missing <title>")?);
    let abstract_text = collapse_whitespace(&summary.unwrap_or_default());

    let published_at = published
        .and_then(|p| DateTime::parse_from_rfc3339(&p).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    let primary_category = primary_category
        .or_else(|| categories.first().cloned())
        .unwrap_or_default();

    Ok(FetchedPaper {
        arxiv_id,
        title,
        abstract_text,
        authors,
        pdf_url: pdf_url.unwrap_or_default(),
        primary_category,
        all_categories: categories,
        published_at,
        matched_queries: BTreeSet::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_modern_version_suffix() {
        assert_eq!(strip_version("2402.11111v2"), "2402.11111");
        assert_eq!(strip_version("2402.11111"), "2402.11111");
    }

    #[test]
    fn strips_legacy_version_suffix() {
        assert_eq!(strip_version("hep-ph/0601001v3"), "hep-ph/0601001");
        assert_eq!(strip_version("hep-ph/0601001"), "hep-ph/0601001");
    }

    #[test]
    fn strips_version_from_full_abs_url() {
        assert_eq!(
            strip_version("http://arxiv.org/abs/2402.11111v1"),
            "2402.11111"
        );
    }

    #[test]
    fn parses_single_entry_feed() {
        let xml = r#"<?xml version="1.0"?>
        <feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
          <entry>
            <id>http://arxiv.org/abs/2402.11111v1</id>
            <title>  A   Great   Paper  </title>
            <summary>An abstract with  extra   spaces.</summary>
            <published>2024-02-10T12:00:00Z</published>
            <author><name>Alice Example</name></author>
            <author><name>Bob Example</name></author>
            <link title="pdf" href="http://arxiv.org/pdf/2402.11111v1"/>
            <arxiv:primary_category term="cs.CL"/>
            <category term="cs.CL"/>
            <category term="cs.LG"/>
          </entry>
        </feed>"#;

        let papers = parse_atom(xml);
        assert_eq!(papers.len(), 1);
        let p = &papers[0];
        assert_eq!(p.arxiv_id, "2402.11111");
        assert_eq!(p.title, "A Great Paper");
        assert_eq!(p.abstract_text, "An abstract with extra spaces.");
        assert_eq!(p.authors, vec!["Alice Example", "Bob Example"]);
        assert_eq!(p.pdf_url, "http://arxiv.org/pdf/2402.11111v1");
        assert_eq!(p.primary_category, "cs.CL");
        assert_eq!(p.all_categories, vec!["cs.CL", "cs.LG"]);
    }

    #[test]
    fn malformed_entry_missing_id_is_skipped() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
          <entry><title>No id here</title></entry>
        </feed>"#;
        assert!(parse_atom(xml).is_empty());
    }

    #[test]
    fn garbage_document_yields_zero_papers() {
        assert!(parse_atom("not xml at all <<<").is_empty());
    }

    #[test]
    fn fetch_window_is_midnight_to_midnight_utc() {
        let now = Utc.with_ymd_and_hms(2026, 7, 26, 15, 30, 0).unwrap();
        let (start, end) = fetch_window(now);
        assert_eq!(format_window_bound(start), "202607250000");
        assert_eq!(format_window_bound(end), "202607260000");
    }
}
