use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use parking_lot::RwLock;
use crate::aggregation::aggregate_all;
use crate::core::config::Config;
use crate::core::error::Result;
use crate::index::collection::Index;
use crate::query::matcher;
use crate::schema::schema::Schema;
use crate::search::highlight::{self, Highlighter};
use crate::search::request::SearchRequest;
use crate::search::results::{ScoredHit, SearchResults};
use crate::search::scroll::{parse_keep_alive, ScrollManager};
use crate::search::sort::sort_hits;

/// Runs a search request over one or more indexes.
///
/// Each index is locked for reading only while it is scored; sorting,
/// aggregation, paging and highlighting work on owned hits.
pub struct QueryExecutor<'a> {
    config: &'a Config,
    scrolls: &'a ScrollManager,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(config: &'a Config, scrolls: &'a ScrollManager) -> Self {
        QueryExecutor { config, scrolls }
    }

    pub fn execute(&self, indexes: &[Arc<RwLock<Index>>], request: &SearchRequest) -> Result<SearchResults> {
        let start = Instant::now();
        if let Some(keep_alive) = &request.scroll {
            parse_keep_alive(keep_alive)?;
        }

        // Score every document of every target index
        let mut schemas: HashMap<String, Arc<Schema>> = HashMap::new();
        let mut hits: Vec<ScoredHit> = Vec::new();
        for index in indexes {
            let index = index.read();
            let schema = index.schema();
            let scorer = matcher::compile(&request.query, schema.clone())?;
            tracing::debug!("Scoring index [{}] with {} scorer", index.name, scorer.name());
            hits.extend(index.score(scorer.as_ref(), self.config.parallel_threshold));
            schemas.insert(index.name.clone(), schema);
        }

        // Aggregations see the unpaged result set
        let aggregations = if request.aggregations.is_empty() {
            None
        } else {
            Some(aggregate_all(&request.aggregations, &hits))
        };

        sort_hits(&mut hits, &request.sort);

        let scroll_id = match &request.scroll {
            Some(keep_alive) => Some(self.scrolls.open_at(
                hits.clone(),
                request.from.saturating_add(request.size),
                request.size,
                keep_alive,
            )?),
            None => None,
        };

        let total_hits = hits.len();
        let max_score = hits.iter().map(|hit| hit.score).reduce(f64::max);
        let mut page: Vec<ScoredHit> = hits.into_iter().skip(request.from).take(request.size).collect();

        if let Some(highlight_request) = &request.highlight {
            let mut highlighters: HashMap<&str, Box<dyn Highlighter>> = HashMap::new();
            for hit in page.iter_mut() {
                // Each index highlights against its own mappings
                if !highlighters.contains_key(hit.index.as_str()) {
                    let Some((name, schema)) = schemas.get_key_value(&hit.index) else { continue };
                    highlighters.insert(name.as_str(), highlight::compile(&request.query, highlight_request, schema)?);
                }
                let Some(highlighter) = highlighters.get(hit.index.as_str()) else { continue };
                let snippets = match &hit.source {
                    Some(source) => highlighter.highlight(source),
                    None => continue,
                };
                if !snippets.is_empty() {
                    hit.highlight = Some(snippets);
                }
            }
        }

        for hit in page.iter_mut() {
            if let Some(source) = hit.source.take() {
                hit.source = request.source.apply(source);
            }
        }

        let took_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            "Searched {} index(es): {} hits, {} returned, {} ms",
            indexes.len(),
            total_hits,
            page.len(),
            took_ms
        );

        Ok(SearchResults {
            total_hits,
            max_score,
            hits: page,
            aggregations,
            scroll_id,
            took_ms,
        })
    }
}
