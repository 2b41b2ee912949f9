use std::num::NonZeroUsize;
use std::time::Duration;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use lru::LruCache;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::digit1,
    combinator::{all_consuming, map_res},
};
use parking_lot::Mutex;
use crate::core::error::{Error, Result};
use crate::core::utils::generate_identifier;
use crate::search::results::{ScoredHit, ScrollPage};

/// Framing placed before the node id in caller-facing scroll ids
const SCROLL_ID_PREFIX: &[u8] = b"queryAndFetch\x01\x00\x00\x00\x00\x00\x00\x00>\x16";

pub fn encode_scroll_id(node: &str) -> String {
    let mut raw = Vec::with_capacity(SCROLL_ID_PREFIX.len() + node.len());
    raw.extend_from_slice(SCROLL_ID_PREFIX);
    raw.extend_from_slice(node.as_bytes());
    STANDARD.encode(raw)
}

pub fn decode_scroll_id(scroll_id: &str) -> Result<String> {
    let raw = STANDARD.decode(scroll_id)?;
    let node = raw
        .strip_prefix(SCROLL_ID_PREFIX)
        .ok_or_else(|| Error::validation(format!("malformed scroll id [{}]", scroll_id)))?;
    String::from_utf8(node.to_vec()).map_err(|_| Error::validation(format!("malformed scroll id [{}]", scroll_id)))
}

fn keep_alive(input: &str) -> IResult<&str, Duration> {
    let (rest, (amount, unit)) = all_consuming((
        map_res(digit1, str::parse::<u64>),
        alt((tag("nanos"), tag("micros"), tag("ms"), tag("d"), tag("h"), tag("m"), tag("s"))),
    ))
    .parse(input)?;

    let duration = match unit {
        "d" => Duration::from_secs(amount.saturating_mul(86_400)),
        "h" => Duration::from_secs(amount.saturating_mul(3_600)),
        "m" => Duration::from_secs(amount.saturating_mul(60)),
        "s" => Duration::from_secs(amount),
        "ms" => Duration::from_millis(amount),
        "micros" => Duration::from_micros(amount),
        _ => Duration::from_nanos(amount),
    };
    Ok((rest, duration))
}

/// Parse a keep-alive hint such as `1m` or `30s`
pub fn parse_keep_alive(value: &str) -> Result<Duration> {
    keep_alive(value.trim())
        .map(|(_, duration)| duration)
        .map_err(|_| Error::validation(format!("failed to parse keep-alive [{}]", value)))
}

/// Frozen, already sorted hit list with a read position
#[derive(Debug, Clone)]
pub struct ScrollCursor {
    pub hits: Vec<ScoredHit>,
    pub offset: usize,
    pub size: usize,
    /// Informational only, cursors never expire by time
    pub keep_alive: Duration,
}

impl ScrollCursor {
    fn next_page(&mut self) -> Vec<ScoredHit> {
        let start = self.offset.min(self.hits.len());
        let end = start.saturating_add(self.size).min(self.hits.len());
        self.offset = self.offset.saturating_add(self.size);
        self.hits[start..end].to_vec()
    }
}

/// Bounded table of open scroll cursors.
///
/// Inserting over capacity evicts the oldest cursor. Reading a page does
/// not count as a use.
pub struct ScrollManager {
    cursors: Mutex<LruCache<String, ScrollCursor>>,
    id_length: usize,
}

impl ScrollManager {
    pub fn new(capacity: usize, id_length: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        ScrollManager {
            cursors: Mutex::new(LruCache::new(capacity)),
            id_length,
        }
    }

    /// Open a cursor whose first continuation starts at the first hit
    pub fn open(&self, hits: Vec<ScoredHit>, size: usize, keep_alive: &str) -> Result<String> {
        self.open_at(hits, 0, size, keep_alive)
    }

    /// Open a cursor whose first continuation starts at `offset`
    pub fn open_at(&self, hits: Vec<ScoredHit>, offset: usize, size: usize, keep_alive: &str) -> Result<String> {
        let keep_alive = parse_keep_alive(keep_alive)?;
        let node = generate_identifier(self.id_length);
        let cursor = ScrollCursor { hits, offset, size, keep_alive };

        if let Some((evicted, _)) = self.cursors.lock().push(node.clone(), cursor) {
            if evicted != node {
                tracing::debug!("Scroll table full, evicted cursor {}", evicted);
            }
        }
        Ok(encode_scroll_id(&node))
    }

    /// Next page of the cursor behind `scroll_id`
    pub fn continue_scroll(&self, scroll_id: &str) -> Result<ScrollPage> {
        let node = decode_scroll_id(scroll_id)?;
        let mut cursors = self.cursors.lock();
        let cursor = cursors
            .peek_mut(&node)
            .ok_or_else(|| Error::not_found(format!("No search context found for id [{}]", node)))?;

        Ok(ScrollPage {
            scroll_id: scroll_id.to_string(),
            total_hits: cursor.hits.len(),
            hits: cursor.next_page(),
        })
    }

    /// Close the given cursors, returning how many were open
    pub fn close(&self, scroll_ids: &[&str]) -> Result<usize> {
        let nodes = scroll_ids
            .iter()
            .map(|scroll_id| decode_scroll_id(scroll_id))
            .collect::<Result<Vec<_>>>()?;
        let mut cursors = self.cursors.lock();
        Ok(nodes.iter().filter(|node| cursors.pop(*node).is_some()).count())
    }

    pub fn close_all(&self) -> usize {
        let mut cursors = self.cursors.lock();
        let closed = cursors.len();
        cursors.clear();
        closed
    }

    /// Ids of the open cursors, oldest first
    pub fn active_ids(&self) -> Vec<String> {
        let cursors = self.cursors.lock();
        let mut ids: Vec<String> = cursors.iter().map(|(node, _)| encode_scroll_id(node)).collect();
        ids.reverse();
        ids
    }

    pub fn len(&self) -> usize {
        self.cursors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hits(count: usize) -> Vec<ScoredHit> {
        (0..count)
            .map(|i| ScoredHit::new("people", &i.to_string(), 1.0, json!({"n": i})))
            .collect()
    }

    #[test]
    fn test_scroll_id_round_trip() {
        let id = encode_scroll_id("abc-DEF-123");
        assert_eq!(decode_scroll_id(&id).unwrap(), "abc-DEF-123");
        assert!(decode_scroll_id("not base64!").unwrap_err().is_validation());
        assert!(decode_scroll_id(&STANDARD.encode("plain")).unwrap_err().is_validation());
    }

    #[test]
    fn test_keep_alive_units() {
        assert_eq!(parse_keep_alive("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_keep_alive("2d").unwrap(), Duration::from_secs(172_800));
        assert_eq!(parse_keep_alive("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_keep_alive("7micros").unwrap(), Duration::from_micros(7));
        assert_eq!(parse_keep_alive("9nanos").unwrap(), Duration::from_nanos(9));
        for bad in ["", "m", "10", "10w", "1.5m", "-1s"] {
            assert!(parse_keep_alive(bad).unwrap_err().is_validation(), "{}", bad);
        }
    }

    #[test]
    fn test_pages_until_exhausted() {
        let manager = ScrollManager::new(20, 20);
        let id = manager.open(hits(5), 2, "1m").unwrap();

        let sizes: Vec<usize> = (0..4).map(|_| manager.continue_scroll(&id).unwrap().hits.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1, 0]);

        assert_eq!(manager.close(&[id.as_str()]).unwrap(), 1);
        assert!(manager.continue_scroll(&id).unwrap_err().is_not_found());
        assert_eq!(manager.close(&[id.as_str()]).unwrap(), 0);
    }

    #[test]
    fn test_open_at_skips_first_page() {
        let manager = ScrollManager::new(20, 20);
        let id = manager.open_at(hits(5), 2, 2, "1m").unwrap();
        let page = manager.continue_scroll(&id).unwrap();
        assert_eq!(page.total_hits, 5);
        assert_eq!(page.hits.iter().map(|h| h.id.as_str()).collect::<Vec<_>>(), vec!["2", "3"]);
    }

    #[test]
    fn test_oldest_cursor_evicted_despite_reads() {
        let manager = ScrollManager::new(2, 20);
        let first = manager.open(hits(3), 1, "1m").unwrap();
        let second = manager.open(hits(3), 1, "1m").unwrap();
        manager.continue_scroll(&first).unwrap();
        let third = manager.open(hits(3), 1, "1m").unwrap();

        assert!(manager.continue_scroll(&first).unwrap_err().is_not_found());
        assert_eq!(manager.active_ids(), vec![second, third]);
        assert_eq!(manager.close_all(), 2);
        assert!(manager.is_empty());
    }
}
