pub mod core;
pub mod document;
pub mod schema;
pub mod index;
pub mod scoring;
pub mod query;
pub mod aggregation;
pub mod search;

pub use crate::core::config::Config;
pub use crate::core::database::Database;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::search::request::SearchRequest;
pub use crate::search::results::{ScoredHit, ScrollPage, SearchResults};

/*
┌────────────────────────────────────────────────────────────────────────────────────────────┐
│                            SEARCHMOCK STRUCT ARCHITECTURE                                   │
└────────────────────────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────────────────── CORE LAYER ──────────────────────────────────────────┐
│                                                                                              │
│  ┌────────────────────────────────────────────────────────────────────────────────────┐    │
│  │                               struct Database                                       │    │
│  │  ┌──────────────────────────────────────────────────────────────────────────────┐ │    │
│  │  │ config: Config                                  // Defaults and bounds       │ │    │
│  │  │ indexes: RwLock<HashMap<String, Arc<RwLock<Index>>>> // One lock per index   │ │    │
│  │  │ scrolls: ScrollManager                          // Open scroll cursors       │ │    │
│  │  └──────────────────────────────────────────────────────────────────────────────┘ │    │
│  └────────────────────────────────────────────────────────────────────────────────────┘    │
│                                                                                              │
│  ┌──────────────────────┐  ┌──────────────────────┐  ┌──────────────────────────────┐     │
│  │ struct Config        │  │ type Document        │  │ struct Error                 │     │
│  │ • scroll_capacity    │  │ = serde_json::Value  │  │ • kind: ErrorKind            │     │
│  │ • default_page_size  │  └──────────────────────┘  │ • context: String            │     │
│  │ • default_bucket_size│                            └──────────────────────────────┘     │
│  │ • parallel_threshold │  ┌──────────────────────┐                                        │
│  │ • id_length          │  │ struct IndexInfo     │                                        │
│  └──────────────────────┘  │ • name, uuid         │                                        │
│                            │ • created_at         │                                        │
│                            │ • doc_count          │                                        │
│                            └──────────────────────┘                                        │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────────── STORAGE LAYER ────────────────────────────────────────┐
│                                                                                              │
│  ┌────────────────────────────┐  ┌─────────────────────────┐  ┌──────────────────────────┐ │
│  │ struct Index               │  │ struct DocumentTable    │  │ struct Schema            │ │
│  │ • name, uuid, created_at   │  │ • by_sequence: BTreeMap │  │ • mappings: BTreeMap     │ │
│  │ • documents: DocumentTable │  │ • sequences: HashMap    │  │ • copy_to_fields: Map    │ │
│  │ • schema: Arc<Schema>      │  │ (insertion order)       │  │ • properties (raw tree)  │ │
│  │ • settings: Value          │  └─────────────────────────┘  └──────────────────────────┘ │
│  └────────────────────────────┘                                                              │
│                                   fn values_at(doc, path)   fn parents_of_leaf(doc, path)   │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────────── SEARCH LAYER ─────────────────────────────────────────┐
│                                                                                              │
│  SearchRequest ──► QueryExecutor::execute                                                    │
│                     1. matcher::compile(Query, Arc<Schema>) ──► Box<dyn Scorer>             │
│                     2. Index::score (rayon above parallel_threshold), keep score > 0        │
│                     3. aggregate_all over the unpaged hits                                  │
│                     4. sort_hits (sort keys, or coarse descending score)                    │
│                     5. ScrollManager::open_at over the sorted snapshot                      │
│                     6. page = from..from+size                                               │
│                     7. highlight::compile per index ──► Box<dyn Highlighter> on the page    │
│                     8. SourceFilter on the page                                             │
│                                                                                              │
│  ┌─────────────────────┐  ┌──────────────────────┐  ┌────────────────────────────┐        │
│  │ enum Query (AST)    │  │ trait Aggregator     │  │ struct SearchResults       │        │
│  │ • Bool  • Match     │  │ • TermsAggregation   │  │ • total_hits, max_score    │        │
│  │ • Wildcard • Term   │  │ • CompositeAggreg.   │  │ • hits: Vec<ScoredHit>     │        │
│  │ • Terms • Exists    │  └──────────────────────┘  │ • aggregations, scroll_id  │        │
│  │ • Nested • Range    │                            │ • took_ms                  │        │
│  │ • MatchAll          │  ┌──────────────────────┐  └────────────────────────────┘        │
│  └─────────────────────┘  │ struct ScrollManager │                                         │
│                           │ • Mutex<LruCache>    │                                         │
│                           └──────────────────────┘                                         │
└──────────────────────────────────────────────────────────────────────────────────────────────┘
*/
