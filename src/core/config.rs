#[derive(Debug, Clone)]
pub struct Config {
    pub scroll_capacity: usize,     // Live scroll cursors kept before the oldest is evicted
    pub default_page_size: usize,   // `size` of a search request that omits it
    pub default_bucket_size: usize, // `size` of terms/composite aggregations that omit it
    pub parallel_threshold: usize,  // Document count from which scoring fans out on rayon
    pub id_length: usize,           // Length of generated document and scroll node ids
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scroll_capacity: 20,
            default_page_size: 10,
            default_bucket_size: 10,
            parallel_threshold: 1024,
            id_length: 20,
        }
    }
}

impl Config {
    pub fn with_scroll_capacity(mut self, capacity: usize) -> Self {
        self.scroll_capacity = capacity;
        self
    }

    pub fn with_default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }
}
