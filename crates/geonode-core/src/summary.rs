//! Harvest statistics, per run and across servers.
//!
//! Pure bookkeeping: counting what happened to each layer, decoupled from
//! I/O and CLI output.

/// Outcome of processing a single layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerOutcome {
    /// Dataset and showcase were published
    Published,
    /// An ignore term vetoed the layer
    Ignored,
}

/// Statistics for one harvesting run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HarvestStats {
    pub countries: usize,
    pub published: usize,
    pub ignored: usize,
    /// Datasets deleted by pruning
    pub pruned: usize,
}

impl HarvestStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an outcome, incrementing the appropriate counter.
    pub fn record(&mut self, outcome: LayerOutcome) {
        match outcome {
            LayerOutcome::Published => self.published += 1,
            LayerOutcome::Ignored => self.ignored += 1,
        }
    }

    /// Returns the total number of layers seen.
    pub fn total_layers(&self) -> usize {
        self.published + self.ignored
    }
}

/// Result of harvesting a single server in batch mode.
#[derive(Debug, Clone)]
pub struct ServerHarvestResult {
    pub server_name: String,
    pub server_url: String,
    pub stats: HarvestStats,
    /// Error message if the harvest failed, None if successful.
    pub error: Option<String>,
}

impl ServerHarvestResult {
    pub fn success(name: String, url: String, stats: HarvestStats) -> Self {
        Self {
            server_name: name,
            server_url: url,
            stats,
            error: None,
        }
    }

    pub fn failure(name: String, url: String, error: String) -> Self {
        Self {
            server_name: name,
            server_url: url,
            stats: HarvestStats::default(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregated results from harvesting several servers.
#[derive(Debug, Clone, Default)]
pub struct BatchHarvestSummary {
    pub results: Vec<ServerHarvestResult>,
}

impl BatchHarvestSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, result: ServerHarvestResult) {
        self.results.push(result);
    }

    pub fn successful_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }

    /// Returns the number of datasets published across all servers.
    pub fn total_published(&self) -> usize {
        self.results.iter().map(|r| r.stats.published).sum()
    }

    pub fn total_servers(&self) -> usize {
        self.results.len()
    }
}
