use std::path::PathBuf;
use std::time::Duration;

use futures::stream::{StreamExt, iter};
use log::{debug, info, warn};

use crate::clients::{
    Hit, SearchApi,
    errors::{Error, Result},
};
use crate::table::{Table, flatten};

pub const DEFAULT_PER_PAGE: u32 = 15;

/// How often a failed search is tried again before its term is given up.
///
/// Only retryable failures (see [`Error::is_retryable`]) are retried. The
/// default never retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        RetryPolicy {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }

    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        RetryPolicy { max_retries, delay }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

// Configuration for the Harvester struct
pub struct Config<C> {
    pub client: C,
    pub per_page: u32,
    /// 0 runs terms one after another; N keeps up to N searches in flight.
    pub parallelism: usize,
    pub retry: RetryPolicy,
    /// When set, every term's table is also saved here as `genius-<index>-<term>.csv`.
    pub per_term_dir: Option<PathBuf>,
}

pub struct ConfigBuilder<C> {
    client: Option<C>,
    per_page: Option<u32>,
    parallelism: Option<usize>,
    retry: Option<RetryPolicy>,
    per_term_dir: Option<PathBuf>,
}

impl<C: SearchApi> ConfigBuilder<C> {
    pub fn new() -> Self {
        Self {
            client: None,
            per_page: None,     // Default is DEFAULT_PER_PAGE hits per term.
            parallelism: None,  // Default is sequential.
            retry: None,
            per_term_dir: None,
        }
    }

    #[must_use]
    pub fn client(mut self, client: C) -> Self {
        self.client = Some(client);
        self
    }

    #[must_use]
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    #[must_use]
    pub fn parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    #[must_use]
    pub fn per_term_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.per_term_dir = dir;
        self
    }

    pub fn build(self) -> Result<Config<C>> {
        let client = self
            .client
            .ok_or_else(|| Error::ConfigurationError("No search client configured".into()))?;
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE);
        if per_page == 0 {
            return Err(Error::ConfigurationError(
                "Results per term must be at least 1".into(),
            ));
        }
        Ok(Config {
            client,
            per_page,
            parallelism: self.parallelism.unwrap_or(0),
            retry: self.retry.unwrap_or_default(),
            per_term_dir: self.per_term_dir,
        })
    }
}

impl<C: SearchApi> Default for ConfigBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of harvesting a single term.
#[derive(Debug)]
pub struct TermOutcome {
    /// Position of the term in the input list.
    pub index: usize,
    pub term: String,
    pub result: Result<Table>,
}

/// Per-term outcomes of one run, in the order they were gathered.
///
/// Sequential runs gather in input order. Concurrent runs gather in
/// completion order; call [`RunReport::sort_by_input_order`] to restore the
/// input order.
#[derive(Debug, Default)]
pub struct RunReport {
    outcomes: Vec<TermOutcome>,
}

impl RunReport {
    pub fn outcomes(&self) -> &[TermOutcome] {
        &self.outcomes
    }

    pub fn sort_by_input_order(&mut self) {
        self.outcomes.sort_by_key(|o| o.index);
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.term.as_str(), e)))
    }

    /// True when there was at least one term and none of them succeeded.
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.succeeded() == 0
    }

    /// Concatenate the successful tables in report order.
    pub fn into_table(self) -> Table {
        Table::concat(self.outcomes.into_iter().filter_map(|o| o.result.ok()))
    }
}

// The main Harvester struct that runs the search pipeline over many terms
pub struct Harvester<C> {
    config: Config<C>,
}

impl<C: SearchApi> Harvester<C> {
    pub fn new(config: Config<C>) -> Self {
        Harvester { config }
    }

    pub async fn run(&self, terms: &[String]) -> RunReport {
        let parallelism = self.config.parallelism;
        info!(
            "Harvesting {} terms ({} per page, {})",
            terms.len(),
            self.config.per_page,
            if parallelism == 0 {
                "sequential".to_string()
            } else {
                format!("up to {parallelism} concurrent")
            }
        );

        let outcomes = if parallelism == 0 {
            let mut outcomes = Vec::with_capacity(terms.len());
            for (index, term) in terms.iter().enumerate() {
                outcomes.push(self.harvest_term(index, term).await);
            }
            outcomes
        } else {
            // Outcomes arrive as searches complete, not in input order
            iter(terms.iter().enumerate())
                .map(|(index, term)| self.harvest_term(index, term))
                .buffer_unordered(parallelism)
                .collect::<Vec<TermOutcome>>()
                .await
        };

        let report = RunReport { outcomes };
        for (term, err) in report.failures() {
            warn!("Search for {term:?} failed: {err}");
        }
        info!(
            "Harvest completed. Succeeded: {}, failed: {}",
            report.succeeded(),
            report.outcomes.len() - report.succeeded()
        );
        report
    }

    async fn harvest_term(&self, index: usize, term: &str) -> TermOutcome {
        let result = match self.search_with_retry(term).await {
            Ok(hits) => {
                let table = flatten(hits);
                info!("Data gathered for {term:?}: {} rows", table.len());
                match &self.config.per_term_dir {
                    Some(dir) => table
                        .save_csv(&dir.join(per_term_file_name(index, term)))
                        .await
                        .map(|()| table),
                    None => Ok(table),
                }
            }
            Err(e) => Err(e),
        };
        TermOutcome {
            index,
            term: term.to_string(),
            result,
        }
    }

    async fn search_with_retry(&self, term: &str) -> Result<Vec<Hit>> {
        let retry = self.config.retry;
        let mut attempt = 0;
        loop {
            match self.config.client.search(term, self.config.per_page).await {
                Err(e) if e.is_retryable() && attempt < retry.max_retries => {
                    attempt += 1;
                    warn!(
                        "Search for {term:?} failed ({e}), retry {attempt}/{} in {:?}",
                        retry.max_retries, retry.delay
                    );
                    tokio::time::sleep(retry.delay).await;
                }
                other => {
                    debug!("Search for {term:?} finished after {} attempts", attempt + 1);
                    return other;
                }
            }
        }
    }
}

/// File name used for a term's own CSV export.
///
/// The input position leads the name so terms that sanitize alike, such as
/// `AC/DC` and `AC:DC`, never share a file.
pub fn per_term_file_name(index: usize, term: &str) -> String {
    let safe: String = term
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("genius-{index}-{safe}.csv")
}
