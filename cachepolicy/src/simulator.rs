use std::io::BufRead;
use std::time::{Duration, Instant};
use log::info;
use serde::{Deserialize, Serialize};
use crate::cache::{CacheTrait, GenericCache, RequestOutcome};
use crate::config::SimulationConfig;
use crate::error::{ConfigError, TraceError};
use crate::trace::{Request, TraceReader};

/// The simulator replays requests against every configured cache, and collects results.
///
/// The caches are independent, each sees the full request stream, which makes it easy to compare
/// policies on the same trace.
///
/// It supports calling simulate multiple times, the logical clock carries on and the results and
/// time taken accumulate
pub struct Simulator {
    caches: Vec<GenericCache>,
    report: SimulationReport,
    clock: u64,
    simulation_time: Duration,
}

/// The result of a simulation. Can be serialised to JSON
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SimulationReport {
    pub requests: u64,
    pub caches: Vec<CacheReport>,
}

/// The result for an individual cache
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CacheReport {
    pub name: String,
    pub policy: String,
    pub hits: u64,
    pub misses: u64,
    /// Misses which evicted a valid line, each of which requires a write-back
    pub evictions: u64,
    /// The evictions whose victim had been written to
    pub dirty_evictions: u64,
    pub hit_rate: f64,
}

impl CacheReport {
    fn record(&mut self, outcome: RequestOutcome) {
        match outcome {
            RequestOutcome::Hit => self.hits += 1,
            RequestOutcome::Miss(insert) => {
                self.misses += 1;
                if let Some(write_back) = insert.write_back {
                    self.evictions += 1;
                    if write_back.dirty {
                        self.dirty_evictions += 1;
                    }
                }
            }
        }
        self.hit_rate = self.hits as f64 / (self.hits + self.misses) as f64;
    }
}

impl Simulator {
    /// Creates a new simulator for a given configuration
    ///
    /// # Arguments
    ///
    /// * `config`: A simulation configuration, usually resulting from parsing JSON
    ///
    /// returns: Result<Simulator, ConfigError>, failing if any cache has an invalid geometry
    pub fn new(config: &SimulationConfig) -> Result<Self, ConfigError> {
        if config.caches.is_empty() {
            return Err(ConfigError::NoCaches);
        }
        let caches = config.caches.iter()
            .map(|cache| GenericCache::try_from(cache))
            .collect::<Result<Vec<_>, _>>()?;
        let report = SimulationReport {
            requests: 0,
            caches: config.caches.iter().zip(&caches).map(|(config, cache)| CacheReport {
                name: config.name.clone(),
                policy: cache.policy_name().to_string(),
                hits: 0,
                misses: 0,
                evictions: 0,
                dirty_evictions: 0,
                hit_rate: 0.0,
            }).collect(),
        };
        Ok(Self {
            caches,
            report,
            clock: 0,
            simulation_time: Duration::new(0, 0),
        })
    }

    /// Runs one request through every cache
    fn step(&mut self, request: Request) {
        for (cache, report) in self.caches.iter_mut().zip(&mut self.report.caches) {
            report.record(cache.request(request.address, request.operation, self.clock));
        }
        self.report.requests += 1;
        self.clock += 1;
    }

    /// Simulates the caches on requests already in memory
    pub fn simulate_requests<I: IntoIterator<Item = Request>>(&mut self, requests: I) -> &SimulationReport {
        let start = Instant::now();
        for request in requests {
            self.step(request);
        }
        self.finish(start);
        &self.report
    }

    /// Simulates the caches on a text trace, see [`crate::trace`] for the format
    ///
    /// Reads are *guaranteed to be sequential*, so when using something like mmap one can advise
    /// the operating system of it
    ///
    /// Stops at the first malformed line. Requests before it have already been simulated, and are
    /// counted in the report and the execution time
    ///
    /// returns: Result<&SimulationReport, TraceError>
    pub fn simulate<R: BufRead>(&mut self, reader: R) -> Result<&SimulationReport, TraceError> {
        let start = Instant::now();
        let result = TraceReader::new(reader).try_for_each(|request| {
            self.step(request?);
            Ok::<(), TraceError>(())
        });
        self.finish(start);
        result.map(|_| &self.report)
    }

    fn finish(&mut self, start: Instant) {
        self.simulation_time += start.elapsed();
        for cache in &self.report.caches {
            info!(
                "{} ({}): {} hits, {} misses, {} evictions, hit rate {:.2}%",
                cache.name, cache.policy, cache.hits, cache.misses, cache.evictions, cache.hit_rate * 100.0
            );
        }
    }

    pub fn report(&self) -> &SimulationReport {
        &self.report
    }

    pub fn caches(&self) -> &[GenericCache] {
        &self.caches
    }

    /// Gets the wall-clock execution time for processing
    pub fn get_execution_time(&self) -> &Duration {
        &self.simulation_time
    }

    /// Gets the number of invalid blocks for each cache
    pub fn get_invalid_block_counts(&self) -> Vec<u64> {
        self.caches.iter().map(|x| x.invalid_block_count() as u64).collect()
    }
}
