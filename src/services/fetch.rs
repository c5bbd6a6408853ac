//! Background fetching of chunk images, audio segments and species
//! searches, plus annotation mutations.
//!
//! Jobs carry the identifiers (chunk index and refresh token, load token,
//! request id) their owners need to recognise stale results, and every
//! outcome echoes them back. The owning view polls outcomes once per frame
//! without blocking.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::audio::AudioSegment;
use crate::canvas::ChunkImage;
use crate::chunk_manager::{ChunkRequest, ChunkResponse, SpectrogramRequest};
use crate::error::{AudioFetchError, ChunkFetchError, MutationError, SearchError, WorkerError};
use crate::player::{AudioLoad, AudioRequest, AudioResponse};
use crate::services::mutations::{AnnotationSink, Mutation};
use crate::species::{SpeciesCandidate, SpeciesQuery};

/// Renders spectrogram chunk images.
pub trait SpectrogramSource: Send + Sync {
    fn fetch_chunk(&self, request: &SpectrogramRequest) -> Result<ChunkImage, ChunkFetchError>;
}

/// Renders playable audio segments.
pub trait AudioSource: Send + Sync {
    fn fetch_segment(&self, request: &AudioRequest) -> Result<AudioSegment, AudioFetchError>;
}

/// Searches a taxonomic catalogue.
pub trait SpeciesSource: Send + Sync {
    fn search_species(&self, query: &str, limit: usize)
        -> Result<Vec<SpeciesCandidate>, SearchError>;
}

/// The collaborators a worker fetches from.
#[derive(Clone)]
pub struct Sources {
    pub spectrograms: Arc<dyn SpectrogramSource>,
    pub audio: Arc<dyn AudioSource>,
    pub species: Arc<dyn SpeciesSource>,
    pub annotations: Arc<dyn AnnotationSink>,
}

impl Sources {
    /// Every contract served by one client.
    pub fn from_client<C>(client: Arc<C>) -> Self
    where
        C: SpectrogramSource + AudioSource + SpeciesSource + AnnotationSink + 'static,
    {
        Self {
            spectrograms: client.clone(),
            audio: client.clone(),
            species: client.clone(),
            annotations: client,
        }
    }
}

#[derive(Debug, Clone)]
pub enum FetchJob {
    Chunk(ChunkRequest),
    Audio(AudioLoad),
    Species(SpeciesQuery),
    Mutation(Mutation),
}

#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Chunk(ChunkResponse),
    Audio(AudioResponse),
    Species {
        request_id: u64,
        result: Result<Vec<SpeciesCandidate>, SearchError>,
    },
    Mutation {
        mutation: Mutation,
        result: Result<(), MutationError>,
    },
}

impl FetchJob {
    /// Run the job on the calling thread.
    pub fn run(self, sources: &Sources) -> FetchOutcome {
        let start = Instant::now();
        match self {
            FetchJob::Chunk(job) => {
                let result = sources.spectrograms.fetch_chunk(&job.request);
                FetchOutcome::Chunk(ChunkResponse {
                    index: job.index,
                    token: job.token,
                    result,
                    elapsed: start.elapsed(),
                })
            }
            FetchJob::Audio(job) => {
                let result = sources.audio.fetch_segment(&job.request);
                FetchOutcome::Audio(AudioResponse {
                    token: job.token,
                    result,
                    elapsed: start.elapsed(),
                })
            }
            FetchJob::Species(job) => FetchOutcome::Species {
                request_id: job.request_id,
                result: sources.species.search_species(&job.query, job.limit),
            },
            FetchJob::Mutation(mutation) => {
                let result = mutation.apply(sources.annotations.as_ref());
                FetchOutcome::Mutation { mutation, result }
            }
        }
    }

    /// The outcome reported when the job could not be run at all.
    fn abandoned(self) -> FetchOutcome {
        let reason = "fetch worker stopped".to_string();
        match self {
            FetchJob::Chunk(job) => FetchOutcome::Chunk(ChunkResponse {
                index: job.index,
                token: job.token,
                result: Err(ChunkFetchError::WorkerGone),
                elapsed: Default::default(),
            }),
            FetchJob::Audio(job) => FetchOutcome::Audio(AudioResponse {
                token: job.token,
                result: Err(AudioFetchError::Network { reason }),
                elapsed: Default::default(),
            }),
            FetchJob::Species(job) => FetchOutcome::Species {
                request_id: job.request_id,
                result: Err(SearchError::Network { reason }),
            },
            FetchJob::Mutation(mutation) => FetchOutcome::Mutation {
                mutation,
                result: Err(MutationError::Network { reason }),
            },
        }
    }
}

/// Where the view sends fetch jobs and collects their outcomes.
pub trait Dispatcher {
    fn dispatch(&mut self, job: FetchJob);

    /// Outcomes finished since the last poll. Never blocks.
    fn poll(&mut self) -> Vec<FetchOutcome>;
}

/// Pool of fetch threads sharing one job queue.
pub struct FetchWorker {
    jobs: Option<Sender<FetchJob>>,
    outcomes: Receiver<FetchOutcome>,
    handles: Vec<JoinHandle<()>>,
    abandoned: Vec<FetchOutcome>,
}

/// Spawn `threads` fetch threads over `sources`.
pub fn spawn_fetch_worker(sources: Sources, threads: usize) -> Result<FetchWorker, WorkerError> {
    FetchWorker::spawn(sources, threads)
}

impl FetchWorker {
    pub fn spawn(sources: Sources, threads: usize) -> Result<Self, WorkerError> {
        let (job_tx, job_rx) = channel::<FetchJob>();
        let (outcome_tx, outcome_rx) = channel::<FetchOutcome>();
        let job_rx = Arc::new(Mutex::new(job_rx));

        let mut handles = Vec::with_capacity(threads.max(1));
        for n in 0..threads.max(1) {
            let jobs = Arc::clone(&job_rx);
            let outcomes = outcome_tx.clone();
            let sources = sources.clone();
            let handle = thread::Builder::new()
                .name(format!("fetch-{}", n))
                .spawn(move || worker_loop(n, &jobs, &outcomes, &sources))
                .map_err(|e| WorkerError::StartFailed {
                    reason: e.to_string(),
                })?;
            handles.push(handle);
        }

        tracing::info!(threads = handles.len(), "Fetch worker started");
        Ok(Self {
            jobs: Some(job_tx),
            outcomes: outcome_rx,
            handles,
            abandoned: Vec::new(),
        })
    }

    pub fn submit(&self, job: FetchJob) -> Result<(), WorkerError> {
        let jobs = self.jobs.as_ref().ok_or(WorkerError::ChannelDisconnected)?;
        jobs.send(job).map_err(|_| WorkerError::ChannelDisconnected)
    }

    pub fn try_recv_all(&self) -> Vec<FetchOutcome> {
        self.outcomes.try_iter().collect()
    }

    /// Stop accepting jobs and wait for the threads to finish queued work.
    pub fn shutdown(mut self) -> Result<(), WorkerError> {
        self.jobs = None;
        for handle in self.handles.drain(..) {
            handle.join().map_err(|e| WorkerError::Panicked {
                reason: panic_reason(&e),
            })?;
        }
        tracing::info!("Fetch worker stopped");
        Ok(())
    }
}

impl Dispatcher for FetchWorker {
    fn dispatch(&mut self, job: FetchJob) {
        let Some(jobs) = &self.jobs else {
            self.abandoned.push(job.abandoned());
            return;
        };
        if let Err(err) = jobs.send(job) {
            tracing::warn!("Fetch worker unavailable, abandoning job");
            self.abandoned.push(err.0.abandoned());
        }
    }

    fn poll(&mut self) -> Vec<FetchOutcome> {
        let mut outcomes = std::mem::take(&mut self.abandoned);
        outcomes.extend(self.outcomes.try_iter());
        outcomes
    }
}

fn worker_loop(
    n: usize,
    jobs: &Mutex<Receiver<FetchJob>>,
    outcomes: &Sender<FetchOutcome>,
    sources: &Sources,
) {
    tracing::debug!(worker = n, "Fetch thread started");
    loop {
        let job = match jobs.lock() {
            Ok(rx) => rx.recv(),
            Err(_) => break,
        };
        let Ok(job) = job else {
            break;
        };
        if outcomes.send(job.run(sources)).is_err() {
            tracing::info!(worker = n, "Outcome channel closed, fetch thread shutting down");
            break;
        }
    }
    tracing::debug!(worker = n, "Fetch thread exiting");
}

fn panic_reason(payload: &Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Runs every job synchronously on dispatch.
pub struct InlineDispatcher {
    sources: Sources,
    ready: Vec<FetchOutcome>,
}

impl InlineDispatcher {
    pub fn new(sources: Sources) -> Self {
        Self {
            sources,
            ready: Vec::new(),
        }
    }
}

impl Dispatcher for InlineDispatcher {
    fn dispatch(&mut self, job: FetchJob) {
        let outcome = job.run(&self.sources);
        self.ready.push(outcome);
    }

    fn poll(&mut self) -> Vec<FetchOutcome> {
        std::mem::take(&mut self.ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Interval;
    use crate::settings::{AudioSettings, SpectrogramSettings};
    use crate::test_fixtures::fixture_sources;
    use std::time::Duration;

    fn chunk_job(index: usize, token: u64) -> FetchJob {
        FetchJob::Chunk(ChunkRequest {
            index,
            token,
            request: SpectrogramRequest {
                recording_uuid: "rec".to_string(),
                interval: Interval::new(index as f64 * 5.0, (index + 1) as f64 * 5.0),
                audio: AudioSettings::default(),
                spectrogram: SpectrogramSettings::default(),
            },
        })
    }

    #[test]
    fn test_worker_echoes_index_and_token() {
        let worker = FetchWorker::spawn(fixture_sources(), 2).unwrap();
        for i in 0..4 {
            worker.submit(chunk_job(i, 7)).unwrap();
        }

        let mut seen = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while seen.len() < 4 && Instant::now() < deadline {
            for outcome in worker.try_recv_all() {
                if let FetchOutcome::Chunk(resp) = outcome {
                    assert_eq!(resp.token, 7);
                    assert!(resp.result.is_ok());
                    seen.push(resp.index);
                }
            }
            thread::sleep(Duration::from_millis(5));
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3]);
        worker.shutdown().unwrap();
    }

    #[test]
    fn test_inline_dispatcher() {
        let mut dispatcher = InlineDispatcher::new(fixture_sources());
        dispatcher.dispatch(chunk_job(0, 1));
        let outcomes = dispatcher.poll();
        assert_eq!(outcomes.len(), 1);
        assert!(dispatcher.poll().is_empty());
    }

    #[test]
    fn test_abandoned_jobs_report_worker_gone() {
        let outcome = chunk_job(3, 2).abandoned();
        let FetchOutcome::Chunk(resp) = outcome else {
            panic!("expected chunk outcome");
        };
        assert_eq!(resp.index, 3);
        assert_eq!(resp.result.unwrap_err(), ChunkFetchError::WorkerGone);
    }
}
