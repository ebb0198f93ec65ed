use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use crate::api::{DataSource, FetchError, fetch_chart};
use crate::charts::ChartPayload;
use crate::refresh::{FetchRequest, FetchTicket};

// ---------------------------------------------------------------------------
// Background fetch thread
// ---------------------------------------------------------------------------

struct FetchJob {
    request: FetchRequest,
    source: Arc<dyn DataSource>,
}

/// A finished fetch, to be handed to the coordinator.
pub struct FetchResult {
    pub ticket: FetchTicket,
    pub outcome: Result<ChartPayload, FetchError>,
}

/// Runs fetches one at a time off the UI thread.
///
/// The thread exits once the worker is dropped.
pub struct FetchWorker {
    jobs: Sender<FetchJob>,
    results: Receiver<FetchResult>,
    notify: Arc<dyn Fn() + Send + Sync>,
}

impl FetchWorker {
    /// Start the thread. `notify` is called after every result is posted,
    /// typically to wake the UI.
    pub fn spawn(notify: impl Fn() + Send + Sync + 'static) -> io::Result<Self> {
        let notify: Arc<dyn Fn() + Send + Sync> = Arc::new(notify);
        let (jobs, results) = start_thread(Arc::clone(&notify))?;
        Ok(FetchWorker { jobs, results, notify })
    }

    /// Replace a worker thread that has stopped. Queued jobs and unread
    /// results of the old thread are lost.
    pub fn respawn(&mut self) -> io::Result<()> {
        let (jobs, results) = start_thread(Arc::clone(&self.notify))?;
        self.jobs = jobs;
        self.results = results;
        log::warn!("fetch worker restarted");
        Ok(())
    }

    /// Queue a fetch. Returns `false` if the worker thread is gone.
    pub fn submit(&self, request: FetchRequest, source: Arc<dyn DataSource>) -> bool {
        let sent = self.jobs.send(FetchJob { request, source }).is_ok();
        if !sent {
            log::error!("fetch worker is not running; dropping {:?}", request.ticket);
        }
        sent
    }

    /// A finished fetch, if one is waiting.
    pub fn try_recv(&self) -> Option<FetchResult> {
        self.results.try_recv().ok()
    }

    /// A worker whose thread has already exited.
    #[cfg(test)]
    pub fn stopped() -> Self {
        let (jobs, _) = mpsc::channel();
        let (_, results) = mpsc::channel();
        FetchWorker {
            jobs,
            results,
            notify: Arc::new(|| {}),
        }
    }
}

fn start_thread(notify: Arc<dyn Fn() + Send + Sync>) -> io::Result<(Sender<FetchJob>, Receiver<FetchResult>)> {
    let (jobs, job_rx) = mpsc::channel::<FetchJob>();
    let (result_tx, results) = mpsc::channel();

    thread::Builder::new()
        .name("fetch-worker".into())
        .spawn(move || {
            for job in job_rx {
                let FetchRequest { ticket, chart, range } = job.request;
                log::debug!("fetching {chart} for {range}");
                let outcome = fetch_chart(job.source.as_ref(), chart, range);
                if result_tx.send(FetchResult { ticket, outcome }).is_err() {
                    break;
                }
                notify();
            }
            log::debug!("fetch worker stopped");
        })?;

    Ok((jobs, results))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::api::wire::{AverageResponse, BubbleResponse, CauseRow, LineRow};
    use crate::charts::ChartKind;
    use crate::data::filter::YearRange;
    use crate::data::topology::WorldMap;

    struct Empty;

    impl DataSource for Empty {
        fn describe(&self) -> String {
            "empty".into()
        }
        fn average_life_expectancy(&self, _: YearRange) -> Result<AverageResponse, FetchError> {
            Ok(AverageResponse::new())
        }
        fn bubble_rows(&self, _: YearRange) -> Result<BubbleResponse, FetchError> {
            Ok(BubbleResponse::new())
        }
        fn death_causes(&self, _: YearRange) -> Result<Vec<CauseRow>, FetchError> {
            Ok(Vec::new())
        }
        fn life_expectancy(&self, _: YearRange) -> Result<Vec<LineRow>, FetchError> {
            Ok(Vec::new())
        }
        fn world_topology(&self) -> Result<Arc<WorldMap>, FetchError> {
            Ok(Arc::new(WorldMap::default()))
        }
    }

    fn wait_for(worker: &FetchWorker) -> FetchResult {
        for _ in 0..200 {
            if let Some(result) = worker.try_recv() {
                return result;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("no result from the fetch worker");
    }

    #[test]
    fn stopped_worker_rejects_jobs_until_respawned() {
        let mut worker = FetchWorker::stopped();
        let source: Arc<dyn DataSource> = Arc::new(Empty);
        let request = FetchRequest {
            ticket: FetchTicket { pass: 1, step: 0 },
            chart: ChartKind::Line,
            range: YearRange::new(2000, 2001),
        };
        assert!(!worker.submit(request, Arc::clone(&source)));

        worker.respawn().unwrap();
        assert!(worker.submit(request, source));
        assert_eq!(wait_for(&worker).ticket, request.ticket);
    }

    #[test]
    fn results_come_back_in_submission_order() {
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notified);
        let worker = FetchWorker::spawn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let source: Arc<dyn DataSource> = Arc::new(Empty);
        let range = YearRange::new(2000, 2001);
        for (step, chart) in [ChartKind::Bar, ChartKind::Line].into_iter().enumerate() {
            let ticket = FetchTicket { pass: 1, step };
            assert!(worker.submit(FetchRequest { ticket, chart, range }, Arc::clone(&source)));
        }

        let first = wait_for(&worker);
        let second = wait_for(&worker);
        assert_eq!(first.ticket.step, 0);
        assert_eq!(first.outcome.unwrap().kind(), ChartKind::Bar);
        assert_eq!(second.outcome.unwrap().kind(), ChartKind::Line);
        // `notify` runs right after each send.
        for _ in 0..200 {
            if notified.load(Ordering::SeqCst) == 2 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(notified.load(Ordering::SeqCst), 2);
    }
}
