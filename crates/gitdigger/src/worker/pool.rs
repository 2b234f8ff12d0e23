use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info};

use crate::error::WorkerError;
use crate::pipeline::Pipeline;
use crate::worker::job::{JobRequest, JobResult};

/// Fixed set of OS threads running pipelines off the request path.
///
/// Each worker owns a current-thread tokio runtime and takes jobs from a
/// shared queue. `shutdown` stops intake; `wait` lets the workers drain
/// whatever is already queued and joins them.
pub struct WorkerPool {
    job_sender: Sender<JobRequest>,
    result_receiver: Receiver<JobResult>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(pipeline: Arc<Pipeline>, worker_count: usize) -> Result<Self, WorkerError> {
        if worker_count == 0 {
            return Err(WorkerError::NoWorkers);
        }

        let (job_sender, job_receiver) = unbounded::<JobRequest>();
        let (result_sender, result_receiver) = unbounded::<JobResult>();
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;
            let job_rx = job_receiver.clone();
            let result_tx = result_sender.clone();
            let worker_pipeline = Arc::clone(&pipeline);

            let handle = thread::Builder::new()
                .name(format!("gitdigger-worker-{}", worker_id))
                .spawn(move || {
                    run_worker(worker_id, runtime, job_rx, result_tx, worker_pipeline);
                })
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Ok(Self {
            job_sender,
            result_receiver,
            workers,
            shutdown,
        })
    }

    /// Queues a job without blocking. Fails once the pool is shut down.
    pub fn submit(&self, request: JobRequest) -> Result<(), WorkerError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(WorkerError::ChannelClosed);
        }

        self.job_sender
            .send(request)
            .map_err(|_| WorkerError::ChannelClosed)
    }

    /// Number of jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.job_sender.len()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn try_recv_result(&self) -> Option<JobResult> {
        self.result_receiver.try_recv().ok()
    }

    pub fn recv_result(&self) -> Option<JobResult> {
        self.result_receiver.recv().ok()
    }

    pub fn recv_result_timeout(&self, timeout: Duration) -> Option<JobResult> {
        self.result_receiver.recv_timeout(timeout).ok()
    }

    /// A handle on the result channel for a dedicated consumer.
    pub fn results(&self) -> Receiver<JobResult> {
        self.result_receiver.clone()
    }

    /// Stops accepting new jobs. Queued and running jobs still finish.
    pub fn shutdown(&self) {
        info!("Shutting down worker pool ({} queued)", self.queued());
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Closes the queue, waits for workers to drain it, and joins them.
    pub fn wait(self) {
        self.shutdown.store(true, Ordering::Release);
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }
}

fn run_worker(
    worker_id: usize,
    runtime: tokio::runtime::Runtime,
    job_receiver: Receiver<JobRequest>,
    result_sender: Sender<JobResult>,
    pipeline: Arc<Pipeline>,
) {
    debug!("Worker {} started", worker_id);

    // recv keeps returning queued jobs after the sender is dropped and
    // only errors once the queue is empty.
    while let Ok(request) = job_receiver.recv() {
        debug!("Worker {} processing job {}", worker_id, request.job_id);
        let result = runtime.block_on(pipeline.run(&request));

        // Nobody listening for results is fine; the store has the outcome.
        if result_sender.send(result).is_err() {
            debug!("Worker {} result channel closed", worker_id);
        }
    }

    debug!("Worker {} stopped, queue drained", worker_id);
}
