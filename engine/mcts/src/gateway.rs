//! Evaluator gateway: coalesces concurrent evaluation requests into batches.
//!
//! Simulation workers call [`BatchingEvaluator::evaluate`] like any other
//! evaluator. Each request carries its own response channel; a background
//! thread collects requests until the batch is full or the collection
//! window closes, makes one `evaluate_batch` call on the wrapped model,
//! and sends every caller exactly the result for its own input.

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::evaluator::{EvalResult, Evaluator, EvaluatorError};

type Response = Result<EvalResult, EvaluatorError>;

/// One pending evaluation.
struct Request {
    input: Vec<f32>,
    respond: Sender<Response>,
}

#[derive(Debug, Default)]
struct GatewayCounters {
    requests: AtomicU64,
    batches: AtomicU64,
    failed_batches: AtomicU64,
    largest_batch: AtomicUsize,
}

/// Snapshot of gateway activity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GatewayStats {
    /// Requests sent to the model
    pub requests: u64,
    /// Model calls made
    pub batches: u64,
    /// Model calls that failed
    pub failed_batches: u64,
    pub largest_batch: usize,
}

impl GatewayStats {
    pub fn mean_batch_size(&self) -> f64 {
        if self.batches == 0 {
            0.0
        } else {
            self.requests as f64 / self.batches as f64
        }
    }
}

/// Batching front end for a model evaluator.
pub struct BatchingEvaluator<M: Evaluator + 'static> {
    model: Arc<M>,
    config: GatewayConfig,
    sender: Mutex<Option<Sender<Request>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<GatewayCounters>,
}

impl<M: Evaluator + 'static> BatchingEvaluator<M> {
    /// Start the gateway thread in front of `model`.
    pub fn new(model: M, config: GatewayConfig) -> Result<Self, EvaluatorError> {
        let model = Arc::new(model);
        let counters = Arc::new(GatewayCounters::default());
        let (sender, receiver) = unbounded();

        let worker = {
            let model = Arc::clone(&model);
            let counters = Arc::clone(&counters);
            let config = config.clone();
            std::thread::Builder::new()
                .name("eval-gateway".into())
                .spawn(move || run_gateway(model.as_ref(), receiver, &config, &counters))
                .map_err(|e| EvaluatorError::Unavailable(format!("gateway thread: {}", e)))?
        };

        Ok(Self {
            model,
            config,
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            counters,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The wrapped model.
    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            requests: self.counters.requests.load(Ordering::Relaxed),
            batches: self.counters.batches.load(Ordering::Relaxed),
            failed_batches: self.counters.failed_batches.load(Ordering::Relaxed),
            largest_batch: self.counters.largest_batch.load(Ordering::Relaxed),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    fn submit(&self, input: Vec<f32>) -> Result<Receiver<Response>, EvaluatorError> {
        let sender = self
            .sender
            .lock()
            .as_ref()
            .cloned()
            .ok_or(EvaluatorError::Closed)?;
        let (respond, response) = bounded(1);
        sender
            .send(Request { input, respond })
            .map_err(|_| EvaluatorError::Unavailable("gateway thread stopped".into()))?;
        Ok(response)
    }

    fn wait(&self, response: Receiver<Response>) -> Response {
        match response.recv_timeout(self.config.request_timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                Err(EvaluatorError::Timeout(self.config.request_timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(EvaluatorError::Unavailable(
                "gateway dropped the request".into(),
            )),
        }
    }
}

impl<M: Evaluator + 'static> Evaluator for BatchingEvaluator<M> {
    fn evaluate(&self, input: &[f32]) -> Result<EvalResult, EvaluatorError> {
        let response = self.submit(input.to_vec())?;
        self.wait(response)
    }

    /// Queue every input before waiting, so one caller's batch coalesces too.
    fn evaluate_batch(&self, inputs: &[&[f32]]) -> Result<Vec<EvalResult>, EvaluatorError> {
        let pending = inputs
            .iter()
            .map(|input| self.submit(input.to_vec()))
            .collect::<Result<Vec<_>, _>>()?;
        pending.into_iter().map(|rx| self.wait(rx)).collect()
    }

    /// Stop accepting requests, drain the queue and join the gateway thread.
    fn close(&self) {
        let Some(sender) = self.sender.lock().take() else {
            return;
        };
        drop(sender);

        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                warn!("Evaluator gateway thread panicked");
            }
        }
        self.model.close();
    }
}

impl<M: Evaluator + 'static> Drop for BatchingEvaluator<M> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<M: Evaluator + 'static> std::fmt::Debug for BatchingEvaluator<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchingEvaluator")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Gateway thread body. Returns once every sender is gone and the queue
/// is drained.
fn run_gateway<M: Evaluator>(
    model: &M,
    requests: Receiver<Request>,
    config: &GatewayConfig,
    counters: &GatewayCounters,
) {
    info!(
        max_batch_size = config.max_batch_size,
        batch_wait_us = config.batch_wait.as_micros() as u64,
        "Evaluator gateway started"
    );

    while let Ok(first) = requests.recv() {
        let mut batch = vec![first];
        let deadline = Instant::now() + config.batch_wait;
        while batch.len() < config.max_batch_size {
            match requests.recv_deadline(deadline) {
                Ok(request) => batch.push(request),
                Err(_) => break,
            }
        }
        dispatch(model, batch, counters);
    }

    info!(
        requests = counters.requests.load(Ordering::Relaxed),
        batches = counters.batches.load(Ordering::Relaxed),
        "Evaluator gateway stopped"
    );
}

/// Run one model call and fan the results out to the waiting callers.
fn dispatch<M: Evaluator>(model: &M, batch: Vec<Request>, counters: &GatewayCounters) {
    let size = batch.len();
    counters.requests.fetch_add(size as u64, Ordering::Relaxed);
    counters.batches.fetch_add(1, Ordering::Relaxed);
    counters.largest_batch.fetch_max(size, Ordering::Relaxed);

    let inputs: Vec<&[f32]> = batch.iter().map(|r| r.input.as_slice()).collect();
    let outcome = match model.evaluate_batch(&inputs) {
        Ok(results) if results.len() == size => Ok(results),
        Ok(results) => Err(EvaluatorError::InvalidOutput(format!(
            "model returned {} results for {} inputs",
            results.len(),
            size
        ))),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(results) => {
            debug!(batch_size = size, "Evaluated batch");
            for (request, result) in batch.into_iter().zip(results) {
                // The caller may have timed out and dropped its receiver
                let _ = request.respond.send(Ok(result));
            }
        }
        Err(e) => {
            counters.failed_batches.fetch_add(1, Ordering::Relaxed);
            warn!(batch_size = size, error = %e, "Batch evaluation failed");
            for request in batch {
                let _ = request.respond.send(Err(e.clone()));
            }
        }
    }
}
