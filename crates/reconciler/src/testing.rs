//! Scripted collaborators for exercising the watch engine without a live
//! job service.
//!
//! Each provider operation replays its own queue of canned responses. The
//! last response is sticky: once a queue is down to one entry it is returned
//! for every further call. An operation with nothing scripted fails.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::time::Instant;
use tunewatch_core::{JobDetail, TrainingStatus};

use crate::error::{Error, Result};
use crate::provider::{JobStatusProvider, ReportSink};
use crate::types::{JobIndex, JobSnapshot};

#[derive(Debug)]
struct Script<T> {
    probe: &'static str,
    responses: VecDeque<Result<T>>,
}

impl<T: Clone> Script<T> {
    const fn new(probe: &'static str) -> Self {
        Self {
            probe,
            responses: VecDeque::new(),
        }
    }

    fn next(&mut self) -> Result<T> {
        if self.responses.len() > 1 {
            if let Some(response) = self.responses.pop_front() {
                return response;
            }
        }
        self.responses
            .front()
            .cloned()
            .unwrap_or_else(|| Err(Error::probe_failed(self.probe, "no scripted response")))
    }
}

/// Number of calls made to each provider operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderCalls {
    pub get_detail: usize,
    pub terminate: usize,
    pub locate_log: usize,
    pub package_output: usize,
}

#[derive(Debug, Default)]
struct Counters {
    get_detail: AtomicUsize,
    terminate: AtomicUsize,
    locate_log: AtomicUsize,
    package_output: AtomicUsize,
}

/// `JobStatusProvider` that replays canned responses.
#[derive(Debug)]
pub struct ScriptedProvider {
    details: Mutex<Script<JobDetail>>,
    terminates: Mutex<Script<()>>,
    logs: Mutex<Script<String>>,
    outputs: Mutex<Script<String>>,
    counters: Counters,
    log_dirs: Mutex<Vec<String>>,
    terminated: Mutex<Vec<String>>,
    checks: Mutex<Vec<(String, Instant)>>,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProvider {
    /// A provider with nothing scripted; every call fails.
    pub fn new() -> Self {
        Self {
            details: Mutex::new(Script::new("status")),
            terminates: Mutex::new(Script::new("terminate")),
            logs: Mutex::new(Script::new("log")),
            outputs: Mutex::new(Script::new("output")),
            counters: Counters::default(),
            log_dirs: Mutex::new(Vec::new()),
            terminated: Mutex::new(Vec::new()),
            checks: Mutex::new(Vec::new()),
        }
    }

    /// A job that has already completed after `duration` seconds, with a log
    /// at `log` and its output packaged to `archive`.
    pub fn completed(duration: u64, log: &str, archive: &str) -> Self {
        Self::new()
            .with_detail(Ok(JobDetail::new(TrainingStatus::Completed, duration)))
            .with_log(Ok(log.to_string()))
            .with_output(Ok(archive.to_string()))
    }

    #[must_use]
    pub fn with_detail(self, response: Result<JobDetail>) -> Self {
        push(&self.details, response);
        self
    }

    #[must_use]
    pub fn with_terminate(self, response: Result<()>) -> Self {
        push(&self.terminates, response);
        self
    }

    #[must_use]
    pub fn with_log(self, response: Result<String>) -> Self {
        push(&self.logs, response);
        self
    }

    #[must_use]
    pub fn with_output(self, response: Result<String>) -> Self {
        push(&self.outputs, response);
        self
    }

    /// Calls made so far.
    pub fn calls(&self) -> ProviderCalls {
        ProviderCalls {
            get_detail: self.counters.get_detail.load(Ordering::SeqCst),
            terminate: self.counters.terminate.load(Ordering::SeqCst),
            locate_log: self.counters.locate_log.load(Ordering::SeqCst),
            package_output: self.counters.package_output.load(Ordering::SeqCst),
        }
    }

    /// Log directories passed to `locate_log`, in call order.
    pub fn log_dirs(&self) -> Vec<String> {
        self.log_dirs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// When `job_id`'s status was requested, in call order.
    pub fn checks_of(&self, job_id: &str) -> Vec<Instant> {
        self.checks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(id, _)| id == job_id)
            .map(|(_, at)| *at)
            .collect()
    }

    /// Job ids passed to `terminate`, in call order.
    pub fn terminated(&self) -> Vec<String> {
        self.terminated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn push<T>(script: &Mutex<Script<T>>, response: Result<T>) {
    script
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .responses
        .push_back(response);
}

fn next<T: Clone>(script: &Mutex<Script<T>>, counter: &AtomicUsize) -> Result<T> {
    counter.fetch_add(1, Ordering::SeqCst);
    script.lock().unwrap_or_else(PoisonError::into_inner).next()
}

#[async_trait]
impl JobStatusProvider for ScriptedProvider {
    async fn get_detail(&self, job_id: &str) -> Result<JobDetail> {
        self.checks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((job_id.to_string(), Instant::now()));
        next(&self.details, &self.counters.get_detail)
    }

    async fn terminate(&self, job_id: &str) -> Result<()> {
        self.terminated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(job_id.to_string());
        next(&self.terminates, &self.counters.terminate)
    }

    async fn locate_log(&self, log_dir: &str) -> Result<String> {
        self.log_dirs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(log_dir.to_string());
        next(&self.logs, &self.counters.locate_log)
    }

    async fn package_output(&self, _output_dir: &str) -> Result<String> {
        next(&self.outputs, &self.counters.package_output)
    }
}

/// `ReportSink` that records every snapshot it accepts.
#[derive(Debug, Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<(JobIndex, JobSnapshot)>>,
    attempts: AtomicUsize,
    failures_left: AtomicUsize,
    closed: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `n` reports.
    #[must_use]
    pub fn failing(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    /// Accepted reports, in arrival order.
    pub fn reports(&self) -> Vec<(JobIndex, JobSnapshot)> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Accepted reports for one finetune id.
    pub fn reports_for(&self, finetune_id: &str) -> Vec<JobSnapshot> {
        self.reports()
            .into_iter()
            .filter(|(index, _)| index.finetune_id == finetune_id)
            .map(|(_, snapshot)| snapshot)
            .collect()
    }

    /// Every call to `report`, accepted or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportSink for RecordingSink {
    async fn report(&self, index: &JobIndex, snapshot: &JobSnapshot) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let rejected = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if rejected {
            return Err(Error::report_failed("scripted rejection"));
        }

        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((index.clone(), snapshot.clone()));
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
