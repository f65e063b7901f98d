//! Scripted camera and manual clock for pipeline tests

use crate::clock::Clock;
use async_trait::async_trait;
use osc_protocol::{endpoint, DeviceChannel, OscError};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Clock whose sleeps advance time instantly
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        })
    }

    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        *self.offset.lock().unwrap() += duration;
    }
}

/// A request the scripted camera received
#[derive(Debug, Clone)]
pub struct Call {
    pub method: &'static str,
    pub target: String,
    pub body: Option<Value>,
    /// Manual clock time of the call, when a clock is attached
    pub at: Option<Duration>,
}

/// Camera that answers from per-path response queues
///
/// When a queue runs dry the path's sticky fallback is used, or `{}`.
#[derive(Default)]
pub struct ScriptedChannel {
    queues: Mutex<HashMap<String, VecDeque<Result<Value, OscError>>>>,
    fallbacks: HashMap<String, Value>,
    downloads: Mutex<VecDeque<Result<Vec<u8>, OscError>>>,
    calls: Mutex<Vec<Call>>,
    clock: Option<Arc<ManualClock>>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(mut self, clock: Arc<ManualClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn respond(self, path: &str, value: Value) -> Self {
        self.push(path, Ok(value))
    }

    pub fn reject(self, path: &str, status: u16) -> Self {
        let error = OscError::Protocol {
            method: if path == endpoint::INFO { "GET" } else { "POST" },
            path: path.to_string(),
            status,
            body: json!({"error": {"code": "invalidParameterName"}}).to_string(),
        };
        self.push(path, Err(error))
    }

    pub fn fail(self, path: &str) -> Self {
        let error = OscError::Transport {
            target: path.to_string(),
            reason: "connection refused".to_string(),
        };
        self.push(path, Err(error))
    }

    pub fn fallback(mut self, path: &str, value: Value) -> Self {
        self.fallbacks.insert(path.to_string(), value);
        self
    }

    pub fn download_ok(self, bytes: &[u8]) -> Self {
        self.downloads.lock().unwrap().push_back(Ok(bytes.to_vec()));
        self
    }

    pub fn download_err(self, url: &str, status: u16) -> Self {
        self.downloads.lock().unwrap().push_back(Err(OscError::Download {
            url: url.to_string(),
            status,
            body: "not found".to_string(),
        }));
        self
    }

    fn push(self, path: &str, response: Result<Value, OscError>) -> Self {
        self.queues
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, target: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.target == target)
            .collect()
    }

    pub fn download_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == "DOWNLOAD")
            .collect()
    }

    fn record(&self, method: &'static str, target: &str, body: Option<Value>) {
        let at = self.clock.as_ref().map(|c| c.elapsed());
        self.calls.lock().unwrap().push(Call {
            method,
            target: target.to_string(),
            body,
            at,
        });
    }

    fn next(&self, path: &str) -> Result<Value, OscError> {
        let scripted = self
            .queues
            .lock()
            .unwrap()
            .get_mut(path)
            .and_then(|q| q.pop_front());

        scripted.unwrap_or_else(|| {
            Ok(self
                .fallbacks
                .get(path)
                .cloned()
                .unwrap_or_else(|| json!({})))
        })
    }
}

#[async_trait]
impl DeviceChannel for ScriptedChannel {
    async fn get(&self, path: &str) -> Result<Value, OscError> {
        self.record("GET", path, None);
        self.next(path)
    }

    async fn post(&self, path: &str, body: Option<Value>) -> Result<Value, OscError> {
        self.record("POST", path, body);
        self.next(path)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, OscError> {
        self.record("DOWNLOAD", url, None);
        self.downloads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}
