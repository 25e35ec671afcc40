//! Scripted transport for tests that must not touch the network

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::UpstreamFailure;
use crate::transport::UpstreamTransport;

/// A call observed by [`ScriptedTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub url: String,
    pub body: Option<Value>,
    pub timeout: Duration,
}

/// Replays queued answers in order and records every call it receives.
///
/// An exhausted queue answers with an `Unexpected` failure.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    posts: Mutex<VecDeque<Result<Value, UpstreamFailure>>>,
    gets: Mutex<VecDeque<Result<Value, UpstreamFailure>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_post(self, answer: Result<Value, UpstreamFailure>) -> Self {
        self.posts.lock().unwrap().push_back(answer);
        self
    }

    pub fn push_get(self, answer: Result<Value, UpstreamFailure>) -> Self {
        self.gets.lock().unwrap().push_back(answer);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl UpstreamTransport for ScriptedTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<Value, UpstreamFailure> {
        self.record(RecordedCall {
            method: "POST",
            url: url.to_string(),
            body: Some(body.clone()),
            timeout,
        });
        self.posts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(UpstreamFailure::unexpected("no scripted POST answer")))
    }

    async fn get_json(&self, url: &str, timeout: Duration) -> Result<Value, UpstreamFailure> {
        self.record(RecordedCall {
            method: "GET",
            url: url.to_string(),
            body: None,
            timeout,
        });
        self.gets
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(UpstreamFailure::unexpected("no scripted GET answer")))
    }
}
