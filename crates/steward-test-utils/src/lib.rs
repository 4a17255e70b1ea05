//! Testing utilities for the Steward workspace
//!
//! Scripted reasoning, fake capabilities, a recording transport and a
//! harness that wires them into [`Services`].

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use steward_capability::{
    Capability, CapabilityDescriptor, CapabilityError, CapabilityRegistry, InvocationContext,
    OwnerId,
};
use steward_core::{
    InvocationRequest, Limits, MemoryScratchpad, MemoryStore, Message, Planner, ReasoningError,
    ReasoningService, Reply, Services, StepExecutor, Transport, TransportError, PROPOSE_PLAN,
};
use steward_policy::{PolicyEngine, RulePolicyEngine};
use tokio::time::Instant;

static NEXT_CALL: AtomicUsize = AtomicUsize::new(1);

// ---------------------------------------------------------------------------
// Scripted reasoning
// ---------------------------------------------------------------------------

/// One scripted reasoning response
#[derive(Debug, Clone)]
pub enum Scripted {
    Reply(Reply),
    Error(ReasoningError),
    /// Wait (tokio time) before replying
    Delay(Duration, Reply),
}

impl From<Reply> for Scripted {
    fn from(reply: Reply) -> Self {
        Self::Reply(reply)
    }
}

/// Which loop issued a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Planner,
    Worker,
}

/// A request the engine made
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub lane: Lane,
    pub messages: Vec<Message>,
    pub manifest: Vec<String>,
}

/// Reasoning service replaying fixed replies
///
/// Requests whose manifest offers `propose_plan` come from the planner and
/// are served from the planner queue; everything else from the worker queue.
/// An exhausted queue answers with `ReasoningError::Unavailable`.
#[derive(Debug, Default)]
pub struct ScriptedReasoning {
    planner: Mutex<VecDeque<Scripted>>,
    worker: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedReasoning {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plan(&self, item: impl Into<Scripted>) -> &Self {
        self.planner.lock().push_back(item.into());
        self
    }

    pub fn work(&self, item: impl Into<Scripted>) -> &Self {
        self.worker.lock().push_back(item.into());
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_from(&self, lane: Lane) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.lane == lane)
            .cloned()
            .collect()
    }

    pub fn remaining(&self) -> (usize, usize) {
        (self.planner.lock().len(), self.worker.lock().len())
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoning {
    async fn complete(
        &self,
        messages: &[Message],
        manifest: &[CapabilityDescriptor],
    ) -> Result<Reply, ReasoningError> {
        let lane = if manifest.iter().any(|d| d.name == PROPOSE_PLAN) {
            Lane::Planner
        } else {
            Lane::Worker
        };
        self.requests.lock().push(RecordedRequest {
            lane,
            messages: messages.to_vec(),
            manifest: manifest.iter().map(|d| d.name.clone()).collect(),
        });

        let next = match lane {
            Lane::Planner => self.planner.lock().pop_front(),
            Lane::Worker => self.worker.lock().pop_front(),
        };
        match next {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Error(e)) => Err(e),
            Some(Scripted::Delay(delay, reply)) => {
                tokio::time::sleep(delay).await;
                Ok(reply)
            }
            None => Err(ReasoningError::Unavailable(format!("{lane:?} script exhausted"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Reply builders
// ---------------------------------------------------------------------------

/// One step of a proposal
pub fn step(id: u32, description: &str, status: &str, tools: &[&str]) -> Value {
    json!({
        "id": id,
        "description": description,
        "status": status,
        "tools": tools,
    })
}

/// Planner reply proposing a plan
pub fn propose(steps: Vec<Value>) -> Reply {
    call(PROPOSE_PLAN, json!({ "steps": steps }))
}

/// Reply requesting one invocation
pub fn call(name: &str, arguments: Value) -> Reply {
    Reply::invoke(vec![request(name, arguments)])
}

/// Invocation request with a fresh id
pub fn request(name: &str, arguments: Value) -> InvocationRequest {
    let id = NEXT_CALL.fetch_add(1, Ordering::Relaxed);
    InvocationRequest::new(format!("call_{id}"), name, arguments.to_string())
}

/// Final free-text reply
pub fn answer(text: &str) -> Reply {
    Reply::text(text)
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

fn open_schema() -> Value {
    json!({ "type": "object" })
}

/// Always answers with the same text
#[derive(Debug)]
pub struct StaticCapability {
    descriptor: CapabilityDescriptor,
    response: String,
    calls: Mutex<Vec<Value>>,
}

impl StaticCapability {
    pub fn new(name: &str, response: &str) -> Arc<Self> {
        Arc::new(Self {
            descriptor: CapabilityDescriptor::new(name, format!("{name} test capability"), open_schema()),
            response: response.to_string(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Capability for StaticCapability {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, _ctx: &InvocationContext, args: Value) -> Result<String, CapabilityError> {
        self.calls.lock().push(args);
        Ok(self.response.clone())
    }
}

/// Fails with an execution error a fixed number of times, then succeeds
#[derive(Debug)]
pub struct FlakyCapability {
    descriptor: CapabilityDescriptor,
    failures_left: AtomicU32,
    attempts: Mutex<Vec<Instant>>,
}

impl FlakyCapability {
    pub fn new(name: &str, failures: u32) -> Arc<Self> {
        Arc::new(Self {
            descriptor: CapabilityDescriptor::new(name, format!("{name} flaky capability"), open_schema()),
            failures_left: AtomicU32::new(failures),
            attempts: Mutex::new(Vec::new()),
        })
    }

    /// Tokio instants of every attempt
    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().clone()
    }
}

#[async_trait]
impl Capability for FlakyCapability {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, _ctx: &InvocationContext, _args: Value) -> Result<String, CapabilityError> {
        self.attempts.lock().push(Instant::now());
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(CapabilityError::execution(&self.descriptor.name, "upstream unavailable"));
        }
        Ok("recovered".to_string())
    }
}

/// Sleeps before answering
#[derive(Debug)]
pub struct SlowCapability {
    descriptor: CapabilityDescriptor,
    delay: Duration,
    calls: AtomicUsize,
}

impl SlowCapability {
    pub fn new(name: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            descriptor: CapabilityDescriptor::new(name, format!("{name} slow capability"), open_schema()),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Capability for SlowCapability {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, _ctx: &InvocationContext, _args: Value) -> Result<String, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok("finally".to_string())
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Keeps every delivery
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(OwnerId, String)>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<(OwnerId, String)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, owner: &OwnerId, text: &str) -> Result<(), TransportError> {
        self.sent.lock().push((owner.clone(), text.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub fn owner() -> OwnerId {
    OwnerId::from("chat-1")
}

/// Registry holding the given capabilities
pub fn registry(capabilities: Vec<Arc<dyn Capability>>) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    for capability in capabilities {
        registry.register(capability).unwrap();
    }
    registry
}

/// Scripted reasoning, in-memory store and scratchpad wired into services
pub struct Harness {
    pub reasoning: Arc<ScriptedReasoning>,
    pub store: Arc<MemoryStore>,
    pub scratchpad: Arc<MemoryScratchpad>,
    pub services: Services,
}

impl Harness {
    /// Default safety rules
    pub fn new(capabilities: Vec<Arc<dyn Capability>>) -> Self {
        Self::with_policy(capabilities, RulePolicyEngine::with_default_rules())
    }

    pub fn with_policy(capabilities: Vec<Arc<dyn Capability>>, policy: impl PolicyEngine + 'static) -> Self {
        Self::from_registry(registry(capabilities), policy)
    }

    pub fn from_registry(registry: CapabilityRegistry, policy: impl PolicyEngine + 'static) -> Self {
        let reasoning = Arc::new(ScriptedReasoning::new());
        let store = Arc::new(MemoryStore::new());
        let scratchpad = Arc::new(MemoryScratchpad::new());
        let services = Services::new(
            reasoning.clone(),
            Arc::new(registry),
            Arc::new(policy),
            scratchpad.clone(),
            store.clone(),
        );
        Self {
            reasoning,
            store,
            scratchpad,
            services,
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.services = self.services.with_limits(limits);
        self
    }

    pub fn planner(&self) -> Planner {
        Planner::new(self.services.clone())
    }

    pub fn executor(&self) -> StepExecutor {
        StepExecutor::new(self.services.clone())
    }
}
