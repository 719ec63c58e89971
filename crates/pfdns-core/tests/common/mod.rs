//! Test doubles and common utilities for contract tests
//!
//! The recording store answers like the appliance would and counts every
//! call so tests can assert exactly which remote steps ran.

#![allow(dead_code)]

use pfdns_core::Error;
use pfdns_core::config::EngineConfig;
use pfdns_core::traits::{OperationResult, RemoteStore};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// How the recording store answers one kind of call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Succeed
    Ok,
    /// Return `success = false`
    Rejected,
    /// Return a transport error
    Error,
}

/// A RemoteStore that records calls
#[derive(Clone)]
pub struct RecordingStore {
    section: Arc<Mutex<Value>>,
    fetch_reply: Arc<Mutex<Reply>>,
    persist_reply: Arc<Mutex<Reply>>,
    trigger_reply: Arc<Mutex<Reply>>,
    fetch_call_count: Arc<AtomicUsize>,
    persist_call_count: Arc<AtomicUsize>,
    triggers: Arc<Mutex<Vec<String>>>,
    persisted: Arc<Mutex<Vec<Value>>>,
}

impl RecordingStore {
    /// Create a store serving `section`
    pub fn new(section: Value) -> Self {
        Self {
            section: Arc::new(Mutex::new(section)),
            fetch_reply: Arc::new(Mutex::new(Reply::Ok)),
            persist_reply: Arc::new(Mutex::new(Reply::Ok)),
            trigger_reply: Arc::new(Mutex::new(Reply::Ok)),
            fetch_call_count: Arc::new(AtomicUsize::new(0)),
            persist_call_count: Arc::new(AtomicUsize::new(0)),
            triggers: Arc::new(Mutex::new(Vec::new())),
            persisted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn fail_fetch(&self, reply: Reply) {
        *self.fetch_reply.lock().unwrap() = reply;
    }

    pub fn fail_persist(&self, reply: Reply) {
        *self.persist_reply.lock().unwrap() = reply;
    }

    pub fn fail_triggers(&self, reply: Reply) {
        *self.trigger_reply.lock().unwrap() = reply;
    }

    /// Number of times fetch_section() was called
    pub fn fetch_call_count(&self) -> usize {
        self.fetch_call_count.load(Ordering::SeqCst)
    }

    /// Number of times persist_section() was called
    pub fn persist_call_count(&self) -> usize {
        self.persist_call_count.load(Ordering::SeqCst)
    }

    /// Number of times execute_trigger() was called
    pub fn trigger_call_count(&self) -> usize {
        self.triggers.lock().unwrap().len()
    }

    /// Triggers in the order they were called
    pub fn triggers(&self) -> Vec<String> {
        self.triggers.lock().unwrap().clone()
    }

    /// Section as currently stored
    pub fn section(&self) -> Value {
        self.section.lock().unwrap().clone()
    }

    /// Last value handed to persist_section()
    pub fn last_persisted(&self) -> Option<Value> {
        self.persisted.lock().unwrap().last().cloned()
    }

    /// Total number of calls of any kind
    pub fn total_call_count(&self) -> usize {
        self.fetch_call_count() + self.persist_call_count() + self.trigger_call_count()
    }
}

fn answer(reply: Reply, what: &str) -> Result<OperationResult, Error> {
    match reply {
        Reply::Ok => Ok(OperationResult::ok()),
        Reply::Rejected => Ok(OperationResult::failed()),
        Reply::Error => Err(Error::rpc(format!("{what}: connection reset"))),
    }
}

#[async_trait::async_trait]
impl RemoteStore for RecordingStore {
    async fn fetch_section(&self, _section: &str) -> Result<Value, Error> {
        self.fetch_call_count.fetch_add(1, Ordering::SeqCst);
        match *self.fetch_reply.lock().unwrap() {
            Reply::Ok => Ok(self.section()),
            _ => Err(Error::rpc("fetch: connection refused")),
        }
    }

    async fn persist_section(&self, _section: &str, contents: &Value) -> Result<OperationResult, Error> {
        self.persist_call_count.fetch_add(1, Ordering::SeqCst);
        self.persisted.lock().unwrap().push(contents.clone());

        let reply = *self.persist_reply.lock().unwrap();
        if reply == Reply::Ok {
            *self.section.lock().unwrap() = contents.clone();
        }
        answer(reply, "persist")
    }

    async fn execute_trigger(&self, script: &str) -> Result<OperationResult, Error> {
        self.triggers.lock().unwrap().push(script.to_string());
        answer(*self.trigger_reply.lock().unwrap(), "trigger")
    }

    fn store_name(&self) -> &'static str {
        "recording"
    }
}

/// Engine configuration with two recognizable triggers
pub fn test_config(dry_run: bool) -> EngineConfig {
    EngineConfig {
        section: "unbound".to_string(),
        reconfigure_triggers: vec!["reload-resolver".to_string(), "reload-dhcp".to_string()],
        dry_run,
        event_channel_capacity: 100,
    }
}

/// A realistic resolver section with one hand-authored override
pub fn unbound_section() -> Value {
    serde_json::json!({
        "enable": "",
        "active_interface": "lan",
        "hosts": [
            {
                "host": "router",
                "domain": "lan",
                "ip": "10.0.0.1",
                "descr": "gateway",
                "aliases": { "item": [{ "host": "gw", "domain": "lan", "description": "" }] }
            }
        ],
        "acls": [{ "aclid": "0", "aclname": "lan", "aclaction": "allow" }],
        "custom_options": "c2VydmVyOg=="
    })
}
