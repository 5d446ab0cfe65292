//! In-process Redis stand-in for the store tests.
//!
//! Emulates SET/INCRBY/PTTL/GET/DEL and the increment script, and counts
//! every call that would have hit the network. Errors can be injected with
//! [`FakeRedis::fail_commands`].

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use ratelimit_store::cache::{Command, ConnectionStatus, StoreConnection};
use redis::{ErrorKind, RedisError, RedisResult, Script, Value};

struct Entry {
    value: i64,
    expires_at: Option<Instant>,
}

#[derive(Default)]
pub struct CallCounts {
    pub load: AtomicUsize,
    pub invoke: AtomicUsize,
    pub eval: AtomicUsize,
    pub exec: AtomicUsize,
    pub del: AtomicUsize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.load.load(Ordering::SeqCst)
            + self.invoke.load(Ordering::SeqCst)
            + self.eval.load(Ordering::SeqCst)
            + self.exec.load(Ordering::SeqCst)
            + self.del.load(Ordering::SeqCst)
    }
}

pub struct FakeRedis {
    data: Mutex<HashMap<String, Entry>>,
    pub calls: CallCounts,
    registered: bool,
    nested: bool,
    status: Mutex<Option<ConnectionStatus>>,
    ready: AtomicBool,
    has_probe: bool,
    failure: Mutex<Option<(ErrorKind, &'static str, String)>>,
}

impl FakeRedis {
    /// Client that can register scripts and reports a status field.
    pub fn registered() -> Self {
        Self::build(true, false, false)
    }

    /// Client limited to EVAL that wraps replies in `[meta, value]` pairs.
    pub fn eval_only_nested() -> Self {
        Self::build(false, true, true)
    }

    fn build(registered: bool, nested: bool, has_probe: bool) -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
            calls: CallCounts::default(),
            registered,
            nested,
            status: Mutex::new(if has_probe {
                None
            } else {
                Some(ConnectionStatus::Ready)
            }),
            ready: AtomicBool::new(true),
            has_probe,
            failure: Mutex::new(None),
        }
    }

    pub fn set_status(&self, status: ConnectionStatus) {
        *self.status.lock().unwrap() = Some(status);
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Every later command fails with this error.
    pub fn fail_commands(&self, kind: ErrorKind, desc: &'static str, detail: &str) {
        *self.failure.lock().unwrap() = Some((kind, desc, detail.to_string()));
    }

    fn injected_failure(&self) -> RedisResult<()> {
        match self.failure.lock().unwrap().as_ref() {
            Some((kind, desc, detail)) => Err(RedisError::from((*kind, *desc, detail.clone()))),
            None => Ok(()),
        }
    }

    /// Writes a key with no expiry, bypassing the store.
    pub fn insert_persistent(&self, key: &str, value: i64) {
        self.data.lock().unwrap().insert(
            key.to_string(),
            Entry {
                value,
                expires_at: None,
            },
        );
    }

    /// Makes the key expire immediately.
    pub fn expire_now(&self, key: &str) {
        if let Some(entry) = self.data.lock().unwrap().get_mut(key) {
            entry.expires_at = Some(Instant::now());
        }
    }

    fn purge_expired(data: &mut HashMap<String, Entry>, key: &str) {
        let expired = data
            .get(key)
            .and_then(|e| e.expires_at)
            .is_some_and(|at| at <= Instant::now());
        if expired {
            data.remove(key);
        }
    }

    fn pttl(data: &HashMap<String, Entry>, key: &str) -> i64 {
        match data.get(key) {
            None => -2,
            Some(Entry {
                expires_at: None, ..
            }) => -1,
            Some(Entry {
                expires_at: Some(at),
                ..
            }) => at.saturating_duration_since(Instant::now()).as_millis() as i64,
        }
    }

    fn run(data: &mut HashMap<String, Entry>, command: &Command) -> Value {
        Self::purge_expired(data, command.key());
        match command {
            Command::Set {
                key,
                value,
                expire_secs,
            } => {
                data.insert(
                    key.clone(),
                    Entry {
                        value: *value,
                        expires_at: expire_secs.map(|s| Instant::now() + Duration::from_secs(s)),
                    },
                );
                Value::Okay
            }
            Command::IncrBy { key, by } => {
                let entry = data.entry(key.clone()).or_insert(Entry {
                    value: 0,
                    expires_at: None,
                });
                entry.value += by;
                Value::Int(entry.value)
            }
            Command::Pttl { key } => Value::Int(Self::pttl(data, key)),
            Command::Get { key } => match data.get(key) {
                Some(entry) => Value::BulkString(entry.value.to_string().into_bytes()),
                None => Value::Nil,
            },
        }
    }

    fn run_script(&self, key: &str, args: &[i64]) -> Value {
        let (points, secs) = (args[0], args[1] as u64);
        let mut data = self.data.lock().unwrap();
        Self::purge_expired(&mut data, key);
        let entry = data.entry(key.to_string()).or_insert(Entry {
            value: 0,
            expires_at: Some(Instant::now() + Duration::from_secs(secs)),
        });
        entry.value += points;
        let consumed = entry.value;
        let mut ttl = Self::pttl(&data, key);
        if ttl == -1 {
            if let Some(entry) = data.get_mut(key) {
                entry.expires_at = Some(Instant::now() + Duration::from_secs(secs));
            }
            ttl = 1000 * secs as i64;
        }
        Value::Array(vec![Value::Int(consumed), Value::Int(ttl)])
    }

    fn shape(&self, replies: Vec<Value>) -> Value {
        if self.nested {
            Value::Array(
                replies
                    .into_iter()
                    .map(|v| Value::Array(vec![Value::Nil, v]))
                    .collect(),
            )
        } else {
            Value::Array(replies)
        }
    }
}

impl StoreConnection for FakeRedis {
    fn status(&self) -> Option<ConnectionStatus> {
        *self.status.lock().unwrap()
    }

    fn ready_probe(&self) -> Option<bool> {
        self.has_probe.then(|| self.ready.load(Ordering::SeqCst))
    }

    fn supports_registered_scripts(&self) -> bool {
        self.registered
    }

    async fn load_script(&self, _script: &Script) -> RedisResult<()> {
        self.calls.load.fetch_add(1, Ordering::SeqCst);
        self.injected_failure()?;
        Ok(())
    }

    async fn invoke_script(&self, _script: &Script, key: &str, args: &[i64]) -> RedisResult<Value> {
        self.calls.invoke.fetch_add(1, Ordering::SeqCst);
        self.injected_failure()?;
        Ok(self.run_script(key, args))
    }

    async fn eval(&self, _source: &str, key: &str, args: &[i64]) -> RedisResult<Value> {
        self.calls.eval.fetch_add(1, Ordering::SeqCst);
        self.injected_failure()?;
        Ok(self.run_script(key, args))
    }

    async fn exec_atomic(&self, commands: &[Command]) -> RedisResult<Value> {
        self.calls.exec.fetch_add(1, Ordering::SeqCst);
        self.injected_failure()?;
        let replies = {
            let mut data = self.data.lock().unwrap();
            commands
                .iter()
                .map(|c| Self::run(&mut data, c))
                .collect::<Vec<_>>()
        };
        Ok(self.shape(replies))
    }

    async fn del(&self, key: &str) -> RedisResult<i64> {
        self.calls.del.fetch_add(1, Ordering::SeqCst);
        self.injected_failure()?;
        let mut data = self.data.lock().unwrap();
        Self::purge_expired(&mut data, key);
        Ok(data.remove(key).map_or(0, |_| 1))
    }
}
