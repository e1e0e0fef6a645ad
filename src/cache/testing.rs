//! Test doubles for the primary tier.
//!
//! `ScriptedStore` stands in for a `PrimaryStore` with scriptable failures.
//! `RespServer` is a minimal Redis speaking RESP over loopback TCP, used to
//! drive the real `RedisStore`.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use redis::{ErrorKind, RedisError};
use regex::Regex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::cache::pattern::glob_to_regex;
use crate::cache::PrimaryStore;
use crate::error::{CacheError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Transport,
    Capacity,
}

#[derive(Default)]
pub struct ScriptedStore {
    data: Mutex<HashMap<String, String>>,
    failure: Mutex<Option<Failure>>,
    calls: AtomicUsize,
    close_fails: AtomicBool,
    closed: AtomicBool,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(failure: Failure) -> Self {
        let store = Self::default();
        store.fail_with(Some(failure));
        store
    }

    pub fn fail_with(&self, failure: Option<Failure>) {
        *self.failure.lock().unwrap() = failure;
    }

    pub fn fail_on_close(&self) {
        self.close_fails.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.lock().unwrap().contains_key(key)
    }

    pub fn put_raw(&self, key: &str, value: &str) {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn check(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match *self.failure.lock().unwrap() {
            None => Ok(()),
            Some(Failure::Transport) => Err(CacheError::Redis(RedisError::from((
                ErrorKind::IoError,
                "connection refused",
            )))),
            Some(Failure::Capacity) => Err(CacheError::Capacity(
                "OOM command not allowed when used memory > 'maxmemory'".to_string(),
            )),
        }
    }
}

#[async_trait]
impl PrimaryStore for ScriptedStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn set_ex(&self, key: &str, value: &str, _ttl_seconds: u64) -> Result<()> {
        self.check()?;
        self.put_raw(key, value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check()?;
        self.data.lock().unwrap().remove(key);
        Ok(())
    }

    async fn delete_matching(&self, glob: &str) -> Result<usize> {
        self.check()?;
        let re = glob_to_regex(glob).unwrap();
        let mut data = self.data.lock().unwrap();
        let before = data.len();
        data.retain(|key, _| !re.is_match(key));
        Ok(before - data.len())
    }

    async fn flush_namespace(&self) -> Result<()> {
        self.check()?;
        self.data.lock().unwrap().clear();
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.check()
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        if self.close_fails.load(Ordering::SeqCst) {
            return Err(CacheError::Redis(RedisError::from((
                ErrorKind::IoError,
                "broken pipe",
            ))));
        }
        Ok(())
    }
}

// == RESP Server ==
/// Loopback Redis supporting the commands `RedisStore` issues.
///
/// `SCAN` returns at most one key per call so cursor loops are exercised.
/// After `stall_reads`, a `GET` is never answered and its connection goes
/// silent.
pub struct RespServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct ServerState {
    data: Mutex<BTreeMap<String, String>>,
    commands: Mutex<Vec<Vec<String>>>,
    stall_reads: AtomicBool,
}

impl RespServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(ServerState::default());

        let accept_state = Arc::clone(&state);
        let task = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve_connection(socket, Arc::clone(&accept_state)));
            }
        });

        Self { addr, state, task }
    }

    pub fn url(&self) -> String {
        format!("redis://{}", self.addr)
    }

    pub fn put(&self, key: &str, value: &str) {
        self.state
            .data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    /// Stored keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.state.data.lock().unwrap().keys().cloned().collect()
    }

    pub fn stall_reads(&self) {
        self.state.stall_reads.store(true, Ordering::SeqCst);
    }

    /// Every received command with the given name, arguments included.
    pub fn commands_named(&self, name: &str) -> Vec<Vec<String>> {
        self.state
            .commands
            .lock()
            .unwrap()
            .iter()
            .filter(|command| command[0].eq_ignore_ascii_case(name))
            .cloned()
            .collect()
    }
}

impl Drop for RespServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_connection(mut socket: TcpStream, state: Arc<ServerState>) {
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 4096];
    // Keys a SCAN started at cursor 0 walks over
    let mut scan_keys: Vec<String> = Vec::new();

    loop {
        while let Some((command, used)) = parse_command(&buf) {
            buf.drain(..used);
            state.commands.lock().unwrap().push(command.clone());

            match state.reply(&command, &mut scan_keys) {
                Some(reply) => {
                    if socket.write_all(reply.as_bytes()).await.is_err() {
                        return;
                    }
                }
                None => {
                    std::future::pending::<()>().await;
                }
            }
        }

        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

impl ServerState {
    fn reply(&self, command: &[String], scan_keys: &mut Vec<String>) -> Option<String> {
        let mut data = self.data.lock().unwrap();
        let reply = match command[0].to_ascii_uppercase().as_str() {
            "PING" => "+PONG\r\n".to_string(),
            "GET" => {
                if self.stall_reads.load(Ordering::SeqCst) {
                    return None;
                }
                match data.get(&command[1]) {
                    Some(value) => bulk(value),
                    None => "$-1\r\n".to_string(),
                }
            }
            "SETEX" => {
                data.insert(command[1].clone(), command[3].clone());
                "+OK\r\n".to_string()
            }
            "SET" => {
                data.insert(command[1].clone(), command[2].clone());
                "+OK\r\n".to_string()
            }
            "DEL" => {
                let removed = command[1..]
                    .iter()
                    .filter(|key| data.remove(*key).is_some())
                    .count();
                format!(":{}\r\n", removed)
            }
            "FLUSHDB" => {
                data.clear();
                "+OK\r\n".to_string()
            }
            "SCAN" => {
                let cursor: usize = command[1].parse().unwrap();
                if cursor == 0 {
                    *scan_keys = data.keys().cloned().collect();
                }
                let pattern = command
                    .iter()
                    .position(|arg| arg.eq_ignore_ascii_case("MATCH"))
                    .map(|i| redis_glob(&command[i + 1]));

                let batch: Vec<String> = scan_keys
                    .get(cursor)
                    .filter(|key| data.contains_key(*key))
                    .filter(|key| pattern.as_ref().map_or(true, |re| re.is_match(key)))
                    .cloned()
                    .into_iter()
                    .collect();
                let next = if cursor + 1 < scan_keys.len() { cursor + 1 } else { 0 };

                let mut reply = format!("*2\r\n{}*{}\r\n", bulk(&next.to_string()), batch.len());
                for key in &batch {
                    reply.push_str(&bulk(key));
                }
                reply
            }
            // CLIENT SETINFO and other handshake commands
            _ => "+OK\r\n".to_string(),
        };
        Some(reply)
    }
}

fn bulk(value: &str) -> String {
    format!("${}\r\n{}\r\n", value.len(), value)
}

/// Parses one array-of-bulk-strings command. `None` while incomplete.
fn parse_command(buf: &[u8]) -> Option<(Vec<String>, usize)> {
    let (count, mut pos) = parse_header(buf, 0, b'*')?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let (len, start) = parse_header(buf, pos, b'$')?;
        let end = start + len;
        if buf.len() < end + 2 {
            return None;
        }
        args.push(String::from_utf8_lossy(&buf[start..end]).into_owned());
        pos = end + 2;
    }
    Some((args, pos))
}

fn parse_header(buf: &[u8], pos: usize, marker: u8) -> Option<(usize, usize)> {
    if *buf.get(pos)? != marker {
        return None;
    }
    let line_len = buf[pos..].windows(2).position(|w| w == b"\r\n")?;
    let value = std::str::from_utf8(&buf[pos + 1..pos + line_len]).ok()?.parse().ok()?;
    Some((value, pos + line_len + 2))
}

/// Redis MATCH syntax: `*`, `?` and backslash escapes.
fn redis_glob(pattern: &str) -> Regex {
    let mut re = String::from("^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    re.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).unwrap()
}
