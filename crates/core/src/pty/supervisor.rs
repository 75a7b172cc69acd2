// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owns one PTY channel end to end: spawns the child, duplicates its
//! output stream into the ring buffer / transcript file / segment log /
//! attached sinks, and runs the SIGTERM-then-SIGKILL termination
//! protocol.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{broadcast, oneshot, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::ansi;
use crate::error::{ErrorCode, ServiceError};
use crate::ring::RingBuffer;
use crate::segment::SegmentLog;

use super::spawn::NativePty;
use super::{Backend, BackendInput, ExitStatus};

/// Grace period between SIGTERM and SIGKILL.
pub const TERM_GRACE: Duration = Duration::from_millis(1500);
/// Hard deadline by which stop-waiters are always resolved.
pub const STOP_HARD_DEADLINE: Duration = Duration::from_secs(4);

/// Events the sink/ws layer subscribes to besides raw output bytes.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// Channel transitioned to running or idle; carries a domain-specific
    /// snapshot supplied by the caller (provider or run state).
    State(serde_json::Value),
    Exit { code: Option<i32>, signal: Option<i32> },
}

/// A transcript writer appending JSON lines `{ts, provider|run, channel,
/// source, text}` to `provider-channel-YYYYMMDD.jsonl`, mode 0600.
pub struct Transcript {
    dir: PathBuf,
    owner_tag: String,
    channel_name: String,
}

impl Transcript {
    pub fn new(dir: PathBuf, owner_tag: impl Into<String>, channel_name: impl Into<String>) -> Self {
        Self { dir, owner_tag: owner_tag.into(), channel_name: channel_name.into() }
    }

    fn path_for_today(&self) -> PathBuf {
        let today = chrono_like_today();
        self.dir.join(format!("{}-{}-{}.jsonl", self.owner_tag, self.channel_name, today))
    }

    /// Best-effort append; failures are swallowed per the error policy
    /// (transcripts must never interrupt PTY data flow).
    pub async fn append(&self, source: &str, text: &str) {
        if let Err(e) = self.append_inner(source, text).await {
            warn!(error = %e, "transcript append failed, swallowing");
        }
    }

    async fn append_inner(&self, source: &str, text: &str) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for_today();
        let line = serde_json::json!({
            "ts": now_unix_ms(),
            "owner": self.owner_tag,
            "channel": self.channel_name,
            "source": source,
            "text": text,
        });
        let mut contents = line.to_string();
        contents.push('\n');

        use tokio::io::AsyncWriteExt;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(contents.as_bytes()).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = tokio::fs::set_permissions(&path, perms).await;
        }
        Ok(())
    }
}

/// Minimal date formatting (YYYYMMDD) without a calendar library for the
/// transcript filename; the harness branch-naming path uses `chrono` for
/// calendar-correct formatting, this one only needs to be a daily bucket.
fn chrono_like_today() -> String {
    chrono::Utc::now().format("%Y%m%d").to_string()
}

fn now_unix_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// One PTY channel: ring buffer, segment log, transcript, and broadcast
/// fan-out to attached sinks. Re-usable across spawn/exit/respawn cycles.
pub struct Channel {
    pub name: String,
    ring: RwLock<RingBuffer>,
    segments: RwLock<SegmentLog>,
    transcript: Transcript,
    output_tx: broadcast::Sender<Bytes>,
    lifecycle_tx: broadcast::Sender<LifecycleEvent>,
    running: AtomicBool,
    child_pid: AtomicU32,
    cols: AtomicU16,
    rows: AtomicU16,
    exit_status: RwLock<Option<ExitStatus>>,
    input_tx: Mutex<Option<tokio::sync::mpsc::Sender<BackendInput>>>,
    resize_tx: Mutex<Option<tokio::sync::mpsc::Sender<(u16, u16)>>>,
    backend_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
    stop_waiters: Mutex<Vec<oneshot::Sender<()>>>,
}

impl Channel {
    pub fn new(
        name: impl Into<String>,
        ring_cap: usize,
        transcript: Transcript,
        cols: u16,
        rows: u16,
    ) -> Arc<Self> {
        let (output_tx, _) = broadcast::channel(1024);
        let (lifecycle_tx, _) = broadcast::channel(256);
        Arc::new(Self {
            name: name.into(),
            ring: RwLock::new(RingBuffer::new(ring_cap)),
            segments: RwLock::new(SegmentLog::new()),
            transcript,
            output_tx,
            lifecycle_tx,
            running: AtomicBool::new(false),
            child_pid: AtomicU32::new(0),
            cols: AtomicU16::new(cols),
            rows: AtomicU16::new(rows),
            exit_status: RwLock::new(None),
            input_tx: Mutex::new(None),
            resize_tx: Mutex::new(None),
            backend_handle: Mutex::new(None),
            stop_waiters: Mutex::new(Vec::new()),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn child_pid(&self) -> Option<u32> {
        let v = self.child_pid.load(Ordering::Acquire);
        if v == 0 {
            None
        } else {
            Some(v)
        }
    }

    pub fn size(&self) -> (u16, u16) {
        (self.cols.load(Ordering::Relaxed), self.rows.load(Ordering::Relaxed))
    }

    pub async fn ring_dump(&self) -> Vec<u8> {
        self.ring.read().await.dump()
    }

    /// Subscribe to the output stream and take the ring snapshot as one
    /// atomic step: both happen while holding the ring's write lock, the
    /// same lock `ingest`/`push_sys` hold across their push-then-broadcast
    /// pair. That serialization means no chunk can land in the gap between
    /// "what the snapshot contains" and "what the subscription starts
    /// seeing" — a sink that calls this instead of `ring_dump()` followed
    /// by `subscribe_output()` never drops or duplicates a chunk across the
    /// join (§8 property 2, S6).
    pub async fn subscribe_output_and_dump(&self) -> (Vec<u8>, broadcast::Receiver<Bytes>) {
        let guard = self.ring.write().await;
        let data = guard.dump();
        let rx = self.output_tx.subscribe();
        (data, rx)
    }

    /// The sequence number that will be assigned to the next emitted
    /// segment; used as the `seqBefore` marker captured before a persona
    /// prompt is written (§3.4).
    pub async fn output_seq(&self) -> u64 {
        self.segments.read().await.next_seq()
    }

    /// All ANSI-stripped segments with `seq > marker`, oldest first
    /// (§4.8 narration extraction).
    pub async fn segments_since(&self, marker: u64) -> Vec<(u64, i64, String)> {
        self.segments
            .read()
            .await
            .since(marker)
            .into_iter()
            .map(|s| (s.seq, s.timestamp_unix_ms, s.text.clone()))
            .collect()
    }

    pub fn subscribe_output(&self) -> broadcast::Receiver<Bytes> {
        self.output_tx.subscribe()
    }

    pub fn subscribe_lifecycle(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.lifecycle_tx.subscribe()
    }

    pub fn broadcast_state(&self, state: serde_json::Value) {
        let _ = self.lifecycle_tx.send(LifecycleEvent::State(state));
    }

    /// Spawn the child if not already running; idempotent.
    pub async fn spawn(
        self: &Arc<Self>,
        argv: &[String],
        cwd: &std::path::Path,
        env: &HashMap<String, String>,
    ) -> anyhow::Result<()> {
        if self.is_running() {
            return Ok(());
        }
        let (cols, rows) = self.size();
        let backend = NativePty::spawn(argv, cwd, env, cols, rows)
            .map_err(|e| ServiceError::new(ErrorCode::SpawnFailed, e.to_string()))?;

        let pid = backend.child_pid().unwrap_or(0);
        self.child_pid.store(pid, Ordering::Release);
        self.running.store(true, Ordering::Release);
        *self.exit_status.write().await = None;

        let (input_tx, input_rx) = tokio::sync::mpsc::channel::<BackendInput>(256);
        let (resize_tx, resize_rx) = tokio::sync::mpsc::channel::<(u16, u16)>(8);
        let (output_tx, mut output_rx) = tokio::sync::mpsc::channel::<Bytes>(256);
        *self.input_tx.lock().await = Some(input_tx);
        *self.resize_tx.lock().await = Some(resize_tx);

        let channel = Arc::clone(self);
        let pump_handle = tokio::spawn(async move {
            while let Some(bytes) = output_rx.recv().await {
                channel.ingest(&bytes).await;
            }
        });

        let channel = Arc::clone(self);
        let run_handle = tokio::spawn(async move {
            let mut backend = backend;
            let exit = backend.run(output_tx, input_rx, resize_rx).await;
            pump_handle.await.ok();
            channel.on_exit(exit).await;
        });

        *self.backend_handle.lock().await = Some(run_handle);
        Ok(())
    }

    async fn ingest(self: &Arc<Self>, bytes: &Bytes) {
        // Push and broadcast under the same write-lock critical section as
        // `subscribe_output_and_dump`, so a concurrent sink attach can never
        // observe a gap between the ring snapshot and the broadcast tail.
        {
            let mut ring = self.ring.write().await;
            ring.push(bytes);
            let _ = self.output_tx.send(bytes.clone());
        }
        self.transcript.append("out", &String::from_utf8_lossy(bytes)).await;

        let stripped = ansi::strip(bytes);
        if !stripped.is_empty() {
            self.segments.write().await.push(stripped, now_unix_ms());
        }
    }

    async fn on_exit(self: &Arc<Self>, result: anyhow::Result<ExitStatus>) {
        let status = match result {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, channel = %self.name, "pty backend exited with error");
                ExitStatus { code: None, signal: None }
            }
        };
        self.running.store(false, Ordering::Release);
        self.child_pid.store(0, Ordering::Release);
        *self.exit_status.write().await = Some(status);
        *self.input_tx.lock().await = None;
        *self.resize_tx.lock().await = None;

        let mut waiters = self.stop_waiters.lock().await;
        for waiter in waiters.drain(..) {
            let _ = waiter.send(());
        }
        drop(waiters);

        let _ = self.lifecycle_tx.send(LifecycleEvent::Exit { code: status.code, signal: status.signal });
        info!(channel = %self.name, code = ?status.code, signal = ?status.signal, "channel exited");
    }

    /// Push a synthetic, non-child-originated line into the channel's
    /// ring buffer / transcript (tagged `sys`) / segment log / sinks, for
    /// channels that narrate pipeline progress rather than wrap a PTY
    /// child (e.g. the harness `orchestrator` channel).
    pub async fn push_sys(self: &Arc<Self>, text: &str) {
        let mut line = text.to_owned();
        line.push('\n');
        let bytes = Bytes::from(line.into_bytes());
        {
            let mut ring = self.ring.write().await;
            ring.push(&bytes);
            let _ = self.output_tx.send(bytes.clone());
        }
        self.transcript.append("sys", text).await;
        let stripped = ansi::strip(&bytes);
        if !stripped.is_empty() {
            self.segments.write().await.push(stripped, now_unix_ms());
        }
    }

    /// Write raw bytes into the PTY master. Fails with
    /// [`ErrorCode::SessionNotRunning`] if the channel is idle.
    pub async fn write(&self, data: &[u8]) -> anyhow::Result<()> {
        let guard = self.input_tx.lock().await;
        let Some(tx) = guard.as_ref() else {
            return Err(ServiceError::new(ErrorCode::SessionNotRunning, "channel is not running").into());
        };
        tx.send(BackendInput::Write(Bytes::copy_from_slice(data)))
            .await
            .map_err(|_| ServiceError::new(ErrorCode::SessionNotRunning, "channel writer closed"))?;
        self.transcript.append("in", &String::from_utf8_lossy(data)).await;
        Ok(())
    }

    /// Resize, clamped by the caller to `[20,400] x [5,200]` per the
    /// WebSocket contract. No-op if the channel is idle.
    pub async fn resize(&self, cols: u16, rows: u16) -> anyhow::Result<()> {
        self.cols.store(cols, Ordering::Relaxed);
        self.rows.store(rows, Ordering::Relaxed);
        let guard = self.resize_tx.lock().await;
        if let Some(tx) = guard.as_ref() {
            let _ = tx.send((cols, rows)).await;
        }
        Ok(())
    }

    /// Terminate protocol: register a stop-waiter, send SIGTERM, escalate
    /// to SIGKILL after [`TERM_GRACE`], and resolve the waiter either from
    /// the exit handler or the hard [`STOP_HARD_DEADLINE`], whichever
    /// fires first.
    pub async fn stop(self: &Arc<Self>) {
        if !self.is_running() {
            return;
        }
        let (tx, rx) = oneshot::channel();
        self.stop_waiters.lock().await.push(tx);

        let pid = self.child_pid();
        if let Some(pid) = pid {
            debug!(channel = %self.name, pid, "sending SIGTERM");
            let _ = nix::sys::signal::kill(
                nix::unistd::Pid::from_raw(pid as i32),
                nix::sys::signal::Signal::SIGTERM,
            );
        }

        let channel = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(TERM_GRACE) => {
                    if channel.is_running() {
                        if let Some(pid) = channel.child_pid() {
                            debug!(channel = %channel.name, pid, "escalating to SIGKILL");
                            let _ = nix::sys::signal::kill(
                                nix::unistd::Pid::from_raw(pid as i32),
                                nix::sys::signal::Signal::SIGKILL,
                            );
                        }
                    }
                }
                _ = async {
                    // Poll briefly; `on_exit` resolves waiters directly so
                    // this branch only matters if the exit happens first.
                    while channel.is_running() {
                        tokio::time::sleep(Duration::from_millis(25)).await;
                    }
                } => {}
            }
        });

        let _ = tokio::time::timeout(STOP_HARD_DEADLINE, rx).await;
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
