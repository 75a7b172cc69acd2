// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod nbio;
pub mod spawn;
pub mod supervisor;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use tokio::sync::mpsc;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

/// Input sent to the PTY backend: either raw bytes to write or a resize.
#[derive(Debug)]
pub enum BackendInput {
    Write(Bytes),
}

/// A running PTY-attached child process.
///
/// Object-safe for use as `Box<dyn Backend>`.
pub trait Backend: Send + 'static {
    fn run(
        &mut self,
        output_tx: mpsc::Sender<Bytes>,
        input_rx: mpsc::Receiver<BackendInput>,
        resize_rx: mpsc::Receiver<(u16, u16)>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ExitStatus>> + Send + '_>>;

    fn resize(&self, cols: u16, rows: u16) -> anyhow::Result<()>;

    fn child_pid(&self) -> Option<u32>;

    /// Request termination: SIGTERM now, the supervisor escalates to
    /// SIGKILL after the grace period if the child hasn't exited.
    fn terminate(&self) -> anyhow::Result<()>;

    /// Force-kill immediately (SIGKILL).
    fn kill(&self) -> anyhow::Result<()>;
}
