// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::ffi::CString;
use std::future::Future;
use std::os::fd::AsRawFd;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context};
use bytes::Bytes;
use nix::libc;
use nix::pty::{forkpty, ForkptyResult, Winsize};
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{chdir, execvp, Pid};
use tokio::io::unix::AsyncFd;
use tokio::sync::mpsc;

use super::nbio::{read_chunk, set_nonblocking, write_all, PtyFd};
use super::{Backend, BackendInput, ExitStatus};

/// Native PTY backend that spawns a child process via `forkpty`.
pub struct NativePty {
    master: AsyncFd<PtyFd>,
    child_pid: Pid,
    cols: Arc<AtomicU16>,
    rows: Arc<AtomicU16>,
}

impl NativePty {
    /// Spawn `argv[0]` with `argv[1..]` as arguments, attached to a new
    /// pseudo-terminal sized `cols x rows`, in `cwd`, with `env` merged
    /// over the current process environment.
    #[allow(unsafe_code)]
    pub fn spawn(
        argv: &[String],
        cwd: &Path,
        env: &HashMap<String, String>,
        cols: u16,
        rows: u16,
    ) -> anyhow::Result<Self> {
        if argv.is_empty() {
            bail!("spawn requires a non-empty argv");
        }

        let winsize = Winsize { ws_row: rows, ws_col: cols, ws_xpixel: 0, ws_ypixel: 0 };

        // SAFETY: forkpty is unsafe because the child is in a
        // partially-initialized post-fork state until execvp replaces
        // the image. Only async-signal-safe calls happen before execvp.
        let result = unsafe { forkpty(&winsize, None) }.context("forkpty failed")?;

        match result {
            ForkptyResult::Parent { child, master } => {
                set_nonblocking(&master)?;
                let afd = AsyncFd::new(PtyFd(master))?;
                Ok(Self {
                    master: afd,
                    child_pid: child,
                    cols: Arc::new(AtomicU16::new(cols)),
                    rows: Arc::new(AtomicU16::new(rows)),
                })
            }
            ForkptyResult::Child => {
                for (key, value) in env {
                    std::env::set_var(key, value);
                }
                if chdir(cwd).is_err() {
                    std::process::exit(127);
                }
                let program = CString::new(argv[0].as_bytes()).unwrap_or_default();
                let args: Vec<CString> =
                    argv.iter().filter_map(|a| CString::new(a.as_bytes()).ok()).collect();
                let _ = execvp(&program, &args);
                // execvp only returns on failure.
                std::process::exit(127);
            }
        }
    }

    /// Block until the child exits, mapping the wait status to
    /// [`ExitStatus`]. Intended to run inside `spawn_blocking`.
    fn wait_for_exit(pid: Pid) -> anyhow::Result<ExitStatus> {
        loop {
            match waitpid(pid, None) {
                Ok(WaitStatus::Exited(_, code)) => {
                    return Ok(ExitStatus { code: Some(code), signal: None })
                }
                Ok(WaitStatus::Signaled(_, sig, _)) => {
                    return Ok(ExitStatus { code: None, signal: Some(sig as i32) })
                }
                Ok(_) => continue,
                Err(nix::errno::Errno::ECHILD) => return Ok(ExitStatus { code: None, signal: None }),
                Err(nix::errno::Errno::EINTR) => continue,
                Err(e) => bail!("waitpid failed: {e}"),
            }
        }
    }
}

impl Backend for NativePty {
    fn run(
        &mut self,
        output_tx: mpsc::Sender<Bytes>,
        mut input_rx: mpsc::Receiver<BackendInput>,
        mut resize_rx: mpsc::Receiver<(u16, u16)>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ExitStatus>> + Send + '_>> {
        Box::pin(async move {
            let mut buf = [0u8; 32 * 1024];
            loop {
                tokio::select! {
                    read_result = read_chunk(&self.master, &mut buf) => {
                        match read_result {
                            Ok(0) => break,
                            Ok(n) => {
                                if output_tx.send(Bytes::copy_from_slice(&buf[..n])).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) if e.raw_os_error() == Some(libc::EIO) => break,
                            Err(e) => return Err(e).context("pty read failed"),
                        }
                    }
                    input = input_rx.recv() => {
                        match input {
                            Some(BackendInput::Write(data)) => {
                                if let Err(e) = write_all(&self.master, &data).await {
                                    if e.raw_os_error() == Some(libc::EIO) {
                                        break;
                                    }
                                    return Err(e).context("pty write failed");
                                }
                            }
                            None => break,
                        }
                    }
                    resize = resize_rx.recv() => {
                        if let Some((cols, rows)) = resize {
                            self.resize(cols, rows)?;
                        }
                    }
                }
            }

            let pid = self.child_pid;
            tokio::task::spawn_blocking(move || Self::wait_for_exit(pid))
                .await
                .context("wait_for_exit task panicked")?
        })
    }

    #[allow(unsafe_code)]
    fn resize(&self, cols: u16, rows: u16) -> anyhow::Result<()> {
        self.cols.store(cols, Ordering::Relaxed);
        self.rows.store(rows, Ordering::Relaxed);
        let ws = Winsize { ws_row: rows, ws_col: cols, ws_xpixel: 0, ws_ypixel: 0 };
        // SAFETY: TIOCSWINSZ ioctl requires unsafe for the libc::ioctl call;
        // the fd and struct layout are valid for the lifetime of this call.
        let ret = unsafe { libc::ioctl(self.master.as_raw_fd(), libc::TIOCSWINSZ, &ws) };
        if ret != 0 {
            bail!("ioctl(TIOCSWINSZ) failed: {}", std::io::Error::last_os_error());
        }
        Ok(())
    }

    fn child_pid(&self) -> Option<u32> {
        Some(self.child_pid.as_raw() as u32)
    }

    fn terminate(&self) -> anyhow::Result<()> {
        kill(self.child_pid, Signal::SIGTERM).context("sending SIGTERM")?;
        Ok(())
    }

    fn kill(&self) -> anyhow::Result<()> {
        kill(self.child_pid, Signal::SIGKILL).context("sending SIGKILL")?;
        Ok(())
    }
}

impl Drop for NativePty {
    fn drop(&mut self) {
        let _ = kill(self.child_pid, Signal::SIGTERM);
        let _ = waitpid(self.child_pid, Some(WaitPidFlag::WNOHANG));
    }
}
