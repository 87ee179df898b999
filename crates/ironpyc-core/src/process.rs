//! Blocking invocation of external executables.
//!
//! The runner spawns the program with exactly the arguments it is given (the
//! program name is never prepended), captures stdout and stderr into one text
//! result and blocks until the child exits. A non-zero exit code is an ordinary
//! return value; only failing to start (or an opted-in timeout) is an error.
//!
//! Unix 下 stdout/stderr 共用同一个管道，输出保持子进程写入的先后顺序。

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Poll interval while waiting on a child with a deadline.
const WAIT_POLL_INTERVAL_MS: u64 = 50;

/// After a timeout kill, how long to wait for the output readers to hit EOF.
const KILL_DRAIN_GRACE_MS: u64 = 500;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("executable not found: {}", .program.display())]
    NotFound { program: PathBuf },

    #[error("permission denied launching {}", .program.display())]
    NotExecutable { program: PathBuf },

    #[error("failed to launch {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed waiting for {}: {source}", .program.display())]
    Wait {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} killed: exceeded timeout of {:?}", .program.display(), .timeout)]
    TimedOut { program: PathBuf, timeout: Duration },
}

/// Combined output and exit code of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// stdout and stderr merged in the order they were written.
    pub output: String,
    /// -1 when the process was terminated by a signal.
    pub exit_code: i32,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// `None` blocks until the child exits, however long that takes.
    pub timeout: Option<Duration>,
}

impl RunOptions {
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

/// Seam for spawning external processes; tests substitute a scripted runner.
pub trait ProcessRunner: Send + Sync {
    /// Run `program` with `args` in `cwd` (the caller's current directory when `None`).
    fn run(
        &self,
        program: &Path,
        args: &[String],
        cwd: Option<&Path>,
        options: RunOptions,
    ) -> Result<ProcessOutput, LaunchError>;
}

/// Runs real child processes via `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(
        &self,
        program: &Path,
        args: &[String],
        cwd: Option<&Path>,
        options: RunOptions,
    ) -> Result<ProcessOutput, LaunchError> {
        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        // 有超时时放进独立进程组，超时后整组终止（ipy 启动脚本会再拉起 mono）
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            if options.timeout.is_some() {
                cmd.process_group(0);
            }
        }

        tracing::debug!(program = %program.display(), ?args, cwd = ?cwd, "spawning process");
        let (mut child, sink) = spawn_merged(cmd, program)?;

        let status = match options.timeout {
            None => child.wait().map_err(|source| LaunchError::Wait {
                program: program.to_path_buf(),
                source,
            }),
            Some(timeout) => wait_with_deadline(&mut child, program, timeout),
        };
        let output = match status {
            Ok(_) => sink.collect(None),
            Err(_) => sink.collect(Some(Duration::from_millis(KILL_DRAIN_GRACE_MS))),
        };
        let status = status?;

        let exit_code = status.code().unwrap_or(-1);
        tracing::debug!(program = %program.display(), exit_code, "process finished");
        Ok(ProcessOutput { output, exit_code })
    }
}

fn launch_error(program: &Path, e: io::Error) -> LaunchError {
    let program = program.to_path_buf();
    match e.kind() {
        io::ErrorKind::NotFound => LaunchError::NotFound { program },
        io::ErrorKind::PermissionDenied => LaunchError::NotExecutable { program },
        _ => LaunchError::Spawn { program, source: e },
    }
}

/// Point stdout and stderr at a single pipe so the parent reads one ordered stream.
#[cfg(unix)]
fn spawn_merged(mut cmd: Command, program: &Path) -> Result<(Child, OutputSink), LaunchError> {
    use nix::fcntl::{fcntl, FcntlArg, FdFlag};
    use std::os::fd::AsRawFd;

    let spawn_err = |e: nix::Error| LaunchError::Spawn {
        program: program.to_path_buf(),
        source: io::Error::from(e),
    };
    let (read_end, write_end) = nix::unistd::pipe().map_err(spawn_err)?;
    for fd in [&read_end, &write_end] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC)).map_err(spawn_err)?;
    }
    let stderr_end = write_end.try_clone().map_err(|e| launch_error(program, e))?;
    cmd.stdout(Stdio::from(write_end)).stderr(Stdio::from(stderr_end));

    let child = cmd.spawn().map_err(|e| launch_error(program, e))?;
    // 父进程必须关闭写端，否则读线程永远等不到 EOF
    drop(cmd);
    let reader: Box<dyn Read + Send> = Box::new(std::fs::File::from(read_end));
    Ok((child, OutputSink::start(vec![reader])))
}

#[cfg(not(unix))]
fn spawn_merged(mut cmd: Command, program: &Path) -> Result<(Child, OutputSink), LaunchError> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(|e| launch_error(program, e))?;
    let mut readers: Vec<Box<dyn Read + Send>> = Vec::new();
    if let Some(out) = child.stdout.take() {
        readers.push(Box::new(out));
    }
    if let Some(err) = child.stderr.take() {
        readers.push(Box::new(err));
    }
    Ok((child, OutputSink::start(readers)))
}

/// Reader threads appending chunks to one shared buffer as they arrive.
///
/// Draining while the child runs keeps a chatty child from blocking on a full
/// pipe buffer.
struct OutputSink {
    buf: Arc<Mutex<Vec<u8>>>,
    done: mpsc::Receiver<()>,
    readers: usize,
}

impl OutputSink {
    fn start(readers: Vec<Box<dyn Read + Send>>) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let (tx, done) = mpsc::channel();
        let count = readers.len();
        for mut reader in readers {
            let buf = Arc::clone(&buf);
            let tx = tx.clone();
            thread::spawn(move || {
                let mut chunk = [0u8; 8192];
                loop {
                    match reader.read(&mut chunk) {
                        Ok(0) => break,
                        Ok(n) => buf
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .extend_from_slice(&chunk[..n]),
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(_) => break,
                    }
                }
                let _ = tx.send(());
            });
        }
        Self {
            buf,
            done,
            readers: count,
        }
    }

    /// Wait for every reader to reach EOF, or at most `grace`, then take what was read.
    /// Readers still blocked after `grace` are left detached.
    fn collect(self, grace: Option<Duration>) -> String {
        let deadline = grace.map(|g| Instant::now() + g);
        for _ in 0..self.readers {
            let finished = match deadline {
                None => self.done.recv().is_ok(),
                Some(d) => {
                    let left = d.saturating_duration_since(Instant::now());
                    self.done.recv_timeout(left).is_ok()
                }
            };
            if !finished {
                tracing::debug!("output reader still blocked, leaving it detached");
                break;
            }
        }
        let bytes = self.buf.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;
        if killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL).is_ok() {
            return;
        }
    }
    let _ = child.kill();
}

fn wait_with_deadline(
    child: &mut Child,
    program: &Path,
    timeout: Duration,
) -> Result<ExitStatus, LaunchError> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(source) => {
                return Err(LaunchError::Wait {
                    program: program.to_path_buf(),
                    source,
                })
            }
        }
        if start.elapsed() > timeout {
            kill_tree(child);
            let _ = child.wait();
            tracing::warn!(program = %program.display(), ?timeout, "process exceeded timeout, killed");
            return Err(LaunchError::TimedOut {
                program: program.to_path_buf(),
                timeout,
            });
        }
        thread::sleep(Duration::from_millis(WAIT_POLL_INTERVAL_MS));
    }
}
