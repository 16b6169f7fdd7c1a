//! Running one attempt of a command as a child process.
//!
//! The command text is written line by line to the stdin of a shell
//! (local `bash`, or `bash` on a node over SSH) from a writer thread,
//! while the calling thread polls for exit and watches the deadline.
//! On timeout the whole process group is killed, so nothing the shell
//! started keeps the stdin pipe open.

use std::collections::HashMap;
use std::io::Write;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use tracing::{debug, warn};

use crate::error::Result;
use crate::steps::{AttemptOutcome, AttemptRunner};

use super::target::CommandTarget;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const WRITER_GRACE: Duration = Duration::from_millis(200);

/// What happens to the child's stdout/stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChildOutput {
    /// Pass through to our own stdout/stderr.
    #[default]
    Inherit,
    /// Discard.
    Discard,
}

impl ChildOutput {
    fn stdio(self) -> Stdio {
        match self {
            ChildOutput::Inherit => Stdio::inherit(),
            ChildOutput::Discard => Stdio::null(),
        }
    }
}

/// [`AttemptRunner`] backed by a real shell process.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    target: CommandTarget,
    env: HashMap<String, String>,
    output: ChildOutput,
}

enum Exit {
    Finished(ExitStatus),
    Killed,
}

impl ProcessRunner {
    pub fn new(target: CommandTarget) -> Self {
        Self {
            target,
            env: HashMap::new(),
            output: ChildOutput::default(),
        }
    }

    /// Extra environment for the shell (merged with ours).
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_output(mut self, output: ChildOutput) -> Self {
        self.output = output;
        self
    }

    fn spawn(&self) -> Result<Child> {
        let (program, args) = self.target.program();
        let mut cmd = Command::new(program);
        cmd.args(&args)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(self.output.stdio())
            .stderr(self.output.stdio());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd
            .spawn()
            .with_context(|| format!("Failed to start `{}` for {}", program, self.target))?;
        Ok(child)
    }
}

impl AttemptRunner for ProcessRunner {
    fn run_attempt(&mut self, input: &str, deadline: Option<Instant>) -> Result<AttemptOutcome> {
        let mut payload = input.to_string();
        if !payload.ends_with('\n') {
            payload.push('\n');
        }

        if deadline.is_some_and(|d| Instant::now() >= d) {
            debug!("Deadline already passed; not starting {}", self.target);
            return Ok(AttemptOutcome::TimedOut {
                remaining_input: payload,
            });
        }

        let mut child = self.spawn()?;
        debug!("Started pid {} on {}", child.id(), self.target);

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("Child stdin was not captured"))?;
        let fed = Arc::new(AtomicUsize::new(0));
        let cancel = Arc::new(AtomicBool::new(false));
        let writer = spawn_writer(stdin, payload.clone(), fed.clone(), cancel.clone());

        let exit = supervise(&mut child, deadline);
        cancel.store(true, Ordering::SeqCst);
        finish_writer(writer);

        let remaining_input = payload[fed.load(Ordering::SeqCst)..].to_string();

        match exit? {
            Exit::Killed => Ok(AttemptOutcome::TimedOut { remaining_input }),
            Exit::Finished(status) if status.success() => Ok(AttemptOutcome::Succeeded),
            Exit::Finished(status) => Ok(AttemptOutcome::Failed {
                exit_code: status.code(),
                remaining_input,
            }),
        }
    }
}

fn spawn_writer(
    mut stdin: ChildStdin,
    payload: String,
    fed: Arc<AtomicUsize>,
    cancel: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        for line in payload.split_inclusive('\n') {
            if cancel.load(Ordering::SeqCst) {
                return;
            }
            if let Err(e) = stdin.write_all(line.as_bytes()).and_then(|_| stdin.flush()) {
                debug!("stdin closed after {} bytes: {}", fed.load(Ordering::SeqCst), e);
                return;
            }
            fed.fetch_add(line.len(), Ordering::SeqCst);
        }
    })
}

/// Wait for the child to exit, killing it at `deadline`.
fn supervise(child: &mut Child, deadline: Option<Instant>) -> Result<Exit> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Exit::Finished(status)),
            Ok(None) => {}
            Err(e) => {
                kill_tree(child);
                let _ = child.wait();
                return Err(e.into());
            }
        }

        let now = Instant::now();
        let wait = match deadline {
            Some(d) if now >= d => {
                warn!("Deadline reached; killing pid {}", child.id());
                kill_tree(child);
                child.wait()?;
                return Ok(Exit::Killed);
            }
            Some(d) => POLL_INTERVAL.min(d - now),
            None => POLL_INTERVAL,
        };
        thread::sleep(wait);
    }
}

/// Join the writer if it stops soon; otherwise leave it behind.
///
/// A background job of the shell can keep stdin open after the shell
/// itself exits, which would block the writer indefinitely.
fn finish_writer(writer: JoinHandle<()>) {
    let until = Instant::now() + WRITER_GRACE;
    while !writer.is_finished() && Instant::now() < until {
        thread::sleep(Duration::from_millis(5));
    }
    if writer.is_finished() {
        let _ = writer.join();
    } else {
        debug!("stdin writer still blocked; detaching");
    }
}

#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    let pgid = child.id() as libc::pid_t;
    // SAFETY: kill(2) has no memory-safety preconditions; the group was
    // created for this child by `process_group(0)`.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}
