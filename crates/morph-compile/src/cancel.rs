//! Cooperative cancellation and background compilation.

use crate::{CompilationUnit, CompiledModule, compile_cancellable};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError},
    },
    thread,
    time::Duration,
};

///
/// CancelToken
///
/// Shared flag checked by the compiler between stages.
///

#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

///
/// CompileTask
///
/// Handle to a compilation running on its own thread. Dropping the handle
/// cancels the compilation.
///

#[derive(Debug)]
pub struct CompileTask {
    token: CancelToken,
    rx: Receiver<Option<CompiledModule>>,
}

impl CompileTask {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Wait for the result. `None` means the compilation was cancelled.
    #[must_use]
    pub fn join(self) -> Option<CompiledModule> {
        self.rx.recv().ok().flatten()
    }

    /// Wait at most `timeout`. On timeout the compilation is cancelled and
    /// `None` is returned.
    #[must_use]
    pub fn join_timeout(self, timeout: Duration) -> Option<CompiledModule> {
        match self.rx.recv_timeout(timeout) {
            Ok(module) => module,
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Drop for CompileTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Compile `unit` on a background thread.
#[must_use]
pub fn spawn_compile(unit: CompilationUnit) -> CompileTask {
    let token = CancelToken::new();
    let (tx, rx) = mpsc::channel();

    let worker = token.clone();
    thread::spawn(move || {
        // receiver may be gone already; nothing to report then
        let _ = tx.send(compile_cancellable(&unit, &worker));
    });

    CompileTask { token, rx }
}
