use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::WorkerError;
use crate::env::{AsyncEnv, Env, EnvError};

type Reply<T> = oneshot::Sender<Result<T, EnvError>>;

enum Request<E: Env> {
    Reset {
        seed: Option<u64>,
        options: Option<E::Info>,
        reply: Reply<(E::Obs, E::Info)>,
    },
    Step {
        act: E::Act,
        reply: Reply<(E::Obs, f32, bool, E::Info)>,
    },
    Render {
        mode: String,
        reply: Reply<()>,
    },
    Close {
        reply: Reply<()>,
    },
}

/// Owns an environment on a dedicated thread.
///
/// Each call is forwarded to the thread and awaited, optionally bounded by a
/// timeout. A timed-out call keeps running on the worker; later calls queue
/// behind it. Dropping the worker closes the environment and joins the
/// thread, blocking until any call still in flight returns.
pub struct EnvWorker<E: Env> {
    id: Uuid,
    requests: Option<mpsc::UnboundedSender<Request<E>>>,
    thread: Option<JoinHandle<()>>,
    timeout: Option<Duration>,
}

impl<E> EnvWorker<E>
where
    E: Env + 'static,
{
    /// Builds the environment on a fresh thread and waits for it to be ready.
    pub async fn spawn<F>(make_env: F) -> Result<Self, WorkerError>
    where
        F: FnOnce() -> Result<E, EnvError> + Send + 'static,
    {
        let id = Uuid::new_v4();
        let (requests, inbox) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        let thread = std::thread::Builder::new()
            .name(format!("env-worker-{id}"))
            .spawn(move || {
                let mut env = match make_env() {
                    Ok(env) => {
                        let _ = ready_tx.send(Ok(()));
                        env
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                serve(&mut env, inbox);
                if let Err(e) = env.close() {
                    warn!(worker = %id, error = %e, "failed to close environment");
                }
                debug!(worker = %id, "env worker stopped");
            })?;

        ready_rx.await??;
        info!(worker = %id, "env worker started");

        Ok(Self {
            id,
            requests: Some(requests),
            thread: Some(thread),
            timeout: None,
        })
    }

    /// Bounds every subsequent call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn render(&self, mode: &str) -> Result<(), WorkerError> {
        let mode = mode.to_string();
        self.call(|reply| Request::Render { mode, reply }).await
    }

    /// Closes the environment and waits for the worker thread to exit.
    pub async fn shutdown(mut self) -> Result<(), WorkerError> {
        let closed = self.call(|reply| Request::Close { reply }).await;
        self.requests = None;
        if let Some(thread) = self.thread.take() {
            tokio::task::spawn_blocking(move || thread.join())
                .await
                .map_err(|_| WorkerError::Canceled)?
                .map_err(|_| WorkerError::Canceled)?;
        }
        closed
    }

    async fn call<T>(
        &self,
        request: impl FnOnce(Reply<T>) -> Request<E>,
    ) -> Result<T, WorkerError> {
        let requests = self.requests.as_ref().ok_or(WorkerError::Canceled)?;
        let (reply, response) = oneshot::channel();
        requests
            .send(request(reply))
            .map_err(|_| WorkerError::Canceled)?;

        let result = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, response)
                .await
                .map_err(|_| WorkerError::Timeout)?,
            None => response.await,
        };
        Ok(result??)
    }
}

fn serve<E: Env>(env: &mut E, mut inbox: mpsc::UnboundedReceiver<Request<E>>) {
    while let Some(request) = inbox.blocking_recv() {
        match request {
            Request::Reset {
                seed,
                options,
                reply,
            } => {
                let _ = reply.send(env.reset(seed, options.as_ref()));
            }
            Request::Step { act, reply } => {
                let _ = reply.send(env.step(act));
            }
            Request::Render { mode, reply } => {
                let _ = reply.send(env.render(&mode));
            }
            Request::Close { reply } => {
                let _ = reply.send(env.close());
            }
        }
    }
}

impl<E: Env> Drop for EnvWorker<E> {
    fn drop(&mut self) {
        self.requests = None;
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!(worker = %self.id, "env worker panicked");
            }
        }
    }
}

#[async_trait]
impl<E> AsyncEnv for EnvWorker<E>
where
    E: Env + 'static,
{
    type Obs = E::Obs;
    type Act = E::Act;
    type Info = E::Info;
    type Error = WorkerError;

    async fn reset(
        &mut self,
        seed: Option<u64>,
        options: Option<E::Info>,
    ) -> Result<(E::Obs, E::Info), WorkerError> {
        self.call(|reply| Request::Reset {
            seed,
            options,
            reply,
        })
        .await
    }

    async fn step(&mut self, act: E::Act) -> Result<(E::Obs, f32, bool, E::Info), WorkerError> {
        self.call(|reply| Request::Step { act, reply }).await
    }

    async fn close(&mut self) -> Result<(), WorkerError> {
        self.call(|reply| Request::Close { reply }).await
    }
}
