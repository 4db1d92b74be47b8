//! Task tracking and cooperative shutdown.
//!
//! One broadcast channel carries the stop signal to every actor loop and
//! feeder; the `JoinSet` lets teardown wait for every tracked task.
use anyhow::Result;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::task::JoinSet;

#[derive(Clone)]
pub struct ShutdownHandle {
    tx: broadcast::Sender<()>,
}

impl ShutdownHandle {
    pub fn signal(&self) {
        let _ = self.tx.send(());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// A receiver for code that cannot `.await`, such as a plain OS thread.
    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }
}

pub struct ShutdownListener {
    rx: broadcast::Receiver<()>,
}

impl ShutdownListener {
    /// Non-blocking. A closed or lagged channel also counts as fired.
    pub fn fired(&mut self) -> bool {
        !matches!(self.rx.try_recv(), Err(TryRecvError::Empty))
    }
}

pub struct ActorSystem {
    joinset: JoinSet<Result<()>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Default for ActorSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorSystem {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(8);
        Self {
            joinset: JoinSet::new(),
            shutdown_tx,
        }
    }

    pub fn shutdown_notifier(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    pub fn track(&mut self, fut: impl std::future::Future<Output = Result<()>> + Send + 'static) {
        self.joinset.spawn(fut);
    }

    /// Signal every subscriber and drain all tracked tasks.
    ///
    /// Every task is awaited even after one fails; the first failure is returned.
    pub async fn graceful_shutdown(mut self) -> Result<()> {
        let _ = self.shutdown_tx.send(());
        let mut first_err = None;
        while let Some(joined) = self.joinset.join_next().await {
            let outcome = joined.map_err(anyhow::Error::from).and_then(|res| res);
            if let Err(e) = outcome {
                tracing::warn!(error = ?e, "system.task_failed");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
