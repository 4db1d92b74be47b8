use crate::actor::{spawn_actor_with_shutdown, Actor, ActorHandle, Addr};
use crate::system::{ActorSystem, ShutdownHandle};
use anyhow::Result;

/// Spawns actors onto one [`ActorSystem`] and owns the process lifetime.
pub struct Builder {
    sys: ActorSystem,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        Self {
            sys: ActorSystem::new(),
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.sys.shutdown_handle()
    }

    /// Spawn an actor wired to the shared shutdown signal and track its task.
    pub fn spawn<A: Actor>(&mut self, name: &str, mailbox: usize, actor: A) -> Addr<A> {
        let shutdown_rx = self.sys.shutdown_notifier();
        let h: ActorHandle<A> = spawn_actor_with_shutdown(actor, mailbox, Some(shutdown_rx));
        let addr = h.addr.clone();
        let name = name.to_string();
        tracing::debug!(actor = %name, mailbox, "actor.spawned");
        self.sys.track(async move {
            let res = h.task.await?;
            if let Err(e) = &res {
                tracing::error!(actor = %name, error = ?e, "actor.failed");
            }
            res
        });
        addr
    }

    /// Block until CTRL-C or a shutdown signal, then shut down every actor.
    pub async fn run_until_ctrl_c(self) -> Result<()> {
        let mut shutdown_rx = self.sys.shutdown_notifier();
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = shutdown_rx.recv() => {}
        }
        self.sys.graceful_shutdown().await
    }
}
