use anyhow::Result;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};

/// Minimal actor trait. `Self: Sized` avoids object-safety issues when using `Context<Self>`.
#[async_trait::async_trait]
pub trait Actor: Send + Sized + 'static {
    type Msg: Send + 'static;

    /// Handle a single message. Return `Err` to stop the actor.
    async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()>;
}

/// Runtime context for an actor instance.
pub struct Context<A: Actor> {
    addr: Addr<A>,
    stop: bool,
}

impl<A: Actor> Context<A> {
    /// A clone of this actor's `Addr`, for replies routed back through spawned tasks.
    pub fn addr(&self) -> Addr<A> {
        self.addr.clone()
    }

    /// Request a graceful stop after processing the current message.
    pub fn stop(&mut self) {
        self.stop = true;
    }
}

/// Address for sending messages to an actor.
pub struct Addr<A: Actor>(mpsc::Sender<A::Msg>);

/// Manual Clone to avoid unnecessary bounds on `A`/`A::Msg`.
impl<A: Actor> Clone for Addr<A> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A: Actor> Addr<A> {
    /// Async send; awaits backpressure. Returns the message if the receiver is dropped.
    pub async fn send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.send(msg).await.map_err(|e| e.0)
    }

    /// Try to send without waiting. Returns the message if the mailbox is full or closed.
    pub fn try_send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.try_send(msg).map_err(|e| e.into_inner())
    }

    /// Send from a plain OS thread. Must not be called from async context.
    pub fn blocking_send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.blocking_send(msg).map_err(|e| e.0)
    }

    /// Bounded mailbox capacity.
    pub fn capacity(&self) -> usize {
        self.0.max_capacity()
    }
}

/// Handle to a running actor task.
pub struct ActorHandle<A: Actor> {
    pub addr: Addr<A>,
    pub task: JoinHandle<anyhow::Result<()>>,
}

/// Spawn an actor with a bounded mailbox.
///
/// Stop conditions:
/// - `handle` returns `Err`
/// - `ctx.stop()` is called
///
/// ```
/// # use anyhow::Result;
/// # use async_trait::async_trait;
/// # use riskdash_actors::actor::{self, Actor, Context};
/// struct Tally(u32);
///
/// #[async_trait]
/// impl Actor for Tally {
///     type Msg = u32;
///     async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()> {
///         self.0 += msg;
///         if self.0 >= 5 {
///             ctx.stop();
///         }
///         Ok(())
///     }
/// }
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// rt.block_on(async {
///     let actor::ActorHandle { addr, task } = actor::spawn_actor(Tally(0), 8);
///     assert_eq!(addr.capacity(), 8);
///     addr.send(2).await.unwrap();
///     addr.send(3).await.unwrap();
///     drop(addr);
///     task.await.unwrap().unwrap();
/// });
/// ```
pub fn spawn_actor<A: Actor>(actor: A, capacity: usize) -> ActorHandle<A> {
    spawn_actor_with_shutdown(actor, capacity, None)
}

/// Like [`spawn_actor`], but the loop also exits when `shutdown` fires.
pub fn spawn_actor_with_shutdown<A: Actor>(
    mut actor: A,
    capacity: usize,
    shutdown: Option<broadcast::Receiver<()>>,
) -> ActorHandle<A> {
    let (tx, mut rx) = mpsc::channel::<A::Msg>(capacity);
    let addr = Addr(tx);
    let mut ctx = Context {
        addr: addr.clone(),
        stop: false,
    };

    let task = tokio::spawn(async move {
        match shutdown {
            Some(mut shutdown_rx) => loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    maybe_msg = rx.recv() => match maybe_msg {
                        Some(msg) => {
                            if dispatch(&mut actor, msg, &mut ctx).await? {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            },
            None => {
                while let Some(msg) = rx.recv().await {
                    if dispatch(&mut actor, msg, &mut ctx).await? {
                        break;
                    }
                }
            }
        }
        Ok(())
    });

    ActorHandle { addr, task }
}

/// Run one message; `Ok(true)` means the actor asked to stop.
async fn dispatch<A: Actor>(actor: &mut A, msg: A::Msg, ctx: &mut Context<A>) -> Result<bool> {
    if let Err(e) = actor.handle(msg, ctx).await {
        tracing::error!(target = "riskdash-actors", error = ?e, "actor returned error; stopping");
        return Err(e);
    }
    Ok(ctx.stop)
}
