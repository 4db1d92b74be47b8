use crate::tui::{TuiActor, TuiMsg};
use anyhow::{Context as _, Result};
use crossterm::event;
use riskdash_actors::actor::Addr;
use riskdash_actors::system::ShutdownHandle;
use std::time::Duration;
use tokio::time;

const INPUT_POLL: Duration = Duration::from_millis(100);

/// Start the two producers behind the TUI mailbox: terminal input and the
/// render tick. Both stop on the shutdown signal.
pub fn spawn_tui_feeders(
    tui: Addr<TuiActor>,
    shutdown: ShutdownHandle,
    tick: Duration,
) -> Result<()> {
    // crossterm reads block; keep them off the runtime.
    let tui_in = tui.clone();
    let mut shutdown_input = shutdown.listener();
    std::thread::Builder::new()
        .name("riskdash-input".into())
        .spawn(move || {
            loop {
                if shutdown_input.fired() {
                    break;
                }
                match event::poll(INPUT_POLL) {
                    Ok(false) => {}
                    Ok(true) => {
                        let msg = match event::read() {
                            Ok(ev) => TuiMsg::InputEvent(ev),
                            Err(e) => TuiMsg::OpError(format!("input: {e}")),
                        };
                        if tui_in.blocking_send(msg).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = tui_in.blocking_send(TuiMsg::OpError(format!("input: {e}")));
                        break;
                    }
                }
            }
            tracing::debug!("input feeder stopped");
        })
        .context("spawning input thread")?;

    let mut shutdown_tick = shutdown.subscribe();
    tokio::spawn(async move {
        let mut interval = time::interval(tick);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown_tick.recv() => break,
                _ = interval.tick() => {
                    // A full mailbox already has a redraw pending.
                    let _ = tui.try_send(TuiMsg::Tick);
                }
            }
        }
    });

    Ok(())
}
