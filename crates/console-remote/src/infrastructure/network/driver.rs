//! Drives a [`RemoteClient`] from async code.

use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;

use super::client::RemoteClient;
use crate::application::RemoteEvent;

/// How often [`drive`] calls [`RemoteClient::update`].
pub const TICK: Duration = Duration::from_millis(10);

/// Updates `client` every [`TICK`] and hands each batch of events to `step`
/// until `step` returns `true` or `timeout` elapses.
///
/// Returns `true` if `step` asked to stop, `false` on timeout.
pub async fn drive<F>(client: &mut RemoteClient, timeout: Duration, mut step: F) -> bool
where
    F: FnMut(&RemoteClient, Vec<RemoteEvent>) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    let mut ticker = tokio::time::interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => return false,
            _ = ticker.tick() => {
                let events = client.update(Instant::now());
                if step(client, events) {
                    return true;
                }
            }
        }
    }
}
