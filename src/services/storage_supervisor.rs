use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{room_store::RoomStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Keep a room store installed in `state`, switching to degraded mode while none is reachable.
///
/// Never returns: once an established store cannot be recovered, `connect` is called again.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn RoomStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, retry_in = ?delay, "storage connection attempt failed");
                state.update_degraded(true);
                sleep(delay).await;
                delay = next_delay(delay);
                continue;
            }
        };

        state.set_room_store(store.clone()).await;
        state.update_degraded(false);
        info!("room store connected");
        delay = INITIAL_DELAY;

        watch_store(&state, store.as_ref()).await;

        warn!("room store lost; reconnecting from scratch");
        sleep(delay).await;
        delay = next_delay(delay);
    }
}

/// Poll the store until it fails and cannot be recovered in place.
async fn watch_store(state: &SharedState, store: &dyn RoomStore) {
    loop {
        sleep(HEALTH_POLL_INTERVAL).await;
        if store.health_check().await.is_ok() {
            if state.is_degraded() {
                info!("room store healthy again");
                state.update_degraded(false);
            }
            continue;
        }

        if !reconnect(state, store).await {
            return;
        }
        state.update_degraded(false);
    }
}

async fn reconnect(state: &SharedState, store: &dyn RoomStore) -> bool {
    let mut delay = INITIAL_DELAY;
    for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "room store reconnected");
                return true;
            }
            Err(err) => {
                if attempt == 1 {
                    warn!(error = %err, "room store reconnect failed; entering degraded mode");
                    state.update_degraded(true);
                } else {
                    warn!(attempt, error = %err, "room store reconnect failed");
                }
                sleep(delay).await;
                delay = next_delay(delay);
            }
        }
    }
    warn!(
        attempts = MAX_RECONNECT_ATTEMPTS,
        "room store reconnect attempts exhausted"
    );
    false
}

fn next_delay(delay: Duration) -> Duration {
    (delay * 2).min(MAX_DELAY)
}
