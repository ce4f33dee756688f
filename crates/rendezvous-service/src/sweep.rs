//! Background expiry sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::state::AppState;

/// Expire finished events every `every`, starting immediately.
///
/// Each sweep is one transaction. A failed sweep is logged and retried on the
/// next tick.
pub fn spawn_expiry_sweep(state: Arc<AppState>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let now = Utc::now();
            match state.db.transaction(|tx| state.events.expire_due(tx, now)) {
                Ok(summary) => {
                    tracing::debug!(
                        events_expired = summary.events_expired,
                        credits_released = summary.credits_released,
                        "Expiry sweep finished"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "Expiry sweep failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use rendezvous_core::{EventStatus, NewEvent, UserId};
    use rendezvous_store::Database;

    use crate::config::ServiceConfig;

    #[tokio::test(start_paused = true)]
    async fn sweep_expires_finished_events() {
        let state = Arc::new(AppState::new(
            Arc::new(Database::in_memory()),
            ServiceConfig::default(),
        ));
        let owner = UserId::generate();
        let start = Utc::now() - ChronoDuration::hours(2);

        let event = state
            .db
            .transaction(|tx| {
                state.ledger.initialize(tx, owner)?;
                state.events.create(
                    tx,
                    owner,
                    NewEvent {
                        title: "Brunch".into(),
                        room_title: None,
                        start_time: start,
                        end_time: Some(start + ChronoDuration::hours(1)),
                        max_guests: Some(2),
                        min_age: None,
                        max_age: None,
                    },
                    Utc::now(),
                )
            })
            .unwrap();

        let handle = spawn_expiry_sweep(Arc::clone(&state), Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.abort();

        let (stored, balance) = state
            .db
            .transaction(|tx| {
                Ok::<_, rendezvous_core::DomainError>((
                    state.events.get(tx, event.id)?,
                    state.ledger.balance(tx, owner)?,
                ))
            })
            .unwrap();
        assert_eq!(stored.status, EventStatus::Expired);
        assert_eq!(balance.available_credits, 4);
        assert_eq!(balance.held_credits, 0);
    }
}
