//! Clock Scheduler
//!
//! One task per session pumps the clock at `max(1000 / speed, 50)` ms of
//! wall time, one simulated day per tick. The task owns no market state: it
//! takes the session mutex, ticks, releases, then publishes the results.

use crate::services::SessionHandle;
use crate::types::{PortfolioUpdateData, ServerFrame};
use crate::websocket::Hub;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Spawn the tick loop for a session. `broadcast_market` is set only for
/// the reference session feeding the shared `market_data` topic.
pub fn spawn(
    handle: Arc<SessionHandle>,
    hub: Arc<Hub>,
    broadcast_market: bool,
) -> JoinHandle<()> {
    let mut stop = handle.stop_signal();
    tokio::spawn(async move {
        loop {
            let interval = handle.lock().clock.tick_interval();
            tokio::select! {
                _ = stop.recv() => {
                    debug!(session = %handle.id, "scheduler stopped");
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }

            // Bounded work under the mutex; publishing happens after release.
            let (owner_key, report) = {
                let mut session = handle.lock();
                (session.owner.key().to_string(), session.tick(1))
            };

            if report.exhausted {
                continue;
            }

            if broadcast_market {
                for delta in &report.deltas {
                    hub.publish_market(ServerFrame::MarketUpdate {
                        data: delta.clone(),
                    })
                    .await;
                }
            }

            hub.publish_portfolio(
                &owner_key,
                ServerFrame::PortfolioUpdate {
                    data: PortfolioUpdateData {
                        session_id: handle.id.clone(),
                        total_value: report.total_value,
                        cash: report.cash,
                        unrealized_pnl: report.unrealized_pnl,
                        day: report.day,
                    },
                },
            )
            .await;
        }
    })
}
