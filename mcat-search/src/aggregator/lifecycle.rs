//! Lifecycle Guard
//!
//! Sole writer to a search's [`EventSink`]. Owns the aggregation counters
//! and the per-request state machine:
//!
//! ```text
//! Dispatched ──▶ Streaming ──▶ Closing ──▶ Closed
//!      │             │  ▲                    ▲
//!      │             └──┘ (each settlement)  │
//!      └─────────────┴──── remote disconnect ┘
//! ```
//!
//! Settlements keep being counted after the remote side disconnects; only
//! the writes are skipped. `complete` is written at most once, and only when
//! the settled count has reached the dispatched count.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::dispatcher::{ProviderOutcome, Settlement};
use super::events::SearchEvent;
use super::sink::EventSink;

/// Per-request lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Providers started, `start` sent
    Dispatched,
    /// At least one provider settled
    Streaming,
    /// Every provider settled, `complete` being written
    Closing,
    /// Terminal; sink released
    Closed,
}

/// Counters reported when a search ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleCounts {
    /// Providers dispatched
    pub dispatched: usize,
    /// Providers settled
    pub settled: usize,
    /// Records across all successful providers, after filtering
    pub total_results: usize,
    /// Whether the terminal event reached the receiver
    pub terminal_delivered: bool,
    /// State at the end of the search
    pub state: LifecycleState,
}

/// Single writer for one search stream
#[derive(Debug)]
pub struct LifecycleGuard {
    search_id: Uuid,
    sink: EventSink,
    state: LifecycleState,
    dispatched: usize,
    settled: usize,
    total_results: usize,
}

impl LifecycleGuard {
    /// Write `start` and enter `Dispatched`
    pub fn start(search_id: Uuid, sink: EventSink, query: &str, dispatched: usize) -> Self {
        let mut guard = Self {
            search_id,
            sink,
            state: LifecycleState::Dispatched,
            dispatched,
            settled: 0,
            total_results: 0,
        };

        guard.emit(SearchEvent::Start {
            search_id,
            query: query.to_string(),
            total_providers: dispatched,
            timestamp: Utc::now(),
        });

        guard
    }

    /// Write a request-level `error` as the only event and close the sink
    ///
    /// Used when the search fails before any provider is dispatched.
    pub fn reject(search_id: Uuid, mut sink: EventSink, reason: &str) -> LifecycleCounts {
        warn!(search_id = %search_id, reason, "Search rejected before dispatch");

        let delivered = sink.is_open()
            && sink.write(SearchEvent::Error {
                error: reason.to_string(),
                timestamp: Utc::now(),
            });
        sink.close();

        LifecycleCounts {
            dispatched: 0,
            settled: 0,
            total_results: 0,
            terminal_delivered: delivered,
            state: LifecycleState::Closed,
        }
    }

    /// Current state
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Whether every dispatched provider has settled
    pub fn all_settled(&self) -> bool {
        self.settled >= self.dispatched
    }

    /// Account for one provider settlement and write its event
    pub fn settle(&mut self, outcome: ProviderOutcome) {
        self.settled += 1;
        if self.state == LifecycleState::Dispatched {
            self.state = LifecycleState::Streaming;
        }

        let reason = outcome.failure_reason();
        let event = match outcome.settlement {
            Settlement::Results(results) => {
                self.total_results += results.len();
                debug!(
                    search_id = %self.search_id,
                    provider = %outcome.provider,
                    results = results.len(),
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    "Provider settled"
                );
                SearchEvent::ProviderResult {
                    provider: outcome.provider,
                    provider_name: outcome.provider_name,
                    results,
                    timestamp: Utc::now(),
                }
            }
            Settlement::Failed(_) | Settlement::TimedOut(_) => {
                let error = reason.unwrap_or_default();
                warn!(
                    search_id = %self.search_id,
                    provider = %outcome.provider,
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    error = %error,
                    "Provider failed"
                );
                SearchEvent::ProviderError {
                    provider: outcome.provider,
                    provider_name: outcome.provider_name,
                    error,
                    timestamp: Utc::now(),
                }
            }
        };

        self.emit(event);
    }

    /// Write `complete` (if still open and every provider settled) and close
    pub fn finish(mut self) -> LifecycleCounts {
        let mut terminal_delivered = false;

        if !self.all_settled() {
            warn!(
                search_id = %self.search_id,
                settled = self.settled,
                dispatched = self.dispatched,
                "Search finished with unsettled providers, not sending complete"
            );
        } else if self.state != LifecycleState::Closed {
            self.state = LifecycleState::Closing;
            terminal_delivered = self.emit(SearchEvent::Complete {
                total_results: self.total_results,
                settled_providers: self.settled,
                timestamp: Utc::now(),
            });
        }

        self.sink.close();
        self.state = LifecycleState::Closed;

        LifecycleCounts {
            dispatched: self.dispatched,
            settled: self.settled,
            total_results: self.total_results,
            terminal_delivered,
            state: self.state,
        }
    }

    /// Write one event if the sink is open; move to `Closed` when it is not
    fn emit(&mut self, event: SearchEvent) -> bool {
        if self.state == LifecycleState::Closed {
            return false;
        }

        if self.sink.is_open() && self.sink.write(event) {
            return true;
        }

        info!(
            search_id = %self.search_id,
            settled = self.settled,
            dispatched = self.dispatched,
            "Client disconnected, discarding further search events"
        );
        self.sink.close();
        self.state = LifecycleState::Closed;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcat_common::ResultRecord;
    use std::time::Duration;

    fn outcome(provider: &str, settlement: Settlement) -> ProviderOutcome {
        ProviderOutcome {
            provider: provider.to_string(),
            provider_name: provider.to_uppercase(),
            settlement,
            elapsed: Duration::from_millis(1),
        }
    }

    fn records(n: usize) -> Vec<ResultRecord> {
        (0..n)
            .map(|i| ResultRecord {
                id: i.to_string(),
                title: format!("Title {}", i),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_state_transitions() {
        let (sink, mut rx) = EventSink::channel();
        let mut guard = LifecycleGuard::start(Uuid::new_v4(), sink, "query", 2);
        assert_eq!(guard.state(), LifecycleState::Dispatched);

        guard.settle(outcome("a", Settlement::Results(records(2))));
        assert_eq!(guard.state(), LifecycleState::Streaming);
        assert!(!guard.all_settled());

        guard.settle(outcome("b", Settlement::Failed("down".to_string())));
        assert!(guard.all_settled());

        let counts = guard.finish();
        assert_eq!(counts.state, LifecycleState::Closed);
        assert_eq!(counts.settled, 2);
        assert_eq!(counts.total_results, 2);
        assert!(counts.terminal_delivered);

        let kinds: Vec<&str> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.kind())
            .collect();
        assert_eq!(kinds, vec!["start", "provider_result", "provider_error", "complete"]);
    }

    #[test]
    fn test_disconnect_skips_writes_but_counts_settlements() {
        let (sink, rx) = EventSink::channel();
        let mut guard = LifecycleGuard::start(Uuid::new_v4(), sink, "query", 2);
        drop(rx);

        guard.settle(outcome("a", Settlement::Results(records(3))));
        assert_eq!(guard.state(), LifecycleState::Closed);

        guard.settle(outcome("b", Settlement::TimedOut(Duration::from_secs(1))));
        assert_eq!(guard.state(), LifecycleState::Closed);

        let counts = guard.finish();
        assert_eq!(counts.settled, 2);
        assert_eq!(counts.total_results, 3);
        assert!(!counts.terminal_delivered);
    }

    #[test]
    fn test_finish_before_all_settled_skips_complete() {
        let (sink, mut rx) = EventSink::channel();
        let mut guard = LifecycleGuard::start(Uuid::new_v4(), sink, "query", 2);
        guard.settle(outcome("a", Settlement::Results(records(1))));

        let counts = guard.finish();
        assert_eq!(counts.state, LifecycleState::Closed);
        assert_eq!(counts.settled, 1);
        assert!(!counts.terminal_delivered);

        let kinds: Vec<&str> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.kind())
            .collect();
        assert_eq!(kinds, vec!["start", "provider_result"]);
    }

    #[test]
    fn test_reject_writes_single_error() {
        let (sink, mut rx) = EventSink::channel();
        let counts = LifecycleGuard::reject(Uuid::new_v4(), sink, "Unknown user: x");

        assert!(counts.terminal_delivered);
        assert_eq!(counts.dispatched, 0);
        assert!(matches!(rx.try_recv(), Ok(SearchEvent::Error { .. })));
        assert!(rx.try_recv().is_err());
    }
}
