//! NATS-based reasoning source for the engine.
//!
//! [`NatsReasoningSource`] implements [`ReasoningSource`] by publishing
//! one snapshot per agent and collecting directive batches within a
//! configurable timeout window.
//!
//! # Subject Convention
//!
//! - **Snapshot publish:** `habitat.reasoning.{agent_id}`
//! - **Directive subscribe:** `habitat.directive.*`
//!
//! The reasoning service answers each snapshot with one message on
//! `habitat.directive.{agent_id}` whose payload is a JSON array of
//! [`Directive`]s (possibly empty). Directives carry the tick they answer;
//! late answers from an earlier tick are dropped. Agents that get no answer
//! in time keep running on their own behavior logic.
//!
//! # Sync/Async Bridge
//!
//! [`ReasoningSource`] is synchronous but NATS is async. The call is
//! bridged onto the running tokio runtime with `block_in_place` and
//! `Handle::block_on`, which needs the multi-threaded runtime.

use std::collections::BTreeSet;
use std::time::Duration;

use futures::StreamExt as _;
use habitat_core::reasoning::{ReasoningError, ReasoningSource};
use habitat_types::{AgentId, Directive, ReasoningSnapshot};
use tracing::{debug, warn};

/// Wildcard subject directive batches arrive on.
const DIRECTIVE_SUBJECT: &str = "habitat.directive.*";

/// Prefix of the per-agent directive subjects.
const DIRECTIVE_PREFIX: &str = "habitat.directive.";

/// Subject a snapshot for `agent` is published on.
fn snapshot_subject(agent: AgentId) -> String {
    format!("habitat.reasoning.{agent}")
}

/// The agent a directive batch answers for, taken from its subject.
fn subject_agent(subject: &str) -> Option<AgentId> {
    subject
        .strip_prefix(DIRECTIVE_PREFIX)
        .and_then(|id| id.parse().ok())
        .map(AgentId)
}

/// A reasoning source backed by a NATS connection.
pub struct NatsReasoningSource {
    /// The NATS client connection.
    client: async_nats::Client,
    /// Maximum time to wait for all answers.
    timeout: Duration,
}

impl NatsReasoningSource {
    /// Connect to a NATS server.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, ReasoningError> {
        let client = async_nats::connect(url).await.map_err(|e| ReasoningError::Transport {
            message: format!("failed to connect to NATS at {url}: {e}"),
        })?;
        Ok(Self { client, timeout })
    }

    async fn request_async(
        &self,
        tick: u64,
        snapshots: &[ReasoningSnapshot],
    ) -> Result<Vec<Directive>, ReasoningError> {
        // Subscribe first so no answer can slip past.
        let mut sub = self
            .client
            .subscribe(DIRECTIVE_SUBJECT)
            .await
            .map_err(|e| ReasoningError::Transport {
                message: format!("failed to subscribe to {DIRECTIVE_SUBJECT}: {e}"),
            })?;

        self.publish_snapshots(tick, snapshots).await?;

        let expected: BTreeSet<AgentId> = snapshots.iter().map(|s| s.agent.agent_id).collect();
        let directives = collect_answers(&mut sub, tick, &expected, self.timeout).await;

        if let Err(e) = sub.unsubscribe().await {
            warn!(tick, error = %e, "Failed to unsubscribe from directives");
        }
        Ok(directives)
    }

    async fn publish_snapshots(&self, tick: u64, snapshots: &[ReasoningSnapshot]) -> Result<(), ReasoningError> {
        for snapshot in snapshots {
            let agent = snapshot.agent.agent_id;
            let subject = snapshot_subject(agent);
            let payload = serde_json::to_vec(snapshot)?;
            self.client
                .publish(subject.clone(), payload.into())
                .await
                .map_err(|e| ReasoningError::Transport {
                    message: format!("failed to publish snapshot on {subject}: {e}"),
                })?;
            debug!(tick, agent_id = %agent, "Published reasoning snapshot");
        }

        self.client.flush().await.map_err(|e| ReasoningError::Transport {
            message: format!("failed to flush NATS: {e}"),
        })
    }
}

/// Collect directive batches until every expected agent answered or the
/// timeout runs out.
async fn collect_answers(
    sub: &mut async_nats::Subscriber,
    tick: u64,
    expected: &BTreeSet<AgentId>,
    timeout: Duration,
) -> Vec<Directive> {
    let mut answered: BTreeSet<AgentId> = BTreeSet::new();
    let mut directives = Vec::new();
    let deadline = tokio::time::Instant::now()
        .checked_add(timeout)
        .unwrap_or_else(tokio::time::Instant::now);

    while answered.len() < expected.len() {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        match tokio::time::timeout(remaining, sub.next()).await {
            Ok(Some(msg)) => match serde_json::from_slice::<Vec<Directive>>(&msg.payload) {
                Ok(batch) => {
                    let from = subject_agent(msg.subject.as_str());
                    accept_batch(tick, expected, from, batch, &mut answered, &mut directives);
                }
                Err(e) => warn!(tick, subject = %msg.subject, error = %e, "Failed to decode directive batch"),
            },
            // Subscription closed or deadline hit.
            Ok(None) | Err(_) => break,
        }
    }

    let missing = expected.len().saturating_sub(answered.len());
    if missing > 0 {
        warn!(tick, answered = answered.len(), timed_out = missing, "Some agents got no reasoning answer in time");
    }
    directives
}

/// Keep directives for this tick that target an agent we asked about.
///
/// The agent named by the subject counts as answered when its batch is
/// empty or carries at least one directive for this tick. A batch made only
/// of late directives from an earlier tick does not count.
fn accept_batch(
    tick: u64,
    expected: &BTreeSet<AgentId>,
    from: Option<AgentId>,
    batch: Vec<Directive>,
    answered: &mut BTreeSet<AgentId>,
    out: &mut Vec<Directive>,
) {
    let current = batch.is_empty() || batch.iter().any(|d| d.tick == tick);
    if let Some(agent) = from.filter(|a| current && expected.contains(a)) {
        answered.insert(agent);
    }
    for directive in batch {
        if directive.tick != tick || !expected.contains(&directive.agent_id) {
            debug!(
                tick,
                directive_tick = directive.tick,
                agent_id = %directive.agent_id,
                "Ignoring stray directive"
            );
            continue;
        }
        answered.insert(directive.agent_id);
        out.push(directive);
    }
}

impl std::fmt::Debug for NatsReasoningSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsReasoningSource")
            .field("timeout_ms", &self.timeout.as_millis())
            .finish_non_exhaustive()
    }
}

impl ReasoningSource for NatsReasoningSource {
    fn request_directives(
        &mut self,
        tick: u64,
        snapshots: &[ReasoningSnapshot],
    ) -> Result<Vec<Directive>, ReasoningError> {
        if snapshots.is_empty() {
            return Ok(Vec::new());
        }
        let handle = tokio::runtime::Handle::try_current().map_err(|e| ReasoningError::Transport {
            message: format!("no tokio runtime available: {e}"),
        })?;
        tokio::task::block_in_place(|| handle.block_on(self.request_async(tick, snapshots)))
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use habitat_core::config::SimulationConfig;
    use habitat_core::reasoning::build_snapshot;
    use habitat_core::tick::SimulationState;
    use habitat_types::{BehaviorKind, DirectiveCommand, Position};

    use super::*;

    fn switch(agent: u64, tick: u64, behavior: &str) -> Directive {
        Directive {
            agent_id: AgentId(agent),
            tick,
            command: DirectiveCommand::SwitchBehavior {
                behavior: behavior.to_owned(),
            },
        }
    }

    #[test]
    fn snapshot_subject_names_the_agent() {
        assert_eq!(snapshot_subject(AgentId(3)), "habitat.reasoning.3");
    }

    #[test]
    fn stray_directives_are_dropped() {
        let expected: BTreeSet<AgentId> = [AgentId(1), AgentId(2)].into_iter().collect();
        let mut answered = BTreeSet::new();
        let mut out = Vec::new();
        let batch = vec![
            switch(1, 5, "flee"),
            switch(1, 4, "rest"),
            switch(9, 5, "guard"),
            Directive {
                agent_id: AgentId(2),
                tick: 5,
                command: DirectiveCommand::SetMoveTarget {
                    target: Position::new(1.0, 2.0),
                },
            },
        ];
        accept_batch(5, &expected, None, batch, &mut answered, &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(answered, expected);
    }

    #[test]
    fn empty_batch_counts_as_answer() {
        let expected: BTreeSet<AgentId> = [AgentId(1), AgentId(2)].into_iter().collect();
        let mut answered = BTreeSet::new();
        let mut out = Vec::new();
        accept_batch(5, &expected, Some(AgentId(2)), Vec::new(), &mut answered, &mut out);
        assert!(out.is_empty());
        assert_eq!(answered, [AgentId(2)].into_iter().collect());
    }

    #[test]
    fn late_batch_does_not_count_as_answer() {
        let expected: BTreeSet<AgentId> = [AgentId(1)].into_iter().collect();
        let mut answered = BTreeSet::new();
        let mut out = Vec::new();
        accept_batch(5, &expected, Some(AgentId(1)), vec![switch(1, 4, "rest")], &mut answered, &mut out);
        assert!(out.is_empty());
        assert!(answered.is_empty());
    }

    #[test]
    fn unknown_sender_is_not_marked() {
        let expected: BTreeSet<AgentId> = [AgentId(1)].into_iter().collect();
        let mut answered = BTreeSet::new();
        let mut out = Vec::new();
        accept_batch(5, &expected, Some(AgentId(7)), Vec::new(), &mut answered, &mut out);
        assert!(answered.is_empty());
    }

    #[test]
    fn subject_names_the_answering_agent() {
        assert_eq!(subject_agent("habitat.directive.12"), Some(AgentId(12)));
        assert_eq!(subject_agent("habitat.directive.x"), None);
        assert_eq!(subject_agent("habitat.reasoning.12"), None);
    }

    #[test]
    fn batch_payload_decodes() {
        let json = r#"[{"agent_id":1,"tick":2,"command":{"type":"switch_behavior","behavior":"GatherBehavior"}}]"#;
        let batch: Vec<Directive> = serde_json::from_str(json).unwrap();
        assert_eq!(batch, vec![switch(1, 2, "GatherBehavior")]);
    }

    /// Without a responder every agent times out and nothing is returned.
    #[tokio::test(flavor = "multi_thread")]
    async fn timeout_returns_no_directives() {
        let Ok(mut source) = NatsReasoningSource::connect("nats://localhost:4222", Duration::from_millis(200)).await
        else {
            // NATS not available.
            return;
        };

        let mut state = SimulationState::new(SimulationConfig::default()).unwrap();
        let id = state.spawn_agent(Position::ORIGIN, BehaviorKind::Gather).unwrap();
        let agent = state.agents.get(id).unwrap();
        let snapshot = build_snapshot(
            agent,
            999,
            state.clock.is_day(),
            &state.habitat,
            &state.spawns,
            state.config.world.half_extent,
        );

        let directives = source.request_directives(999, &[snapshot]).unwrap();
        assert!(directives.is_empty());
    }
}
