//! Habitat food distribution.
//!
//! Every `dispense_interval_secs` the distributor checks the habitat's
//! waiting list. A round runs only when enough agents are waiting, every
//! one of them has already handed over what they carried, and there is
//! food in storage. Agents are served in strictly descending fitness
//! order, ties broken by ascending agent ID, each receiving up to one
//! portion until the stock runs out.

use std::cmp::Reverse;
use std::time::Duration;

use habitat_agents::scheduler::secs;
use habitat_agents::{AgentManager, FoodUse, SimTime};
use habitat_types::AgentId;
use habitat_world::Habitat;
use tracing::{debug, info, warn};

use crate::config::HabitatConfig;

/// What one distribution round did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispenseReport {
    /// Agents fed, in serving order, with the amount each received.
    pub served: Vec<(AgentId, u32)>,
    /// Waiting agents left without food because stock ran out.
    pub unserved: Vec<AgentId>,
    /// Whether the round ended on an empty store.
    pub exhausted: bool,
    /// Food left in storage.
    pub remaining: u32,
}

/// Periodic food dispenser for the habitat.
#[derive(Debug, Clone)]
pub struct FoodDistributor {
    interval: Duration,
    portion: u32,
    expected: usize,
    next_check: SimTime,
}

impl FoodDistributor {
    /// First check happens one interval after start.
    pub fn new(config: &HabitatConfig) -> Self {
        let interval = secs(config.dispense_interval_secs);
        Self {
            interval,
            portion: config.food_portion_value,
            expected: config.expected_agent_count,
            next_check: SimTime::ZERO.saturating_add(interval),
        }
    }

    /// Food handed to each agent per round.
    pub const fn portion(&self) -> u32 {
        self.portion
    }

    /// Run a round if one is due and its preconditions hold.
    pub fn poll(&mut self, now: SimTime, habitat: &mut Habitat, agents: &mut AgentManager) -> Option<DispenseReport> {
        if now < self.next_check {
            return None;
        }
        self.next_check = now.saturating_add(self.interval);

        let waiting = habitat.waiting();
        if waiting.is_empty() || waiting.len() < self.expected {
            debug!(waiting = waiting.len(), expected = self.expected, "Distribution skipped: not enough agents waiting");
            return None;
        }
        let still_carrying = waiting
            .iter()
            .filter_map(|id| agents.get(*id))
            .any(|a| a.fitness().current_food() > 0);
        if still_carrying {
            debug!("Distribution skipped: agents still carrying food");
            return None;
        }
        if habitat.stored_food() == 0 {
            debug!("Distribution skipped: no food in storage");
            return None;
        }

        Some(self.dispense(habitat, agents))
    }

    fn dispense(&self, habitat: &mut Habitat, agents: &mut AgentManager) -> DispenseReport {
        let order = distribution_order(agents, habitat.waiting(), habitat.stored_food());
        let mut report = DispenseReport {
            served: Vec::new(),
            unserved: Vec::new(),
            exhausted: false,
            remaining: habitat.stored_food(),
        };

        for id in order {
            if report.exhausted {
                report.unserved.push(id);
                continue;
            }
            let Some(agent) = agents.get_mut(id).filter(|a| a.is_alive()) else {
                warn!(agent_id = %id, "Waiting agent missing or dead, skipped");
                continue;
            };
            let amount = habitat.take_food(self.portion);
            let used = agent.receive_food(amount);
            report.served.push((id, amount));
            match used {
                FoodUse::Healed(n) => debug!(agent_id = %id, amount, healed = n, "Food dispensed"),
                FoodUse::Ate(n) => debug!(agent_id = %id, amount, ate = n, "Food dispensed"),
                FoodUse::Wasted => debug!(agent_id = %id, amount, "Food dispensed to a full agent"),
            }
            report.exhausted = habitat.stored_food() == 0;
        }

        report.remaining = habitat.stored_food();
        habitat.clear_waiting();
        info!(
            served = report.served.len(),
            unserved = report.unserved.len(),
            remaining = report.remaining,
            "Habitat food distributed"
        );
        report
    }
}

/// Serving order: fitness descending, then agent ID ascending.
///
/// Unknown IDs sort last in ID order. Fitness is recomputed on every call.
pub fn distribution_order(agents: &AgentManager, waiting: &[AgentId], habitat_stored_food: u32) -> Vec<AgentId> {
    let mut order: Vec<(Reverse<i64>, AgentId)> = waiting
        .iter()
        .map(|id| {
            let fitness = agents
                .get(*id)
                .map_or(i64::MIN, |a| a.fitness().fitness_score(habitat_stored_food));
            (Reverse(fitness), *id)
        })
        .collect();
    order.sort_unstable();
    order.dedup_by_key(|(_, id)| *id);
    order.into_iter().map(|(_, id)| id).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use habitat_agents::AgentConfig;
    use habitat_types::{BehaviorKind, EntityId, Position};
    use habitat_world::NavSettings;

    use super::*;

    fn config(portion: u32, expected: usize) -> HabitatConfig {
        HabitatConfig {
            food_portion_value: portion,
            expected_agent_count: expected,
            dispense_interval_secs: 5.0,
            ..HabitatConfig::default()
        }
    }

    fn manager(n: usize) -> (AgentManager, Vec<AgentId>) {
        let config = AgentConfig::default();
        let mut agents = AgentManager::new();
        let ids = (0..n)
            .map(|_| {
                agents
                    .spawn_agent(EntityId::new(), Position::ORIGIN, BehaviorKind::Rest, &config, NavSettings::default())
                    .unwrap()
            })
            .collect();
        (agents, ids)
    }

    fn habitat(food: u32, waiting: &[AgentId]) -> Habitat {
        let mut habitat = Habitat::new(Position::ORIGIN, 5.0, &[], food);
        for id in waiting {
            habitat.register(*id, false);
        }
        habitat
    }

    #[test]
    fn order_is_fitness_desc_then_id_asc() {
        let (mut agents, ids) = manager(3);
        let [a, b, c] = ids.as_slice() else {
            return;
        };
        // a and c tie, b leads.
        agents.get_mut(*a).unwrap().fitness_mut().set_state(0, 1, 100);
        agents.get_mut(*b).unwrap().fitness_mut().set_state(0, 4, 100);
        agents.get_mut(*c).unwrap().fitness_mut().set_state(0, 1, 100);

        let waiting = [*c, *a, *b];
        let first = distribution_order(&agents, &waiting, 0);
        assert_eq!(first, vec![*b, *a, *c]);
        for _ in 0..5 {
            assert_eq!(distribution_order(&agents, &waiting, 0), first);
        }
    }

    #[test]
    fn stops_once_stock_is_exhausted() {
        let (mut agents, ids) = manager(3);
        let [a, b, c] = ids.as_slice() else {
            return;
        };
        agents.get_mut(*a).unwrap().fitness_mut().set_state(0, 3, 80);
        agents.get_mut(*b).unwrap().fitness_mut().set_state(0, 0, 90);
        let mut habitat = habitat(15, &[*a, *b, *c]);
        let mut distributor = FoodDistributor::new(&config(10, 2));

        let report = distributor
            .poll(SimTime(5000), &mut habitat, &mut agents)
            .unwrap();

        // b: 10*15 - 100 = 50; a: 150 + 21 - 200 = -29; c: 150.
        assert_eq!(report.served, vec![(*c, 10), (*b, 5)]);
        assert_eq!(report.unserved, vec![*a]);
        assert!(report.exhausted);
        assert_eq!(report.remaining, 0);
        assert_eq!(habitat.stored_food(), 0);
        assert!(habitat.waiting().is_empty());
    }

    #[test]
    fn injured_agents_heal_before_eating() {
        let (mut agents, ids) = manager(1);
        let id = *ids.first().unwrap();
        agents.get_mut(id).unwrap().fitness_mut().set_state(0, 0, 95);
        let mut habitat = habitat(10, &[id]);
        let mut distributor = FoodDistributor::new(&config(10, 1));

        distributor.poll(SimTime(5000), &mut habitat, &mut agents).unwrap();
        let fitness = agents.get(id).unwrap().fitness();
        assert_eq!(fitness.health(), 100);
        assert_eq!(fitness.hunger(), 0);
    }

    #[test]
    fn waits_for_interval_and_quorum() {
        let (mut agents, ids) = manager(2);
        let first = *ids.first().unwrap();
        let mut habitat = habitat(20, &[first]);
        let mut distributor = FoodDistributor::new(&config(5, 2));

        assert!(distributor.poll(SimTime(4999), &mut habitat, &mut agents).is_none());
        // Due, but only one of two expected agents is waiting.
        assert!(distributor.poll(SimTime(5000), &mut habitat, &mut agents).is_none());
        assert_eq!(habitat.stored_food(), 20);

        for id in &ids {
            habitat.register(*id, false);
        }
        // Next check is one interval after the skipped one.
        assert!(distributor.poll(SimTime(9000), &mut habitat, &mut agents).is_none());
        assert!(distributor.poll(SimTime(10_000), &mut habitat, &mut agents).is_some());
        assert_eq!(habitat.stored_food(), 10);
    }

    #[test]
    fn skips_while_anyone_still_carries_food() {
        let (mut agents, ids) = manager(1);
        let id = *ids.first().unwrap();
        agents.get_mut(id).unwrap().fitness_mut().set_state(2, 0, 100);
        let mut habitat = habitat(10, &[id]);
        let mut distributor = FoodDistributor::new(&config(5, 1));

        assert!(distributor.poll(SimTime(5000), &mut habitat, &mut agents).is_none());
        assert_eq!(habitat.stored_food(), 10);
        assert!(habitat.is_waiting(id));
    }

    #[test]
    fn empty_store_is_not_a_round() {
        let (mut agents, ids) = manager(1);
        let mut habitat = habitat(0, &ids);
        let mut distributor = FoodDistributor::new(&config(5, 1));
        assert!(distributor.poll(SimTime(5000), &mut habitat, &mut agents).is_none());
    }
}
