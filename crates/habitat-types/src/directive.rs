//! Directives returned by a remote reasoning service.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geometry::Position;
use crate::ids::AgentId;

/// A command for a single agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Directive {
    /// The agent the directive targets.
    pub agent_id: AgentId,
    /// The tick the directive was issued for.
    pub tick: u64,
    /// What to do.
    pub command: DirectiveCommand,
}

/// The command carried by a [`Directive`].
///
/// Behavior tags travel as free text and are parsed on arrival, so an
/// unknown tag surfaces as an invalid transition rather than a decode
/// failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DirectiveCommand {
    /// Override the agent's navigation destination.
    SetMoveTarget {
        /// Destination in world coordinates.
        target: Position,
    },
    /// Switch the active behavior variant.
    SwitchBehavior {
        /// Behavior tag, e.g. `"GatherBehavior"` or `"rest"`.
        behavior: String,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn directive_decodes_from_tagged_json() {
        let json = r#"{
            "agent_id": 3,
            "tick": 12,
            "command": { "type": "switch_behavior", "behavior": "FleeBehavior" }
        }"#;
        let directive: Directive = serde_json::from_str(json).unwrap();
        assert_eq!(directive.agent_id, AgentId(3));
        assert_eq!(
            directive.command,
            DirectiveCommand::SwitchBehavior {
                behavior: "FleeBehavior".to_owned()
            }
        );
    }

    #[test]
    fn move_target_encodes_position() {
        let directive = Directive {
            agent_id: AgentId(1),
            tick: 0,
            command: DirectiveCommand::SetMoveTarget {
                target: Position::new(4.0, -2.0),
            },
        };
        let value = serde_json::to_value(&directive).unwrap();
        assert_eq!(value["command"]["type"], "set_move_target");
        assert_eq!(value["command"]["target"]["y"], -2.0);
    }
}
