// Agent vocabulary and the (type, goal) -> behaviour rule registry.

use crate::domain::map::Position;
use crate::domain::memory::LocationMemory;
use crate::domain::state::{Enemy, PlayerId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentType {
    Guard,
    Scout,
    Assassin,
}

impl AgentType {
    pub fn default_goal(self) -> AgentGoal {
        match self {
            AgentType::Guard => AgentGoal::GuardChest,
            AgentType::Scout => AgentGoal::FindPlayer,
            AgentType::Assassin => AgentGoal::KillPlayer,
        }
    }
}

impl FromStr for AgentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GUARD" => Ok(AgentType::Guard),
            "SCOUT" => Ok(AgentType::Scout),
            "ASSASSIN" => Ok(AgentType::Assassin),
            _ => Err(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentGoal {
    GuardChest,
    FindPlayer,
    KillPlayer,
}

/// Anything an agent can pursue that has a position.
///
/// Player targets are lookups into the live roster, never owned by the agent; a player that
/// leaves the map resolves to nothing and the target is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentGoalTarget {
    Player(PlayerId),
    Point(Position),
}

impl AgentGoalTarget {
    pub fn resolve(self, players: &[PlayerSighting]) -> Option<Position> {
        match self {
            AgentGoalTarget::Player(id) => players.iter().find(|p| p.id == id).map(|p| p.pos),
            AgentGoalTarget::Point(pos) => Some(pos),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentBehaviour {
    pub agent_type: AgentType,
    pub goal: AgentGoal,
    pub target: Option<AgentGoalTarget>,
}

impl AgentBehaviour {
    pub fn new(agent_type: AgentType, target: Option<AgentGoalTarget>) -> Self {
        Self {
            agent_type,
            goal: agent_type.default_goal(),
            target,
        }
    }

    /// Switching goals forgets the old target.
    pub fn set_goal(&mut self, goal: AgentGoal) {
        if self.goal != goal {
            self.goal = goal;
            self.target = None;
        }
    }

    pub fn reset(&mut self, home: Option<AgentGoalTarget>) {
        self.goal = self.agent_type.default_goal();
        self.target = home;
    }
}

/// Where a player stood when the roster was snapshotted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSighting {
    pub id: PlayerId,
    pub pos: Position,
}

/// Read-only view an agent behaviour decides from.
pub struct Perception<'a> {
    pub players: &'a [PlayerSighting],
    pub memory: &'a LocationMemory,
    pub sight_range: f32,
}

impl Perception<'_> {
    pub fn can_see(&self, from: Position, target: Position) -> bool {
        from.distance(target) <= self.sight_range
    }

    pub fn first_visible(&self, from: Position) -> Option<PlayerSighting> {
        self.players
            .iter()
            .copied()
            .find(|p| self.can_see(from, p.pos))
    }
}

/// Movement order issued by a behaviour; the movement controller turns it into velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Patrol(Position),
    Attack(Position),
    Search(Position),
}

impl Order {
    pub fn destination(self) -> Position {
        match self {
            Order::Patrol(p) | Order::Attack(p) | Order::Search(p) => p,
        }
    }
}

pub type Behaviour = fn(&mut Enemy, &Perception<'_>) -> Option<Order>;

#[derive(Clone, Copy)]
pub struct AgentRule {
    pub name: &'static str,
    pub agent_type: AgentType,
    pub goal: AgentGoal,
    pub behaviour: Behaviour,
}

impl AgentRule {
    pub fn matches(&self, agent_type: AgentType, goal: AgentGoal) -> bool {
        self.agent_type == agent_type && self.goal == goal
    }
}

impl std::fmt::Debug for AgentRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRule")
            .field("name", &self.name)
            .field("agent_type", &self.agent_type)
            .field("goal", &self.goal)
            .finish()
    }
}

/// Ordered rule list, built once at startup. First match wins.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<AgentRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<AgentRule>) -> Self {
        Self { rules }
    }

    pub fn standard() -> Self {
        Self::new(vec![
            AgentRule {
                name: "guard_patrol",
                agent_type: AgentType::Guard,
                goal: AgentGoal::GuardChest,
                behaviour: patrol_guard_target,
            },
            AgentRule {
                name: "guard_kill",
                agent_type: AgentType::Guard,
                goal: AgentGoal::KillPlayer,
                behaviour: attack_first_visible,
            },
            AgentRule {
                name: "scout_find",
                agent_type: AgentType::Scout,
                goal: AgentGoal::FindPlayer,
                behaviour: search_last_known,
            },
            AgentRule {
                name: "scout_kill",
                agent_type: AgentType::Scout,
                goal: AgentGoal::KillPlayer,
                behaviour: attack_current_target,
            },
            AgentRule {
                name: "assassin_kill",
                agent_type: AgentType::Assassin,
                goal: AgentGoal::KillPlayer,
                behaviour: attack_first_visible,
            },
        ])
    }

    pub fn find(&self, agent_type: AgentType, goal: AgentGoal) -> Option<&AgentRule> {
        self.rules.iter().find(|r| r.matches(agent_type, goal))
    }

    /// Runs the matching behaviour, if any. A state without a rule is a no-op.
    pub fn execute(&self, enemy: &mut Enemy, perception: &Perception<'_>) -> Option<Order> {
        let rule = self.find(enemy.behaviour.agent_type, enemy.behaviour.goal)?;
        (rule.behaviour)(enemy, perception)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

fn patrol_guard_target(enemy: &mut Enemy, perception: &Perception<'_>) -> Option<Order> {
    let post = enemy.behaviour.target?.resolve(perception.players)?;
    Some(Order::Patrol(post))
}

fn attack_first_visible(enemy: &mut Enemy, perception: &Perception<'_>) -> Option<Order> {
    if let Some(seen) = perception.first_visible(enemy.body.pos) {
        enemy.behaviour.target = Some(AgentGoalTarget::Player(seen.id));
    }
    attack_current_target(enemy, perception)
}

fn attack_current_target(enemy: &mut Enemy, perception: &Perception<'_>) -> Option<Order> {
    let at = enemy.behaviour.target?.resolve(perception.players)?;
    Some(Order::Attack(at))
}

fn search_last_known(_enemy: &mut Enemy, perception: &Perception<'_>) -> Option<Order> {
    perception
        .memory
        .best()
        .map(|(at, _confidence)| Order::Search(at))
}
