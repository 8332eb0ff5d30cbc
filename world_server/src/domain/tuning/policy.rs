// What happens to combatants whose health reaches zero.

use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnemyDeathPolicy {
    /// Stays in the enemy set flagged dead; skipped by AI and combat.
    #[default]
    Persist,
    /// Purged from the enemy set at the end of the tick.
    Remove,
    /// Restored at its spawn point after the delay.
    Respawn { after_ticks: u32 },
}

impl FromStr for EnemyDeathPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "persist" => Ok(EnemyDeathPolicy::Persist),
            "remove" => Ok(EnemyDeathPolicy::Remove),
            _ => {
                let ticks = s
                    .strip_prefix("respawn:")
                    .ok_or_else(|| format!("unknown enemy death policy: {s}"))?;
                let after_ticks = ticks
                    .parse::<u32>()
                    .map_err(|_| format!("invalid respawn delay: {ticks}"))?;
                Ok(EnemyDeathPolicy::Respawn { after_ticks })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayerDeathPolicy {
    /// Teleport to the map spawn with full health.
    #[default]
    Respawn,
    /// Leave the player where it fell at zero health.
    Ignore,
}

impl FromStr for PlayerDeathPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "respawn" => Ok(PlayerDeathPolicy::Respawn),
            "ignore" => Ok(PlayerDeathPolicy::Ignore),
            other => Err(format!("unknown player death policy: {other}")),
        }
    }
}
