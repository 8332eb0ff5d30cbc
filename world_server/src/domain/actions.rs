// Parsing and validation of batched gameplay actions ("CMD,player,value").

use crate::domain::errors::ActionError;
use crate::domain::state::Player;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionCommand {
    AttrUp,
    Equip,
    Unequip,
    Refine,
}

impl ActionCommand {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "ATTR_UP" => Some(ActionCommand::AttrUp),
            "EQUIP" => Some(ActionCommand::Equip),
            "UNEQUIP" => Some(ActionCommand::Unequip),
            "REFINE" => Some(ActionCommand::Refine),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub command: ActionCommand,
    pub player: String,
    pub value: i32,
}

/// Parses one batch item. Checks run in a fixed order: shape, player, value, command.
pub fn parse_action(raw: &str, is_online: impl Fn(&str) -> bool) -> Result<Action, ActionError> {
    let mut parts = raw.split(',').map(str::trim);
    let (Some(command), Some(player), Some(value), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ActionError::Malformed(raw.to_string()));
    };

    if player.is_empty() || !is_online(player) {
        return Err(ActionError::UnknownPlayer(player.to_string()));
    }
    let value = value
        .parse::<i32>()
        .map_err(|_| ActionError::BadValue(value.to_string()))?;
    let command =
        ActionCommand::parse(command).ok_or_else(|| ActionError::UnknownCommand(command.to_string()))?;

    Ok(Action {
        command,
        player: player.to_string(),
        value,
    })
}

/// Applies a validated action. A failed action leaves the player untouched.
pub fn apply_action(player: &mut Player, action: &Action) -> Result<(), ActionError> {
    match action.command {
        ActionCommand::AttrUp => player.increase_attr(action.value),
        ActionCommand::Equip => player.equip(action.value),
        ActionCommand::Unequip => player.unequip(action.value),
        ActionCommand::Refine => player.refine(action.value),
    }
}
