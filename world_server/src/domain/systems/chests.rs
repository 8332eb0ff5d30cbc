use crate::domain::state::{Chest, ChestId, Player, PlayerId};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pickup {
    pub player_id: PlayerId,
    pub chest_id: ChestId,
    pub money: u64,
    pub items: Vec<String>,
    // Items that did not fit into a full inventory.
    pub discarded: Vec<String>,
}

/// Opens every unopened chest that shares a cell with a player and hands its contents over.
pub fn resolve_pickups<'a>(
    players: impl IntoIterator<Item = &'a mut Player>,
    chests: &mut [Chest],
    cell_size: i32,
) -> Vec<Pickup> {
    let mut pickups = Vec::new();
    for player in players {
        let cell = player.body.pos.cell(cell_size);
        for chest in chests
            .iter_mut()
            .filter(|c| !c.is_opened() && c.pos.cell(cell_size) == cell)
        {
            let Some((money, items)) = chest.open() else {
                continue;
            };
            player.money += money;

            let mut pickup = Pickup {
                player_id: player.id,
                chest_id: chest.id,
                money,
                items: Vec::new(),
                discarded: Vec::new(),
            };
            for item in items {
                let id = item.id.clone();
                match player.inventory.add(item) {
                    Ok(()) => pickup.items.push(id),
                    Err(_) => {
                        warn!(player_id = player.id, item = %id, "inventory full, item discarded");
                        pickup.discarded.push(id);
                    }
                }
            }
            pickups.push(pickup);
        }
    }
    pickups
}

/// Drops opened chests from the active set. Returns how many were removed.
pub fn purge_opened(chests: &mut Vec<Chest>) -> usize {
    let before = chests.len();
    chests.retain(|c| !c.is_opened());
    before - chests.len()
}
