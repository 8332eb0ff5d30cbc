// Narrow item model: what chests hold and what actions equip or refine.

use crate::domain::errors::ActionError;
use serde::{Deserialize, Serialize};

pub const INVENTORY_MAX_SIZE: usize = 30;
pub const MAX_REFINE_LEVEL: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Weapon,
    Armor,
    Misc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    /// Attack for weapons, defence for armor.
    pub power: i32,
    #[serde(default)]
    pub refine: u8,
}

impl Item {
    pub fn is_equippable(&self) -> bool {
        matches!(self.kind, ItemKind::Weapon | ItemKind::Armor)
    }

    /// Power including the refine bonus (+10% per level).
    pub fn effective_power(&self) -> i32 {
        self.power + self.power * i32::from(self.refine) / 10
    }
}

const CATALOG: &[(&str, &str, ItemKind, i32)] = &[
    ("4001", "Knife", ItemKind::Weapon, 17),
    ("4002", "Cutter", ItemKind::Weapon, 25),
    ("4003", "Main Gauche", ItemKind::Weapon, 35),
    ("5001", "Cotton Shirt", ItemKind::Armor, 2),
    ("5003", "Chain Mail", ItemKind::Armor, 8),
    ("5004", "Full Plate", ItemKind::Armor, 12),
    ("7001", "Jellopy", ItemKind::Misc, 0),
];

/// Looks up an item template by id.
pub fn catalog_item(id: &str) -> Option<Item> {
    CATALOG
        .iter()
        .find(|(item_id, ..)| *item_id == id)
        .map(|(item_id, name, kind, power)| Item {
            id: (*item_id).to_string(),
            name: (*name).to_string(),
            kind: *kind,
            power: *power,
            refine: 0,
        })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    items: Vec<Item>,
}

impl Inventory {
    pub fn from_items(mut items: Vec<Item>) -> Self {
        items.truncate(INVENTORY_MAX_SIZE);
        Self { items }
    }

    /// Adds the item, handing it back when the inventory is full.
    pub fn add(&mut self, item: Item) -> Result<(), Item> {
        if self.is_full() {
            return Err(item);
        }
        self.items.push(item);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Item> {
        self.items.get_mut(index)
    }

    pub fn remove(&mut self, index: usize) -> Option<Item> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= INVENTORY_MAX_SIZE
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquipSlot {
    Weapon,
    Armor,
}

impl EquipSlot {
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(EquipSlot::Weapon),
            1 => Some(EquipSlot::Armor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub weapon: Option<Item>,
    pub armor: Option<Item>,
}

impl Equipment {
    pub fn slot_mut(&mut self, slot: EquipSlot) -> &mut Option<Item> {
        match slot {
            EquipSlot::Weapon => &mut self.weapon,
            EquipSlot::Armor => &mut self.armor,
        }
    }

    pub fn attack_bonus(&self) -> i32 {
        self.weapon.as_ref().map_or(0, Item::effective_power)
    }

    pub fn defence_bonus(&self) -> i32 {
        self.armor.as_ref().map_or(0, Item::effective_power)
    }
}

/// Moves the item at `index` into its equipment slot; any previously equipped item goes back.
pub fn equip(
    inventory: &mut Inventory,
    equipment: &mut Equipment,
    index: i32,
) -> Result<(), ActionError> {
    let slot_index = usize::try_from(index).map_err(|_| ActionError::ItemNotFound(index))?;
    let item = inventory
        .get(slot_index)
        .ok_or(ActionError::ItemNotFound(index))?;
    let slot = match item.kind {
        ItemKind::Weapon => EquipSlot::Weapon,
        ItemKind::Armor => EquipSlot::Armor,
        ItemKind::Misc => return Err(ActionError::NotEquippable(index)),
    };

    let Some(item) = inventory.remove(slot_index) else {
        return Err(ActionError::ItemNotFound(index));
    };
    if let Some(previous) = equipment.slot_mut(slot).replace(item) {
        // The slot we just freed guarantees room for the swapped item.
        let _ = inventory.add(previous);
    }
    Ok(())
}

pub fn unequip(
    inventory: &mut Inventory,
    equipment: &mut Equipment,
    slot_index: i32,
) -> Result<(), ActionError> {
    let slot = EquipSlot::from_index(slot_index).ok_or(ActionError::UnknownSlot(slot_index))?;
    if inventory.is_full() {
        return Err(ActionError::InventoryFull);
    }
    let item = equipment
        .slot_mut(slot)
        .take()
        .ok_or(ActionError::EmptySlot(slot_index))?;
    let _ = inventory.add(item);
    Ok(())
}

pub fn refine(inventory: &mut Inventory, index: i32) -> Result<(), ActionError> {
    let item = usize::try_from(index)
        .ok()
        .and_then(|i| inventory.get_mut(i))
        .ok_or(ActionError::ItemNotFound(index))?;
    if !item.is_equippable() {
        return Err(ActionError::NotRefinable(index));
    }
    if item.refine >= MAX_REFINE_LEVEL {
        return Err(ActionError::MaxRefine(index));
    }
    item.refine += 1;
    Ok(())
}
