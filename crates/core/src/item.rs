//! Item system - tools, weapons, armor, and placeable tiles.

use serde::{Deserialize, Serialize};

/// Number of hotbar slots in a loadout.
pub const HOTBAR_SLOTS: usize = 10;

/// Maximum count for stackable items.
pub const MAX_STACK: u32 = 999;

/// Tool material tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ToolMaterial {
    /// Wooden tools (tier 0)
    Wood = 0,
    /// Copper tools (tier 1)
    Copper = 1,
    /// Iron tools (tier 2)
    Iron = 2,
    /// Gold tools (tier 3)
    Gold = 3,
}

impl ToolMaterial {
    /// Mining power added per frame while a block is being mined.
    pub fn mining_power(self) -> f32 {
        match self {
            ToolMaterial::Wood => 1.0,
            ToolMaterial::Copper => 1.5,
            ToolMaterial::Iron => 2.0,
            ToolMaterial::Gold => 3.0,
        }
    }

    /// Maximum durability for tools of this material.
    pub fn durability(self) -> u32 {
        match self {
            ToolMaterial::Wood => 60,
            ToolMaterial::Copper => 120,
            ToolMaterial::Iron => 250,
            ToolMaterial::Gold => 400,
        }
    }

    /// Melee damage for a sword of this material.
    pub fn sword_damage(self) -> f32 {
        match self {
            ToolMaterial::Wood => 4.0,
            ToolMaterial::Copper => 6.0,
            ToolMaterial::Iron => 8.0,
            ToolMaterial::Gold => 11.0,
        }
    }

    /// Horizontal knockback (tiles per frame) dealt by a sword of this material.
    pub fn sword_knockback(self) -> f32 {
        match self {
            ToolMaterial::Wood => 0.25,
            ToolMaterial::Copper => 0.3,
            ToolMaterial::Iron => 0.35,
            ToolMaterial::Gold => 0.4,
        }
    }
}

/// A piece of equipped armor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArmorPiece {
    /// Armor slot the piece occupies.
    pub slot: ArmorSlot,
    /// Flat damage reduction.
    pub defense: u32,
}

/// Armor slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArmorSlot {
    /// Head slot
    Helmet = 0,
    /// Body slot
    Chestplate = 1,
    /// Leg slot
    Leggings = 2,
}

/// What an item stack holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// Mining tool.
    Pickaxe(ToolMaterial),
    /// Melee weapon.
    Sword(ToolMaterial),
    /// Placeable foreground block (raw block id).
    Block(u8),
    /// Placeable background wall (raw wall id).
    Wall(u8),
    /// Wearable armor.
    Armor(ArmorPiece),
}

impl ItemKind {
    /// Whether this kind wears out with use.
    pub fn has_durability(self) -> bool {
        matches!(self, ItemKind::Pickaxe(_) | ItemKind::Sword(_))
    }

    /// Maximum stack size for this kind.
    pub fn max_stack(self) -> u32 {
        match self {
            ItemKind::Block(_) | ItemKind::Wall(_) => MAX_STACK,
            _ => 1,
        }
    }
}

/// An item stack in inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Type of item
    pub kind: ItemKind,
    /// Quantity in stack
    pub count: u32,
    /// Remaining uses for tools and weapons (None for everything else)
    pub durability: Option<u32>,
}

impl ItemStack {
    /// Create a new item stack
    pub fn new(kind: ItemKind, count: u32) -> Self {
        let durability = match kind {
            ItemKind::Pickaxe(material) | ItemKind::Sword(material) => Some(material.durability()),
            _ => None,
        };
        Self {
            kind,
            count: count.min(kind.max_stack()),
            durability,
        }
    }

    /// Check if this stack can accept more items
    pub fn can_add(&self, count: u32) -> bool {
        self.count + count <= self.kind.max_stack()
    }

    /// Consume one use. Returns true when the item is used up and must be destroyed.
    pub fn wear(&mut self) -> bool {
        match self.durability.as_mut() {
            Some(durability) => {
                *durability = durability.saturating_sub(1);
                *durability == 0
            }
            None => false,
        }
    }
}

/// Result of wearing the selected item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WearOutcome {
    /// Selected slot holds nothing that wears out.
    Untouched,
    /// Durability decreased; the item is still usable.
    Worn {
        /// Uses left.
        remaining: u32,
    },
    /// Durability reached zero and the item was removed.
    Destroyed,
}

/// Hotbar plus equipped armor for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loadout {
    /// Hotbar slots.
    pub hotbar: Vec<Option<ItemStack>>,
    /// Selected hotbar index.
    pub selected: usize,
    /// Equipped armor, indexed by [`ArmorSlot`].
    pub armor: [Option<ArmorPiece>; 3],
}

impl Default for Loadout {
    fn default() -> Self {
        Self {
            hotbar: vec![None; HOTBAR_SLOTS],
            selected: 0,
            armor: [None; 3],
        }
    }
}

impl Loadout {
    /// Starting kit: copper pickaxe, copper sword, a stack of planks.
    pub fn starter(planks_block: u8) -> Self {
        let mut loadout = Self::default();
        loadout.hotbar[0] = Some(ItemStack::new(ItemKind::Pickaxe(ToolMaterial::Copper), 1));
        loadout.hotbar[1] = Some(ItemStack::new(ItemKind::Sword(ToolMaterial::Copper), 1));
        loadout.hotbar[2] = Some(ItemStack::new(ItemKind::Block(planks_block), 50));
        loadout
    }

    /// Select a hotbar slot (ignored when out of range).
    pub fn select(&mut self, slot: usize) {
        if slot < self.hotbar.len() {
            self.selected = slot;
        }
    }

    /// Currently selected stack, if any.
    pub fn selected_item(&self) -> Option<&ItemStack> {
        self.hotbar.get(self.selected).and_then(Option::as_ref)
    }

    /// Wear the selected item by one use, removing it when it breaks.
    pub fn wear_selected(&mut self) -> WearOutcome {
        let Some(slot) = self.hotbar.get_mut(self.selected) else {
            return WearOutcome::Untouched;
        };
        let Some(stack) = slot.as_mut() else {
            return WearOutcome::Untouched;
        };
        if !stack.kind.has_durability() {
            return WearOutcome::Untouched;
        }
        if stack.wear() {
            *slot = None;
            WearOutcome::Destroyed
        } else {
            WearOutcome::Worn {
                remaining: stack.durability.unwrap_or(0),
            }
        }
    }

    /// Remove one item from the selected stack, returning its kind.
    pub fn take_one_selected(&mut self) -> Option<ItemKind> {
        let slot = self.hotbar.get_mut(self.selected)?;
        let stack = slot.as_mut()?;
        let kind = stack.kind;
        stack.count = stack.count.saturating_sub(1);
        if stack.count == 0 {
            *slot = None;
        }
        Some(kind)
    }

    /// Add items, merging into an existing stack first. Returns false when there is no room.
    pub fn add(&mut self, kind: ItemKind, count: u32) -> bool {
        if let Some(stack) = self
            .hotbar
            .iter_mut()
            .flatten()
            .find(|stack| stack.kind == kind && stack.can_add(count))
        {
            stack.count += count;
            return true;
        }
        match self.hotbar.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(ItemStack::new(kind, count));
                true
            }
            None => false,
        }
    }

    /// Equip an armor piece, returning whatever was in that slot.
    pub fn equip(&mut self, piece: ArmorPiece) -> Option<ArmorPiece> {
        self.armor[piece.slot as usize].replace(piece)
    }

    /// Sum of equipped armor defense.
    pub fn total_defense(&self) -> u32 {
        self.armor.iter().flatten().map(|piece| piece.defense).sum()
    }
}
