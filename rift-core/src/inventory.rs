//! Items and the slotted inventory capability.
//!
//! Item definitions are content: registered once into an [`ItemCatalog`]
//! and referenced everywhere else by string id, which is also how saved
//! inventories name their contents. The inventory itself is a fixed number
//! of slots; stackable items share a slot and accumulate quantity.

use crate::dialogue::condition::ConditionEvaluator;
use crate::saving::Persistable;
use crate::signal::Signal;
use crate::value::SaveValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ItemCategory {
    #[default]
    None,
    Weapon,
    Armor,
    Consumable,
    Quest,
    Trinket,
}

/// Definition of an item kind. Instances in an inventory are just an id
/// plus a quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDefinition {
    #[serde(default)]
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    stackable: bool,
    #[serde(default)]
    category: ItemCategory,
}

impl ItemDefinition {
    /// Create a definition with a blank id; the catalog mints one on
    /// registration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            description: String::new(),
            stackable: false,
            category: ItemCategory::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn stackable(mut self) -> Self {
        self.stackable = true;
        self
    }

    pub fn with_category(mut self, category: ItemCategory) -> Self {
        self.category = category;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_stackable(&self) -> bool {
        self.stackable
    }

    pub fn category(&self) -> ItemCategory {
        self.category
    }
}

/// Registry resolving item ids to definitions, e.g. when restoring saved
/// inventories.
#[derive(Debug, Default)]
pub struct ItemCatalog {
    items: HashMap<String, Arc<ItemDefinition>>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, minting an id if the definition has none.
    /// The first registration of an id wins; a second one is rejected with
    /// a warning and the existing definition is returned.
    pub fn register(&mut self, mut item: ItemDefinition) -> Arc<ItemDefinition> {
        if item.id.trim().is_empty() {
            item.id = Uuid::new_v4().to_string();
        }

        if let Some(existing) = self.items.get(&item.id) {
            warn!(id = %item.id, "duplicate item id, keeping the first registration");
            return Arc::clone(existing);
        }

        let item = Arc::new(item);
        self.items.insert(item.id.clone(), Arc::clone(&item));
        item
    }

    pub fn get(&self, id: &str) -> Option<Arc<ItemDefinition>> {
        self.items.get(id).map(Arc::clone)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Slot {
    item: Arc<ItemDefinition>,
    quantity: u32,
}

/// Fixed-size slotted inventory capability.
#[derive(Debug)]
pub struct Inventory {
    slots: Vec<Option<Slot>>,
    catalog: Arc<ItemCatalog>,
    changed: Signal,
}

impl Inventory {
    pub fn new(size: usize, catalog: Arc<ItemCatalog>) -> Self {
        Self {
            slots: (0..size).map(|_| None).collect(),
            catalog,
            changed: Signal::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn catalog(&self) -> &Arc<ItemCatalog> {
        &self.catalog
    }

    pub fn item_in_slot(&self, slot: usize) -> Option<&Arc<ItemDefinition>> {
        self.slots.get(slot)?.as_ref().map(|slot| &slot.item)
    }

    pub fn quantity_in_slot(&self, slot: usize) -> u32 {
        self.slots
            .get(slot)
            .and_then(|slot| slot.as_ref())
            .map(|slot| slot.quantity)
            .unwrap_or(0)
    }

    pub fn has_item(&self, item_id: &str) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|slot| slot.item.id() == item_id)
    }

    pub fn count_empty_slots(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_none()).count()
    }

    /// Whether one more unit of `item` would fit.
    pub fn has_space_for(&self, item: &ItemDefinition) -> bool {
        self.find_slot(item).is_some()
    }

    /// Whether the whole collection would fit at once, accounting for
    /// stackables that can share slots with existing stacks or each other.
    pub fn has_space_for_all<'a, I>(&self, items: I) -> bool
    where
        I: IntoIterator<Item = &'a ItemDefinition>,
    {
        let mut empty = self.count_empty_slots();
        let mut seen_stacks: HashSet<&str> = HashSet::new();

        for item in items {
            if item.is_stackable() && (!seen_stacks.insert(item.id()) || self.has_item(item.id())) {
                continue;
            }
            if empty == 0 {
                return false;
            }
            empty -= 1;
        }
        true
    }

    /// Add a quantity to the first available slot: an existing stack for
    /// stackable items, otherwise the first empty slot. Quantities
    /// accumulate into stacks. Returns `false` (and changes nothing) when
    /// no slot is available.
    pub fn add_to_first_available(&mut self, item: &Arc<ItemDefinition>, quantity: u32) -> bool {
        if quantity == 0 {
            return true;
        }

        let Some(index) = self.find_slot(item) else {
            return false;
        };
        self.place(index, item, quantity);
        true
    }

    /// Add a quantity to a specific slot. Falls back to
    /// [`add_to_first_available`](Self::add_to_first_available) when the
    /// slot is occupied by a different item, and redirects to an existing
    /// stack for stackable items.
    pub fn add_to_slot(&mut self, slot: usize, item: &Arc<ItemDefinition>, quantity: u32) -> bool {
        if quantity == 0 {
            return true;
        }
        if slot >= self.slots.len() {
            return false;
        }

        if let Some(occupant) = &self.slots[slot] {
            if occupant.item.id() != item.id() {
                return self.add_to_first_available(item, quantity);
            }
        }

        let index = self.find_stack(item).unwrap_or(slot);
        self.place(index, item, quantity);
        true
    }

    /// Remove a quantity from a slot; the slot empties when it reaches
    /// zero. Removing from an empty slot is a no-op.
    pub fn remove_from_slot(&mut self, slot: usize, quantity: u32) {
        let Some(occupied) = self.slots.get_mut(slot) else {
            return;
        };
        let Some(current) = occupied else {
            return;
        };

        current.quantity = current.quantity.saturating_sub(quantity);
        if current.quantity == 0 {
            *occupied = None;
        }
        self.changed.emit();
    }

    pub fn on_changed(&mut self, listener: impl FnMut() + Send + 'static) {
        self.changed.connect(listener);
    }

    fn place(&mut self, index: usize, item: &Arc<ItemDefinition>, quantity: u32) {
        match &mut self.slots[index] {
            Some(slot) => slot.quantity += quantity,
            empty => {
                *empty = Some(Slot {
                    item: Arc::clone(item),
                    quantity,
                });
            }
        }
        debug!(item = item.name(), quantity, slot = index, "inventory add");
        self.changed.emit();
    }

    fn find_slot(&self, item: &ItemDefinition) -> Option<usize> {
        self.find_stack(item).or_else(|| self.find_empty())
    }

    fn find_stack(&self, item: &ItemDefinition) -> Option<usize> {
        if !item.is_stackable() {
            return None;
        }
        self.slots.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|slot| slot.item.id() == item.id())
        })
    }

    fn find_empty(&self) -> Option<usize> {
        self.slots.iter().position(|slot| slot.is_none())
    }
}

impl Persistable for Inventory {
    fn state_key(&self) -> &'static str {
        "inventory"
    }

    fn capture_state(&self) -> SaveValue {
        let slots = self
            .slots
            .iter()
            .map(|slot| match slot {
                None => SaveValue::Null,
                Some(slot) => {
                    let mut record = BTreeMap::new();
                    record.insert("item".to_string(), SaveValue::from(slot.item.id()));
                    record.insert("quantity".to_string(), SaveValue::from(slot.quantity));
                    SaveValue::Map(record)
                }
            })
            .collect();
        SaveValue::List(slots)
    }

    fn restore_state(&mut self, state: &SaveValue) {
        let Some(records) = state.as_list() else {
            warn!("malformed inventory state, keeping current contents");
            return;
        };

        let empty = SaveValue::Null;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let record = records.get(index).unwrap_or(&empty);
            *slot = restore_slot(record, &self.catalog);
        }
        self.changed.emit();
    }
}

fn restore_slot(record: &SaveValue, catalog: &ItemCatalog) -> Option<Slot> {
    if record.is_null() {
        return None;
    }

    let item_id = record.get("item")?.as_str()?;
    let quantity = record.get("quantity")?.as_i64()? as u32;
    if quantity == 0 {
        return None;
    }

    match catalog.get(item_id) {
        Some(item) => Some(Slot { item, quantity }),
        None => {
            warn!(item_id, "unknown item in saved inventory, slot left empty");
            None
        }
    }
}

impl ConditionEvaluator for Inventory {
    fn evaluate(&self, predicate: &str, parameters: &[String]) -> Option<bool> {
        match predicate {
            "HasItem" => {
                let item_id = parameters.first()?;
                Some(self.has_item(item_id))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn catalog() -> Arc<ItemCatalog> {
        let mut catalog = ItemCatalog::new();
        catalog.register(
            ItemDefinition::new("Healing Draught")
                .with_id("healing-draught")
                .stackable()
                .with_category(ItemCategory::Consumable),
        );
        catalog.register(
            ItemDefinition::new("Iron Sword")
                .with_id("iron-sword")
                .with_category(ItemCategory::Weapon),
        );
        Arc::new(catalog)
    }

    #[test]
    fn test_catalog_mints_blank_ids() {
        let mut catalog = ItemCatalog::new();
        let item = catalog.register(ItemDefinition::new("Mystery Meat"));
        assert!(!item.id().is_empty());
        assert!(catalog.get(item.id()).is_some());
    }

    #[test]
    fn test_catalog_keeps_first_registration() {
        let mut catalog = ItemCatalog::new();
        let first = catalog.register(ItemDefinition::new("Torch").with_id("torch"));
        let second = catalog.register(ItemDefinition::new("Imposter Torch").with_id("torch"));
        assert_eq!(second.name(), first.name());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_stackable_items_share_a_slot() {
        let catalog = catalog();
        let draught = catalog.get("healing-draught").unwrap();
        let mut inventory = Inventory::new(3, Arc::clone(&catalog));

        assert!(inventory.add_to_first_available(&draught, 2));
        assert!(inventory.add_to_first_available(&draught, 3));

        assert_eq!(inventory.quantity_in_slot(0), 5);
        assert_eq!(inventory.count_empty_slots(), 2);
    }

    #[test]
    fn test_non_stackable_items_take_separate_slots() {
        let catalog = catalog();
        let sword = catalog.get("iron-sword").unwrap();
        let mut inventory = Inventory::new(2, Arc::clone(&catalog));

        assert!(inventory.add_to_first_available(&sword, 1));
        assert!(inventory.add_to_first_available(&sword, 1));
        assert!(!inventory.add_to_first_available(&sword, 1), "full");

        assert_eq!(inventory.quantity_in_slot(0), 1);
        assert_eq!(inventory.quantity_in_slot(1), 1);
    }

    #[test]
    fn test_add_to_slot_redirects_to_existing_stack() {
        let catalog = catalog();
        let draught = catalog.get("healing-draught").unwrap();
        let mut inventory = Inventory::new(4, Arc::clone(&catalog));

        assert!(inventory.add_to_slot(2, &draught, 1));
        assert!(inventory.add_to_slot(0, &draught, 4));

        assert_eq!(inventory.quantity_in_slot(2), 5);
        assert_eq!(inventory.quantity_in_slot(0), 0);
    }

    #[test]
    fn test_remove_empties_slot_at_zero() {
        let catalog = catalog();
        let draught = catalog.get("healing-draught").unwrap();
        let mut inventory = Inventory::new(2, Arc::clone(&catalog));

        inventory.add_to_first_available(&draught, 3);
        inventory.remove_from_slot(0, 2);
        assert_eq!(inventory.quantity_in_slot(0), 1);

        inventory.remove_from_slot(0, 5);
        assert!(inventory.item_in_slot(0).is_none());
    }

    #[test]
    fn test_has_space_for_all_counts_stacks_once() {
        let catalog = catalog();
        let draught = catalog.get("healing-draught").unwrap();
        let sword = catalog.get("iron-sword").unwrap();
        let mut inventory = Inventory::new(2, Arc::clone(&catalog));
        inventory.add_to_first_available(&sword, 1);

        // One empty slot left: two draught stacks collapse into one slot.
        assert!(inventory.has_space_for_all([draught.as_ref(), draught.as_ref()]));
        // A second sword cannot share.
        assert!(!inventory.has_space_for_all([sword.as_ref(), draught.as_ref(), draught.as_ref()]));
    }

    #[test]
    fn test_capture_restore_round_trip() {
        let catalog = catalog();
        let draught = catalog.get("healing-draught").unwrap();
        let sword = catalog.get("iron-sword").unwrap();

        let mut inventory = Inventory::new(3, Arc::clone(&catalog));
        inventory.add_to_first_available(&sword, 1);
        inventory.add_to_first_available(&draught, 4);
        let captured = inventory.capture_state();

        let mut restored = Inventory::new(3, Arc::clone(&catalog));
        let changes = std::sync::Arc::new(AtomicU32::new(0));
        {
            let changes = std::sync::Arc::clone(&changes);
            restored.on_changed(move || {
                changes.fetch_add(1, Ordering::SeqCst);
            });
        }
        restored.restore_state(&captured);

        assert_eq!(restored.item_in_slot(0).unwrap().id(), "iron-sword");
        assert_eq!(restored.quantity_in_slot(1), 4);
        assert!(restored.item_in_slot(2).is_none());
        assert_eq!(changes.load(Ordering::SeqCst), 1, "restore refires change");
    }

    #[test]
    fn test_restore_skips_unknown_items() {
        let catalog = catalog();
        let mut record = BTreeMap::new();
        record.insert("item".to_string(), SaveValue::from("deleted-item"));
        record.insert("quantity".to_string(), SaveValue::from(2u32));
        let state = SaveValue::List(vec![SaveValue::Map(record)]);

        let mut inventory = Inventory::new(2, catalog);
        inventory.restore_state(&state);
        assert!(inventory.item_in_slot(0).is_none());
    }

    #[test]
    fn test_has_item_condition() {
        let catalog = catalog();
        let sword = catalog.get("iron-sword").unwrap();
        let mut inventory = Inventory::new(2, Arc::clone(&catalog));
        inventory.add_to_first_available(&sword, 1);

        assert_eq!(
            inventory.evaluate("HasItem", &["iron-sword".to_string()]),
            Some(true)
        );
        assert_eq!(
            inventory.evaluate("HasItem", &["healing-draught".to_string()]),
            Some(false)
        );
        assert_eq!(inventory.evaluate("HasQuest", &["Intro".to_string()]), None);
        assert_eq!(inventory.evaluate("HasItem", &[]), None);
    }
}
