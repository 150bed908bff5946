use std::fmt::Display;

use log::{debug, error, warn};
use pasar_common::Rupiah;
use serde::{Deserialize, Serialize};

use crate::{
    cart::groups::{group_by_vendor, FeePolicy, VendorGroup},
    order_types::DeliveryMethod,
    traits::KeyValueStore,
};

/// Storage key for the cart snapshot.
pub const CART_STORAGE_KEY: &str = "pasarkopi.cart";

//--------------------------------------       LineId        ---------------------------------------------------------

/// Identifier of a cart line, generated when the line is first inserted and stable for its whole life.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineId(pub String);

impl LineId {
    pub fn random() -> Self {
        Self(format!("line-{:012x}", rand::random::<u64>() & 0xffff_ffff_ffff))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for LineId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for LineId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for LineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------     Cart lines      ---------------------------------------------------------

/// Name and price of a menu item as they were when the item entered the cart. Later menu edits do not reprice
/// lines that are already in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemSnapshot {
    pub name: String,
    pub price: Rupiah,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: LineId,
    pub menu_item_id: String,
    pub item: MenuItemSnapshot,
    pub vendor_id: String,
    pub vendor_name: String,
    pub quantity: u32,
    pub notes: Option<String>,
}

impl CartLine {
    pub fn line_total(&self) -> Rupiah {
        self.item.price.times(self.quantity)
    }
}

/// A menu item about to be added to the cart.
#[derive(Debug, Clone)]
pub struct NewLine {
    pub menu_item_id: String,
    pub item: MenuItemSnapshot,
    pub vendor_id: String,
    pub vendor_name: String,
}

impl NewLine {
    pub fn new(
        menu_item_id: impl Into<String>,
        name: impl Into<String>,
        price: Rupiah,
        vendor_id: impl Into<String>,
        vendor_name: impl Into<String>,
    ) -> Self {
        Self {
            menu_item_id: menu_item_id.into(),
            item: MenuItemSnapshot { name: name.into(), price, image_url: None },
            vendor_id: vendor_id.into(),
            vendor_name: vendor_name.into(),
        }
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.item.image_url = Some(url.into());
        self
    }
}

/// The persisted cart shape. Lines keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub lines: Vec<CartLine>,
}

//--------------------------------------      CartStore      ---------------------------------------------------------

/// The cart, bound to a durable [`KeyValueStore`].
///
/// Every mutation rewrites the snapshot under [`CART_STORAGE_KEY`] before returning, so a reload (or a second
/// store over the same backing file) always sees the latest state. Persistence failures are logged and swallowed;
/// a broken disk must not take the in-memory cart down with it.
pub struct CartStore<S> {
    storage: S,
    cart: Cart,
}

impl<S: KeyValueStore> CartStore<S> {
    /// Loads the cart from storage. A missing, malformed or foreign-shaped snapshot is an empty cart, never an
    /// error.
    pub fn new(storage: S) -> Self {
        let cart = match storage.get(CART_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Cart>(&raw) {
                Ok(cart) => cart,
                Err(e) => {
                    warn!("🛒️ Ignoring malformed cart snapshot and starting empty. {e}");
                    Cart::default()
                },
            },
            Ok(None) => Cart::default(),
            Err(e) => {
                error!("🛒️ Could not read the cart snapshot, starting empty. {e}");
                Cart::default()
            },
        };
        Self { storage, cart }
    }

    /// Adds an item. If a line for the same `(menu_item_id, vendor_id)` already exists, quantities merge into
    /// that line and its notes are overwritten only when `notes` is non-empty. Returns the id of the affected
    /// line.
    pub fn add(&mut self, line: NewLine, quantity: u32, notes: Option<String>) -> LineId {
        let quantity = quantity.max(1);
        if let Some(existing) = self
            .cart
            .lines
            .iter_mut()
            .find(|l| l.menu_item_id == line.menu_item_id && l.vendor_id == line.vendor_id)
        {
            existing.quantity = existing.quantity.saturating_add(quantity);
            if let Some(n) = notes {
                if !n.trim().is_empty() {
                    existing.notes = Some(n);
                }
            }
            let id = existing.id.clone();
            debug!("🛒️ Merged {quantity} more of {} into line {id}", line.item.name);
            self.persist();
            return id;
        }
        let id = LineId::random();
        debug!("🛒️ Added {quantity}×{} from {} as line {id}", line.item.name, line.vendor_name);
        self.cart.lines.push(CartLine {
            id: id.clone(),
            menu_item_id: line.menu_item_id,
            item: line.item,
            vendor_id: line.vendor_id,
            vendor_name: line.vendor_name,
            quantity,
            notes: notes.filter(|n| !n.trim().is_empty()),
        });
        self.persist();
        id
    }

    /// Removes a line. Unknown ids are a no-op and return `false`.
    pub fn remove(&mut self, id: &LineId) -> bool {
        let before = self.cart.lines.len();
        self.cart.lines.retain(|l| &l.id != id);
        if self.cart.lines.len() == before {
            return false;
        }
        debug!("🛒️ Removed line {id}");
        self.persist();
        true
    }

    /// Sets the quantity of a line. A quantity of zero or less removes the line.
    pub fn set_quantity(&mut self, id: &LineId, quantity: i64) -> bool {
        if quantity <= 0 {
            return self.remove(id);
        }
        match self.cart.lines.iter_mut().find(|l| &l.id == id) {
            Some(line) => {
                line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
                self.persist();
                true
            },
            None => false,
        }
    }

    /// Replaces the notes on a line. `None` clears them.
    pub fn set_notes(&mut self, id: &LineId, notes: Option<String>) -> bool {
        match self.cart.lines.iter_mut().find(|l| &l.id == id) {
            Some(line) => {
                line.notes = notes.filter(|n| !n.trim().is_empty());
                self.persist();
                true
            },
            None => false,
        }
    }

    pub fn clear(&mut self) {
        if !self.cart.lines.is_empty() {
            debug!("🛒️ Cleared {} line(s) from the cart", self.cart.lines.len());
        }
        self.cart.lines.clear();
        self.persist();
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.cart.lines
    }

    pub fn find_line(&self, id: &LineId) -> Option<&CartLine> {
        self.cart.lines.iter().find(|l| &l.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.cart.lines.is_empty()
    }

    /// Total number of items (the sum of quantities, not the number of lines).
    pub fn total_items(&self) -> u32 {
        self.cart.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn total_price(&self) -> Rupiah {
        self.cart.lines.iter().map(CartLine::line_total).sum()
    }

    /// Projects the cart into per-vendor groups. See [`group_by_vendor`].
    pub fn group_by_vendor(&self, fees: &FeePolicy, method: DeliveryMethod) -> Vec<VendorGroup> {
        group_by_vendor(&self.cart.lines, fees, method)
    }

    fn persist(&mut self) {
        match serde_json::to_string(&self.cart) {
            Ok(raw) => {
                if let Err(e) = self.storage.put(CART_STORAGE_KEY, &raw) {
                    error!("🛒️ Failed to persist the cart snapshot. {e}");
                }
            },
            Err(e) => error!("🛒️ Failed to encode the cart snapshot. {e}"),
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::storage::MemoryStore;

    fn kopi_susu() -> NewLine {
        NewLine::new("item-kopi-susu", "Es Kopi Susu", Rupiah::new(12_000), "vendor-aroma", "Kopi Aroma")
    }

    fn cold_brew() -> NewLine {
        NewLine::new("item-cold-brew", "Cold Brew", Rupiah::new(22_000), "vendor-titik", "Titik Koma")
    }

    #[test]
    fn repeated_adds_merge_into_one_line() {
        let mut cart = CartStore::new(MemoryStore::new());
        let a = cart.add(kopi_susu(), 1, None);
        let b = cart.add(kopi_susu(), 2, None);
        assert_eq!(a, b);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.total_items(), 3);
    }

    #[test]
    fn a_merge_near_the_quantity_ceiling_saturates() {
        let mut cart = CartStore::new(MemoryStore::new());
        let id = cart.add(kopi_susu(), u32::MAX - 1, None);
        cart.add(kopi_susu(), 5, None);
        assert_eq!(cart.find_line(&id).unwrap().quantity, u32::MAX);
    }

    #[test]
    fn same_item_from_another_vendor_is_a_separate_line() {
        let mut cart = CartStore::new(MemoryStore::new());
        cart.add(kopi_susu(), 1, None);
        let franchised = NewLine::new("item-kopi-susu", "Es Kopi Susu", Rupiah::new(13_000), "vendor-titik", "Titik Koma");
        cart.add(franchised, 1, None);
        assert_eq!(cart.lines().len(), 2);
    }

    #[test]
    fn merge_keeps_notes_unless_new_notes_are_non_empty() {
        let mut cart = CartStore::new(MemoryStore::new());
        let id = cart.add(kopi_susu(), 1, Some("less sugar".into()));
        cart.add(kopi_susu(), 1, None);
        assert_eq!(cart.find_line(&id).unwrap().notes.as_deref(), Some("less sugar"));
        cart.add(kopi_susu(), 1, Some("   ".into()));
        assert_eq!(cart.find_line(&id).unwrap().notes.as_deref(), Some("less sugar"));
        cart.add(kopi_susu(), 1, Some("no ice".into()));
        assert_eq!(cart.find_line(&id).unwrap().notes.as_deref(), Some("no ice"));
    }

    #[test]
    fn zero_quantity_removes_the_line() {
        let mut cart = CartStore::new(MemoryStore::new());
        let id = cart.add(kopi_susu(), 2, None);
        assert!(cart.set_quantity(&id, 0));
        assert!(cart.is_empty());

        let id = cart.add(kopi_susu(), 2, None);
        assert!(cart.set_quantity(&id, -3));
        assert!(cart.is_empty());
    }

    #[test]
    fn set_quantity_updates_totals() {
        let mut cart = CartStore::new(MemoryStore::new());
        let id = cart.add(kopi_susu(), 1, None);
        assert!(cart.set_quantity(&id, 4));
        assert_eq!(cart.total_items(), 4);
        assert_eq!(cart.total_price(), Rupiah::new(48_000));
        assert!(!cart.set_quantity(&LineId::from("line-missing"), 2));
    }

    #[test]
    fn remove_unknown_line_is_a_noop() {
        let mut cart = CartStore::new(MemoryStore::new());
        cart.add(kopi_susu(), 1, None);
        assert!(!cart.remove(&LineId::from("line-missing")));
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn set_notes_replaces_and_clears() {
        let mut cart = CartStore::new(MemoryStore::new());
        let id = cart.add(kopi_susu(), 1, Some("less sugar".into()));
        assert!(cart.set_notes(&id, Some("extra shot".into())));
        assert_eq!(cart.find_line(&id).unwrap().notes.as_deref(), Some("extra shot"));
        assert!(cart.set_notes(&id, None));
        assert_eq!(cart.find_line(&id).unwrap().notes, None);
    }

    #[test]
    fn every_mutation_is_persisted_synchronously() {
        let storage = Arc::new(Mutex::new(MemoryStore::new()));
        let mut cart = CartStore::new(Arc::clone(&storage));
        let id = cart.add(kopi_susu(), 2, None);

        let snapshot = |storage: &Arc<Mutex<MemoryStore>>| -> Cart {
            let raw = storage.get(CART_STORAGE_KEY).unwrap().unwrap();
            serde_json::from_str(&raw).unwrap()
        };
        assert_eq!(snapshot(&storage).lines[0].quantity, 2);

        cart.set_quantity(&id, 5);
        assert_eq!(snapshot(&storage).lines[0].quantity, 5);

        cart.clear();
        assert!(snapshot(&storage).lines.is_empty());
    }

    #[test]
    fn reload_restores_the_persisted_cart() {
        let storage = Arc::new(Mutex::new(MemoryStore::new()));
        {
            let mut cart = CartStore::new(Arc::clone(&storage));
            cart.add(kopi_susu(), 2, Some("less sugar".into()));
            cart.add(cold_brew(), 1, None);
        }
        let reloaded = CartStore::new(storage);
        assert_eq!(reloaded.lines().len(), 2);
        assert_eq!(reloaded.total_items(), 3);
        assert_eq!(reloaded.lines()[0].notes.as_deref(), Some("less sugar"));
    }

    #[test]
    fn malformed_snapshot_falls_back_to_an_empty_cart() {
        let mut storage = MemoryStore::new();
        storage.put(CART_STORAGE_KEY, "{{ not json").unwrap();
        let cart = CartStore::new(storage);
        assert!(cart.is_empty());

        let mut storage = MemoryStore::new();
        storage.put(CART_STORAGE_KEY, r#"{"version": 2, "entries": []}"#).unwrap();
        let cart = CartStore::new(storage);
        assert!(cart.is_empty());
    }
}
