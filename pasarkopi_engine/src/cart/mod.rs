//! The client-side cart.
//!
//! [`CartStore`] owns the lines and the durable snapshot; [`groups`] turns the flat line list into per-vendor
//! groups with computed fees. Grouping is a pure projection and is recomputed on every read, so there is no per
//! vendor state to keep in sync with the lines.

pub mod groups;
mod store;

pub use groups::{group_by_vendor, FeePolicy, VendorGroup, DEFAULT_DELIVERY_FEE, DEFAULT_SERVICE_FEE_BPS};
pub use store::{Cart, CartLine, CartStore, LineId, MenuItemSnapshot, NewLine, CART_STORAGE_KEY};
