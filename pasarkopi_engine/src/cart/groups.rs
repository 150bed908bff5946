use pasar_common::Rupiah;
use serde::Serialize;

use crate::{cart::store::CartLine, order_types::DeliveryMethod};

/// Flat delivery fee charged per vendor group when the order is delivered.
pub const DEFAULT_DELIVERY_FEE: Rupiah = Rupiah::new(5_000);
/// Service fee in basis points of the group subtotal. 100 bps = 1%.
pub const DEFAULT_SERVICE_FEE_BPS: u32 = 100;

//--------------------------------------      FeePolicy      ---------------------------------------------------------

/// Per-group fee rules. All arithmetic is integer arithmetic so repeated aggregation can never drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    pub delivery_fee: Rupiah,
    pub service_fee_bps: u32,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self { delivery_fee: DEFAULT_DELIVERY_FEE, service_fee_bps: DEFAULT_SERVICE_FEE_BPS }
    }
}

impl FeePolicy {
    /// Pickups carry no delivery fee.
    pub fn delivery_fee_for(&self, method: DeliveryMethod) -> Rupiah {
        match method {
            DeliveryMethod::Delivery => self.delivery_fee,
            DeliveryMethod::Pickup => Rupiah::default(),
        }
    }

    /// `subtotal × bps / 10_000`, rounded half up.
    pub fn service_fee_for(&self, subtotal: Rupiah) -> Rupiah {
        let bps = i64::from(self.service_fee_bps);
        Rupiah::new((subtotal.value() * bps + 5_000) / 10_000)
    }
}

//--------------------------------------     VendorGroup     ---------------------------------------------------------

/// One vendor's slice of the cart, with its own totals.
///
/// Groups are a pure projection of the cart lines. They are recomputed on demand and never persisted, so there is
/// no way for a stale group to disagree with the cart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorGroup {
    pub vendor_id: String,
    pub vendor_name: String,
    pub lines: Vec<CartLine>,
    pub subtotal: Rupiah,
    pub delivery_fee: Rupiah,
    pub service_fee: Rupiah,
    pub total: Rupiah,
}

/// Partitions cart lines by vendor.
///
/// Vendors appear in the order they first appear in the cart and lines keep their insertion order inside each
/// group. Nothing is sorted, so the projection is stable across calls.
pub fn group_by_vendor(lines: &[CartLine], fees: &FeePolicy, method: DeliveryMethod) -> Vec<VendorGroup> {
    let mut groups: Vec<VendorGroup> = Vec::new();
    for line in lines {
        match groups.iter_mut().find(|g| g.vendor_id == line.vendor_id) {
            Some(group) => group.lines.push(line.clone()),
            None => groups.push(VendorGroup {
                vendor_id: line.vendor_id.clone(),
                vendor_name: line.vendor_name.clone(),
                lines: vec![line.clone()],
                subtotal: Rupiah::default(),
                delivery_fee: Rupiah::default(),
                service_fee: Rupiah::default(),
                total: Rupiah::default(),
            }),
        }
    }
    for group in &mut groups {
        group.subtotal = group.lines.iter().map(CartLine::line_total).sum();
        group.delivery_fee = fees.delivery_fee_for(method);
        group.service_fee = fees.service_fee_for(group.subtotal);
        group.total = group.subtotal + group.delivery_fee + group.service_fee;
    }
    groups
}
