//! Product records and the invoice assembled from them.

use serde::{Deserialize, Serialize};

/// Numeric product identifier used by the product store.
pub type ProductId = i64;

/// A product as held by the product store.
///
/// Immutable from the invoice side; it appears verbatim as a line item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub amount: i32,
}

impl ProductRecord {
    pub fn new(id: ProductId, name: impl Into<String>, amount: i32) -> Self {
        ProductRecord {
            id,
            name: name.into(),
            amount,
        }
    }
}

/// Line items in request order plus their total.
///
/// Serializes to the raw invoice body:
///
/// ```
/// use invoice_kit::entity::{InvoiceResult, ProductRecord};
///
/// let invoice = InvoiceResult::from_entities(vec![ProductRecord::new(1, "ItemA", 7)]);
/// let body = serde_json::to_value(&invoice).unwrap();
/// assert_eq!(body["amountSum"], 7);
/// assert_eq!(body["productsList"][0]["name"], "ItemA");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceResult {
    #[serde(rename = "productsList")]
    pub entities: Vec<ProductRecord>,
    #[serde(rename = "amountSum")]
    pub total_sum: i32,
}

impl InvoiceResult {
    /// Build an invoice, summing amounts with 32-bit wrapping arithmetic.
    pub fn from_entities(entities: Vec<ProductRecord>) -> Self {
        let total_sum = entities
            .iter()
            .fold(0i32, |sum, entity| sum.wrapping_add(entity.amount));
        InvoiceResult {
            entities,
            total_sum,
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
