// FOCUS column vocabulary and header handling
use crate::error::{FocusError, Result};
use csv::StringRecord;
use std::collections::HashMap;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const PROVIDERS: [&str; 4] = ["AWS", "Google Cloud", "Oracle", "Microsoft"];

pub const BILLING_PERIOD_START: &str = "BillingPeriodStart";
pub const BILLING_PERIOD_END: &str = "BillingPeriodEnd";
pub const PROVIDER_NAME: &str = "ProviderName";

/// Columns a complete FOCUS export is expected to carry.
pub const FOCUS_COLUMNS: [&str; 44] = [
    "AvailabilityZone", "BilledCost", "BillingAccountId", "BillingAccountName", "BillingCurrency",
    "BillingPeriodEnd", "BillingPeriodStart", "ChargeCategory", "ChargeClass", "ChargeDescription",
    "ChargeFrequency", "ChargePeriodEnd", "ChargePeriodStart", "CommitmentDiscountCategory",
    "CommitmentDiscountId", "CommitmentDiscountName", "CommitmentDiscountStatus",
    "CommitmentDiscountType", "ConsumedQuantity", "ConsumedUnit", "ContractedCost",
    "ContractedUnitPrice", "EffectiveCost", "InvoiceIssuerName", "ListCost", "ListUnitPrice",
    "PricingCategory", "PricingQuantity", "PricingUnit", "ProviderName", "PublisherName", "RegionId",
    "RegionName", "ResourceId", "ResourceName", "ResourceType", "ServiceCategory", "Id", "ServiceName",
    "SkuId", "SkuPriceId", "SubAccountId", "SubAccountName", "Tags",
];

/// Header of a file plus a lookup from column name to position.
#[derive(Debug, Clone)]
pub struct Schema {
    headers: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Schema {
    pub fn new(headers: &StringRecord) -> Self {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let positions = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();

        Schema { headers, positions }
    }

    /// Appends any of `columns` the header does not already have.
    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        for c in columns {
            if !self.positions.contains_key(*c) {
                self.positions.insert(c.to_string(), self.headers.len());
                self.headers.push(c.to_string());
            }
        }
        self
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    pub fn require(&self, column: &str) -> Result<usize> {
        self.position(column)
            .ok_or_else(|| FocusError::MissingColumn(column.to_string()))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn missing<'a>(&self, expected: &[&'a str]) -> Vec<&'a str> {
        expected
            .iter()
            .filter(|c| !self.positions.contains_key(**c))
            .copied()
            .collect()
    }

    /// Copies a template record into an owned row padded to the schema width.
    pub fn row_from(&self, record: &StringRecord) -> Row {
        let mut fields: Vec<String> = record.iter().map(|f| f.to_string()).collect();
        fields.resize(self.width(), String::new());
        Row(fields)
    }
}

/// A mutable output row laid out according to a [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct Row(pub Vec<String>);

impl Row {
    /// Sets a column; columns absent from the schema are ignored.
    pub fn set(&mut self, schema: &Schema, column: &str, value: impl Into<String>) {
        if let Some(i) = schema.position(column) {
            self.0[i] = value.into();
        }
    }

    pub fn get<'a>(&'a self, schema: &Schema, column: &str) -> Option<&'a str> {
        schema.position(column).map(|i| self.0[i].as_str())
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }
}
