use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single marketplace sale as exported by the event collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub timestamp: DateTime<Utc>,
    pub event: String,
    pub project_id: String,
    pub props: TransactionProps,
    pub nums: TransactionNums,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionProps {
    pub currency_symbol: String,
    #[serde(default)]
    pub chain_id: String,
    #[serde(default)]
    pub collection_address: Option<String>,
    #[serde(default)]
    pub currency_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionNums {
    /// Amount in base units (18-decimal fixed point), kept as text
    pub currency_value_decimal: String,
}

impl Transaction {
    pub fn ticker(&self) -> &str {
        &self.props.currency_symbol
    }

    pub fn raw_value(&self) -> &str {
        &self.nums.currency_value_decimal
    }
}
