//! Valuation response reshaping
//!
//! The service nests trims under `data.market_value.market_value_data`, each
//! with a list of condition rows. The sink expects one object per trim, keyed
//! `item0`, `item1`, ... in service order, with conditions turned into a map.
//! Both levels serialize in insertion order, independent of serde_json's map
//! implementation, since the sink's schema depends on the exact key layout.

use crate::error::{PipelineError, PipelineResult};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct ValuationEnvelope {
    data: ValuationData,
}

#[derive(Debug, Deserialize)]
struct ValuationData {
    market_value: MarketValueBlock,
}

#[derive(Debug, Deserialize)]
struct MarketValueBlock {
    market_value_data: Vec<TrimEntry>,
}

#[derive(Debug, Deserialize)]
struct TrimEntry {
    #[serde(default)]
    trim: Value,
    #[serde(rename = "market value", default)]
    market_value: Vec<ConditionEntry>,
}

#[derive(Debug, Deserialize)]
struct ConditionEntry {
    #[serde(rename = "Condition")]
    condition: String,
    #[serde(rename = "Trade-In", default)]
    trade_in: Value,
    #[serde(rename = "Private Party", default)]
    private_party: Value,
    #[serde(rename = "Dealer Retail", default)]
    dealer_retail: Value,
}

/// Amounts for one condition. Values are passed through as the service sent them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueTriple {
    #[serde(rename = "Trade_In")]
    pub trade_in: Value,
    #[serde(rename = "Private_Party")]
    pub private_party: Value,
    #[serde(rename = "Dealer_Retail")]
    pub dealer_retail: Value,
}

/// Condition label → amounts, in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionValues(Vec<(String, ValueTriple)>);

impl ConditionValues {
    /// Insert or replace. A repeated label keeps its first position and takes the new values.
    pub fn insert(&mut self, condition: String, values: ValueTriple) {
        match self.0.iter_mut().find(|(c, _)| *c == condition) {
            Some(slot) => slot.1 = values,
            None => self.0.push((condition, values)),
        }
    }

    pub fn get(&self, condition: &str) -> Option<&ValueTriple> {
        self.0.iter().find(|(c, _)| c == condition).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ConditionValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (condition, values) in &self.0 {
            map.serialize_entry(condition, values)?;
        }
        map.end()
    }
}

/// Valuation for one trim
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrimValuation {
    pub trim: Value,
    pub market_value: ConditionValues,
}

/// Trims in service order, serialized as `{ "item0": .., "item1": .. }`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedValuations(Vec<TrimValuation>);

impl IndexedValuations {
    pub fn trims(&self) -> &[TrimValuation] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Key for the trim at position `idx`: `item0`, `item1`, ...
pub fn item_key(idx: usize) -> String {
    format!("item{}", idx)
}

impl Serialize for IndexedValuations {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (idx, trim) in self.0.iter().enumerate() {
            map.serialize_entry(&item_key(idx), trim)?;
        }
        map.end()
    }
}

/// Flatten a raw valuation response into indexed trims
pub fn reshape(body: &Value) -> PipelineResult<IndexedValuations> {
    let envelope = ValuationEnvelope::deserialize(body)
        .map_err(|e| PipelineError::MalformedValuation(e.to_string()))?;

    let trims = envelope
        .data
        .market_value
        .market_value_data
        .into_iter()
        .map(|entry| {
            let mut market_value = ConditionValues::default();
            for row in entry.market_value {
                market_value.insert(
                    row.condition,
                    ValueTriple {
                        trade_in: row.trade_in,
                        private_party: row.private_party,
                        dealer_retail: row.dealer_retail,
                    },
                );
            }
            TrimValuation {
                trim: entry.trim,
                market_value,
            }
        })
        .collect();

    Ok(IndexedValuations(trims))
}
