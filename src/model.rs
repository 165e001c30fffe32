use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One odometer reading. The last element of `Document::km` is the current odometer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdometerReading {
    pub km: i64,
    pub date: String,
}

/// One fuel purchase. `price` is the total paid, not the unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelPurchase {
    pub liters: f64,
    pub price: f64,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceEvent {
    pub desc: String,
    pub date: String,
    pub km: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// The whole persisted state: three append-only lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub km: Vec<OdometerReading>,
    #[serde(default)]
    pub fuel: Vec<FuelPurchase>,
    #[serde(default)]
    pub manu: Vec<MaintenanceEvent>,
}

impl Document {
    /// Km of the most recently appended reading, or 0 when nothing was recorded.
    pub fn last_km(&self) -> i64 {
        self.km.last().map(|r| r.km).unwrap_or(0)
    }

    pub fn len_of(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Km => self.km.len(),
            RecordKind::Fuel => self.fuel.len(),
            RecordKind::Manu => self.manu.len(),
        }
    }

    /// Removes the entry at a 1-based `index`. Returns `false` when the index is out of bounds.
    pub fn remove(&mut self, kind: RecordKind, index: usize) -> bool {
        if index == 0 || index > self.len_of(kind) {
            return false;
        }
        let at = index - 1;
        match kind {
            RecordKind::Km => {
                self.km.remove(at);
            }
            RecordKind::Fuel => {
                self.fuel.remove(at);
            }
            RecordKind::Manu => {
                self.manu.remove(at);
            }
        }
        true
    }

    pub fn clear(&mut self) {
        self.km.clear();
        self.fuel.clear();
        self.manu.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.km.is_empty() && self.fuel.is_empty() && self.manu.is_empty()
    }
}

/// Names one of the three lists, as typed in `/del <kind> <index>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Km,
    Fuel,
    Manu,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Km => "km",
            RecordKind::Fuel => "fuel",
            RecordKind::Manu => "manu",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "km" => Ok(RecordKind::Km),
            "fuel" => Ok(RecordKind::Fuel),
            "manu" => Ok(RecordKind::Manu),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(km: i64) -> OdometerReading {
        OdometerReading { km, date: "01/01/25 às 10:00".to_string() }
    }

    #[test]
    fn last_km_follows_insertion_order() {
        let mut doc = Document::default();
        assert_eq!(doc.last_km(), 0);
        for km in [15000, 9000, 12000] {
            doc.km.push(reading(km));
            assert_eq!(doc.last_km(), km);
        }
    }

    #[test]
    fn remove_uses_one_based_bounds() {
        let mut doc = Document::default();
        doc.km.push(reading(100));
        doc.km.push(reading(200));
        assert!(!doc.remove(RecordKind::Km, 0));
        assert!(!doc.remove(RecordKind::Km, 3));
        assert!(doc.remove(RecordKind::Km, 1));
        assert_eq!(doc.km, vec![reading(200)]);
        assert!(!doc.remove(RecordKind::Fuel, 1));
    }

    #[test]
    fn deserializes_legacy_document_without_prices() {
        let raw = r#"{"km":[{"km":15000,"date":"01/02/25 às 08:00"}],
            "manu":[{"desc":"Troca de óleo","date":"01/02/25 às 08:00","km":15000}]}"#;
        let doc: Document = serde_json::from_str(raw).unwrap();
        assert!(doc.fuel.is_empty());
        assert_eq!(doc.manu[0].price, None);

        let back = serde_json::to_value(&doc).unwrap();
        assert!(back["manu"][0].get("price").is_none());
        assert_eq!(back["fuel"], serde_json::json!([]));
    }

    #[test]
    fn record_kind_parses_only_known_names() {
        assert_eq!("km".parse::<RecordKind>(), Ok(RecordKind::Km));
        assert_eq!("manu".parse::<RecordKind>(), Ok(RecordKind::Manu));
        assert!("KM".parse::<RecordKind>().is_err());
        assert!("oil".parse::<RecordKind>().is_err());
    }
}
