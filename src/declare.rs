use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// 無資料時在 JSON 中使用的字串
pub const NOT_AVAILABLE: &str = "N/A";

/// Company identifier used by the quote site to address a company page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompanyId(pub i64);

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A quote figure that is either a number or explicitly "not available".
///
/// Non-trading instruments are listed with blank cells; that is reported as
/// `NotAvailable` rather than as an error or a zero. On the wire the variant
/// becomes the string `"N/A"`, a value stays a JSON number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<T> {
    Value(T),
    NotAvailable,
}

impl<T: fmt::Display> fmt::Display for FieldValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Value(v) => write!(f, "{}", v),
            FieldValue::NotAvailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

impl<T: Serialize> Serialize for FieldValue<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Value(v) => v.serialize(serializer),
            FieldValue::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldValue<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw<T> {
            Value(T),
            Text(String),
        }

        match Raw::<T>::deserialize(deserializer)? {
            Raw::Value(v) => Ok(FieldValue::Value(v)),
            Raw::Text(s) if s == NOT_AVAILABLE => Ok(FieldValue::NotAvailable),
            Raw::Text(s) => Err(de::Error::invalid_value(
                de::Unexpected::Str(&s),
                &"a number or \"N/A\"",
            )),
        }
    }
}

pub type Price = FieldValue<f64>;
pub type Volume = FieldValue<i64>;

/// End-of-day quote of one symbol, as published to the broker.
///
/// Field order here is the field order of the published JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub stock: String,
    pub close: Price,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub volume: Volume,
}

impl StockRecord {
    /// JSON payload sent to the broker.
    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

impl fmt::Display for StockRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} close={} open={} high={} low={} volume={}",
            self.stock, self.close, self.open, self.high, self.low, self.volume
        )
    }
}
