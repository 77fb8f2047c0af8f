//! Records and restartable record sources.
//!
//! A [`Record`] is one parsed genomic event (a variant call, a breakpoint
//! prediction) with named scalar fields. The build is two-pass, so a
//! [`RecordSource`] must be able to hand out any number of independent
//! streams over the same records: the scan pass consumes one stream fully,
//! the write pass opens a fresh one.

use crate::error::{Result, TableError};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A scalar field value.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    /// Enumerated text such as a strand (`+`/`-`) or a filter flag.
    Enum(String),
    /// Multi-valued field, e.g. the alternate alleles of a variant call.
    Multi(Vec<Value>),
    /// No value, e.g. a VCF `QUAL` of `.`. Stored as NaN in float columns.
    Missing,
}

impl Value {
    /// Canonical text form of a value.
    ///
    /// Every place that measures or stores a value as text goes through this
    /// function, so widths measured before a merge always match what the merge
    /// writes. Floats use the shortest round-trip form and always carry a
    /// fractional part (`1.0`, `0.5`, `1e-7`).
    #[must_use]
    pub fn canonical_string(&self) -> String {
        match self {
            Value::Int(v) => int_text(*v),
            Value::Float(v) => float_text(*v),
            Value::Text(s) | Value::Enum(s) => s.clone(),
            Value::Multi(vs) => vs
                .iter()
                .map(Value::canonical_string)
                .collect::<Vec<_>>()
                .join(","),
            Value::Missing => String::new(),
        }
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view of the value, if it has one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Number of elements this value expands into (1 for scalars).
    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            Value::Multi(vs) => vs.len(),
            _ => 1,
        }
    }

    /// Element `i` of an expanded value; scalars repeat for every `i`.
    #[must_use]
    pub fn element(&self, i: usize) -> Option<&Value> {
        match self {
            Value::Multi(vs) => vs.get(i),
            v => Some(v),
        }
    }
}

pub(crate) fn int_text(v: i64) -> String {
    v.to_string()
}

pub(crate) fn float_text(v: f64) -> String {
    format!("{v:?}")
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(vs: Vec<T>) -> Self {
        Value::Multi(vs.into_iter().map(Into::into).collect())
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number, a string, null, or an array of those")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Missing)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Missing)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Value, E> {
        i64::try_from(v)
            .map(Value::Int)
            .map_err(|_| E::custom(format!("integer {v} does not fit in i64")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Value, E> {
        Ok(Value::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Value, E> {
        Ok(Value::Text(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Value, A::Error> {
        let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(v) = seq.next_element::<Value>()? {
            out.push(v);
        }
        Ok(Value::Multi(out))
    }
}

/// An immutable, ordered mapping from field name to [`Value`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion. A repeated name replaces the earlier value
    /// in place, keeping its position.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Field names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of named fields")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Record, A::Error> {
                let mut record = Record::new();
                while let Some((k, v)) = map.next_entry::<String, Value>()? {
                    record.set(k, v);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// A stream of records from one [`RecordSource::open_stream`] call.
pub type RecordStream<'a> = Box<dyn Iterator<Item = Result<Record>> + Send + 'a>;

/// A restartable producer of records.
///
/// Every call to [`open_stream`](RecordSource::open_stream) must yield a new,
/// independent stream over logically identical records. The scan and write
/// passes each open their own stream; a source that cannot honour this
/// (a pipe, a socket) has to be materialized first, e.g. into a [`VecSource`].
pub trait RecordSource: Send + Sync {
    /// Open a fresh stream positioned at the first record.
    ///
    /// # Errors
    /// Returns an error if the underlying records cannot be reached.
    fn open_stream(&self) -> Result<RecordStream<'_>>;
}

impl<S: RecordSource + ?Sized> RecordSource for &S {
    fn open_stream(&self) -> Result<RecordStream<'_>> {
        (**self).open_stream()
    }
}

impl<S: RecordSource + ?Sized> RecordSource for Arc<S> {
    fn open_stream(&self) -> Result<RecordStream<'_>> {
        (**self).open_stream()
    }
}

/// In-memory record source. Each stream walks the same shared vector.
#[derive(Clone, Debug, Default)]
pub struct VecSource {
    records: Arc<Vec<Record>>,
}

impl VecSource {
    #[must_use]
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }

    /// Drain another source into memory so it can be re-read.
    ///
    /// # Errors
    /// Propagates the first error of the drained stream.
    pub fn materialize(source: &dyn RecordSource) -> Result<Self> {
        let records = source.open_stream()?.collect::<Result<Vec<_>>>()?;
        Ok(Self::new(records))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSource for VecSource {
    fn open_stream(&self) -> Result<RecordStream<'_>> {
        Ok(Box::new(self.records.iter().cloned().map(Ok)))
    }
}

/// Look up a required field, failing with a schema error naming the table.
pub(crate) fn require<'r>(record: &'r Record, table: &str, field: &str) -> Result<&'r Value> {
    record
        .get(field)
        .ok_or_else(|| TableError::schema(table, format!("record has no field `{field}`")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_forms() {
        assert_eq!(Value::Int(42).canonical_string(), "42");
        assert_eq!(Value::Float(1.0).canonical_string(), "1.0");
        assert_eq!(Value::Float(0.5).canonical_string(), "0.5");
        assert_eq!(Value::Enum("+".into()).canonical_string(), "+");
        assert_eq!(Value::from(vec!["A", "T"]).canonical_string(), "A,T");
    }

    #[test]
    fn json_object_keeps_field_order() {
        let r: Record =
            serde_json::from_str(r#"{"chrom":"1","coord":10,"alt":["A","G"],"qual":3.5}"#)
                .unwrap();
        assert_eq!(r.names().collect::<Vec<_>>(), ["chrom", "coord", "alt", "qual"]);
        assert_eq!(r.get("coord"), Some(&Value::Int(10)));
        assert_eq!(r.get("alt").map(Value::arity), Some(2));
        assert_eq!(r.get("qual"), Some(&Value::Float(3.5)));
    }

    #[test]
    fn null_is_a_missing_value() {
        let r: Record = serde_json::from_str(r#"{"qual":null,"alt":["A",null]}"#).unwrap();
        assert_eq!(r.get("qual"), Some(&Value::Missing));
        assert_eq!(r.get("alt"), Some(&Value::Multi(vec!["A".into(), Value::Missing])));
        assert_eq!(serde_json::to_string(&r).unwrap(), r#"{"qual":null,"alt":["A",null]}"#);
    }

    #[test]
    fn set_replaces_in_place() {
        let r = Record::new().with("a", 1i64).with("b", 2i64).with("a", 3i64);
        assert_eq!(r.names().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(r.get("a"), Some(&Value::Int(3)));
    }

    #[test]
    fn vec_source_streams_are_independent() {
        let src = VecSource::new(vec![Record::new().with("x", 1i64)]);
        let a: Vec<_> = src.open_stream().unwrap().collect();
        let b: Vec<_> = src.open_stream().unwrap().collect();
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }
}
