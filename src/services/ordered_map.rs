//! Deserializes a JSON object into `(key, value)` pairs in document order.
//!
//! Use with `#[serde(default, deserialize_with = "ordered_map::deserialize")]`.
//! A JSON `null` yields an empty list.

use std::fmt;
use std::marker::PhantomData;

use serde::Deserialize;
use serde::de::{Deserializer, MapAccess, Visitor};

pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    deserializer.deserialize_any(OrderedMapVisitor(PhantomData))
}

struct OrderedMapVisitor<T>(PhantomData<T>);

impl<'de, T> Visitor<'de> for OrderedMapVisitor<T>
where
    T: Deserialize<'de>,
{
    type Value = Vec<(String, T)>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(Vec::new())
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(entry) = map.next_entry::<String, T>()? {
            entries.push(entry);
        }
        Ok(entries)
    }
}
