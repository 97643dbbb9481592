use std::{fmt, marker::PhantomData, str::FromStr};

use serde::{
    Deserialize, Deserializer, Serialize,
    de::{self, Visitor},
};

/// A value that is either one of a fixed set of well-known names or a free-form custom one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnownOrCustom<A, B> {
    Known(A),
    Custom(B),
}

impl<A, B> KnownOrCustom<A, B>
where
    A: FromStr,
    B: From<String>,
{
    /// Anything that doesn't parse as a known value is kept as custom.
    pub fn from_name(s: &str) -> Self {
        let trimmed = s.trim();

        match A::from_str(trimmed) {
            Ok(known) => KnownOrCustom::Known(known),
            Err(_) => KnownOrCustom::Custom(B::from(trimmed.to_string())),
        }
    }
}

impl<A, B> FromStr for KnownOrCustom<A, B>
where
    A: FromStr,
    B: From<String>,
{
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

struct KnownOrCustomVisitor<A, B>(PhantomData<(A, B)>);

impl<'de, A, B> Visitor<'de> for KnownOrCustomVisitor<A, B>
where
    A: FromStr,
    B: From<String>,
{
    type Value = KnownOrCustom<A, B>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a well-known abbreviation or a custom name")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(KnownOrCustom::from_name(v))
    }
}

impl<'de, A, B> Deserialize<'de> for KnownOrCustom<A, B>
where
    A: FromStr,
    B: From<String>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(KnownOrCustomVisitor(PhantomData))
    }
}

impl<A, B> Serialize for KnownOrCustom<A, B>
where
    A: Serialize,
    B: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            KnownOrCustom::Known(a) => a.serialize(serializer),
            KnownOrCustom::Custom(b) => b.serialize(serializer),
        }
    }
}

/// Any scalar (string, bool, number) read back as its string form.
///
/// Config files tend to say `auditable: true` or `asset_duration: 60` where the
/// tool really wants the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ScalarString(pub String);

struct ScalarStringVisitor;

impl Visitor<'_> for ScalarStringVisitor {
    type Value = ScalarString;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string, number or boolean")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(ScalarString(v.to_string()))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(ScalarString(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(ScalarString(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(ScalarString(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(ScalarString(v.to_string()))
    }
}

impl<'de> Deserialize<'de> for ScalarString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ScalarStringVisitor)
    }
}

/// Ordered key/value pairs, written either as a mapping or as a list of
/// `{ key, value }` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairList(pub Vec<(String, String)>);

impl PairList {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the CLI flavour: `key:value,key:value`.
    pub fn parse_cli(raw: &str) -> Result<Self, String> {
        let mut pairs = Vec::new();

        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let Some((key, value)) = entry.split_once(':') else {
                return Err(format!("expected `key:value`, got `{}`", entry));
            };

            let key = key.trim();

            if key.is_empty() {
                return Err(format!("empty key in `{}`", entry));
            }

            pairs.push((key.to_string(), value.trim().to_string()));
        }

        Ok(PairList(pairs))
    }
}

#[derive(Deserialize)]
struct PairEntry {
    key: String,
    value: ScalarString,
}

struct PairListVisitor;

impl<'de> Visitor<'de> for PairListVisitor {
    type Value = PairList;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map, a list of {key, value} entries or `key:value,...`")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        PairList::parse_cli(v).map_err(E::custom)
    }

    fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
    where
        M: de::MapAccess<'de>,
    {
        let mut pairs = Vec::new();

        while let Some((key, value)) = map.next_entry::<ScalarString, ScalarString>()? {
            pairs.push((key.0, value.0));
        }

        Ok(PairList(pairs))
    }

    fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
    where
        S: de::SeqAccess<'de>,
    {
        let mut pairs = Vec::new();

        while let Some(entry) = seq.next_element::<PairEntry>()? {
            pairs.push((entry.key, entry.value.0));
        }

        Ok(PairList(pairs))
    }
}

impl<'de> Deserialize<'de> for PairList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(PairListVisitor)
    }
}

impl Serialize for PairList {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// A list written either as a sequence or as a single comma separated string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommaList<T>(pub Vec<T>);

struct CommaListVisitor<T>(PhantomData<T>);

impl<'de, T> Visitor<'de> for CommaListVisitor<T>
where
    T: Deserialize<'de> + FromStr,
{
    type Value = CommaList<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a list or a comma separated string")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        v.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                T::from_str(item).map_err(|_| E::invalid_value(de::Unexpected::Str(item), &self))
            })
            .collect::<Result<Vec<T>, E>>()
            .map(CommaList)
    }

    fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
    where
        S: de::SeqAccess<'de>,
    {
        let mut items = Vec::new();

        while let Some(item) = seq.next_element::<T>()? {
            items.push(item);
        }

        Ok(CommaList(items))
    }
}

impl<'de, T> Deserialize<'de> for CommaList<T>
where
    T: Deserialize<'de> + FromStr,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(CommaListVisitor(PhantomData))
    }
}
