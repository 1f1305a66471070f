//! Collection fields built by composition over a string-collection slot.
//!
//! Elements that fail to decode are dropped from the result. A read never
//! fails because of one bad element, and the dropped element is only
//! reported through a `debug` log line.

use std::collections::BTreeSet;
use std::sync::Arc;

use prefs_store::StoreValue;
use tracing::debug;

use crate::field::FieldPreference;

/// An enum stored by variant name.
pub trait PreferenceEnum: Copy + Ord + Send + Sync + 'static {
    /// Every variant, in declaration order.
    const VARIANTS: &'static [Self];

    fn name(&self) -> &'static str;

    /// Exact, case-sensitive name lookup.
    fn from_name(name: &str) -> Option<Self> {
        Self::VARIANTS.iter().copied().find(|v| v.name() == name)
    }
}

/// A set of custom-serialized elements over a `BTreeSet<String>` slot.
pub fn serialized_set<P, F, D, E>(
    raw: &FieldPreference<P, BTreeSet<String>>,
    decode: D,
    encode: E,
    default: BTreeSet<F>,
) -> FieldPreference<P, BTreeSet<F>>
where
    P: StoreValue,
    F: StoreValue + Ord,
    D: Fn(&str) -> Option<F> + Send + Sync + 'static,
    E: Fn(&F) -> String + Send + Sync + 'static,
{
    let key: Arc<str> = raw.key().into();
    raw.map(
        move |stored: BTreeSet<String>| Ok(decode_lossy(&key, stored, &decode)),
        move |values: BTreeSet<F>| Ok(values.iter().map(&encode).collect()),
        default,
    )
}

/// An ordered list of custom-serialized elements over a `Vec<String>` slot.
pub fn serialized_list<P, F, D, E>(
    raw: &FieldPreference<P, Vec<String>>,
    decode: D,
    encode: E,
    default: Vec<F>,
) -> FieldPreference<P, Vec<F>>
where
    P: StoreValue,
    F: StoreValue,
    D: Fn(&str) -> Option<F> + Send + Sync + 'static,
    E: Fn(&F) -> String + Send + Sync + 'static,
{
    let key: Arc<str> = raw.key().into();
    raw.map(
        move |stored: Vec<String>| Ok(decode_lossy(&key, stored, &decode)),
        move |values: Vec<F>| Ok(values.iter().map(&encode).collect()),
        default,
    )
}

/// A set of enum variants stored by name. Unknown names are dropped.
pub fn enum_set<P, F>(
    raw: &FieldPreference<P, BTreeSet<String>>,
    default: BTreeSet<F>,
) -> FieldPreference<P, BTreeSet<F>>
where
    P: StoreValue,
    F: PreferenceEnum + StoreValue,
{
    serialized_set(raw, F::from_name, |v: &F| v.name().to_string(), default)
}

fn decode_lossy<F, B, D>(key: &str, stored: impl IntoIterator<Item = String>, decode: &D) -> B
where
    B: FromIterator<F>,
    D: Fn(&str) -> Option<F>,
{
    stored
        .into_iter()
        .filter_map(|text| {
            let decoded = decode(&text);
            if decoded.is_none() {
                debug!(key, element = %text, "dropping undecodable collection element");
            }
            decoded
        })
        .collect()
}
