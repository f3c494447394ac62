//! Bidirectional token ↔ wire tables for enumerated attributes.
//!
//! A mapping is declared once as forward pairs `(token, wire)`; the reverse
//! direction is derived from the same pairs, so the two can never drift apart.
//! Construction fails unless both tokens and wire values are unique, which
//! makes every mapping a bijection.
//!
//! Wire lookups are forgiving about the shape of the reply: surrounding
//! whitespace is ignored, letters compare case-insensitively and numeric
//! replies compare by value (`"+1"` matches a wire value of `"1"`).
//!
//! # Example
//!
//! ```
//! use rust_ivi::mapping::ValueMapping;
//!
//! let behavior = ValueMapping::new([("regulate", "0"), ("trip", "1")]).unwrap();
//! assert_eq!(behavior.to_wire("trip"), Some("1"));
//! assert_eq!(behavior.from_wire(" 0\n"), Some("regulate"));
//! ```

use crate::error::{IviError, IviResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Injective mapping between semantic tokens and instrument wire tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(String, String)>", into = "Vec<(String, String)>")]
pub struct ValueMapping {
    pairs: Vec<(String, String)>,
    reverse: HashMap<String, usize>,
}

impl ValueMapping {
    /// Build a mapping from forward `(token, wire)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`IviError::InvalidModel`] when the table is empty or when a
    /// token or a wire value appears twice.
    pub fn new<I, T, W>(pairs: I) -> IviResult<Self>
    where
        I: IntoIterator<Item = (T, W)>,
        T: Into<String>,
        W: Into<String>,
    {
        let pairs: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(token, wire)| (token.into(), wire.into()))
            .collect();

        if pairs.is_empty() {
            return Err(IviError::InvalidModel("empty value mapping".to_string()));
        }

        let mut reverse = HashMap::with_capacity(pairs.len());
        for (index, (token, wire)) in pairs.iter().enumerate() {
            if pairs[..index].iter().any(|(t, _)| t == token) {
                return Err(IviError::InvalidModel(format!(
                    "token '{token}' appears twice in value mapping"
                )));
            }
            if reverse.insert(wire_key(wire), index).is_some() {
                return Err(IviError::InvalidModel(format!(
                    "wire value '{wire}' is shared by several tokens"
                )));
            }
        }

        Ok(Self { pairs, reverse })
    }

    /// Wire token written for `token`.
    pub fn to_wire(&self, token: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, wire)| wire.as_str())
    }

    /// Semantic token for an instrument reply.
    pub fn from_wire(&self, reply: &str) -> Option<&str> {
        let reply = reply.trim();
        if let Some(&index) = self.reverse.get(&wire_key(reply)) {
            return Some(self.pairs[index].0.as_str());
        }

        // "+1.000" and "1" are the same wire value, field by field for
        // compound values such as "DC;0;1"
        self.pairs
            .iter()
            .find(|(_, wire)| same_fields(wire, reply))
            .map(|(token, _)| token.as_str())
    }

    /// Whether `token` is one of the mapping's semantic tokens.
    pub fn contains_token(&self, token: &str) -> bool {
        self.to_wire(token).is_some()
    }

    /// Semantic tokens in declaration order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(token, _)| token.as_str())
    }

    /// First declared token, used as the default value of an enumerated slot.
    pub fn first_token(&self) -> &str {
        // construction rejects empty tables
        self.pairs.first().map_or("", |(token, _)| token.as_str())
    }

    /// Forward pairs in declaration order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Always false for a constructed mapping.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn wire_key(wire: &str) -> String {
    wire.trim().to_ascii_lowercase()
}

fn same_fields(wire: &str, reply: &str) -> bool {
    let wire: Vec<&str> = wire.split(';').map(str::trim).collect();
    let reply: Vec<&str> = reply.split(';').map(str::trim).collect();
    wire.len() == reply.len()
        && wire.iter().zip(&reply).all(|(w, r)| {
            w.eq_ignore_ascii_case(r)
                || matches!(
                    (w.parse::<f64>(), r.parse::<f64>()),
                    (Ok(a), Ok(b)) if a == b
                )
        })
}

impl TryFrom<Vec<(String, String)>> for ValueMapping {
    type Error = IviError;

    fn try_from(pairs: Vec<(String, String)>) -> Result<Self, Self::Error> {
        ValueMapping::new(pairs)
    }
}

impl From<ValueMapping> for Vec<(String, String)> {
    fn from(mapping: ValueMapping) -> Self {
        mapping.pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracking() -> ValueMapping {
        ValueMapping::new([("independent", "0"), ("series", "1"), ("parallel", "2")]).unwrap()
    }

    #[test]
    fn test_forward_and_reverse() {
        let map = tracking();
        assert_eq!(map.to_wire("series"), Some("1"));
        assert_eq!(map.from_wire("2"), Some("parallel"));
        assert_eq!(map.to_wire("bogus"), None);
        assert_eq!(map.first_token(), "independent");
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_reply_normalisation() {
        let map = ValueMapping::new([("immediate", "IMM"), ("bus", "BUS")]).unwrap();
        assert_eq!(map.from_wire("imm\n"), Some("immediate"));
        assert_eq!(map.from_wire(" Bus "), Some("bus"));
        assert_eq!(tracking().from_wire("+1.000"), Some("series"));
        assert_eq!(tracking().from_wire("7"), None);
    }

    #[test]
    fn test_compound_replies_compare_per_field() {
        let map = ValueMapping::new([("dc", "dc;0;0"), ("hf_reject", "dc;0;1")]).unwrap();
        assert_eq!(map.from_wire("DC;+0;+1\n"), Some("hf_reject"));
        assert_eq!(map.from_wire("DC;0"), None);
    }

    #[test]
    fn test_rejects_duplicate_wire_values() {
        let result = ValueMapping::new([("glitch", "glit"), ("width", "glit")]);
        assert!(matches!(result, Err(IviError::InvalidModel(_))));
    }

    #[test]
    fn test_rejects_duplicate_tokens() {
        let result = ValueMapping::new([("cc", "0"), ("cc", "1")]);
        assert!(matches!(result, Err(IviError::InvalidModel(_))));
    }

    #[test]
    fn test_rejects_empty_table() {
        let pairs: Vec<(String, String)> = Vec::new();
        assert!(ValueMapping::new(pairs).is_err());
    }

    #[test]
    fn test_every_token_round_trips() {
        let map = tracking();
        for token in map.tokens() {
            let wire = map.to_wire(token).unwrap();
            assert_eq!(map.from_wire(wire), Some(token));
        }
    }

    #[test]
    fn test_deserialize_from_pairs() {
        #[derive(Deserialize)]
        struct Holder {
            mapping: ValueMapping,
        }
        let holder: Holder = toml::from_str(r#"mapping = [["cc", "0"], ["cr", "1"]]"#).unwrap();
        assert_eq!(holder.mapping.to_wire("cr"), Some("1"));

        let bad: Result<Holder, _> = toml::from_str(r#"mapping = [["cc", "0"], ["cr", "0"]]"#);
        assert!(bad.is_err());
    }
}
