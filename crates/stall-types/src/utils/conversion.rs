//! Wire conversions for values the backend encodes loosely.

/// Serde adapter for rupiah amounts.
///
/// Amounts are serialized as JSON integers. On input the backend may send
/// an integer, an integral float or a numeric string, all of which are
/// accepted.
pub mod rupiah {
	use serde::de::{self, Deserializer, Visitor};
	use serde::Serializer;
	use std::fmt;

	pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_u64(*value)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
	where
		D: Deserializer<'de>,
	{
		deserializer.deserialize_any(RupiahVisitor)
	}

	struct RupiahVisitor;

	impl Visitor<'_> for RupiahVisitor {
		type Value = u64;

		fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
			f.write_str("a non-negative whole rupiah amount")
		}

		fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
			Ok(v)
		}

		fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
			u64::try_from(v).map_err(|_| E::custom(format!("negative amount {}", v)))
		}

		fn visit_f64<E: de::Error>(self, v: f64) -> Result<u64, E> {
			if v < 0.0 || v.fract() != 0.0 || !v.is_finite() {
				return Err(E::custom(format!("amount {} is not a whole rupiah value", v)));
			}
			Ok(v as u64)
		}

		fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
			let trimmed = v.trim();
			if let Ok(amount) = trimmed.parse::<u64>() {
				return Ok(amount);
			}
			trimmed
				.parse::<f64>()
				.map_err(|_| E::custom(format!("invalid amount '{}'", v)))
				.and_then(|f| self.visit_f64(f))
		}
	}
}

/// Serde adapter for string lists the backend sometimes sends JSON-encoded.
///
/// Accepts an array of strings or a string holding a JSON array. Anything
/// else (including an unparseable string) becomes an empty list.
pub mod string_list {
	use serde::{Deserialize, Deserializer, Serialize, Serializer};

	#[allow(clippy::ptr_arg)]
	pub fn serialize<S>(value: &Vec<String>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		value.serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = serde_json::Value::deserialize(deserializer)?;
		Ok(normalize(raw))
	}

	pub(crate) fn normalize(raw: serde_json::Value) -> Vec<String> {
		match raw {
			serde_json::Value::Array(items) => items
				.into_iter()
				.filter_map(|item| match item {
					serde_json::Value::String(s) => Some(s),
					_ => None,
				})
				.collect(),
			serde_json::Value::String(encoded) => {
				match serde_json::from_str::<serde_json::Value>(&encoded) {
					Ok(serde_json::Value::Array(items)) => {
						normalize(serde_json::Value::Array(items))
					},
					_ => Vec::new(),
				}
			},
			_ => Vec::new(),
		}
	}
}

#[cfg(test)]
mod tests {
	use serde::{Deserialize, Serialize};

	#[derive(Debug, Serialize, Deserialize, PartialEq)]
	struct Priced {
		#[serde(with = "super::rupiah")]
		price: u64,
	}

	#[test]
	fn test_accepts_numbers_and_numeric_strings() {
		for raw in [r#"{"price":15000}"#, r#"{"price":"15000"}"#, r#"{"price":15000.0}"#] {
			let parsed: Priced = serde_json::from_str(raw).unwrap();
			assert_eq!(parsed.price, 15000);
		}
	}

	#[test]
	fn test_rejects_fractional_and_negative_amounts() {
		assert!(serde_json::from_str::<Priced>(r#"{"price":1500.5}"#).is_err());
		assert!(serde_json::from_str::<Priced>(r#"{"price":-1}"#).is_err());
		assert!(serde_json::from_str::<Priced>(r#"{"price":"abc"}"#).is_err());
	}

	#[derive(Debug, Deserialize)]
	struct Tagged {
		#[serde(with = "super::string_list", default)]
		tags: Vec<String>,
	}

	#[test]
	fn test_string_list_accepts_array_and_encoded_string() {
		let direct: Tagged = serde_json::from_str(r#"{"tags":["Pedas","Gurih"]}"#).unwrap();
		assert_eq!(direct.tags, vec!["Pedas", "Gurih"]);

		let encoded: Tagged =
			serde_json::from_str(r#"{"tags":"[\"Pedas\",\"Gurih\"]"}"#).unwrap();
		assert_eq!(encoded.tags, vec!["Pedas", "Gurih"]);
	}

	#[test]
	fn test_string_list_falls_back_to_empty() {
		let garbage: Tagged = serde_json::from_str(r#"{"tags":"Pedas"}"#).unwrap();
		assert!(garbage.tags.is_empty());
		let null: Tagged = serde_json::from_str(r#"{"tags":null}"#).unwrap();
		assert!(null.tags.is_empty());
		let missing: Tagged = serde_json::from_str(r#"{}"#).unwrap();
		assert!(missing.tags.is_empty());
	}

	#[test]
	fn test_serializes_as_integer() {
		let json = serde_json::to_string(&Priced { price: 1000 }).unwrap();
		assert_eq!(json, r#"{"price":1000}"#);
	}
}
