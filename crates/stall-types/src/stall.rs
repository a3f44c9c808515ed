//! Stall profile types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::menu::encode_list;
use crate::utils::conversion::string_list;
use crate::ValidationError;

/// Longest stall description the profile form accepts.
pub const MAX_DESCRIPTION_CHARS: usize = 500;
/// Most food type tags a stall may carry.
pub const MAX_FOOD_TYPES: usize = 10;

/// Category a stall is listed under.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StallCategory {
	#[serde(rename = "Indonesian Food")]
	IndonesianFood,
	#[serde(rename = "Fast Food")]
	FastFood,
	#[serde(rename = "Beverages")]
	Beverages,
	#[serde(rename = "Snacks")]
	Snacks,
	#[serde(rename = "Desserts")]
	Desserts,
	#[serde(rename = "Asian Food")]
	AsianFood,
	#[serde(rename = "Western Food")]
	WesternFood,
	#[serde(rename = "Halal Food")]
	HalalFood,
	#[serde(rename = "Vegetarian")]
	Vegetarian,
	#[serde(rename = "Others")]
	Others,
}

impl StallCategory {
	pub fn as_str(&self) -> &'static str {
		match self {
			StallCategory::IndonesianFood => "Indonesian Food",
			StallCategory::FastFood => "Fast Food",
			StallCategory::Beverages => "Beverages",
			StallCategory::Snacks => "Snacks",
			StallCategory::Desserts => "Desserts",
			StallCategory::AsianFood => "Asian Food",
			StallCategory::WesternFood => "Western Food",
			StallCategory::HalalFood => "Halal Food",
			StallCategory::Vegetarian => "Vegetarian",
			StallCategory::Others => "Others",
		}
	}

	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::IndonesianFood,
			Self::FastFood,
			Self::Beverages,
			Self::Snacks,
			Self::Desserts,
			Self::AsianFood,
			Self::WesternFood,
			Self::HalalFood,
			Self::Vegetarian,
			Self::Others,
		]
		.into_iter()
	}
}

impl fmt::Display for StallCategory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for StallCategory {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all()
			.find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
			.ok_or_else(|| format!("unknown stall category '{}'", s))
	}
}

/// The operator's stall profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stall {
	pub id: String,
	pub owner_id: String,
	pub name: String,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub stall_image_url: Option<String>,
	/// QRIS payment code shown to customers.
	#[serde(default)]
	pub qris_image_url: Option<String>,
	pub category: StallCategory,
	#[serde(with = "string_list", default)]
	pub food_types: Vec<String>,
	#[serde(default)]
	pub rating: f64,
	#[serde(default)]
	pub total_reviews: u32,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Stall {
	/// Checks the name typed by the operator to confirm stall deletion.
	pub fn confirm_deletion(&self, typed_name: &str) -> Result<(), ValidationError> {
		if typed_name != self.name {
			return Err(ValidationError::invalid(
				"confirmation",
				"stall name does not match, deletion cancelled",
			));
		}
		Ok(())
	}
}

/// Partial profile update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StallUpdate {
	pub name: Option<String>,
	pub description: Option<String>,
	pub category: Option<StallCategory>,
	pub food_types: Option<Vec<String>>,
}

impl StallUpdate {
	pub fn validate(&self) -> Result<(), ValidationError> {
		if let Some(name) = &self.name {
			if name.trim().is_empty() {
				return Err(ValidationError::invalid("name", "stall name is required"));
			}
		}
		if let Some(description) = &self.description {
			let chars = description.chars().count();
			if chars > MAX_DESCRIPTION_CHARS {
				return Err(ValidationError::invalid(
					"description",
					format!(
						"description is {} characters, at most {} allowed",
						chars, MAX_DESCRIPTION_CHARS
					),
				));
			}
		}
		if let Some(food_types) = &self.food_types {
			if food_types.len() > MAX_FOOD_TYPES {
				return Err(ValidationError::invalid(
					"foodTypes",
					format!("at most {} food types allowed", MAX_FOOD_TYPES),
				));
			}
			if food_types.iter().any(|t| t.trim().is_empty()) {
				return Err(ValidationError::invalid(
					"foodTypes",
					"food types must not be empty",
				));
			}
		}
		Ok(())
	}

	/// Multipart text fields. Empty values are not sent.
	pub fn to_form_fields(&self) -> Vec<(&'static str, String)> {
		let mut fields = Vec::new();
		if let Some(name) = self.name.as_ref().filter(|n| !n.is_empty()) {
			fields.push(("name", name.trim().to_string()));
		}
		if let Some(description) = self.description.as_ref().filter(|d| !d.is_empty()) {
			fields.push(("description", description.clone()));
		}
		if let Some(category) = self.category {
			fields.push(("category", category.as_str().to_string()));
		}
		if let Some(food_types) = self.food_types.as_ref().filter(|f| !f.is_empty()) {
			fields.push(("foodTypes", encode_list(food_types)));
		}
		fields
	}
}
