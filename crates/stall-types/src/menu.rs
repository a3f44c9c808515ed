//! Menu catalog types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::conversion::{rupiah, string_list};
use crate::ValidationError;

/// A dish or drink offered by the stall.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
	pub id: String,
	pub stall_id: String,
	pub name: String,
	#[serde(default)]
	pub description: String,
	#[serde(with = "string_list", default)]
	pub category: Vec<String>,
	#[serde(with = "rupiah")]
	pub price: u64,
	#[serde(default)]
	pub image_url: Option<String>,
	pub is_available: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// Form input for creating a menu item.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItemInput {
	pub name: String,
	pub description: String,
	pub category: Vec<String>,
	pub price: u64,
	pub is_available: bool,
}

impl MenuItemInput {
	/// Checks the form before it is submitted.
	pub fn validate(&self) -> Result<(), ValidationError> {
		validate_name(&self.name)?;
		validate_price(self.price)?;
		validate_category(&self.category)
	}

	/// Multipart text fields in the layout the backend expects.
	pub fn to_form_fields(&self) -> Vec<(&'static str, String)> {
		vec![
			("name", self.name.trim().to_string()),
			("description", self.description.clone()),
			("category", encode_list(&self.category)),
			("price", self.price.to_string()),
			("isAvailable", self.is_available.to_string()),
		]
	}
}

/// Partial update of a menu item. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuItemUpdate {
	pub name: Option<String>,
	pub description: Option<String>,
	pub category: Option<Vec<String>>,
	pub price: Option<u64>,
	pub is_available: Option<bool>,
}

impl MenuItemUpdate {
	/// Update that only flips availability.
	pub fn availability(is_available: bool) -> Self {
		Self {
			is_available: Some(is_available),
			..Self::default()
		}
	}

	pub fn is_empty(&self) -> bool {
		self.name.is_none()
			&& self.description.is_none()
			&& self.category.is_none()
			&& self.price.is_none()
			&& self.is_available.is_none()
	}

	pub fn validate(&self) -> Result<(), ValidationError> {
		if self.is_empty() {
			return Err(ValidationError::invalid("menu item", "nothing to update"));
		}
		if let Some(name) = &self.name {
			validate_name(name)?;
		}
		if let Some(price) = self.price {
			validate_price(price)?;
		}
		if let Some(category) = &self.category {
			validate_category(category)?;
		}
		Ok(())
	}

	/// Applies the update to a local copy, as the backend would.
	pub fn apply_to(&self, item: &mut MenuItem) {
		if let Some(name) = &self.name {
			item.name = name.trim().to_string();
		}
		if let Some(description) = &self.description {
			item.description = description.clone();
		}
		if let Some(category) = &self.category {
			item.category = category.clone();
		}
		if let Some(price) = self.price {
			item.price = price;
		}
		if let Some(is_available) = self.is_available {
			item.is_available = is_available;
		}
	}

	pub fn to_form_fields(&self) -> Vec<(&'static str, String)> {
		let mut fields = Vec::new();
		if let Some(name) = &self.name {
			fields.push(("name", name.trim().to_string()));
		}
		if let Some(description) = &self.description {
			fields.push(("description", description.clone()));
		}
		if let Some(category) = &self.category {
			fields.push(("category", encode_list(category)));
		}
		if let Some(price) = self.price {
			fields.push(("price", price.to_string()));
		}
		if let Some(is_available) = self.is_available {
			fields.push(("isAvailable", is_available.to_string()));
		}
		fields
	}
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
	if name.trim().is_empty() {
		return Err(ValidationError::invalid("name", "menu name is required"));
	}
	Ok(())
}

fn validate_price(price: u64) -> Result<(), ValidationError> {
	if price == 0 {
		return Err(ValidationError::invalid("price", "price must be greater than 0"));
	}
	Ok(())
}

fn validate_category(category: &[String]) -> Result<(), ValidationError> {
	if category.iter().all(|c| c.trim().is_empty()) {
		return Err(ValidationError::invalid(
			"category",
			"at least one category is required",
		));
	}
	Ok(())
}

/// List fields travel as a JSON array inside a single form field.
pub(crate) fn encode_list(values: &[String]) -> String {
	serde_json::Value::from(values.to_vec()).to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn input() -> MenuItemInput {
		MenuItemInput {
			name: " Es Teh Manis ".into(),
			description: "Teh melati".into(),
			category: vec!["Minuman".into()],
			price: 4000,
			is_available: true,
		}
	}

	#[test]
	fn test_input_validation() {
		assert!(input().validate().is_ok());

		let mut missing_name = input();
		missing_name.name = "   ".into();
		assert!(matches!(
			missing_name.validate(),
			Err(ValidationError::InvalidValue { field, .. }) if field == "name"
		));

		let mut free = input();
		free.price = 0;
		assert!(free.validate().is_err());

		let mut uncategorised = input();
		uncategorised.category.clear();
		assert!(uncategorised.validate().is_err());
	}

	#[test]
	fn test_form_fields_encode_category_as_json() {
		let fields = input().to_form_fields();
		assert!(fields.contains(&("name", "Es Teh Manis".to_string())));
		assert!(fields.contains(&("category", r#"["Minuman"]"#.to_string())));
		assert!(fields.contains(&("isAvailable", "true".to_string())));
	}

	#[test]
	fn test_update_only_sends_present_fields() {
		let update = MenuItemUpdate::availability(false);
		assert_eq!(update.to_form_fields(), vec![("isAvailable", "false".to_string())]);
		assert!(update.validate().is_ok());
		assert!(MenuItemUpdate::default().validate().is_err());
	}

	#[test]
	fn test_menu_item_accepts_encoded_category() {
		let item: MenuItem = serde_json::from_value(serde_json::json!({
			"id": "M1",
			"stallId": "S1",
			"name": "Nasi Goreng",
			"description": "Pedas",
			"category": "[\"Makanan\",\"Nasi\"]",
			"price": "15000",
			"imageUrl": null,
			"isAvailable": true,
			"createdAt": "2024-05-01T08:00:00Z",
			"updatedAt": "2024-05-01T08:00:00Z"
		}))
		.unwrap();
		assert_eq!(item.category, vec!["Makanan", "Nasi"]);
		assert_eq!(item.price, 15000);
	}
}
