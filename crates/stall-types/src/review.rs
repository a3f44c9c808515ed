//! Review types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::conversion::string_list;
use crate::ValidationError;

/// A customer review of a completed order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
	pub id: String,
	pub order_id: String,
	pub user_id: String,
	pub stall_id: String,
	#[serde(default)]
	pub stall_name: String,
	#[serde(default)]
	pub user_name: String,
	/// Star rating from 1 to 5.
	pub rating: u8,
	#[serde(default)]
	pub comment: String,
	#[serde(with = "string_list", default)]
	pub tags: Vec<String>,
	#[serde(with = "string_list", default)]
	pub image_urls: Vec<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewSortBy {
	#[default]
	CreatedAt,
	Rating,
}

impl fmt::Display for ReviewSortBy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ReviewSortBy::CreatedAt => f.write_str("createdAt"),
			ReviewSortBy::Rating => f.write_str("rating"),
		}
	}
}

impl FromStr for ReviewSortBy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"createdAt" | "created_at" | "date" => Ok(Self::CreatedAt),
			"rating" => Ok(Self::Rating),
			other => Err(format!("unknown sort field '{}'", other)),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
	Asc,
	#[default]
	Desc,
}

impl fmt::Display for SortOrder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SortOrder::Asc => f.write_str("asc"),
			SortOrder::Desc => f.write_str("desc"),
		}
	}
}

impl FromStr for SortOrder {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"asc" => Ok(Self::Asc),
			"desc" => Ok(Self::Desc),
			other => Err(format!("unknown sort order '{}'", other)),
		}
	}
}

/// Query for the paginated review listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewQuery {
	/// Only reviews with exactly this many stars.
	pub rating: Option<u8>,
	pub page: u32,
	pub limit: u32,
	pub sort_by: ReviewSortBy,
	pub sort_order: SortOrder,
}

impl Default for ReviewQuery {
	fn default() -> Self {
		Self {
			rating: None,
			page: 1,
			limit: 10,
			sort_by: ReviewSortBy::default(),
			sort_order: SortOrder::default(),
		}
	}
}

impl ReviewQuery {
	pub fn validate(&self) -> Result<(), ValidationError> {
		if let Some(rating) = self.rating {
			if !(1..=5).contains(&rating) {
				return Err(ValidationError::invalid(
					"rating",
					format!("rating must be between 1 and 5, got {}", rating),
				));
			}
		}
		if self.page == 0 {
			return Err(ValidationError::invalid("page", "page starts at 1"));
		}
		Ok(())
	}

	pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
		let mut pairs = Vec::new();
		if let Some(rating) = self.rating {
			pairs.push(("rating", rating.to_string()));
		}
		pairs.push(("page", self.page.to_string()));
		pairs.push(("limit", self.limit.to_string()));
		pairs.push(("sortBy", self.sort_by.to_string()));
		pairs.push(("sortOrder", self.sort_order.to_string()));
		pairs
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_query_pairs() {
		assert_eq!(
			ReviewQuery::default().to_pairs(),
			vec![
				("page", "1".to_string()),
				("limit", "10".to_string()),
				("sortBy", "createdAt".to_string()),
				("sortOrder", "desc".to_string()),
			]
		);
	}

	#[test]
	fn test_rating_filter_bounds() {
		let query = ReviewQuery {
			rating: Some(6),
			..Default::default()
		};
		assert!(query.validate().is_err());

		let query = ReviewQuery {
			rating: Some(5),
			..Default::default()
		};
		assert!(query.validate().is_ok());
		assert_eq!(query.to_pairs()[0], ("rating", "5".to_string()));
	}
}
