//! Stall profile and review listing.

use super::HandlerError;
use stall_client::{ReviewBackend, StallBackend};
use stall_types::{Page, Review, ReviewQuery, Stall, StallUpdate};
use std::sync::Arc;

pub struct ProfileHandler {
	stall: Arc<dyn StallBackend>,
	reviews: Arc<dyn ReviewBackend>,
}

impl ProfileHandler {
	pub fn new(stall: Arc<dyn StallBackend>, reviews: Arc<dyn ReviewBackend>) -> Self {
		Self { stall, reviews }
	}

	pub async fn show(&self) -> Result<Stall, HandlerError> {
		Ok(self.stall.get_stall().await?)
	}

	pub async fn update(&self, update: &StallUpdate) -> Result<Stall, HandlerError> {
		update.validate()?;
		let stall = self.stall.update_stall(update).await?;
		tracing::info!(name = %stall.name, "Stall profile updated");
		Ok(stall)
	}

	/// Deletes the stall once `typed_name` matches its current name exactly.
	pub async fn delete(&self, typed_name: &str) -> Result<(), HandlerError> {
		let stall = self.stall.get_stall().await?;
		stall.confirm_deletion(typed_name)?;
		self.stall.delete_stall().await?;
		tracing::warn!(name = %stall.name, "Stall deleted");
		Ok(())
	}

	pub async fn reviews(&self, query: &ReviewQuery) -> Result<Page<Review>, HandlerError> {
		query.validate()?;
		Ok(self.reviews.list_reviews(query).await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use stall_client::implementations::mock::{fixtures, MockBackend};
	use stall_types::{ReviewSortBy, SortOrder, StallCategory};

	fn handler() -> (ProfileHandler, Arc<MockBackend>) {
		let backend = Arc::new(MockBackend::new());
		backend.set_stall(fixtures::stall("Warung Bu Sri"));
		(ProfileHandler::new(backend.clone(), backend.clone()), backend)
	}

	#[tokio::test]
	async fn test_update_validates_limits() {
		let (handler, backend) = handler();

		let too_long = StallUpdate {
			description: Some("x".repeat(501)),
			..Default::default()
		};
		assert!(matches!(
			handler.update(&too_long).await,
			Err(HandlerError::Validation(_))
		));
		assert_eq!(backend.calls("update_stall"), 0);

		let stall = handler
			.update(&StallUpdate {
				category: Some(StallCategory::HalalFood),
				..Default::default()
			})
			.await
			.unwrap();
		assert_eq!(stall.category, StallCategory::HalalFood);
	}

	#[tokio::test]
	async fn test_delete_requires_exact_name() {
		let (handler, backend) = handler();

		assert!(matches!(
			handler.delete("Warung Bu").await,
			Err(HandlerError::Validation(_))
		));
		assert_eq!(backend.calls("delete_stall"), 0);

		handler.delete("Warung Bu Sri").await.unwrap();
		assert!(matches!(handler.show().await, Err(HandlerError::NotFound(_))));
	}

	#[tokio::test]
	async fn test_reviews_by_rating() {
		let (handler, backend) = handler();
		backend.insert_review(fixtures::review("R1", 4, 0));
		backend.insert_review(fixtures::review("R2", 2, 5));

		let page = handler
			.reviews(&ReviewQuery {
				sort_by: ReviewSortBy::Rating,
				sort_order: SortOrder::Asc,
				..Default::default()
			})
			.await
			.unwrap();
		assert_eq!(page.data[0].id, "R2");

		assert!(matches!(
			handler
				.reviews(&ReviewQuery {
					rating: Some(0),
					..Default::default()
				})
				.await,
			Err(HandlerError::Validation(_))
		));
	}
}
