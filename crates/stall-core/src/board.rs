//! Locally displayed collections.
//!
//! A [`Board`] mirrors what the operator sees on screen. Entries are only
//! ever replaced with records returned by the backend; the optimistic
//! strategy shows a tentative change first and restores the prior copy when
//! the backend refuses it.

use stall_types::{MenuItem, Order};
use std::future::Future;
use tokio::sync::RwLock;

/// Records identified by a stable key.
pub trait Keyed {
	fn key(&self) -> &str;
}

impl Keyed for Order {
	fn key(&self) -> &str {
		&self.id
	}
}

impl Keyed for MenuItem {
	fn key(&self) -> &str {
		&self.id
	}
}

/// How a change reaches the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStrategy {
	/// Wait for the backend, then replace the entry with its answer.
	Confirmed,
	/// Show the change immediately and roll it back if the backend fails.
	Optimistic,
}

/// Insertion-ordered collection of displayed records.
pub struct Board<T> {
	entries: RwLock<Vec<T>>,
}

impl<T> Default for Board<T> {
	fn default() -> Self {
		Self {
			entries: RwLock::new(Vec::new()),
		}
	}
}

impl<T: Keyed + Clone + Send + Sync> Board<T> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replaces the whole collection.
	pub async fn load(&self, entries: Vec<T>) {
		*self.entries.write().await = entries;
	}

	pub async fn get(&self, key: &str) -> Option<T> {
		self.entries
			.read()
			.await
			.iter()
			.find(|e| e.key() == key)
			.cloned()
	}

	/// Replaces the entry with the same key, or appends it. Last writer wins.
	pub async fn replace(&self, entry: T) {
		let mut entries = self.entries.write().await;
		match entries.iter_mut().find(|e| e.key() == entry.key()) {
			Some(existing) => *existing = entry,
			None => entries.push(entry),
		}
	}

	pub async fn remove(&self, key: &str) -> Option<T> {
		let mut entries = self.entries.write().await;
		let index = entries.iter().position(|e| e.key() == key)?;
		Some(entries.remove(index))
	}

	pub async fn snapshot(&self) -> Vec<T> {
		self.entries.read().await.clone()
	}

	pub async fn len(&self) -> usize {
		self.entries.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.entries.read().await.is_empty()
	}

	/// Runs `request` for the entry `key` and merges its result.
	///
	/// With [`UpdateStrategy::Optimistic`], `tentative` is applied to the
	/// displayed entry before the request and undone if it fails. With
	/// [`UpdateStrategy::Confirmed`] it is ignored and the board is untouched
	/// on failure. The lock is never held across the request.
	pub async fn update<F, R, Fut, E>(
		&self,
		key: &str,
		strategy: UpdateStrategy,
		tentative: F,
		request: R,
	) -> Result<T, E>
	where
		F: FnOnce(&mut T),
		R: FnOnce() -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		let prior = match strategy {
			UpdateStrategy::Confirmed => None,
			UpdateStrategy::Optimistic => {
				let mut entries = self.entries.write().await;
				entries.iter_mut().find(|e| e.key() == key).map(|entry| {
					let prior = entry.clone();
					tentative(entry);
					prior
				})
			},
		};

		match request().await {
			Ok(updated) => {
				self.replace(updated.clone()).await;
				Ok(updated)
			},
			Err(e) => {
				if let Some(prior) = prior {
					self.replace(prior).await;
				}
				Err(e)
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Debug, Clone, PartialEq)]
	struct Entry {
		id: String,
		value: u32,
	}

	impl Keyed for Entry {
		fn key(&self) -> &str {
			&self.id
		}
	}

	fn entry(id: &str, value: u32) -> Entry {
		Entry {
			id: id.into(),
			value,
		}
	}

	#[tokio::test]
	async fn test_replace_keeps_order_and_appends_unknown() {
		let board = Board::new();
		board.load(vec![entry("a", 1), entry("b", 2)]).await;

		board.replace(entry("a", 10)).await;
		board.replace(entry("c", 3)).await;

		assert_eq!(
			board.snapshot().await,
			vec![entry("a", 10), entry("b", 2), entry("c", 3)]
		);
		assert_eq!(board.remove("b").await, Some(entry("b", 2)));
		assert_eq!(board.len().await, 2);
	}

	#[tokio::test]
	async fn test_confirmed_failure_leaves_board_untouched() {
		let board = Board::new();
		board.load(vec![entry("a", 1)]).await;

		let result: Result<Entry, &str> = board
			.update("a", UpdateStrategy::Confirmed, |e| e.value = 99, || async {
				Err("refused")
			})
			.await;
		assert_eq!(result, Err("refused"));
		assert_eq!(board.get("a").await, Some(entry("a", 1)));
	}

	#[tokio::test]
	async fn test_optimistic_shows_change_then_reverts() {
		let board = std::sync::Arc::new(Board::new());
		board.load(vec![entry("a", 1)]).await;

		let (seen_tx, seen_rx) = tokio::sync::oneshot::channel();
		let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
		let task_board = board.clone();
		let task = tokio::spawn(async move {
			task_board
				.update("a", UpdateStrategy::Optimistic, |e| e.value = 2, || async move {
					seen_tx.send(()).ok();
					release_rx.await.ok();
					Err::<Entry, _>("network down")
				})
				.await
		});

		seen_rx.await.unwrap();
		assert_eq!(board.get("a").await.unwrap().value, 2);
		release_tx.send(()).unwrap();

		assert_eq!(task.await.unwrap(), Err("network down"));
		assert_eq!(board.get("a").await.unwrap().value, 1);
	}

	#[tokio::test]
	async fn test_optimistic_success_takes_backend_record() {
		let board = Board::new();
		board.load(vec![entry("a", 1)]).await;

		let result: Result<Entry, ()> = board
			.update("a", UpdateStrategy::Optimistic, |e| e.value = 2, || async {
				Ok(entry("a", 3))
			})
			.await;
		assert_eq!(result, Ok(entry("a", 3)));
		assert_eq!(board.get("a").await, Some(entry("a", 3)));
	}
}
