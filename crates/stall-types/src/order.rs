//! Order types for the stall console.
//!
//! This module defines the order record returned by the marketplace backend,
//! the closed set of order statuses, the operator actions that move an order
//! between them, and the invariants every order record must satisfy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::conversion::rupiah;

/// Status of an order in its lifecycle.
///
/// Orders are created by the customer checkout flow in either
/// `PendingPayment` or `WaitingConfirmation` and end in one of the terminal
/// states `Completed`, `Rejected` or `Cancelled`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
	/// Customer has not uploaded a payment proof yet.
	PendingPayment,
	/// Payment proof uploaded, waiting for the stall to verify it.
	WaitingConfirmation,
	/// Payment confirmed, the kitchen is preparing the order.
	Processing,
	/// Order is ready for pickup or delivery.
	Ready,
	/// Order handed over to the customer.
	Completed,
	/// Payment was rejected by the stall.
	Rejected,
	/// Order was cancelled before completion.
	Cancelled,
}

impl OrderStatus {
	/// Returns the wire representation of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::PendingPayment => "pending_payment",
			OrderStatus::WaitingConfirmation => "waiting_confirmation",
			OrderStatus::Processing => "processing",
			OrderStatus::Ready => "ready",
			OrderStatus::Completed => "completed",
			OrderStatus::Rejected => "rejected",
			OrderStatus::Cancelled => "cancelled",
		}
	}

	/// Returns the operator-facing label shown next to an order.
	pub fn label(&self) -> &'static str {
		match self {
			OrderStatus::PendingPayment => "Menunggu Pembayaran",
			OrderStatus::WaitingConfirmation => "Menunggu Konfirmasi",
			OrderStatus::Processing => "Sedang Diproses",
			OrderStatus::Ready => "Siap Diambil/Antar",
			OrderStatus::Completed => "Selesai",
			OrderStatus::Rejected => "Ditolak",
			OrderStatus::Cancelled => "Dibatalkan",
		}
	}

	/// Returns true if no operator action may move the order out of this status.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			OrderStatus::Completed | OrderStatus::Rejected | OrderStatus::Cancelled
		)
	}

	/// Returns an iterator over all statuses.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::PendingPayment,
			Self::WaitingConfirmation,
			Self::Processing,
			Self::Ready,
			Self::Completed,
			Self::Rejected,
			Self::Cancelled,
		]
		.into_iter()
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all()
			.find(|status| status.as_str() == s)
			.ok_or_else(|| format!("unknown order status '{}'", s))
	}
}

/// How the order reaches the customer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
	Pickup,
	Delivery,
}

impl fmt::Display for DeliveryMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DeliveryMethod::Pickup => write!(f, "Pickup"),
			DeliveryMethod::Delivery => write!(f, "Delivery"),
		}
	}
}

/// A single line of an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
	/// Menu item this line refers to.
	pub menu_item_id: String,
	/// Menu item name at checkout time.
	pub name: String,
	/// Unit price in rupiah.
	#[serde(with = "rupiah")]
	pub price: u64,
	#[serde(default)]
	pub image_url: Option<String>,
	pub quantity: u32,
	/// Price times quantity, as computed at checkout.
	#[serde(with = "rupiah")]
	pub subtotal: u64,
}

/// An order placed at the operator's stall.
///
/// Monetary fields are fixed at checkout. Only `status`, `rejection_reason`,
/// `payment_proof_url`, `is_reviewed` and `updated_at` change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Unique identifier for this order.
	pub id: String,
	/// Username of the ordering customer.
	pub username: String,
	pub stall_id: String,
	pub stall_name: String,
	#[serde(default)]
	pub stall_image_url: Option<String>,
	pub items: Vec<OrderItem>,
	/// Sum of the line subtotals.
	#[serde(with = "rupiah")]
	pub items_total: u64,
	/// Marketplace application fee.
	#[serde(with = "rupiah")]
	pub app_fee: u64,
	pub delivery_method: DeliveryMethod,
	/// Delivery fee, zero for pickup orders.
	#[serde(with = "rupiah")]
	pub delivery_fee: u64,
	/// Amount paid by the customer.
	#[serde(with = "rupiah")]
	pub total_price: u64,
	/// Payment proof uploaded by the customer.
	#[serde(default)]
	pub payment_proof_url: Option<String>,
	pub status: OrderStatus,
	/// Reason given when the payment was rejected.
	#[serde(default)]
	pub rejection_reason: Option<String>,
	#[serde(default)]
	pub is_reviewed: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// The monetary part of an order, compared across transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderAmounts {
	pub items_total: u64,
	pub app_fee: u64,
	pub delivery_fee: u64,
	pub total_price: u64,
}

/// A violated order invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderInvariantViolation {
	/// A pickup order carries a delivery fee.
	DeliveryFeeOnPickup { delivery_fee: u64 },
	/// The total does not equal items total + app fee + delivery fee.
	TotalMismatch { expected: u64, actual: u64 },
	/// A rejected order has no rejection reason.
	MissingRejectionReason,
	/// A rejection reason is present on an order that is not rejected.
	UnexpectedRejectionReason { status: OrderStatus },
}

impl fmt::Display for OrderInvariantViolation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::DeliveryFeeOnPickup { delivery_fee } => {
				write!(f, "pickup order has delivery fee {}", delivery_fee)
			},
			Self::TotalMismatch { expected, actual } => {
				write!(f, "total price {} does not match components sum {}", actual, expected)
			},
			Self::MissingRejectionReason => write!(f, "rejected order has no rejection reason"),
			Self::UnexpectedRejectionReason { status } => {
				write!(f, "order in status {} carries a rejection reason", status)
			},
		}
	}
}

impl Order {
	/// Returns the monetary fields of the order.
	pub fn amounts(&self) -> OrderAmounts {
		OrderAmounts {
			items_total: self.items_total,
			app_fee: self.app_fee,
			delivery_fee: self.delivery_fee,
			total_price: self.total_price,
		}
	}

	/// Sum of the price components.
	pub fn expected_total(&self) -> u64 {
		self.items_total
			.saturating_add(self.app_fee)
			.saturating_add(self.delivery_fee)
	}

	/// Checks the record invariants, returning every violation found.
	pub fn check_invariants(&self) -> Vec<OrderInvariantViolation> {
		let mut violations = Vec::new();

		if self.delivery_method == DeliveryMethod::Pickup && self.delivery_fee != 0 {
			violations.push(OrderInvariantViolation::DeliveryFeeOnPickup {
				delivery_fee: self.delivery_fee,
			});
		}

		let expected = self.expected_total();
		if expected != self.total_price {
			violations.push(OrderInvariantViolation::TotalMismatch {
				expected,
				actual: self.total_price,
			});
		}

		match (self.status, &self.rejection_reason) {
			(OrderStatus::Rejected, None) => {
				violations.push(OrderInvariantViolation::MissingRejectionReason)
			},
			(status, Some(_)) if status != OrderStatus::Rejected => {
				violations.push(OrderInvariantViolation::UnexpectedRejectionReason { status })
			},
			_ => {},
		}

		violations
	}

	/// Total number of portions across all lines.
	pub fn item_count(&self) -> u32 {
		self.items.iter().map(|item| item.quantity).sum()
	}
}

/// Operator action that moves an order to a new status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
	/// waiting_confirmation -> processing
	ConfirmPayment,
	/// waiting_confirmation -> rejected
	RejectPayment,
	/// processing -> ready
	MarkReady,
	/// ready -> completed
	Complete,
}

impl TransitionKind {
	/// Status the order must be in for the action to apply.
	pub fn required_from(&self) -> OrderStatus {
		match self {
			TransitionKind::ConfirmPayment | TransitionKind::RejectPayment => {
				OrderStatus::WaitingConfirmation
			},
			TransitionKind::MarkReady => OrderStatus::Processing,
			TransitionKind::Complete => OrderStatus::Ready,
		}
	}

	/// Status the order ends up in after the action.
	pub fn target(&self) -> OrderStatus {
		match self {
			TransitionKind::ConfirmPayment => OrderStatus::Processing,
			TransitionKind::RejectPayment => OrderStatus::Rejected,
			TransitionKind::MarkReady => OrderStatus::Ready,
			TransitionKind::Complete => OrderStatus::Completed,
		}
	}

	/// Last path segment of the backend endpoint for this action.
	pub fn endpoint(&self) -> &'static str {
		match self {
			TransitionKind::ConfirmPayment => "confirm",
			TransitionKind::RejectPayment => "reject",
			TransitionKind::MarkReady => "ready",
			TransitionKind::Complete => "complete",
		}
	}

	/// Returns an iterator over all actions.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::ConfirmPayment,
			Self::RejectPayment,
			Self::MarkReady,
			Self::Complete,
		]
		.into_iter()
	}
}

impl fmt::Display for TransitionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TransitionKind::ConfirmPayment => write!(f, "confirm payment"),
			TransitionKind::RejectPayment => write!(f, "reject payment"),
			TransitionKind::MarkReady => write!(f, "mark ready"),
			TransitionKind::Complete => write!(f, "complete"),
		}
	}
}

/// A transition request together with its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
	ConfirmPayment,
	RejectPayment { reason: String },
	MarkReady,
	Complete,
}

impl Transition {
	pub fn kind(&self) -> TransitionKind {
		match self {
			Transition::ConfirmPayment => TransitionKind::ConfirmPayment,
			Transition::RejectPayment { .. } => TransitionKind::RejectPayment,
			Transition::MarkReady => TransitionKind::MarkReady,
			Transition::Complete => TransitionKind::Complete,
		}
	}
}

/// Body of the reject endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectPaymentRequest {
	pub reason: String,
}

/// Query for the paginated order listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQuery {
	/// Restricts the listing to one status; `None` lists every status.
	pub status: Option<OrderStatus>,
	pub page: u32,
	pub limit: u32,
}

impl Default for OrderQuery {
	fn default() -> Self {
		Self {
			status: None,
			page: 1,
			limit: 10,
		}
	}
}

impl OrderQuery {
	/// Query string pairs in the order the backend documents them.
	pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
		let mut pairs = vec![
			("page", self.page.to_string()),
			("limit", self.limit.to_string()),
		];
		if let Some(status) = self.status {
			pairs.push(("status", status.as_str().to_string()));
		}
		pairs
	}
}
