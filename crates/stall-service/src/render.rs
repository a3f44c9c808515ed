//! Plain-text rendering of console records.

use stall_types::{
	format_rupiah, MenuItem, Order, PaginationMeta, Review, SessionUser, Stall,
};

pub fn order_line(order: &Order) -> String {
	format!(
		"{:<38} {:<22} {:<10} {:>4} item(s) {:>14}  {}",
		order.id,
		order.status.label(),
		order.username,
		order.item_count(),
		format_rupiah(order.total_price),
		order.created_at.format("%Y-%m-%d %H:%M"),
	)
}

pub fn order_detail(order: &Order) -> String {
	let mut lines = vec![
		format!("Order {}", order.id),
		format!("Status:    {}", order.status.label()),
		format!("Customer:  {}", order.username),
		format!("Placed:    {}", order.created_at.format("%Y-%m-%d %H:%M")),
		format!("Method:    {}", order.delivery_method),
		String::new(),
	];
	for item in &order.items {
		lines.push(format!(
			"  {} x{:<3} {:>14}",
			item.name,
			item.quantity,
			format_rupiah(item.subtotal)
		));
	}
	lines.push(String::new());
	lines.push(format!("Items:     {}", format_rupiah(order.items_total)));
	lines.push(format!("App fee:   {}", format_rupiah(order.app_fee)));
	lines.push(format!("Delivery:  {}", format_rupiah(order.delivery_fee)));
	lines.push(format!("Total:     {}", format_rupiah(order.total_price)));
	if let Some(proof) = &order.payment_proof_url {
		lines.push(format!("Proof:     {}", proof));
	}
	if let Some(reason) = &order.rejection_reason {
		lines.push(format!("Rejected:  {}", reason));
	}
	lines.join("\n")
}

pub fn menu_line(item: &MenuItem) -> String {
	format!(
		"{:<38} {:<28} {:>12}  {}",
		item.id,
		item.name,
		format_rupiah(item.price),
		if item.is_available {
			"available"
		} else {
			"sold out"
		},
	)
}

pub fn stall(stall: &Stall) -> String {
	let mut lines = vec![
		stall.name.clone(),
		format!("Category:   {}", stall.category),
		format!(
			"Rating:     {:.1} ({} reviews)",
			stall.rating, stall.total_reviews
		),
	];
	if !stall.food_types.is_empty() {
		lines.push(format!("Food types: {}", stall.food_types.join(", ")));
	}
	if !stall.description.is_empty() {
		lines.push(String::new());
		lines.push(stall.description.clone());
	}
	lines.join("\n")
}

pub fn review_line(review: &Review) -> String {
	let stars: String = "*".repeat(review.rating as usize);
	format!(
		"{:<5} {:<12} {}  {}",
		stars,
		review.user_name,
		review.created_at.format("%Y-%m-%d"),
		review.comment,
	)
}

pub fn user(user: &SessionUser) -> String {
	match &user.email {
		Some(email) => format!("{} <{}>", user.username, email),
		None => user.username.clone(),
	}
}

/// Footer for a listing. `shown` may be smaller than the page when the
/// listing was narrowed locally after fetching it.
pub fn page_footer(shown: usize, meta: &PaginationMeta) -> String {
	let mut footer = format!(
		"{} shown, page {} of {} ({} total)",
		shown,
		meta.page,
		meta.total_pages.max(1),
		meta.total
	);
	if meta.has_next() {
		footer.push_str(&format!(", next: --page {}", meta.page + 1));
	}
	footer
}

#[cfg(test)]
mod tests {
	use super::*;
	use stall_types::{DeliveryMethod, OrderItem, OrderStatus};

	fn order() -> Order {
		let created_at = chrono_epoch();
		Order {
			id: "O2".into(),
			username: "budi".into(),
			stall_id: "S1".into(),
			stall_name: "Warung Bu Sri".into(),
			stall_image_url: None,
			items: vec![OrderItem {
				menu_item_id: "M1".into(),
				name: "Nasi Goreng".into(),
				price: 15_000,
				image_url: None,
				quantity: 1,
				subtotal: 15_000,
			}],
			items_total: 15_000,
			app_fee: 1_000,
			delivery_method: DeliveryMethod::Pickup,
			delivery_fee: 0,
			total_price: 16_000,
			payment_proof_url: None,
			status: OrderStatus::Rejected,
			rejection_reason: Some("Bukti transfer tidak terbaca".into()),
			is_reviewed: false,
			created_at,
			updated_at: created_at,
		}
	}

	fn chrono_epoch() -> chrono::DateTime<chrono::Utc> {
		chrono::DateTime::from_timestamp(1_714_550_400, 0).unwrap()
	}

	#[test]
	fn test_order_detail_shows_totals_and_reason() {
		let text = order_detail(&order());
		assert!(text.contains("Total:     Rp 16.000"));
		assert!(text.contains("Rejected:  Bukti transfer tidak terbaca"));
		assert!(!text.contains("Proof:"));
	}

	#[test]
	fn test_page_footer_never_shows_zero_pages() {
		let meta = PaginationMeta {
			total: 0,
			page: 1,
			limit: 10,
			total_pages: 0,
		};
		assert_eq!(page_footer(0, &meta), "0 shown, page 1 of 1 (0 total)");
	}

	#[test]
	fn test_page_footer_points_at_next_page() {
		let meta = PaginationMeta {
			total: 16,
			page: 1,
			limit: 10,
			total_pages: 2,
		};
		assert_eq!(
			page_footer(0, &meta),
			"0 shown, page 1 of 2 (16 total), next: --page 2"
		);
	}
}
