//! Subcommands of the `stallctl` binary and their dispatch.

use crate::render;
use clap::{Args, Subcommand};
use stall_core::{Console, OrderFilter};
use stall_types::{
	MenuItemInput, MenuItemUpdate, OrderStatus, ReviewQuery, ReviewSortBy, SecretString,
	SortOrder, StallCategory, StallUpdate,
};

type CommandResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Sign in with a username or email
	Login {
		#[arg(short, long)]
		identifier: String,
		#[arg(short, long, env = "STALL_PASSWORD", hide_env_values = true)]
		password: String,
	},
	/// Sign out and forget the stored session
	Logout,
	/// Show the signed-in user and whether the session is still valid
	Whoami,
	/// Incoming orders and their status
	#[command(subcommand)]
	Orders(OrdersCommand),
	/// Menu catalog
	#[command(subcommand)]
	Menu(MenuCommand),
	/// Stall profile
	#[command(subcommand)]
	Profile(ProfileCommand),
	/// Customer reviews of the stall
	Reviews(ReviewsArgs),
}

#[derive(Subcommand, Debug)]
pub enum OrdersCommand {
	/// List orders, active ones by default
	List {
		/// Only orders in this status
		#[arg(long, conflicts_with_all = ["history", "all"])]
		status: Option<OrderStatus>,
		/// Completed, rejected and cancelled orders
		#[arg(long, conflicts_with = "all")]
		history: bool,
		#[arg(long)]
		all: bool,
		#[arg(long, default_value_t = 1)]
		page: u32,
		/// Defaults to `orders.page_size`
		#[arg(long)]
		limit: Option<u32>,
	},
	Show {
		id: String,
	},
	/// Accept the payment proof
	Confirm {
		id: String,
	},
	/// Refuse the payment proof, telling the customer why
	Reject {
		id: String,
		#[arg(short, long)]
		reason: String,
	},
	/// Mark the order ready for pickup or delivery
	Ready {
		id: String,
	},
	Complete {
		id: String,
	},
}

#[derive(Subcommand, Debug)]
pub enum MenuCommand {
	List,
	Add {
		#[arg(long)]
		name: String,
		#[arg(long)]
		price: u64,
		#[arg(long = "category", required = true)]
		categories: Vec<String>,
		#[arg(long, default_value = "")]
		description: String,
		/// Create the item as sold out
		#[arg(long)]
		unavailable: bool,
	},
	Edit {
		id: String,
		#[arg(long)]
		name: Option<String>,
		#[arg(long)]
		price: Option<u64>,
		#[arg(long = "category")]
		categories: Vec<String>,
		#[arg(long)]
		description: Option<String>,
	},
	/// Flip between available and sold out
	Toggle {
		id: String,
	},
	Delete {
		id: String,
	},
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
	Show,
	Edit {
		#[arg(long)]
		name: Option<String>,
		#[arg(long)]
		description: Option<String>,
		#[arg(long)]
		category: Option<StallCategory>,
		#[arg(long = "food-type")]
		food_types: Vec<String>,
	},
	/// Delete the stall. The current name must be typed to confirm.
	Delete {
		#[arg(long)]
		confirm_name: String,
	},
}

#[derive(Args, Debug)]
pub struct ReviewsArgs {
	/// Only reviews with this many stars
	#[arg(long)]
	rating: Option<u8>,
	#[arg(long, default_value = "createdAt")]
	sort_by: ReviewSortBy,
	#[arg(long, default_value = "desc")]
	order: SortOrder,
	#[arg(long, default_value_t = 1)]
	page: u32,
	#[arg(long, default_value_t = 10)]
	limit: u32,
}

pub async fn run(console: &Console, command: Command) -> CommandResult {
	match command {
		Command::Login {
			identifier,
			password,
		} => {
			let user = console
				.session()
				.login(&identifier, SecretString::from(password))
				.await?;
			println!("Signed in as {}", render::user(&user));
		},
		Command::Logout => {
			console.session().logout().await?;
			println!("Signed out");
		},
		Command::Whoami => match console.session().user().await {
			None => println!("Not signed in"),
			Some(user) => {
				let valid = console.session().check().await?;
				println!(
					"{} ({})",
					render::user(&user),
					if valid { "session valid" } else { "session expired" }
				);
			},
		},
		Command::Orders(command) => orders(console, command).await?,
		Command::Menu(command) => menu(console, command).await?,
		Command::Profile(command) => profile(console, command).await?,
		Command::Reviews(args) => {
			let page = console
				.profile()
				.reviews(&ReviewQuery {
					rating: args.rating,
					page: args.page,
					limit: args.limit,
					sort_by: args.sort_by,
					sort_order: args.order,
				})
				.await?;
			for review in &page.data {
				println!("{}", render::review_line(review));
			}
			println!("{}", render::page_footer(page.data.len(), &page.meta));
		},
	}
	Ok(())
}

async fn orders(console: &Console, command: OrdersCommand) -> CommandResult {
	let desk = console.orders();
	let order = match command {
		OrdersCommand::List {
			status,
			history,
			all,
			page,
			limit,
		} => {
			let filter = match (status, history, all) {
				(Some(status), _, _) => OrderFilter::Status(status),
				(None, true, _) => OrderFilter::History,
				(None, false, true) => OrderFilter::All,
				(None, false, false) => OrderFilter::Active,
			};
			let limit = limit.unwrap_or(console.config().orders.page_size);
			let meta = desk.refresh(filter, page, limit).await?;
			let shown = desk.filtered(filter).await;
			for order in &shown {
				println!("{}", render::order_line(order));
			}
			println!("{}", render::page_footer(shown.len(), &meta));
			if filter != OrderFilter::Active {
				println!("{} active order(s)", desk.active_count().await);
			}
			return Ok(());
		},
		OrdersCommand::Show { id } => match desk.order(&id).await {
			Some(order) => order,
			None => desk.fetch(&id).await?,
		},
		OrdersCommand::Confirm { id } => desk.confirm_payment(&id).await?,
		OrdersCommand::Reject { id, reason } => desk.reject_payment(&id, &reason).await?,
		OrdersCommand::Ready { id } => desk.mark_ready(&id).await?,
		OrdersCommand::Complete { id } => desk.complete(&id).await?,
	};
	println!("{}", render::order_detail(&order));
	Ok(())
}

async fn menu(console: &Console, command: MenuCommand) -> CommandResult {
	let handler = console.menu();
	match command {
		MenuCommand::List => {
			handler.refresh().await?;
			for item in handler.items().await {
				println!("{}", render::menu_line(&item));
			}
		},
		MenuCommand::Add {
			name,
			price,
			categories,
			description,
			unavailable,
		} => {
			let item = handler
				.create(&MenuItemInput {
					name,
					description,
					category: categories,
					price,
					is_available: !unavailable,
				})
				.await?;
			println!("{}", render::menu_line(&item));
		},
		MenuCommand::Edit {
			id,
			name,
			price,
			categories,
			description,
		} => {
			let update = MenuItemUpdate {
				name,
				description,
				category: (!categories.is_empty()).then_some(categories),
				price,
				is_available: None,
			};
			let item = handler.update(&id, &update).await?;
			println!("{}", render::menu_line(&item));
		},
		MenuCommand::Toggle { id } => {
			handler.refresh().await?;
			let item = handler.toggle_availability(&id).await?;
			println!("{}", render::menu_line(&item));
		},
		MenuCommand::Delete { id } => {
			handler.delete(&id).await?;
			println!("Deleted {}", id);
		},
	}
	Ok(())
}

async fn profile(console: &Console, command: ProfileCommand) -> CommandResult {
	let handler = console.profile();
	match command {
		ProfileCommand::Show => println!("{}", render::stall(&handler.show().await?)),
		ProfileCommand::Edit {
			name,
			description,
			category,
			food_types,
		} => {
			let stall = handler
				.update(&StallUpdate {
					name,
					description,
					category,
					food_types: (!food_types.is_empty()).then_some(food_types),
				})
				.await?;
			println!("{}", render::stall(&stall));
		},
		ProfileCommand::Delete { confirm_name } => {
			handler.delete(&confirm_name).await?;
			println!("Stall deleted");
		},
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::Parser;

	#[derive(Parser, Debug)]
	struct Cli {
		#[command(subcommand)]
		command: Command,
	}

	#[test]
	fn test_parse_reject_with_reason() {
		let cli = Cli::try_parse_from([
			"stallctl",
			"orders",
			"reject",
			"O2",
			"--reason",
			"Bukti transfer tidak terbaca",
		])
		.unwrap();
		match cli.command {
			Command::Orders(OrdersCommand::Reject { id, reason }) => {
				assert_eq!(id, "O2");
				assert_eq!(reason, "Bukti transfer tidak terbaca");
			},
			other => panic!("unexpected command {:?}", other),
		}
	}

	#[test]
	fn test_parse_status_filter() {
		let cli = Cli::try_parse_from(["stallctl", "orders", "list", "--status", "processing"])
			.unwrap();
		assert!(matches!(
			cli.command,
			Command::Orders(OrdersCommand::List {
				status: Some(OrderStatus::Processing),
				..
			})
		));

		assert!(Cli::try_parse_from(["stallctl", "orders", "list", "--status", "shipped"]).is_err());
		assert!(
			Cli::try_parse_from(["stallctl", "orders", "list", "--history", "--all"]).is_err()
		);
	}

	#[test]
	fn test_parse_review_defaults() {
		let cli = Cli::try_parse_from(["stallctl", "reviews", "--rating", "5"]).unwrap();
		match cli.command {
			Command::Reviews(args) => {
				assert_eq!(args.rating, Some(5));
				assert_eq!(args.sort_by, ReviewSortBy::CreatedAt);
				assert_eq!(args.order, SortOrder::Desc);
				assert_eq!(args.limit, 10);
			},
			other => panic!("unexpected command {:?}", other),
		}
	}
}
