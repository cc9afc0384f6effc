//! Rendering of command results as text or JSON.

use anyhow::Result;
use colored::Colorize;
use seatwatch::protocol::{AvailabilitySnapshot, EventListing};
use serde::Serialize;

use crate::cli::OutputFormat;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}

pub fn print_snapshot(format: OutputFormat, url: &str, snapshot: &AvailabilitySnapshot) -> Result<()> {
	match format {
		OutputFormat::Json => print_json(snapshot),
		OutputFormat::Text => {
			println!("{}", snapshot_text(url, snapshot));
			Ok(())
		}
	}
}

pub fn print_listings(format: OutputFormat, term: &str, listings: &[EventListing]) -> Result<()> {
	match format {
		OutputFormat::Json => print_json(listings),
		OutputFormat::Text => {
			if listings.is_empty() {
				println!("No events found for {}", term.bold());
			}
			for listing in listings {
				println!("{}", listing_text(listing));
			}
			Ok(())
		}
	}
}

fn snapshot_text(url: &str, snapshot: &AvailabilitySnapshot) -> String {
	let verdict = if snapshot.available {
		"AVAILABLE".green().bold()
	} else {
		"NOT AVAILABLE".red().bold()
	};
	let mut out = format!("{} {}\n  reason: {}  via: {}", verdict, url, snapshot.reason, snapshot.strategy);
	for category in &snapshot.ticket_categories {
		let mark = if category.available { "+".green() } else { "-".dimmed() };
		out.push_str(&format!("\n  {} {}", mark, category.name));
		if let Some(price) = &category.price {
			out.push_str(&format!(" ({})", price));
		}
	}
	out
}

fn listing_text(listing: &EventListing) -> String {
	let mut out = format!("{}\n  {}", listing.title.bold(), listing.url.cyan());
	let details: Vec<&str> = [listing.date.as_deref(), listing.location.as_deref(), listing.price.as_deref()]
		.into_iter()
		.flatten()
		.collect();
	if !details.is_empty() {
		out.push_str(&format!("\n  {}", details.join(" | ")));
	}
	if !listing.teams.is_empty() {
		out.push_str(&format!("\n  teams: {}", listing.teams.join(" vs ")));
	}
	out
}
