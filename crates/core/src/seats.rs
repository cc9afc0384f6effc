//! Seat Selector: choose a concrete seat set for a quantity and section policy.

use crate::error::{Result, SeatwatchError};
use crate::html::Document;
use crate::site::Site;
use crate::target::SeatPreference;

/// One open seat as scraped from a seat map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatCandidate {
	pub id: String,
	pub section: String,
	pub row: Option<String>,
	pub number: Option<u32>,
}

impl SeatCandidate {
	pub fn new(id: impl Into<String>, section: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			section: section.into(),
			row: None,
			number: None,
		}
	}

	pub fn at(mut self, row: impl Into<String>, number: u32) -> Self {
		self.row = Some(row.into());
		self.number = Some(number);
		self
	}

	fn in_section(&self, section: &str) -> bool {
		self.section.trim().eq_ignore_ascii_case(section.trim())
	}
}

/// Picks `quantity` seats.
///
/// Candidates are tiered as primary section, secondary section, then any
/// section. With adjacency the first tier holding at least `quantity` seats
/// decides: its first contiguous run within one row wins, and no run means
/// failure rather than scattered seats. Without adjacency seats are taken in
/// encounter order, filling from each tier in turn.
pub fn select_seats(candidates: &[SeatCandidate], quantity: u32, preference: &SeatPreference) -> Result<Vec<SeatCandidate>> {
	let wanted = quantity as usize;
	if wanted == 0 {
		return Ok(Vec::new());
	}

	let primary: Vec<&SeatCandidate> = match &preference.primary {
		Some(section) => candidates.iter().filter(|c| c.in_section(section)).collect(),
		None => Vec::new(),
	};
	let secondary: Vec<&SeatCandidate> = match &preference.secondary {
		Some(section) => candidates
			.iter()
			.filter(|c| c.in_section(section) && !preference.primary.as_deref().is_some_and(|p| c.in_section(p)))
			.collect(),
		None => Vec::new(),
	};
	let any: Vec<&SeatCandidate> = candidates.iter().collect();

	if preference.adjacent {
		for tier in [&primary, &secondary, &any] {
			if tier.len() >= wanted {
				return match first_contiguous_run(tier, wanted) {
					Some(run) => Ok(run.into_iter().cloned().collect()),
					None => Err(SeatwatchError::InsufficientSeats {
						wanted: quantity,
						found: longest_run(tier) as u32,
					}),
				};
			}
		}
		return Err(SeatwatchError::InsufficientSeats {
			wanted: quantity,
			found: longest_run(&any) as u32,
		});
	}

	let mut chosen: Vec<&SeatCandidate> = Vec::with_capacity(wanted);
	for tier in [&primary, &secondary, &any] {
		for seat in tier.iter() {
			if chosen.len() == wanted {
				break;
			}
			if !chosen.iter().any(|c| std::ptr::eq(*c, *seat)) {
				chosen.push(*seat);
			}
		}
	}

	if chosen.len() < wanted {
		return Err(SeatwatchError::InsufficientSeats {
			wanted: quantity,
			found: chosen.len() as u32,
		});
	}
	Ok(chosen.into_iter().cloned().collect())
}

/// Seats of `tier` grouped by (section, row) in encounter order, each sorted by number.
fn rows<'a>(tier: &[&'a SeatCandidate]) -> Vec<Vec<&'a SeatCandidate>> {
	let mut groups: Vec<((String, String), Vec<&'a SeatCandidate>)> = Vec::new();
	for seat in tier.iter().copied().filter(|s| s.number.is_some()) {
		let key = (seat.section.to_ascii_lowercase(), seat.row.clone().unwrap_or_default());
		match groups.iter_mut().find(|(k, _)| *k == key) {
			Some((_, seats)) => seats.push(seat),
			None => groups.push((key, vec![seat])),
		}
	}
	groups
		.into_iter()
		.map(|(_, mut seats)| {
			seats.sort_by_key(|s| s.number);
			seats.dedup_by_key(|s| s.number);
			seats
		})
		.collect()
}

fn first_contiguous_run<'a>(tier: &[&'a SeatCandidate], wanted: usize) -> Option<Vec<&'a SeatCandidate>> {
	for row in rows(tier) {
		if row.len() < wanted {
			continue;
		}
		for window in row.windows(wanted) {
			let first = window[0].number.unwrap_or(0);
			let last = window[wanted - 1].number.unwrap_or(0);
			if last - first == (wanted - 1) as u32 {
				return Some(window.to_vec());
			}
		}
	}
	None
}

fn longest_run(tier: &[&SeatCandidate]) -> usize {
	rows(tier)
		.iter()
		.map(|row| {
			let mut best = 0;
			let mut current = 0;
			let mut previous: Option<u32> = None;
			for seat in row {
				let n = seat.number.unwrap_or(0);
				current = if previous.is_some_and(|p| p + 1 == n) { current + 1 } else { 1 };
				best = best.max(current);
				previous = Some(n);
			}
			best
		})
		.max()
		.unwrap_or(0)
}

/// Open seats on a seat-map page.
pub fn scrape_seats(site: &Site, doc: &Document) -> Vec<SeatCandidate> {
	let Some((_, elements)) = site.selectors.seat.first_match(doc) else {
		return Vec::new();
	};

	elements
		.iter()
		.filter_map(|el| {
			let id = el
				.attr("data-seat-id")
				.or_else(|| el.attr("data-id"))
				.or_else(|| el.attr("value"))
				.or_else(|| el.attr("id"))?;
			let number = el
				.attr("data-number")
				.or_else(|| el.attr("data-seat"))
				.and_then(|n| n.trim().parse::<u32>().ok());
			Some(SeatCandidate {
				id,
				section: el.closest_attr("data-section").unwrap_or_default(),
				row: el.closest_attr("data-row"),
				number,
			})
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn row(section: &str, row: &str, numbers: &[u32]) -> Vec<SeatCandidate> {
		numbers.iter().map(|n| SeatCandidate::new(format!("{}{}{}", section, row, n), section).at(row, *n)).collect()
	}

	fn ids(seats: &[SeatCandidate]) -> Vec<&str> {
		seats.iter().map(|s| s.id.as_str()).collect()
	}

	#[test]
	fn adjacent_selection_takes_first_contiguous_run() {
		let candidates = row("P", "A", &[1, 2, 3, 4, 5, 6]);
		let preference = SeatPreference::new().primary("P").adjacent(true);
		let seats = select_seats(&candidates, 3, &preference).unwrap();
		assert_eq!(ids(&seats), ["PA1", "PA2", "PA3"]);
	}

	#[test]
	fn adjacent_selection_skips_gaps() {
		let mut candidates = row("P", "A", &[1, 2, 4, 5]);
		candidates.extend(row("P", "B", &[7, 8, 9]));
		let preference = SeatPreference::new().primary("P").adjacent(true);
		let seats = select_seats(&candidates, 3, &preference).unwrap();
		assert_eq!(ids(&seats), ["PB7", "PB8", "PB9"]);
	}

	#[test]
	fn adjacent_selection_fails_instead_of_scattering() {
		let candidates = row("P", "A", &[1, 3, 5, 7]);
		let preference = SeatPreference::new().primary("P").adjacent(true);
		match select_seats(&candidates, 2, &preference) {
			Err(SeatwatchError::InsufficientSeats { wanted: 2, found: 1 }) => {}
			other => panic!("expected InsufficientSeats, got {other:?}"),
		}
	}

	#[test]
	fn fills_from_secondary_when_primary_is_short() {
		let mut candidates = vec![SeatCandidate::new("p1", "Primary")];
		candidates.extend((1..=4).map(|i| SeatCandidate::new(format!("s{}", i), "Secondary")));
		let preference = SeatPreference::new().primary("Primary").secondary("Secondary");
		let seats = select_seats(&candidates, 3, &preference).unwrap();
		assert_eq!(ids(&seats), ["p1", "s1", "s2"]);
	}

	#[test]
	fn falls_back_to_any_section() {
		let candidates = vec![
			SeatCandidate::new("x1", "Upper"),
			SeatCandidate::new("p1", "Primary"),
			SeatCandidate::new("x2", "Upper"),
		];
		let preference = SeatPreference::new().primary("primary").secondary("Lower");
		let seats = select_seats(&candidates, 2, &preference).unwrap();
		assert_eq!(ids(&seats), ["p1", "x1"]);
	}

	#[test]
	fn short_inventory_is_a_failure_not_a_partial_result() {
		let candidates: Vec<_> = (1..=4).map(|i| SeatCandidate::new(format!("s{}", i), "Any")).collect();
		match select_seats(&candidates, 5, &SeatPreference::new()) {
			Err(SeatwatchError::InsufficientSeats { wanted: 5, found: 4 }) => {}
			other => panic!("expected InsufficientSeats, got {other:?}"),
		}
	}

	#[test]
	fn scrapes_open_seats_with_section_and_row() {
		let site = Site::default();
		let doc = Document::parse(
			r#"<div class="section" data-section="North"><div data-row="C">
				<span class="seat" data-seat-id="n-c-1" data-number="1"></span>
				<span class="seat sold-out" data-seat-id="n-c-2" data-number="2"></span>
				<span class="seat" data-seat-id="n-c-3" data-number="3"></span>
			</div></div>"#,
		);
		let seats = scrape_seats(&site, &doc);
		assert_eq!(seats.len(), 2);
		assert_eq!(seats[1], SeatCandidate::new("n-c-3", "North").at("C", 3));
	}
}
