//! Staged scrolling: one logical scroll becomes 3–6 bursts with pauses.

use std::time::Duration;

use rand::Rng;

use drover_runtime::Session;

use super::pacing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
	Down,
	Up,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSegment {
	/// Signed pixel delta for `window.scrollBy`.
	pub delta: i64,
	pub pause: Duration,
}

/// Splits `amount` pixels into 3–6 segments whose deltas sum to the
/// whole amount, signed by direction.
pub fn plan_scroll(rng: &mut impl Rng, direction: ScrollDirection, amount: u32) -> Vec<ScrollSegment> {
	let segments = rng.gen_range(3..=6).min(amount.max(1)) as u64;
	let amount = amount.max(1) as u64;
	let base = amount / segments;
	let remainder = amount % segments;
	let sign = match direction {
		ScrollDirection::Down => 1,
		ScrollDirection::Up => -1,
	};
	(0..segments)
		.map(|i| {
			let chunk = base + u64::from(i < remainder);
			ScrollSegment {
				delta: sign * chunk as i64,
				pause: pacing::pick(rng, pacing::SCROLL_PAUSE_MS),
			}
		})
		.collect()
}

/// Scrolls the page in human-looking bursts.
pub async fn scroll(
	session: &Session,
	direction: ScrollDirection,
	amount: u32,
) -> drover_runtime::Result<()> {
	let plan = plan_scroll(&mut rand::thread_rng(), direction, amount);
	for segment in &plan {
		session
			.evaluate(&format!("window.scrollBy(0, {}); true", segment.delta))
			.await?;
		tokio::time::sleep(segment.pause).await;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	use super::*;

	#[test]
	fn segments_sum_to_the_requested_amount() {
		for seed in 0..30 {
			let mut rng = StdRng::seed_from_u64(seed);
			let plan = plan_scroll(&mut rng, ScrollDirection::Down, 600);
			assert!((3..=6).contains(&plan.len()), "seed {seed}");
			let total: i64 = plan.iter().map(|s| s.delta).sum();
			assert_eq!(total, 600);
		}
	}

	#[test]
	fn upward_scroll_is_negative() {
		let mut rng = StdRng::seed_from_u64(5);
		let plan = plan_scroll(&mut rng, ScrollDirection::Up, 400);
		assert!(plan.iter().all(|s| s.delta < 0));
		let total: i64 = plan.iter().map(|s| s.delta).sum();
		assert_eq!(total, -400);
	}

	#[test]
	fn tiny_amounts_do_not_produce_zero_segments() {
		let mut rng = StdRng::seed_from_u64(1);
		let plan = plan_scroll(&mut rng, ScrollDirection::Down, 2);
		let total: i64 = plan.iter().map(|s| s.delta).sum();
		assert_eq!(total, 2);
		assert!(plan.iter().all(|s| s.delta > 0));
	}
}
