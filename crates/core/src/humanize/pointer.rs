//! Curved pointer movement.
//!
//! Paths are quadratic Béziers from a randomized synthetic origin through
//! a randomized control point to the target, one move event per step.
//! The path is decoration: errors while walking it are logged and
//! swallowed, only the press/release of [`click`] affect correctness.

use std::time::Duration;

use rand::Rng;
use tracing::debug;

use drover_runtime::Session;

use super::pacing;

pub const DEFAULT_STEPS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}
}

#[derive(Debug, Clone, Copy)]
pub struct PathStep {
	pub point: Point,
	pub pause: Duration,
}

/// Points along the quadratic Bézier `(1-t)²·from + 2t(1-t)·ctrl + t²·to`,
/// endpoint inclusive.
pub fn bezier_path(from: Point, ctrl: Point, to: Point, steps: usize) -> Vec<Point> {
	let steps = steps.max(1);
	(1..=steps)
		.map(|i| {
			let t = i as f64 / steps as f64;
			let u = 1.0 - t;
			Point {
				x: u * u * from.x + 2.0 * u * t * ctrl.x + t * t * to.x,
				y: u * u * from.y + 2.0 * u * t * ctrl.y + t * t * to.y,
			}
		})
		.collect()
}

/// Plans a move to `to`: random origin in the target's neighborhood,
/// random bow in the control point, randomized per-step pauses.
pub fn plan_move(rng: &mut impl Rng, to: Point, steps: usize) -> Vec<PathStep> {
	let from = Point {
		x: (to.x + rng.gen_range(-300.0..300.0)).max(0.0),
		y: (to.y + rng.gen_range(-200.0..200.0)).max(0.0),
	};
	let ctrl = Point {
		x: ((from.x + to.x) / 2.0 + rng.gen_range(-80.0..80.0)).max(0.0),
		y: ((from.y + to.y) / 2.0 + rng.gen_range(-80.0..80.0)).max(0.0),
	};
	bezier_path(from, ctrl, to, steps)
		.into_iter()
		.map(|point| PathStep {
			point,
			pause: pacing::pick(rng, pacing::POINTER_STEP_MS),
		})
		.collect()
}

/// Walks a curved path to the target. Cosmetic: failures are logged,
/// never surfaced.
pub async fn move_pointer(session: &Session, to: Point) -> Point {
	let plan = plan_move(&mut rand::thread_rng(), to, DEFAULT_STEPS);
	for step in &plan {
		if let Err(err) = session.mouse_move(step.point.x, step.point.y).await {
			debug!(target: "drover::humanize", %err, "pointer step dropped");
			break;
		}
		tokio::time::sleep(step.pause).await;
	}
	to
}

/// Moves to the target, then presses and releases with a human dwell.
pub async fn click(session: &Session, to: Point) -> drover_runtime::Result<()> {
	move_pointer(session, to).await;
	let dwell = pacing::pick(&mut rand::thread_rng(), pacing::CLICK_DWELL_MS);
	session.mouse_press(to.x, to.y).await?;
	tokio::time::sleep(dwell).await;
	session.mouse_release(to.x, to.y).await
}
