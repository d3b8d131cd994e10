//! Screen-slot allocation: a grid of non-overlapping window regions.
//!
//! One allocator instance is injected into the orchestrator (no global
//! state), so tests can run isolated grids in parallel. When every slot
//! is taken the grid extends one slot at a time past its capacity; the
//! extension wraps back onto existing positions, trading overlap for
//! never refusing a window.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::config::{ScreenConfig, WindowConfig};

/// Pixel region reserved for one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SlotBounds {
	pub x: i32,
	pub y: i32,
	pub width: u32,
	pub height: u32,
}

impl SlotBounds {
	pub fn overlaps(&self, other: &SlotBounds) -> bool {
		let self_right = self.x + self.width as i32;
		let self_bottom = self.y + self.height as i32;
		let other_right = other.x + other.width as i32;
		let other_bottom = other.y + other.height as i32;
		self.x < other_right && other.x < self_right && self.y < other_bottom && other.y < self_bottom
	}
}

/// Snapshot of the grid for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct GridInfo {
	pub cols: u32,
	pub rows: u32,
	pub max_slots: usize,
	pub in_use: usize,
}

struct GridState {
	occupied: Vec<bool>,
}

/// Hands out screen slots under a mutex.
pub struct SlotAllocator {
	screen: ScreenConfig,
	window: WindowConfig,
	cols: u32,
	rows: u32,
	base_slots: usize,
	state: Mutex<GridState>,
}

impl SlotAllocator {
	pub fn new(screen: ScreenConfig, window: WindowConfig) -> Self {
		let usable_width = screen.width.saturating_sub(screen.left_offset);
		let usable_height = screen
			.height
			.saturating_sub(screen.top_offset)
			.saturating_sub(screen.taskbar_clearance);
		let cols = (usable_width / (window.width + window.margin)).max(1);
		let rows = (usable_height / (window.height + window.margin)).max(1);
		let base_slots = (cols * rows) as usize;
		Self {
			screen,
			window,
			cols,
			rows,
			base_slots,
			state: Mutex::new(GridState {
				occupied: vec![false; base_slots],
			}),
		}
	}

	/// Claims the first free slot, extending the grid when none is free.
	pub fn acquire(self: &Arc<Self>) -> SlotGuard {
		let mut state = self.state.lock();
		let id = match state.occupied.iter().position(|taken| !taken) {
			Some(id) => {
				state.occupied[id] = true;
				id
			}
			None => {
				// Grid exhausted: extend by one slot. The new slot wraps
				// onto an existing position, so its window may overlap.
				let id = state.occupied.len();
				state.occupied.push(true);
				tracing::warn!(target: "drover::slots", id, "grid exhausted, extending with overlap");
				id
			}
		};
		SlotGuard {
			allocator: Arc::clone(self),
			id,
			released: AtomicBool::new(false),
		}
	}

	fn release(&self, id: usize) {
		let mut state = self.state.lock();
		if let Some(taken) = state.occupied.get_mut(id) {
			debug_assert!(*taken, "slot {id} released while free");
			*taken = false;
		}
	}

	/// Region for a slot id. Extended ids wrap back over the grid.
	pub fn bounds(&self, id: usize) -> SlotBounds {
		let col = id as u32 % self.cols;
		let row = (id as u32 / self.cols) % self.rows;
		SlotBounds {
			x: (self.screen.left_offset + col * (self.window.width + self.window.margin)) as i32,
			y: (self.screen.top_offset + row * (self.window.height + self.window.margin)) as i32,
			width: self.window.width,
			height: self.window.height,
		}
	}

	pub fn grid_info(&self) -> GridInfo {
		let state = self.state.lock();
		GridInfo {
			cols: self.cols,
			rows: self.rows,
			max_slots: state.occupied.len().max(self.base_slots),
			in_use: state.occupied.iter().filter(|taken| **taken).count(),
		}
	}
}

/// An acquired slot. Releasing is structural: dropping the guard returns
/// the slot exactly once, no matter which state the task died in.
pub struct SlotGuard {
	allocator: Arc<SlotAllocator>,
	id: usize,
	released: AtomicBool,
}

impl SlotGuard {
	pub fn id(&self) -> usize {
		self.id
	}

	pub fn bounds(&self) -> SlotBounds {
		self.allocator.bounds(self.id)
	}
}

impl Drop for SlotGuard {
	fn drop(&mut self) {
		if !self.released.swap(true, Ordering::SeqCst) {
			self.allocator.release(self.id);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn allocator(screen_w: u32, screen_h: u32, win_w: u32, win_h: u32, margin: u32) -> Arc<SlotAllocator> {
		Arc::new(SlotAllocator::new(
			ScreenConfig {
				width: screen_w,
				height: screen_h,
				left_offset: 0,
				top_offset: 0,
				taskbar_clearance: 0,
			},
			WindowConfig {
				width: win_w,
				height: win_h,
				margin,
			},
		))
	}

	#[test]
	fn full_hd_grid_matches_expected_dimensions() {
		let allocator = allocator(1920, 1080, 400, 300, 10);
		let info = allocator.grid_info();
		assert_eq!(info.cols, 4);
		assert_eq!(info.rows, 3);
		assert_eq!(info.max_slots, 12);
	}

	#[test]
	fn thirteenth_acquire_extends_the_grid() {
		let allocator = allocator(1920, 1080, 400, 300, 10);
		let guards: Vec<_> = (0..13).map(|_| allocator.acquire()).collect();
		let ids: Vec<_> = guards.iter().map(|g| g.id()).collect();
		assert_eq!(ids, (0..=12).collect::<Vec<_>>());
		// The extension slot wraps onto slot 0's position.
		assert_eq!(guards[12].bounds(), guards[0].bounds());
		assert_eq!(allocator.grid_info().max_slots, 13);
	}

	#[test]
	fn active_base_slots_never_overlap() {
		for (screen_w, screen_h, win_w, win_h, margin) in [
			(1920u32, 1080u32, 400u32, 300u32, 10u32),
			(5120, 1440, 1000, 1500, 10),
			(1366, 768, 500, 400, 5),
			(800, 600, 300, 300, 0),
		] {
			let allocator = allocator(screen_w, screen_h, win_w, win_h, margin);
			let info = allocator.grid_info();
			let guards: Vec<_> = (0..info.max_slots).map(|_| allocator.acquire()).collect();
			for a in &guards {
				for b in &guards {
					if a.id() != b.id() {
						assert!(
							!a.bounds().overlaps(&b.bounds()),
							"slots {} and {} overlap in {screen_w}x{screen_h}",
							a.id(),
							b.id()
						);
					}
				}
			}
		}
	}

	#[test]
	fn release_restores_prior_occupancy_for_every_id() {
		let allocator = allocator(1920, 1080, 400, 300, 10);
		let max = allocator.grid_info().max_slots;
		for _ in 0..max {
			let before: Vec<_> = {
				let state = allocator.state.lock();
				state.occupied.clone()
			};
			let guard = allocator.acquire();
			drop(guard);
			let after: Vec<_> = {
				let state = allocator.state.lock();
				state.occupied.clone()
			};
			assert_eq!(before, after);
			// Occupy one more so the next iteration tests the next id.
			std::mem::forget(allocator.acquire());
		}
	}

	#[test]
	fn freed_slot_is_reused_first() {
		let allocator = allocator(1920, 1080, 400, 300, 10);
		let a = allocator.acquire();
		let b = allocator.acquire();
		assert_eq!(a.id(), 0);
		assert_eq!(b.id(), 1);
		drop(a);
		let c = allocator.acquire();
		assert_eq!(c.id(), 0);
	}

	#[test]
	fn bounds_follow_grid_arithmetic() {
		let allocator = allocator(1920, 1080, 400, 300, 10);
		assert_eq!(
			allocator.bounds(0),
			SlotBounds { x: 0, y: 0, width: 400, height: 300 }
		);
		assert_eq!(
			allocator.bounds(5),
			SlotBounds { x: 410, y: 310, width: 400, height: 300 }
		);
		assert_eq!(
			allocator.bounds(11),
			SlotBounds { x: 1230, y: 620, width: 400, height: 300 }
		);
	}

	#[test]
	fn degenerate_screen_still_yields_one_slot() {
		let allocator = allocator(200, 100, 400, 300, 10);
		let info = allocator.grid_info();
		assert_eq!((info.cols, info.rows), (1, 1));
		let guard = allocator.acquire();
		assert_eq!(guard.id(), 0);
	}
}
