//! Shared timing ranges, all uniform, all in milliseconds.

use std::ops::Range;
use std::time::Duration;

use rand::Rng;

/// Between two pointer path steps.
pub(crate) const POINTER_STEP_MS: Range<u64> = 5..20;
/// Button held down during a click.
pub(crate) const CLICK_DWELL_MS: Range<u64> = 50..150;
/// Plain keystroke.
pub(crate) const KEY_DEFAULT_MS: Range<u64> = 30..100;
/// Uppercase needs the shift hand.
pub(crate) const KEY_UPPER_MS: Range<u64> = 60..160;
/// Punctuation and spaces are where people hesitate.
pub(crate) const KEY_PUNCT_MS: Range<u64> = 80..200;
/// Paragraph breaks read like thinking.
pub(crate) const KEY_NEWLINE_MS: Range<u64> = 300..600;
/// Noticing and fixing a typo.
pub(crate) const TYPO_NOTICE_MS: Range<u64> = 100..300;
pub(crate) const TYPO_FIX_MS: Range<u64> = 100..200;
/// Between scroll bursts.
pub(crate) const SCROLL_PAUSE_MS: Range<u64> = 50..150;

pub(crate) fn pick(rng: &mut impl Rng, range: Range<u64>) -> Duration {
	Duration::from_millis(rng.gen_range(range))
}
