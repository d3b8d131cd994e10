//! Variable-speed typing with occasional typo-and-correct.
//!
//! Carried over from the source behavior: roughly 3% of lowercase
//! letters come out as a neighboring key first, get noticed, backspaced,
//! and retyped. Delays depend on character class — punctuation and
//! spaces slowest, uppercase slower, everything else fastest — with
//! paragraph breaks pausing longest.

use std::time::Duration;

use rand::Rng;

use drover_runtime::Session;

use super::pacing;

const TYPO_CHANCE: f64 = 0.03;

/// Keyboard neighbors used to pick a plausible wrong key.
fn neighbors(ch: char) -> Option<&'static [char]> {
	let pair: &[char] = match ch {
		'a' => &['s', 'q'],
		'b' => &['v', 'n'],
		'c' => &['x', 'v'],
		'd' => &['s', 'f'],
		'e' => &['w', 'r'],
		'f' => &['d', 'g'],
		'g' => &['f', 'h'],
		'h' => &['g', 'j'],
		'i' => &['u', 'o'],
		'j' => &['h', 'k'],
		'k' => &['j', 'l'],
		'l' => &['k', 'o'],
		'm' => &['n', 'k'],
		'n' => &['b', 'm'],
		'o' => &['i', 'p'],
		'p' => &['o', 'l'],
		'r' => &['e', 't'],
		's' => &['a', 'd'],
		't' => &['r', 'y'],
		'u' => &['y', 'i'],
		'v' => &['c', 'b'],
		'w' => &['q', 'e'],
		'x' => &['z', 'c'],
		'y' => &['t', 'u'],
		_ => return None,
	};
	Some(pair)
}

fn class_pause(rng: &mut impl Rng, ch: char) -> Duration {
	if ch == '\n' {
		pacing::pick(rng, pacing::KEY_NEWLINE_MS)
	} else if ch == ' ' || ch.is_ascii_punctuation() {
		pacing::pick(rng, pacing::KEY_PUNCT_MS)
	} else if ch.is_uppercase() {
		pacing::pick(rng, pacing::KEY_UPPER_MS)
	} else {
		pacing::pick(rng, pacing::KEY_DEFAULT_MS)
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeStep {
	Insert { ch: char, pause: Duration },
	Backspace { pause: Duration },
}

/// Expands text into a keystroke script.
pub fn plan_typing(rng: &mut impl Rng, text: &str) -> Vec<TypeStep> {
	let mut plan = Vec::with_capacity(text.len());
	for ch in text.chars() {
		if let Some(wrong_keys) = neighbors(ch) {
			if rng.gen_bool(TYPO_CHANCE) {
				let wrong = wrong_keys[rng.gen_range(0..wrong_keys.len())];
				plan.push(TypeStep::Insert {
					ch: wrong,
					pause: pacing::pick(rng, pacing::TYPO_NOTICE_MS),
				});
				plan.push(TypeStep::Backspace {
					pause: pacing::pick(rng, pacing::TYPO_FIX_MS),
				});
			}
		}
		plan.push(TypeStep::Insert {
			ch,
			pause: class_pause(rng, ch),
		});
	}
	plan
}

/// Replays a keystroke script against the focused element.
pub async fn replay(session: &Session, plan: &[TypeStep]) -> drover_runtime::Result<()> {
	let mut buffer = [0u8; 4];
	for step in plan {
		match step {
			TypeStep::Insert { ch, pause } => {
				session.insert_text(ch.encode_utf8(&mut buffer)).await?;
				tokio::time::sleep(*pause).await;
			}
			TypeStep::Backspace { pause } => {
				session.key_tap("Backspace", "Backspace").await?;
				tokio::time::sleep(*pause).await;
			}
		}
	}
	Ok(())
}

/// Types `text` into the currently focused element, character by
/// character, with human cadence and occasional corrected typos.
pub async fn type_text(session: &Session, text: &str) -> drover_runtime::Result<()> {
	let plan = plan_typing(&mut rand::thread_rng(), text);
	replay(session, &plan).await
}

#[cfg(test)]
mod tests {
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	use super::*;

	/// What the page's input would hold after replaying the plan.
	fn rendered(plan: &[TypeStep]) -> String {
		let mut out = String::new();
		for step in plan {
			match step {
				TypeStep::Insert { ch, .. } => out.push(*ch),
				TypeStep::Backspace { .. } => {
					out.pop();
				}
			}
		}
		out
	}

	#[test]
	fn plan_renders_back_to_the_original_text() {
		let text = "Hello, world!\nSecond paragraph with more words.";
		for seed in 0..50 {
			let plan = plan_typing(&mut StdRng::seed_from_u64(seed), text);
			assert_eq!(rendered(&plan), text, "seed {seed}");
		}
	}

	#[test]
	fn typos_are_always_corrected_before_moving_on() {
		// Long lowercase text so seeds reliably produce typos.
		let text = "the quick brown fox jumps over the lazy dog".repeat(5);
		let mut saw_typo = false;
		for seed in 0..20 {
			let plan = plan_typing(&mut StdRng::seed_from_u64(seed), &text);
			for window in plan.windows(2) {
				if let TypeStep::Backspace { .. } = window[1] {
					saw_typo = true;
					// The step before a backspace is the wrong insert.
					assert!(matches!(window[0], TypeStep::Insert { .. }));
				}
			}
			assert_eq!(rendered(&plan), text);
		}
		assert!(saw_typo, "no typo in 20 seeds; chance tuning broke");
	}

	#[test]
	fn pauses_respect_character_classes() {
		let plan = plan_typing(&mut StdRng::seed_from_u64(3), "a A.\n");
		let pauses: Vec<(char, u64)> = plan
			.iter()
			.filter_map(|step| match step {
				TypeStep::Insert { ch, pause } => Some((*ch, pause.as_millis() as u64)),
				TypeStep::Backspace { .. } => None,
			})
			.collect();
		for (ch, ms) in pauses {
			match ch {
				'\n' => assert!((300..600).contains(&ms)),
				' ' | '.' => assert!((80..200).contains(&ms)),
				'A' => assert!((60..160).contains(&ms)),
				_ => assert!((30..300).contains(&ms)),
			}
		}
	}

	#[test]
	fn characters_without_neighbors_never_typo() {
		let plan = plan_typing(&mut StdRng::seed_from_u64(11), &"1234567890".repeat(100));
		assert!(
			plan.iter().all(|step| matches!(step, TypeStep::Insert { .. })),
			"digits have no neighbor map, so no corrections should appear"
		);
	}
}
