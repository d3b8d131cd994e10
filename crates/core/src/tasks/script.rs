//! Small page-script builders shared by the workflows.
//!
//! Selector and phrase inputs come from the site config; everything is
//! quoted through [`js_quote`] before it reaches the page.

use serde_json::Value;

use drover_runtime::{Result, Session, js_quote};

pub(crate) async fn element_exists(session: &Session, selector: &str) -> Result<bool> {
	let script = format!(
		"document.querySelector({sel}) !== null",
		sel = js_quote(selector)
	);
	Ok(matches!(session.evaluate(&script).await?, Some(Value::Bool(true))))
}

/// First selector in the ladder with a present element.
pub(crate) async fn first_present(session: &Session, selectors: &[String]) -> Result<Option<String>> {
	for selector in selectors {
		if element_exists(session, selector).await? {
			return Ok(Some(selector.clone()));
		}
	}
	Ok(None)
}

/// Focuses an input and clears any stale value.
pub(crate) async fn focus_and_clear_input(session: &Session, selector: &str) -> Result<bool> {
	let script = format!(
		"(function() {{\n\
		\tlet el = document.querySelector({sel});\n\
		\tif (!el) return false;\n\
		\tel.focus();\n\
		\tif (el.isContentEditable) {{ el.innerHTML = ''; }} else {{ el.value = ''; }}\n\
		\treturn true;\n\
		}})()",
		sel = js_quote(selector)
	);
	Ok(matches!(session.evaluate(&script).await?, Some(Value::Bool(true))))
}

/// Clicks and focuses the first visible editor in the ladder.
pub(crate) async fn focus_editor(session: &Session, selectors: &[String]) -> Result<Option<String>> {
	for selector in selectors {
		let script = format!(
			"(function() {{\n\
			\tlet el = document.querySelector({sel});\n\
			\tif (!el || el.offsetParent === null) return false;\n\
			\tel.click();\n\
			\tel.focus();\n\
			\treturn true;\n\
			}})()",
			sel = js_quote(selector)
		);
		if matches!(session.evaluate(&script).await?, Some(Value::Bool(true))) {
			return Ok(Some(selector.clone()));
		}
	}
	Ok(None)
}

/// Clicks the first visible element matching any selector in the ladder.
pub(crate) async fn click_selector(session: &Session, selectors: &[String]) -> Result<Option<String>> {
	for selector in selectors {
		let script = format!(
			"(function() {{\n\
			\tlet el = document.querySelector({sel});\n\
			\tif (!el || el.offsetParent === null || el.disabled) return false;\n\
			\tel.click();\n\
			\treturn true;\n\
			}})()",
			sel = js_quote(selector)
		);
		if matches!(session.evaluate(&script).await?, Some(Value::Bool(true))) {
			return Ok(Some(selector.clone()));
		}
	}
	Ok(None)
}

/// Clicks the first visible control whose label or text equals one of
/// the phrases. Labels move between `aria-label`, spans, and wrapper
/// divs on these sites, so the walk is deliberately broad.
pub(crate) async fn click_by_phrase(session: &Session, phrases: &[String]) -> Result<bool> {
	if phrases.is_empty() {
		return Ok(false);
	}
	let list = phrases
		.iter()
		.map(|p| js_quote(p))
		.collect::<Vec<_>>()
		.join(", ");
	let script = format!(
		"(function() {{\n\
		\tlet phrases = [{list}];\n\
		\tlet nodes = document.querySelectorAll('[role=\"button\"], button, a, span, div[role=\"none\"]');\n\
		\tfor (let node of nodes) {{\n\
		\t\tlet label = (node.getAttribute('aria-label') || '').trim();\n\
		\t\tlet text = (node.innerText || '').trim();\n\
		\t\tif (!phrases.includes(label) && !phrases.includes(text)) continue;\n\
		\t\tlet clickable = node.closest('[role=\"button\"]') || node.closest('button') || node;\n\
		\t\tif (clickable.offsetParent === null) continue;\n\
		\t\tclickable.click();\n\
		\t\treturn true;\n\
		\t}}\n\
		\treturn false;\n\
		}})()"
	);
	Ok(matches!(session.evaluate(&script).await?, Some(Value::Bool(true))))
}

pub(crate) async fn body_text_lower(session: &Session) -> Result<String> {
	Ok(session
		.evaluate_string("((document.body && document.body.innerText) || '').toLowerCase()")
		.await?
		.unwrap_or_default())
}

pub(crate) async fn eval_i64(session: &Session, expression: &str) -> Result<Option<i64>> {
	Ok(session.evaluate(expression).await?.and_then(|v| v.as_i64()))
}
