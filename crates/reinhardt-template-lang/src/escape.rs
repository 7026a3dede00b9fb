//! HTML escaping for rendered output
//!
//! Escaped characters:
//! - `<` → `&lt;`
//! - `>` → `&gt;`
//! - `&` → `&amp;`
//! - `"` → `&quot;`
//! - `'` → `&#x27;`

/// Escape HTML special characters
///
/// # Examples
///
/// ```
/// use reinhardt_template_lang::escape::escape_html;
///
/// assert_eq!(escape_html("<b>A</b>"), "&lt;b&gt;A&lt;/b&gt;");
/// assert_eq!(escape_html("Tom & 'Jerry'"), "Tom &amp; &#x27;Jerry&#x27;");
/// ```
pub fn escape_html(s: &str) -> String {
	let mut out = String::with_capacity(s.len());
	escape_html_into(s, &mut out);
	out
}

/// Escape `s` onto the end of `out`.
pub fn escape_html_into(s: &str, out: &mut String) {
	for c in s.chars() {
		match c {
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'&' => out.push_str("&amp;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#x27;"),
			_ => out.push(c),
		}
	}
}

/// Escape for use inside JavaScript string literals
///
/// # Examples
///
/// ```
/// use reinhardt_template_lang::escape::escape_js;
///
/// assert_eq!(escape_js(r#"alert("x")"#), r#"alert(\"x\")"#);
/// assert_eq!(escape_js("a\nb"), r"a\nb");
/// ```
pub fn escape_js(s: &str) -> String {
	let mut out = String::with_capacity(s.len());
	for c in s.chars() {
		match c {
			'"' => out.push_str(r#"\""#),
			'\'' => out.push_str(r"\'"),
			'\\' => out.push_str(r"\\"),
			'\n' => out.push_str(r"\n"),
			'\r' => out.push_str(r"\r"),
			'\t' => out.push_str(r"\t"),
			_ => out.push(c),
		}
	}
	out
}

/// Percent-encode everything outside the URL unreserved set.
pub fn escape_url(s: &str) -> String {
	let mut out = String::with_capacity(s.len());
	for byte in s.bytes() {
		match byte {
			b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
				out.push(byte as char)
			}
			_ => out.push_str(&format!("%{:02X}", byte)),
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("<script>alert('XSS')</script>", "&lt;script&gt;alert(&#x27;XSS&#x27;)&lt;/script&gt;")]
	#[case(r#"<a href="test">link</a>"#, "&lt;a href=&quot;test&quot;&gt;link&lt;/a&gt;")]
	#[case("plain", "plain")]
	#[case("", "")]
	fn test_escape_html(#[case] input: &str, #[case] expected: &str) {
		assert_eq!(escape_html(input), expected);
	}

	#[rstest]
	#[case("a b", "a%20b")]
	#[case("x/y?z=1", "x%2Fy%3Fz%3D1")]
	#[case("é", "%C3%A9")]
	fn test_escape_url(#[case] input: &str, #[case] expected: &str) {
		assert_eq!(escape_url(input), expected);
	}
}
