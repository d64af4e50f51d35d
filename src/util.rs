//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Comma-join a topic list for prompt interpolation, with a placeholder
/// when the student has no entries yet.
pub fn join_or(items: &[String], empty: &str) -> String {
  if items.is_empty() { empty.to_string() } else { items.join(", ") }
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
/// The cut backs up to a char boundary, since model replies are arbitrary
/// UTF-8 and `max` is a byte count.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_template_replaces_all_occurrences() {
    let out = fill_template("{a} and {b} and {a}", &[("a", "x"), ("b", "y")]);
    assert_eq!(out, "x and y and x");
  }

  #[test]
  fn join_or_uses_placeholder_when_empty() {
    assert_eq!(join_or(&[], "None"), "None");
    assert_eq!(join_or(&["Algebra".into(), "Calculus".into()], "None"), "Algebra, Calculus");
  }

  #[test]
  fn trunc_for_log_respects_char_boundaries() {
    assert_eq!(trunc_for_log("short", 80), "short");

    // 'é' is two bytes; a cut landing inside it must back up, not panic.
    let mut s = String::from("a");
    for _ in 0..50 {
      s.push('é');
    }
    let out = trunc_for_log(&s, 80);
    assert!(out.starts_with('a'));
    assert!(out.ends_with("(101 bytes total)"));
  }
}
