//! JSON parsing with path-aware diagnostics for API response bodies.

/// Parse `body`, and on failure describe where it broke: the serde path, the
/// type mismatch, and a short snippet around the offending column.
pub fn parse_json_with_context<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, String> {
    let jd = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(jd).map_err(|err| {
        let inner = err.inner();
        let (line, column) = (inner.line(), inner.column());
        let path = err.path().to_string();

        let msg = inner.to_string();
        let loc = format!(" at line {line} column {column}");
        let msg = msg.strip_suffix(&loc).unwrap_or(&msg);

        let mut out = String::new();
        if !path.is_empty() && path != "." {
            out.push_str(&format!("at path '{path}': "));
        }
        out.push_str(&format!(
            "{} (line {line} col {column}) near `{}`",
            describe_mismatch(msg),
            snippet(body, line, column, 24)
        ));
        out
    })
}

/// Rewrite "invalid type: X, expected Y" as "expected Y, got X".
fn describe_mismatch(msg: &str) -> String {
    msg.strip_prefix("invalid type: ")
        .and_then(|rest| rest.split_once(", expected "))
        .map(|(actual, expected)| format!("expected {expected}, got {actual}"))
        .unwrap_or_else(|| msg.to_owned())
}

fn snippet(body: &str, line: usize, column: usize, width: usize) -> String {
    let target = body.lines().nth(line.saturating_sub(1)).unwrap_or("");
    let chars: Vec<char> = target.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    let center = column.saturating_sub(1).min(chars.len() - 1);
    let start = center.saturating_sub(width / 2);
    let end = (start + width).min(chars.len());
    chars[start..end].iter().collect()
}
