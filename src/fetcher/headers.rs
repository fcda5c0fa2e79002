use reqwest::header::HeaderMap;

/// Render a header block as text: one `Key: value\r\n` line per value, keys
/// sorted and in canonical MIME case. Values of a repeated key keep their
/// received order.
pub fn serialize_headers(headers: &HeaderMap) -> String {
    let mut lines: Vec<(String, String)> = headers
        .iter()
        .map(|(name, value)| {
            let value = String::from_utf8_lossy(value.as_bytes());
            (canonical_key(name.as_str()), clean_value(&value))
        })
        .collect();

    // stable, so repeated keys stay in order
    lines.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = String::new();
    for (key, value) in lines {
        out.push_str(&key);
        out.push_str(": ");
        out.push_str(&value);
        out.push_str("\r\n");
    }
    out
}

/// `content-type` -> `Content-Type`. Keys containing anything other than
/// token characters are returned unchanged.
pub fn canonical_key(key: &str) -> String {
    if !key.bytes().all(is_token_byte) {
        return key.to_string();
    }

    let mut upper = true;
    key.chars()
        .map(|c| {
            let mapped = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            mapped
        })
        .collect()
}

fn clean_value(value: &str) -> String {
    value.replace(['\r', '\n'], " ").trim().to_string()
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
