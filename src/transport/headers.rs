//! Raw header block encoding
//!
//! Cached requests and responses keep their headers as `Name: value` lines,
//! which stay readable when browsing the object store by hand.

/// Ordered list of header name/value pairs
pub type HeaderList = Vec<(String, String)>;

/// Encodes headers as CRLF-separated `Name: value` lines
pub fn headers_to_raw(headers: &[(String, String)]) -> Vec<u8> {
    headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect::<Vec<_>>()
        .join("\r\n")
        .into_bytes()
}

/// Decodes a raw header block, accepting LF or CRLF line endings
///
/// Lines without a colon are skipped.
pub fn headers_from_raw(raw: &[u8]) -> HeaderList {
    String::from_utf8_lossy(raw)
        .lines()
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Returns the first value of a header, matched case-insensitively
pub fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
