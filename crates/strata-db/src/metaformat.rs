//! Metaformat content files.
//!
//! A content file is a sequence of key/value blocks separated by `---`
//! lines. A block either carries its value inline (`title: Hello`) or as
//! the lines following a bare `key:` line. Duplicate keys are preserved
//! in file order; consumers overwrite, so the last write wins. Lines
//! consisting only of four or more dashes escape literal separator
//! lines inside a value.

/// Parse a content file into `(key, value)` pairs in file order.
///
/// Blocks without a `key:` first line are skipped; this keeps stray
/// prose or malformed blocks from aborting the load.
pub fn tokenize(input: &str) -> Vec<(String, String)> {
    let mut rv = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in input.lines() {
        if is_separator(line) {
            if let Some(pair) = parse_block(&block) {
                rv.push(pair);
            }
            block.clear();
        } else {
            block.push(line);
        }
    }
    if let Some(pair) = parse_block(&block) {
        rv.push(pair);
    }
    rv
}

/// Serialize `(key, value)` pairs back into metaformat text.
pub fn serialize<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut rv = String::new();
    let mut first = true;
    for (key, value) in fields {
        if !first {
            rv.push_str("---\n");
        }
        first = false;
        if !value.contains('\n') && !value.starts_with(char::is_whitespace) {
            rv.push_str(key);
            if value.is_empty() {
                rv.push_str(":\n");
            } else {
                rv.push_str(": ");
                rv.push_str(value);
                rv.push('\n');
            }
        } else {
            rv.push_str(key);
            rv.push_str(":\n\n");
            for line in value.lines() {
                rv.push_str(&escape_line(line));
                rv.push('\n');
            }
        }
    }
    rv
}

fn is_separator(line: &str) -> bool {
    line.trim_end() == "---"
}

fn is_escaped_separator(line: &str) -> bool {
    let trimmed = line.trim_end();
    trimmed.len() >= 4 && trimmed.bytes().all(|b| b == b'-')
}

fn escape_line(line: &str) -> String {
    let trimmed = line.trim_end();
    if trimmed.len() >= 3 && trimmed.bytes().all(|b| b == b'-') {
        format!("-{line}")
    } else {
        line.to_string()
    }
}

fn unescape_line(line: &str) -> &str {
    if is_escaped_separator(line) {
        &line[1..]
    } else {
        line
    }
}

fn parse_block(lines: &[&str]) -> Option<(String, String)> {
    let (first, rest) = lines.split_first()?;
    let colon = first.find(':')?;
    let key = first[..colon].trim();
    if key.is_empty() {
        return None;
    }
    let inline = first[colon + 1..].trim();

    let value = if !inline.is_empty() {
        inline.to_string()
    } else {
        // Multi-line value: skip one leading blank line, drop trailing
        // blank lines, unescape dashed lines.
        let mut body: Vec<&str> = rest.iter().map(|l| unescape_line(l)).collect();
        if body.first().is_some_and(|l| l.trim().is_empty()) {
            body.remove(0);
        }
        while body.last().is_some_and(|l| l.trim().is_empty()) {
            body.pop();
        }
        body.join("\n")
    };
    Some((key.to_string(), value))
}
