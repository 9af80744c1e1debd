//! Reply unwrapping for text-format group reads

use quick_xml::events::Event;
use quick_xml::Reader;

use ncgroups_core::{ClientError, Result};

/// Extract the statements of `group` from a text-format get-configuration reply.
///
/// The reply body carries a `<configuration-text>` element whose content looks like
///
/// ```text
/// ## Last changed: 2024-01-01 00:00:00 UTC
/// groups {
///     ntp {
///         system {
///             ntp server 192.0.2.1;
///         }
///     }
/// }
/// ```
///
/// and the result is the dedented body of the group block. A reply without a
/// `groups` block means the group does not exist and yields an empty string.
pub fn parse_group_text(group: &str, data: &str) -> Result<String> {
    let text = configuration_text(data)?;
    extract_group_body(group, &text)
}

/// Unescaped content of the `<configuration-text>` element
pub fn configuration_text(data: &str) -> Result<String> {
    let mut reader = Reader::from_str(data);
    let mut inside = false;
    let mut found = false;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"configuration-text" => {
                inside = true;
                found = true;
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"configuration-text" => {
                found = true;
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"configuration-text" => {
                inside = false;
            }
            Ok(Event::Text(t)) if inside => {
                let unescaped = t
                    .unescape()
                    .map_err(|e| ClientError::Parse(format!("bad configuration text: {}", e)))?;
                text.push_str(&unescaped);
            }
            Ok(Event::CData(c)) if inside => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ClientError::Parse(format!(
                    "invalid reply at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    if found {
        Ok(text)
    } else {
        Err(ClientError::Parse(
            "reply has no <configuration-text> element".to_string(),
        ))
    }
}

fn extract_group_body(group: &str, text: &str) -> Result<String> {
    let mut lines = text
        .lines()
        .filter(|line| !line.trim_start().starts_with("##"))
        .skip_while(|line| line.trim() != "groups {");

    if lines.next().is_none() {
        return Ok(String::new());
    }

    let header = lines
        .by_ref()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| ClientError::Parse("empty groups block".to_string()))?;

    let (name, opens_block) = match header.strip_suffix('{') {
        Some(name) => (name.trim(), true),
        None => (header.trim_end_matches(';').trim(), false),
    };
    let name = strip_annotations(name).trim_matches('"');
    if name != group {
        return Err(ClientError::Parse(format!(
            "reply describes group '{}', expected '{}'",
            name, group
        )));
    }
    if !opens_block {
        return Ok(String::new());
    }

    let mut depth = 1usize;
    let mut body = Vec::new();
    for line in lines {
        let (opened, closed) = count_braces(line);
        if closed > depth + opened {
            return Err(ClientError::Parse(format!(
                "unbalanced braces in group '{}'",
                group
            )));
        }
        depth = depth + opened - closed;
        if depth == 0 {
            return dedent(group, &body);
        }
        body.push(line);
    }

    Err(ClientError::Parse(format!(
        "unterminated block for group '{}'",
        group
    )))
}

/// Drop `inactive:` and `protect:` markers printed ahead of a statement name
fn strip_annotations(mut name: &str) -> &str {
    loop {
        let stripped = ["inactive:", "protect:"]
            .iter()
            .find_map(|marker| name.strip_prefix(marker));
        match stripped {
            Some(rest) => name = rest.trim_start(),
            None => return name,
        }
    }
}

/// Count braces outside double-quoted strings
fn count_braces(line: &str) -> (usize, usize) {
    let mut quoted = false;
    let mut escaped = false;
    let (mut opened, mut closed) = (0, 0);

    for c in line.chars() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            '{' if !quoted => opened += 1,
            '}' if !quoted => closed += 1,
            _ => {}
        }
    }
    (opened, closed)
}

fn dedent(group: &str, lines: &[&str]) -> Result<String> {
    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        if line.trim().is_empty() {
            out.push("");
            continue;
        }
        let stripped = line
            .get(indent..)
            .filter(|_| line[..indent].chars().all(|c| c == ' ' || c == '\t'))
            .ok_or_else(|| {
                ClientError::Parse(format!(
                    "inconsistent indentation in group '{}': {:?}",
                    group, line
                ))
            })?;
        out.push(stripped.trim_end());
    }
    Ok(out.join("\n"))
}
