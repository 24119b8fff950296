use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt::Write;

use crate::bundle::DebugInfo;

// The resource string table is a tiny fixed XML dialect:
// <ResourceStringTable><Resource id="hex" type="..." name="..."/>...
// It is scanned permissively; the original producer's writer is known to emit
// broken documents (see `repair`).

/// Render debug info the way the original producer formats it: tab indent,
/// no declaration, `/>` without a leading space, lower-case 8-digit hex IDs.
pub(crate) fn render(table: &BTreeMap<u32, DebugInfo>) -> String {
    let mut out = String::from("<ResourceStringTable>\n");
    for (id, info) in table {
        let _ = writeln!(
            out,
            "\t<Resource id=\"{:08x}\" type=\"{}\" name=\"{}\"/>",
            id,
            escape(&info.type_name),
            escape(&info.name)
        );
    }
    out.push_str("</ResourceStringTable>\n");
    out
}

/// Undo the known defects of the original bndl string-table writer before
/// parsing: a close tag in place of the open tag, and a stray close tag in
/// the middle of the document.
pub(crate) fn repair(xml: &str) -> String {
    let mut xml = String::from(xml);
    if xml.starts_with("</ResourceStringTable>") {
        xml.remove(1);
    }
    if let Some(pos) = xml.find("</ResourceStringTable>\n\t") {
        xml.replace_range(pos..pos + 23, "");
    }
    xml
}

/// Non-validating scan for `<Resource .../>` elements. Elements without a
/// parsable hex `id` are skipped; missing attributes become empty strings.
pub(crate) fn parse(xml: &str) -> BTreeMap<u32, DebugInfo> {
    let mut table = BTreeMap::new();
    let mut rest = xml;
    while let Some(start) = rest.find("<Resource") {
        let after = &rest[start + "<Resource".len()..];
        // Do not confuse the root <ResourceStringTable> element for an entry.
        if !after.starts_with([' ', '\t', '\r', '\n', '/', '>']) {
            rest = after;
            continue;
        }
        let Some(end) = after.find('>') else {
            break;
        };
        let element = after[..end].trim_end_matches('/');
        rest = &after[end + 1..];
        let attrs = parse_attributes(element);
        let Some(id) = attrs
            .get("id")
            .and_then(|v| u32::from_str_radix(v, 16).ok())
        else {
            continue;
        };
        table.insert(
            id,
            DebugInfo {
                name: attrs.get("name").cloned().unwrap_or_default(),
                type_name: attrs.get("type").cloned().unwrap_or_default(),
            },
        );
    }
    table
}

fn parse_attributes(element: &str) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    let mut chars = element.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c.is_whitespace() {
            continue;
        }
        let mut name_end = element.len();
        for (i, c) in chars.by_ref() {
            if c == '=' || c.is_whitespace() {
                name_end = i;
                break;
            }
        }
        let name = &element[start..name_end];
        // Whatever sits between the quotes is the value; anything else after
        // the name is skipped without complaint.
        let Some((_, quote)) = chars.find(|&(_, c)| c == '"' || c == '\'') else {
            break;
        };
        let value_start = match chars.peek() {
            Some(&(i, _)) => i,
            None => break,
        };
        let Some((value_end, _)) = chars.find(|&(_, c)| c == quote) else {
            break;
        };
        attrs.insert(
            String::from(name),
            unescape(&element[value_start..value_end]),
        );
    }
    attrs
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let replacement = [
            ("&amp;", '&'),
            ("&lt;", '<'),
            ("&gt;", '>'),
            ("&quot;", '"'),
            ("&apos;", '\''),
        ]
        .iter()
        .find(|(entity, _)| rest.starts_with(entity));
        match replacement {
            Some((entity, c)) => {
                out.push(*c);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
