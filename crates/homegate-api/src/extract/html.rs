// Minimal HTML helpers for the one gateway dialect we read.
//
// Not a parser: just enough to cut a known container out of a page, split
// table rows and cells, and flatten a fragment to text.

use std::sync::LazyLock;

use regex::Regex;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

static ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr\s*>").expect("valid regex"));

static CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<t[dh]\b[^>]*>(.*?)</t[dh]\s*>").expect("valid regex"));

static DEFINITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<dd\b[^>]*>(.*?)</dd\s*>").expect("valid regex"));

static DIV_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(/?)div\b[^>]*>").expect("valid regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Return the inner HTML of the `<div>` whose `id` is `id`, honouring nested
/// `<div>`s. `None` if the page has no such element.
pub fn div_by_id<'a>(html: &'a str, id: &str) -> Option<&'a str> {
    let open = Regex::new(&format!(r#"(?i)<div\b[^>]*\bid\s*=\s*["']{}["'][^>]*>"#, regex::escape(id)))
        .ok()?
        .find(html)?;

    let body_start = open.end();
    let mut depth = 1usize;
    for tag in DIV_TAG.captures_iter(&html[body_start..]) {
        let whole = tag.get(0)?;
        if tag.get(1).is_some_and(|m| m.as_str() == "/") {
            depth -= 1;
            if depth == 0 {
                return Some(&html[body_start..body_start + whole.start()]);
            }
        } else {
            depth += 1;
        }
    }
    // Unterminated container: take the rest of the page.
    Some(&html[body_start..])
}

/// Inner HTML of every `<tr>` in `fragment`, in document order.
pub fn rows(fragment: &str) -> Vec<&str> {
    ROW.captures_iter(fragment)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Inner HTML of every `<td>`/`<th>` in a row.
pub fn cells(row: &str) -> Vec<&str> {
    CELL.captures_iter(row)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Text of every `<dd>` entry in `fragment`.
pub fn definitions(fragment: &str) -> Vec<String> {
    DEFINITION
        .captures_iter(fragment)
        .filter_map(|c| c.get(1).map(|m| text(m.as_str())))
        .collect()
}

/// Flatten a fragment to text: drop tags, decode entities, collapse runs of
/// whitespace. Adjacent elements are *not* separated, which is why labeled
/// values come out as `"MAC Addressaa:bb:..."`.
pub fn text(fragment: &str) -> String {
    let stripped = TAG.replace_all(fragment, "");
    let decoded = decode_entities(&stripped);
    WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

/// Decode the handful of entities gateway firmware emits.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }
    raw.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&amp;", "&")
}

/// Split `entry` on a known leading label: `"MAC Addressaa:bb"` with label
/// `"MAC Address"` yields `"aa:bb"`. Values may contain spaces.
pub fn value_after_label<'a>(entry: &'a str, label: &str) -> Option<&'a str> {
    let head = entry.get(..label.len())?;
    if !head.eq_ignore_ascii_case(label) {
        return None;
    }
    let value = entry[label.len()..].trim_start_matches(':').trim();
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn div_by_id_handles_nesting() {
        let html = r#"<div id="outer"><div id="x"><div>inner</div><p>tail</p></div><div>after</div></div>"#;
        assert_eq!(div_by_id(html, "x"), Some("<div>inner</div><p>tail</p>"));
        assert_eq!(div_by_id(html, "missing"), None);
    }

    #[test]
    fn text_flattens_and_decodes() {
        assert_eq!(text("<b>MAC Address</b>AA:BB"), "MAC AddressAA:BB");
        assert_eq!(text("  Tom&#39;s   &amp; Co\n"), "Tom's & Co");
    }

    #[test]
    fn label_split_keeps_spaces_in_value() {
        assert_eq!(
            value_after_label("CommentsLiving room TV", "Comments"),
            Some("Living room TV")
        );
        assert_eq!(value_after_label("MAC Address", "MAC Address"), None);
        assert_eq!(value_after_label("IPv4 Address10.0.0.2", "MAC Address"), None);
    }

    #[test]
    fn rows_and_cells() {
        let table = "<table><tr><th>A</th><th>B</th></tr><tr><td>1</td><td>2</td></tr></table>";
        let rows = rows(table);
        assert_eq!(rows.len(), 2);
        assert_eq!(cells(rows[1]), vec!["1", "2"]);
    }
}
