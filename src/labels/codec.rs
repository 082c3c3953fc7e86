//! Label ids embedded in diary markdown.
//!
//! Labels travel inside the entry text so that a single markdown file stays
//! self-contained. The document grammar, line by line:
//!
//! ```text
//! document         := body [metadata-section]
//! metadata-section := BLANK SEPARATOR (BLANK | EOF) metadata-line*
//! SEPARATOR        := a line whose trimmed text is exactly "---"
//! metadata-line    := BLANK | MARKER | SUMMARY | FIELD
//! MARKER           := "<!--" WS* "label-ids:" WS* id ("," id)* WS* "-->"
//! SUMMARY          := ["- "] "**Labels:**" text
//! FIELD            := "- **" key ":**" text
//! ```
//!
//! Ids are percent-escaped outside `[A-Za-z0-9_.:~-]`, so `,`, whitespace and
//! `-->` never appear raw inside a marker. A marker must fit on one line but
//! may share it with other text.

use super::models::LabelCatalog;

const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";
const MARKER_KEY: &str = "label-ids:";
const SEPARATOR: &str = "---";
const SUMMARY_KEY: &str = "**Labels:**";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Blank,
    Separator,
    Marker,
    Summary,
    Field,
    Text,
}

impl LineKind {
    fn is_metadata(self) -> bool {
        matches!(
            self,
            LineKind::Blank | LineKind::Marker | LineKind::Summary | LineKind::Field
        )
    }
}

/// A marker token located in a single line: byte range plus raw id payload.
#[derive(Debug, Clone, Copy)]
struct MarkerSpan<'a> {
    start: usize,
    end: usize,
    payload: &'a str,
}

fn find_markers(line: &str) -> Vec<MarkerSpan<'_>> {
    let mut spans = Vec::new();
    let mut pos = 0;

    while let Some(offset) = line[pos..].find(COMMENT_OPEN) {
        let start = pos + offset;
        let after_open = start + COMMENT_OPEN.len();
        let rest = &line[after_open..];
        let key_at = after_open + (rest.len() - rest.trim_start_matches([' ', '\t']).len());

        if !line[key_at..].starts_with(MARKER_KEY) {
            pos = after_open;
            continue;
        }

        let payload_start = key_at + MARKER_KEY.len();
        match line[payload_start..].find(COMMENT_CLOSE) {
            Some(close) => {
                let end = payload_start + close + COMMENT_CLOSE.len();
                spans.push(MarkerSpan {
                    start,
                    end,
                    payload: &line[payload_start..payload_start + close],
                });
                pos = end;
            }
            None => break,
        }
    }

    spans
}

fn classify(line: &str) -> LineKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if trimmed == SEPARATOR {
        return LineKind::Separator;
    }
    if let [only] = find_markers(trimmed).as_slice() {
        if only.start == 0 && only.end == trimmed.len() {
            return LineKind::Marker;
        }
    }
    if is_summary(trimmed) {
        return LineKind::Summary;
    }
    if trimmed.starts_with("- **") && trimmed.contains(":**") {
        return LineKind::Field;
    }
    LineKind::Text
}

fn is_summary(trimmed: &str) -> bool {
    trimmed
        .strip_prefix("- ")
        .unwrap_or(trimmed)
        .trim_start()
        .starts_with(SUMMARY_KEY)
}

fn is_plain_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '~' | '-')
}

fn escape_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for c in id.chars() {
        if is_plain_id_char(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    out
}

fn hex_value(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|digit| digit as u8)
}

/// Reverse of [`escape_id`]. Malformed escapes leave the raw text in place.
fn unescape_id(raw: &str) -> String {
    if !raw.contains('%') {
        return raw.to_string();
    }

    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8(out).unwrap_or_else(|_| raw.to_string())
}

fn parse_payload(payload: &str) -> Vec<String> {
    payload
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(unescape_id)
        .collect()
}

/// Label ids carried by the first marker in `text`; empty when there is none.
pub fn decode(text: &str) -> Vec<String> {
    text.lines()
        .find_map(|line| find_markers(line).first().map(|span| parse_payload(span.payload)))
        .unwrap_or_default()
}

/// Catalog names for `ids`, in order; unknown ids are skipped.
pub fn summary_names<C: LabelCatalog + ?Sized>(ids: &[String], catalog: &C) -> Vec<String> {
    ids.iter()
        .filter_map(|id| catalog.lookup(id))
        .map(|label| label.name.clone())
        .collect()
}

fn marker_line(ids: &[String]) -> String {
    let encoded: Vec<String> = ids.iter().map(|id| escape_id(id)).collect();
    format!("{COMMENT_OPEN} {MARKER_KEY} {} {COMMENT_CLOSE}", encoded.join(","))
}

fn summary_line(names: &[String]) -> String {
    if names.is_empty() {
        format!("- {SUMMARY_KEY}")
    } else {
        format!("- {SUMMARY_KEY} {}", names.join(", "))
    }
}

/// Drop every marker token and every summary line. Returns the remaining
/// text and whether anything was removed.
fn strip_label_metadata(text: &str) -> (String, bool) {
    let mut out = String::with_capacity(text.len());
    let mut stripped = false;

    for line in text.split_inclusive('\n') {
        let (body, newline) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };

        if is_summary(body.trim()) {
            stripped = true;
            continue;
        }

        let spans = find_markers(body);
        if spans.is_empty() {
            out.push_str(line);
            continue;
        }

        stripped = true;
        let mut residual = String::with_capacity(body.len());
        let mut cursor = 0;
        for span in &spans {
            residual.push_str(&body[cursor..span.start]);
            cursor = span.end;
        }
        residual.push_str(&body[cursor..]);

        if !residual.trim().is_empty() {
            out.push_str(&residual);
            out.push_str(newline);
        }
    }

    (out, stripped)
}

/// Index of the separator opening the trailing metadata section, if any.
fn metadata_separator(lines: &[&str]) -> Option<usize> {
    for i in (0..lines.len()).rev() {
        match classify(lines[i]) {
            kind if kind.is_metadata() => continue,
            LineKind::Separator => {
                let blank_before = i > 0 && classify(lines[i - 1]) == LineKind::Blank;
                let blank_after =
                    i + 1 == lines.len() || classify(lines[i + 1]) == LineKind::Blank;
                return (blank_before && blank_after).then_some(i);
            }
            _ => return None,
        }
    }
    None
}

/// Rewrite the label metadata of `text` to carry exactly `ids`.
///
/// Existing markers and summaries are removed first (all of them, malformed
/// documents can hold several). With `ids` empty the result carries no
/// marker; a trailing metadata section left empty by the removal goes too.
pub fn encode<C: LabelCatalog + ?Sized>(text: &str, ids: &[String], catalog: &C) -> String {
    let (stripped_text, stripped) = strip_label_metadata(text);
    if !stripped && ids.is_empty() {
        return text.to_string();
    }

    let mut base = stripped_text.trim_end().to_string();

    if stripped {
        let lines: Vec<&str> = base.lines().collect();
        if let Some(last) = lines.len().checked_sub(1) {
            if metadata_separator(&lines) == Some(last) {
                let keep = lines[..last].join("\n");
                base = keep.trim_end().to_string();
            }
        }
    }

    if ids.is_empty() {
        return base;
    }

    let block = format!(
        "{}\n{}\n",
        marker_line(ids),
        summary_line(&summary_names(ids, catalog))
    );

    let lines: Vec<&str> = base.lines().collect();
    match metadata_separator(&lines) {
        Some(sep) if sep + 1 == lines.len() => format!("{base}\n\n{block}"),
        Some(_) => format!("{base}\n{block}"),
        None => format!("{base}\n\n{SEPARATOR}\n\n{block}"),
    }
}
