//! Character reference decoding.
//!
//! Single left-to-right pass. Replacement text is never re-scanned, so
//! `&amp;lt;` decodes to the literal `&lt;` and not to `<`.

/// Longest named reference we try to match, excluding `&` and `;`.
const MAX_ENTITY_LEN: usize = 10;

fn named_entity(name: &str) -> Option<char> {
    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "ensp" => '\u{2002}',
        "emsp" => '\u{2003}',
        "ndash" => '–',
        "mdash" => '—',
        "middot" => '·',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "hellip" => '…',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "times" => '×',
        "divide" => '÷',
        _ => return None,
    };
    Some(ch)
}

fn numeric_entity(body: &str) -> Option<char> {
    let code = if let Some(hex) = body.strip_prefix('x').or_else(|| body.strip_prefix('X')) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        body.parse::<u32>().ok()?
    };
    char::from_u32(code).filter(|c| *c != '\0')
}

/// Decode character references. Unknown references pass through unchanged.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];

        let decoded = after
            .find(';')
            .filter(|semi| *semi > 0 && *semi <= MAX_ENTITY_LEN)
            .and_then(|semi| {
                let body = &after[..semi];
                let ch = match body.strip_prefix('#') {
                    Some(num) => numeric_entity(num),
                    None => named_entity(body),
                }?;
                Some((ch, semi))
            });

        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_ampersand() {
        assert_eq!(decode_entities("Tom &amp; Jerry"), "Tom & Jerry");
    }

    #[test]
    fn test_no_double_decode() {
        assert_eq!(decode_entities("&amp;lt;b&amp;gt;"), "&lt;b&gt;");
        assert_eq!(decode_entities("&amp;amp;"), "&amp;");
    }

    #[test]
    fn test_unknown_entity_passes_through() {
        assert_eq!(decode_entities("&bogus; & done"), "&bogus; & done");
        assert_eq!(decode_entities("a & b"), "a & b");
        assert_eq!(decode_entities("trailing &"), "trailing &");
    }

    #[test]
    fn test_numeric_references() {
        assert_eq!(decode_entities("&#39;hi&#x27;"), "'hi'");
        assert_eq!(decode_entities("&#0;"), "&#0;");
    }

    #[test]
    fn test_nbsp() {
        assert_eq!(decode_entities("a&nbsp;b"), "a\u{a0}b");
    }
}
