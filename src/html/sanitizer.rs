use std::sync::LazyLock;

use regex::Regex;

/// Elements whose text content is never prose and must disappear entirely.
const BLOCK_ELEMENTS: [&str; 5] = ["script", "style", "head", "noscript", "svg"];

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

// One pattern per element: the regex crate has no backreferences, so the
// closing tag is spelled out instead of matched against the opening one.
static BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    BLOCK_ELEMENTS
        .iter()
        .map(|name| {
            Regex::new(&format!(r"(?is)<{name}\b.*?>.*?</{name}\s*>")).unwrap()
        })
        .collect()
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#(?:x[0-9A-Fa-f]+|[0-9]+)|[A-Za-z][A-Za-z0-9]*);").unwrap());

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Reduces an HTML page to the plain text worth indexing.
///
/// The steps run in a fixed order: comments, block elements with their
/// content, remaining tags, entities, whitespace runs. Entities decode after
/// tag removal, so `&lt;script&gt;` in text can never resurrect markup.
pub fn sanitize(html: &str) -> String {
    let text = strip_comments(html);
    let text = strip_block_elements(&text);
    let text = strip_tags(&text);
    let text = decode_entities(&text);
    collapse_whitespace(&text)
}

fn strip_comments(html: &str) -> String {
    COMMENT.replace_all(html, " ").into_owned()
}

fn strip_block_elements(html: &str) -> String {
    let mut text = html.to_string();
    for block in BLOCKS.iter() {
        text = block.replace_all(&text, " ").into_owned();
    }
    text
}

fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, " ").into_owned()
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let body = &caps[1];
            match decode_entity(body) {
                Some(decoded) => decoded,
                // unknown entities pass through untouched
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn decode_entity(body: &str) -> Option<String> {
    if let Some(numeric) = body.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    named_entity(body).map(String::from)
}

fn named_entity(name: &str) -> Option<&'static str> {
    let text = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "iexcl" => "¡",
        "cent" => "¢",
        "pound" => "£",
        "curren" => "¤",
        "yen" => "¥",
        "sect" => "§",
        "copy" => "©",
        "laquo" => "«",
        "reg" => "®",
        "deg" => "°",
        "plusmn" => "±",
        "sup2" => "²",
        "sup3" => "³",
        "micro" => "µ",
        "para" => "¶",
        "middot" => "·",
        "sup1" => "¹",
        "raquo" => "»",
        "frac14" => "¼",
        "frac12" => "½",
        "frac34" => "¾",
        "iquest" => "¿",
        "szlig" => "ß",
        "agrave" => "à",
        "aacute" => "á",
        "acirc" => "â",
        "atilde" => "ã",
        "auml" => "ä",
        "aring" => "å",
        "aelig" => "æ",
        "ccedil" => "ç",
        "egrave" => "è",
        "eacute" => "é",
        "ecirc" => "ê",
        "euml" => "ë",
        "igrave" => "ì",
        "iacute" => "í",
        "icirc" => "î",
        "iuml" => "ï",
        "ntilde" => "ñ",
        "ograve" => "ò",
        "oacute" => "ó",
        "ocirc" => "ô",
        "otilde" => "õ",
        "ouml" => "ö",
        "divide" => "÷",
        "oslash" => "ø",
        "ugrave" => "ù",
        "uacute" => "ú",
        "ucirc" => "û",
        "uuml" => "ü",
        "yacute" => "ý",
        "yuml" => "ÿ",
        "oelig" => "œ",
        "ndash" => "–",
        "mdash" => "—",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "dagger" => "†",
        "bull" => "•",
        "hellip" => "…",
        "prime" => "′",
        "euro" => "€",
        "trade" => "™",
        "minus" => "−",
        "times" => "×",
        _ => return None,
    };
    Some(text)
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}
