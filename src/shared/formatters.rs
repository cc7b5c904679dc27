// ============================================================
// FORMATTERS
// ============================================================
// String-transformation rules shared by recipient validation and
// template rendering

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Zero-width characters people paste in without noticing.
pub const OBSCURE_ZERO_WIDTH_WHITESPACE: &[char] = &[
    '\u{180E}', // Mongolian vowel separator
    '\u{200B}', // zero width space
    '\u{200C}', // zero width non-joiner
    '\u{200D}', // zero width joiner
    '\u{2060}', // word joiner
    '\u{FEFF}', // zero width non-breaking space
];

pub const OBSCURE_FULL_WIDTH_WHITESPACE: &[char] = &[
    '\u{00A0}', // non breaking space
];

const ASCII_WHITESPACE: &[char] = &[' ', '\t', '\n', '\r', '\x0b', '\x0c'];

/// Whitespace in the widest sense: anything Unicode calls whitespace
/// plus the zero-width characters above.
pub fn is_whitespace_or_zero_width(c: char) -> bool {
    c.is_whitespace() || OBSCURE_ZERO_WIDTH_WHITESPACE.contains(&c)
}

static WHITESPACE_BEFORE_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+([,.])").unwrap());

// check three different unicode hyphens
static HYPHENS_SURROUNDED_BY_SPACES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+[-\u{2013}\u{2014}]{1,3}\s+").unwrap());

static MORE_THAN_TWO_NEWLINES_IN_A_ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

static GOVUK_NOT_A_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(^|\s)((?:#|\*|\^)?)(gov)\.(uk)").unwrap());

// The URL pattern only matches addresses that end in something more
// substantial than trailing punctuation
static URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<]+[^<.,:"')\]\s]"#).unwrap());

// matches wider than an email - everything between an at sign and the
// nearest whitespace
static EMAIL_WITH_SMART_QUOTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(^|\s)\S+@\S+(\s|$)").unwrap());

// Like the HTML spec's character reference pattern, but with trailing
// semicolons non-optional
static CHARREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]+;|#[xX][0-9a-fA-F]+;|[^\t\n\x0c <&#;]{1,32};)").unwrap());

/// Entities which must survive `escape_html` untouched. Each one is
/// swapped for an emoji sequence no real message will contain, then
/// swapped back after escaping.
const HTML_ENTITY_MAPPING: &[(&str, &str)] = &[
    ("&nbsp;", "\u{1F47E}\u{1F426}\u{1F974}"),
    ("&amp;", "\u{2795}\u{1F426}\u{1F974}"),
    ("&lpar;", "\u{25C0}\u{FE0F}\u{1F426}\u{1F974}"),
    ("&rpar;", "\u{25B6}\u{FE0F}\u{1F426}\u{1F974}"),
];

const NAMED_CHARREFS: &[(&str, &str)] = &[
    ("amp;", "&"),
    ("lt;", "<"),
    ("gt;", ">"),
    ("quot;", "\""),
    ("apos;", "'"),
    ("nbsp;", "\u{00A0}"),
    ("lpar;", "("),
    ("rpar;", ")"),
    ("pound;", "£"),
    ("euro;", "€"),
    ("copy;", "©"),
    ("reg;", "®"),
    ("deg;", "°"),
    ("middot;", "·"),
    ("ndash;", "\u{2013}"),
    ("mdash;", "\u{2014}"),
    ("lsquo;", "\u{2018}"),
    ("rsquo;", "\u{2019}"),
    ("ldquo;", "\u{201C}"),
    ("rdquo;", "\u{201D}"),
    ("hellip;", "\u{2026}"),
    ("times;", "×"),
    ("divide;", "÷"),
    ("frac12;", "½"),
    ("sect;", "§"),
];

/// Removes all whitespace characters (and `extra_characters`) from the
/// beginning and end of the string.
pub fn strip_all_whitespace(value: &str, extra_characters: &str) -> String {
    value
        .trim_matches(|c: char| is_whitespace_or_zero_width(c) || extra_characters.contains(c))
        .to_string()
}

/// Removes zero-width and non-breaking whitespace from anywhere in the
/// string, then trims ordinary whitespace from the ends.
pub fn strip_and_remove_obscure_whitespace(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    value
        .chars()
        .filter(|c| {
            !OBSCURE_ZERO_WIDTH_WHITESPACE.contains(c) && !OBSCURE_FULL_WIDTH_WHITESPACE.contains(c)
        })
        .collect::<String>()
        .trim_matches(ASCII_WHITESPACE)
        .to_string()
}

/// Removes ALL whitespace, not just the obscure characters we normally
/// remove.
pub fn remove_whitespace(value: &str) -> String {
    value
        .chars()
        .filter(|&c| !is_whitespace_or_zero_width(c))
        .collect()
}

/// Leading and trailing whitespace removed, zero-width characters
/// removed, runs of spacing characters collapsed to a single space.
pub fn normalise_whitespace(value: &str) -> String {
    let value: String = value
        .chars()
        .filter(|c| !OBSCURE_ZERO_WIDTH_WHITESPACE.contains(c))
        .map(|c| {
            if OBSCURE_FULL_WIDTH_WHITESPACE.contains(&c) {
                ' '
            } else {
                c
            }
        })
        .collect();
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn get_lines_with_normalised_whitespace(value: &str) -> Vec<String> {
    value.lines().map(normalise_whitespace).collect()
}

pub fn normalise_whitespace_and_newlines(value: &str) -> String {
    get_lines_with_normalised_whitespace(value).join("\n")
}

pub fn normalise_multiple_newlines(value: &str) -> String {
    MORE_THAN_TWO_NEWLINES_IN_A_ROW
        .replace_all(value, "\n\n")
        .into_owned()
}

pub fn remove_whitespace_before_punctuation(value: &str) -> String {
    WHITESPACE_BEFORE_PUNCTUATION
        .replace_all(value, "$1")
        .into_owned()
}

/// Hyphens and dashes surrounded by whitespace become a single spaced
/// en dash.
pub fn replace_hyphens_with_en_dashes(value: &str) -> String {
    HYPHENS_SURROUNDED_BY_SPACES
        .replace_all(value, " \u{2013} ")
        .into_owned()
}

pub fn replace_hyphens_with_non_breaking_hyphens(value: &str) -> String {
    value.replace('-', "\u{2011}")
}

pub fn strip_leading_whitespace(value: &str) -> String {
    value.trim_start().to_string()
}

pub fn add_trailing_newline(value: &str) -> String {
    format!("{value}\n")
}

/// U+2028 (line separator) breaks some email clients.
pub fn strip_unsupported_characters(value: &str) -> String {
    value.replace('\u{2028}', "")
}

pub fn add_prefix(body: &str, prefix: Option<&str>) -> String {
    match prefix {
        Some(prefix) => format!("{}: {}", prefix.trim(), body),
        None => body.to_string(),
    }
}

pub fn nl2br(value: &str) -> String {
    value.trim().replace('\r', "<br>").replace('\n', "<br>")
}

/// Stops `GOV.UK` linkifying in email clients by inserting a zero-width
/// space after the dot, unless it really is the start of a URL path.
pub fn unlink_govuk_escaped(message: &str) -> String {
    let mut result = String::with_capacity(message.len());
    let mut last = 0;
    for caps in GOVUK_NOT_A_LINK.captures_iter(message) {
        let whole = caps.get(0).unwrap();
        result.push_str(&message[last..whole.start()]);
        let next_char = message[whole.end()..].chars().next();
        if matches!(next_char, Some('/') | Some('?') | Some('#')) {
            result.push_str(whole.as_str());
        } else {
            result.push_str(&caps[1]);
            result.push_str(&caps[2]);
            result.push_str(&caps[3]);
            result.push_str(".\u{200B}");
            result.push_str(&caps[4]);
        }
        last = whole.end();
    }
    result.push_str(&message[last..]);
    result
}

pub fn url_encode_full_stops(value: &str) -> String {
    value.replace('.', "%2E")
}

pub fn create_sanitised_html_for_url(link: &str, classes: &str, style: &str) -> String {
    let class_attribute = if classes.is_empty() {
        String::new()
    } else {
        format!("class=\"{classes}\" ")
    };
    let style_attribute = if style.is_empty() {
        String::new()
    } else {
        format!("style=\"{style}\" ")
    };
    format!(
        "<a {}{}href=\"{}\">{}</a>",
        class_attribute,
        style_attribute,
        url_encode_full_stops(link),
        link,
    )
}

/// Turns bare `http(s)://` addresses into anchors.
pub fn autolink_urls(value: &str, classes: &str, style: &str) -> String {
    URL.replace_all(value, |caps: &Captures| {
        create_sanitised_html_for_url(&caps[0], classes, style)
    })
    .into_owned()
}

fn decode_charref(charref: &str) -> Option<String> {
    if let Some(body) = charref.strip_prefix('#') {
        let (digits, radix) = match body.strip_prefix(['x', 'X']) {
            Some(hex_digits) => (hex_digits, 16),
            None => (body, 10),
        };
        let codepoint = u32::from_str_radix(digits.trim_end_matches(';'), radix).ok()?;
        return char::from_u32(codepoint).map(String::from);
    }
    NAMED_CHARREFS
        .iter()
        .find(|(name, _)| *name == charref)
        .map(|(_, replacement)| replacement.to_string())
}

/// Like a standard HTML unescape, but trailing semicolons are
/// non-optional and unknown references are left alone.
pub fn unescape_strict(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    CHARREF
        .replace_all(value, |caps: &Captures| {
            decode_charref(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn escape_amp_lt_gt(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escapes `&`, `<` and `>` (not quotes). Character references are
/// decoded first so input can't be double-escaped, except the handful
/// in `HTML_ENTITY_MAPPING`, which pass through verbatim.
pub fn escape_html(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let mut value = value.to_string();
    for (entity, temporary_replacement) in HTML_ENTITY_MAPPING {
        value = value.replace(entity, temporary_replacement);
    }
    let mut value = escape_amp_lt_gt(&unescape_strict(&value));
    for (entity, temporary_replacement) in HTML_ENTITY_MAPPING {
        value = value.replace(temporary_replacement, entity);
    }
    value
}

/// Converts straight quotes to typographic quotes, skipping anything
/// inside tags and the contents of anchors and code-like elements.
pub fn make_quotes_smart(value: &str) -> String {
    const SKIP_ELEMENTS: &[&str] = &["a", "pre", "code", "kbd", "script", "style", "samp", "tt"];

    let mut result = String::with_capacity(value.len());
    let mut skip_depth = 0usize;
    let mut prev_char: Option<char> = None;
    let mut rest = value;

    while !rest.is_empty() {
        if let Some(tag_start) = rest.find('<') {
            let (text, after) = rest.split_at(tag_start);
            educate_quotes(text, &mut prev_char, skip_depth > 0, &mut result);
            match after.find('>') {
                Some(tag_end) => {
                    let tag = &after[..=tag_end];
                    let name: String = tag
                        .trim_start_matches(['<', '/'])
                        .chars()
                        .take_while(|c| c.is_ascii_alphanumeric())
                        .collect();
                    if SKIP_ELEMENTS.contains(&name.to_ascii_lowercase().as_str()) {
                        if tag.starts_with("</") {
                            skip_depth = skip_depth.saturating_sub(1);
                        } else if !tag.ends_with("/>") {
                            skip_depth += 1;
                        }
                    }
                    result.push_str(tag);
                    rest = &after[tag_end + 1..];
                }
                None => {
                    // Unclosed angle bracket, treat the rest as text
                    educate_quotes(after, &mut prev_char, skip_depth > 0, &mut result);
                    rest = "";
                }
            }
        } else {
            educate_quotes(rest, &mut prev_char, skip_depth > 0, &mut result);
            rest = "";
        }
    }
    result
}

fn educate_quotes(text: &str, prev_char: &mut Option<char>, skip: bool, out: &mut String) {
    if skip {
        out.push_str(text);
        if let Some(last) = text.chars().last() {
            *prev_char = Some(last);
        }
        return;
    }
    let chars: Vec<char> = text.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '\'' | '"' => {
                let next = chars.get(i + 1).copied();
                let opening = match *prev_char {
                    None => true,
                    Some(p) => {
                        (p.is_whitespace() || matches!(p, '(' | '[' | '{' | '\u{2013}' | '\u{2014}'))
                            && next.map_or(false, |n| !n.is_whitespace())
                    }
                };
                out.push_str(match (c, opening) {
                    ('\'', true) => "&#8216;",
                    ('\'', false) => "&#8217;",
                    ('"', true) => "&#8220;",
                    ('"', false) => "&#8221;",
                    _ => unreachable!(),
                });
            }
            _ => out.push(c),
        }
        *prev_char = Some(c);
    }
}

/// Email addresses shouldn't pick up typographic quotes, so any that
/// did get their straight apostrophes back.
pub fn remove_smart_quotes_from_email_addresses(value: &str) -> String {
    EMAIL_WITH_SMART_QUOTES
        .replace_all(value, |caps: &Captures| {
            caps[0].replace(['\u{2018}', '\u{2019}'], "'")
        })
        .into_owned()
}

pub fn unescaped_formatted_list(
    items: &[String],
    conjunction: &str,
    before_each: &str,
    after_each: &str,
    separator: &str,
) -> String {
    match items {
        [] => String::new(),
        [only] => format!("{before_each}{only}{after_each}"),
        _ => {
            let formatted: Vec<String> = items
                .iter()
                .map(|item| format!("{before_each}{item}{after_each}"))
                .collect();
            let (last, first) = formatted.split_last().unwrap();
            format!("{} {} {}", first.join(separator), conjunction, last)
        }
    }
}

/// ‘Quoted’, comma-separated list with a conjunction before the last
/// item, HTML-escaping each item.
pub fn formatted_list(items: &[String], conjunction: &str) -> String {
    let escaped: Vec<String> = items.iter().map(|item| escape_html(item)).collect();
    unescaped_formatted_list(&escaped, conjunction, "\u{2018}", "\u{2019}", ", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_and_remove_obscure_whitespace() {
        assert_eq!(
            strip_and_remove_obscure_whitespace("\u{200B} stripped \u{FEFF}\u{00A0}"),
            "stripped"
        );
        assert_eq!(
            strip_and_remove_obscure_whitespace("in\u{200D}side"),
            "inside"
        );
        assert_eq!(strip_and_remove_obscure_whitespace(""), "");
    }

    #[test]
    fn test_strip_all_whitespace_with_extra_characters() {
        assert_eq!(strip_all_whitespace("  foo,bar, \u{00A0},", ","), "foo,bar");
    }

    #[test]
    fn test_normalise_whitespace() {
        assert_eq!(normalise_whitespace("  a \u{00A0} b\u{200B}c  "), "a bc");
    }

    #[test]
    fn test_normalise_multiple_newlines() {
        assert_eq!(normalise_multiple_newlines("a\n\n\n\nb\n\nc"), "a\n\nb\n\nc");
    }

    #[test]
    fn test_remove_whitespace_before_punctuation() {
        assert_eq!(
            remove_whitespace_before_punctuation("hello , world ."),
            "hello, world."
        );
    }

    #[test]
    fn test_replace_hyphens_with_en_dashes() {
        assert_eq!(replace_hyphens_with_en_dashes("a - b"), "a \u{2013} b");
        assert_eq!(replace_hyphens_with_en_dashes("a \u{2014} b"), "a \u{2013} b");
        assert_eq!(replace_hyphens_with_en_dashes("well-known"), "well-known");
    }

    #[test]
    fn test_nl2br() {
        assert_eq!(nl2br(" a\nb\r\nc "), "a<br>b<br><br>c");
    }

    #[test]
    fn test_add_prefix() {
        assert_eq!(add_prefix("body", Some("Service ")), "Service: body");
        assert_eq!(add_prefix("body", None), "body");
    }

    #[test]
    fn test_unlink_govuk_escaped() {
        assert_eq!(unlink_govuk_escaped("visit GOV.UK"), "visit GOV.\u{200B}UK");
        assert_eq!(
            unlink_govuk_escaped("visit www.gov.uk/example"),
            "visit www.gov.uk/example"
        );
        assert_eq!(
            unlink_govuk_escaped("GOV.UK today"),
            "GOV.\u{200B}UK today"
        );
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(escape_html("5 &gt; 4"), "5 &gt; 4");
        assert_eq!(escape_html("tea&nbsp;break"), "tea&nbsp;break");
        assert_eq!(escape_html("&#65;"), "A");
        assert_eq!(escape_html("fish &amp; chips"), "fish &amp; chips");
        assert_eq!(escape_html("&wat;"), "&amp;wat;");
    }

    #[test]
    fn test_make_quotes_smart() {
        assert_eq!(
            make_quotes_smart("isn't \"quoted\""),
            "isn&#8217;t &#8220;quoted&#8221;"
        );
        assert_eq!(
            make_quotes_smart(r#"<a href="https://example.com">don't</a> don't"#),
            r#"<a href="https://example.com">don't</a> don&#8217;t"#
        );
    }

    #[test]
    fn test_remove_smart_quotes_from_email_addresses() {
        assert_eq!(
            remove_smart_quotes_from_email_addresses(
                "Email o\u{2019}connor@example.com about it"
            ),
            "Email o'connor@example.com about it"
        );
        assert_eq!(
            remove_smart_quotes_from_email_addresses("it\u{2019}s fine"),
            "it\u{2019}s fine"
        );
    }

    #[test]
    fn test_autolink_urls() {
        let result = autolink_urls("go to https://example.com/page. now", "link", "");
        assert_eq!(
            result,
            "go to <a class=\"link\" href=\"https://example%2Ecom/page\">https://example.com/page</a>. now"
        );
    }

    #[test]
    fn test_formatted_list() {
        assert_eq!(
            unescaped_formatted_list(
                &["a".to_string(), "b".to_string(), "c".to_string()],
                "and",
                "",
                "",
                ", "
            ),
            "a, b and c"
        );
        assert_eq!(
            formatted_list(&["one".to_string()], "and"),
            "\u{2018}one\u{2019}"
        );
    }
}
