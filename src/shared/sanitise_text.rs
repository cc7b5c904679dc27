// ============================================================
// SANITISE TEXT
// ============================================================
// Downgrade arbitrary unicode into GSM- or ASCII-compatible text

use std::collections::BTreeSet;

/// GSM 03.38 default alphabet.
const GSM_CHARACTERS: &str = "@£$¥èéùìòÇ\nØø\rÅåΔ_ΦΓΛΩΠΨΣΘΞ\u{1b}ÆæßÉ !\"#¤%&'()*+,-./0123456789:;<=>?¡ABCDEFGHIJKLMNOPQRSTUVWXYZÄÖÑÜ§¿abcdefghijklmnopqrstuvwxyzäöñüà";

/// GSM 03.38 extension table. These are sent as two septets, so they
/// count twice towards the character limit.
pub const EXTENDED_GSM_CHARACTERS: &[char] = &['^', '{', '}', '\\', '[', ']', '~', '|', '€'];

/// Welsh characters not already included in GSM.
pub const WELSH_NON_GSM_CHARACTERS: &str =
    "ÂâÊêÎîÔôÛûŴŵŶŷÁáÍíÓóÚúẂẃÝýÀÈÌÒÙẀẁỲỳËëÏïẄẅŸÿ";

const PRINTABLE_ASCII: &str = " !\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`abcdefghijklmnopqrstuvwxyz{|}~";

/// Characters with a sensible non-letter downgrade.
const REPLACEMENT_CHARACTERS: &[(char, &str)] = &[
    ('\u{2013}', "-"),   // EN DASH
    ('\u{2014}', "-"),   // EM DASH
    ('\u{2026}', "..."), // HORIZONTAL ELLIPSIS
    ('\u{2018}', "'"),   // LEFT SINGLE QUOTATION MARK
    ('\u{2019}', "'"),   // RIGHT SINGLE QUOTATION MARK
    ('\u{201C}', "\""),  // LEFT DOUBLE QUOTATION MARK
    ('\u{201D}', "\""),  // RIGHT DOUBLE QUOTATION MARK
    ('\u{200B}', ""),    // ZERO WIDTH SPACE
    ('\u{00A0}', ""),    // NON BREAKING SPACE
    ('\t', " "),         // TAB
];

/// Base letter for the accented Latin characters we expect to see in
/// names and addresses. Mirrors what unicode decomposition would give.
fn base_letter(c: char) -> Option<char> {
    let base = match c {
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' | 'Ǎ' => 'A',
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' | 'ǎ' => 'a',
        'Ç' | 'Ć' | 'Ĉ' | 'Ċ' | 'Č' => 'C',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'Ď' => 'D',
        'ď' => 'd',
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ĕ' | 'Ė' | 'Ę' | 'Ě' => 'E',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'Ĝ' | 'Ğ' | 'Ġ' | 'Ģ' => 'G',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
        'Ĥ' => 'H',
        'ĥ' => 'h',
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ĩ' | 'Ī' | 'Ĭ' | 'Į' | 'İ' => 'I',
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' => 'i',
        'Ĵ' => 'J',
        'ĵ' => 'j',
        'Ķ' => 'K',
        'ķ' => 'k',
        'Ĺ' | 'Ļ' | 'Ľ' => 'L',
        'ĺ' | 'ļ' | 'ľ' => 'l',
        'Ñ' | 'Ń' | 'Ņ' | 'Ň' => 'N',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ō' | 'Ŏ' | 'Ő' => 'O',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ō' | 'ŏ' | 'ő' => 'o',
        'Ŕ' | 'Ŗ' | 'Ř' => 'R',
        'ŕ' | 'ŗ' | 'ř' => 'r',
        'Ś' | 'Ŝ' | 'Ş' | 'Š' => 'S',
        'ś' | 'ŝ' | 'ş' | 'š' => 's',
        'Ţ' | 'Ť' => 'T',
        'ţ' | 'ť' => 't',
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ũ' | 'Ū' | 'Ŭ' | 'Ů' | 'Ű' | 'Ų' => 'U',
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'Ŵ' | 'Ẁ' | 'Ẃ' | 'Ẅ' => 'W',
        'ŵ' | 'ẁ' | 'ẃ' | 'ẅ' => 'w',
        'Ý' | 'Ŷ' | 'Ÿ' | 'Ỳ' => 'Y',
        'ý' | 'ÿ' | 'ŷ' | 'ỳ' => 'y',
        'Ź' | 'Ż' | 'Ž' => 'Z',
        'ź' | 'ż' | 'ž' => 'z',
        _ => return None,
    };
    Some(base)
}

pub trait SanitiseText {
    fn is_allowed(c: char) -> bool;

    /// Attempt to downgrade a non-compatible character to the allowed
    /// character set. May downgrade to multiple characters, eg `… -> ...`
    ///
    /// Returns None if the character has no known downgrade.
    fn downgrade_character(c: char) -> Option<String> {
        if let Some(base) = base_letter(c) {
            return Some(base.to_string());
        }
        REPLACEMENT_CHARACTERS
            .iter()
            .find(|(from, _)| *from == c)
            .map(|(_, to)| to.to_string())
    }

    /// Given a single character, return a compatible replacement from
    /// the allowed set, falling back to `?`.
    fn encode_char(c: char) -> String {
        if Self::is_allowed(c) {
            return c.to_string();
        }
        Self::downgrade_character(c).unwrap_or_else(|| "?".to_string())
    }

    fn encode(content: &str) -> String {
        content.chars().map(Self::encode_char).collect()
    }

    /// The characters `encode` would replace with `?`.
    fn get_non_compatible_characters(content: &str) -> BTreeSet<char> {
        content
            .chars()
            .filter(|&c| !Self::is_allowed(c) && Self::downgrade_character(c).is_none())
            .collect()
    }
}

/// Makes text GSM and Welsh character compatible:
/// * GSM characters (including the extension table) are kept
/// * Welsh accented characters outside GSM are kept
/// * characters with sensible downgrades are replaced in place
/// * everything else (chinese/cyrillic/glyphs/emoji) becomes `?`
pub struct SanitiseSms;

impl SanitiseText for SanitiseSms {
    fn is_allowed(c: char) -> bool {
        GSM_CHARACTERS.contains(c)
            || EXTENDED_GSM_CHARACTERS.contains(&c)
            || WELSH_NON_GSM_CHARACTERS.contains(c)
    }
}

/// As SMS above, but the allowed characters are printable ASCII.
pub struct SanitiseAscii;

impl SanitiseText for SanitiseAscii {
    fn is_allowed(c: char) -> bool {
        PRINTABLE_ASCII.contains(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gsm_characters_kept() {
        assert_eq!(SanitiseSms::encode("a £ @ ñ Ø €"), "a £ @ ñ Ø €");
    }

    #[test]
    fn test_welsh_characters_kept_for_sms_but_not_ascii() {
        assert_eq!(SanitiseSms::encode("Llŷn"), "Llŷn");
        assert_eq!(SanitiseAscii::encode("Llŷn"), "Llyn");
    }

    #[test]
    fn test_downgrades_in_place() {
        assert_eq!(SanitiseSms::encode("a – b — c"), "a - b - c");
        assert_eq!(SanitiseSms::encode("wait…"), "wait...");
        assert_eq!(SanitiseSms::encode("\u{2018}hi\u{2019}"), "'hi'");
        assert_eq!(SanitiseSms::encode("zero\u{200B}width"), "zerowidth");
        assert_eq!(SanitiseSms::encode("tab\there"), "tab here");
        assert_eq!(SanitiseAscii::encode("café"), "cafe");
    }

    #[test]
    fn test_unknown_characters_become_question_marks() {
        assert_eq!(SanitiseSms::encode("文字 🚀"), "?? ?");
        assert_eq!(SanitiseAscii::encode("Привет"), "??????");
    }

    #[test]
    fn test_get_non_compatible_characters() {
        let chars = SanitiseSms::get_non_compatible_characters("café 文字…");
        assert_eq!(chars, BTreeSet::from(['文', '字']));
    }
}
