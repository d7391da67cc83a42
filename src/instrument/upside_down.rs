/// Turn text upside down: mirror the character order and flip every glyph
/// that has an upside-down counterpart. Anything else passes through.
pub fn upside_down(text: &str) -> String {
    text.chars().rev().map(flip).collect()
}

fn flip(c: char) -> char {
    match c {
        'a' => 'ɐ',
        'b' => 'q',
        'c' => 'ɔ',
        'd' => 'p',
        'e' => 'ǝ',
        'f' => 'ɟ',
        'g' => 'ƃ',
        'h' => 'ɥ',
        'i' => 'ᴉ',
        'j' => 'ɾ',
        'k' => 'ʞ',
        'm' => 'ɯ',
        'n' => 'u',
        'p' => 'd',
        'q' => 'b',
        'r' => 'ɹ',
        't' => 'ʇ',
        'u' => 'n',
        'v' => 'ʌ',
        'w' => 'ʍ',
        'y' => 'ʎ',
        'A' => '∀',
        'C' => 'Ɔ',
        'E' => 'Ǝ',
        'F' => 'Ⅎ',
        'G' => '⅁',
        'J' => 'ſ',
        'L' => '˥',
        'M' => 'W',
        'P' => 'Ԁ',
        'T' => '⊥',
        'U' => '∩',
        'V' => 'Λ',
        'W' => 'M',
        'Y' => '⅄',
        '1' => 'Ɩ',
        '2' => 'ᄅ',
        '3' => 'Ɛ',
        '4' => 'ㄣ',
        '5' => 'ϛ',
        '6' => '9',
        '7' => 'ㄥ',
        '9' => '6',
        '.' => '˙',
        ',' => '\'',
        '\'' => ',',
        '!' => '¡',
        '?' => '¿',
        '(' => ')',
        ')' => '(',
        '[' => ']',
        ']' => '[',
        '{' => '}',
        '}' => '{',
        '<' => '>',
        '>' => '<',
        '&' => '⅋',
        '_' => '‾',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirrors_and_flips() {
        assert_eq!(upside_down("abc"), "ɔqɐ");
        assert_eq!(upside_down("(1.5%)"), "(%ϛ˙Ɩ)");
    }

    #[test]
    fn test_symmetric_glyphs_only_reverse() {
        assert_eq!(upside_down("xo8 "), " 8ox");
    }

    #[test]
    fn test_empty() {
        assert_eq!(upside_down(""), "");
    }
}
