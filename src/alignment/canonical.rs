use crate::error::AlignmentError;
use crate::types::{collapse_whitespace, CanonicalKeys, EMPTY_WEAK_KEY};

const THORN: char = 'þ';
const YOGH: char = 'ȝ';

/// Scribal spellings replaced on a full-word match before any folding.
const ARCHAIC_FORMS: [(&str, &str); 9] = [
    ("ye", "the"),
    ("he", "the"),
    ("hit", "it"),
    ("hyt", "it"),
    ("his", "this"),
    ("hem", "them"),
    ("fro", "from"),
    ("froo", "from"),
    ("yerof", "thereof"),
];

/// Editorial placeholders and punctuation dropped from keys.
const STRIPPED_CHARS: [char; 5] = ['?', '*', '/', '_', '.'];

const WEAK_FIXUPS: [(&str, &str); 1] = [("tflt", "tft")];

/// Map a surface form to its strong and weak keys.
///
/// The fold table is tuned to the Middle English corpus; treat any change
/// to it as a change in alignment output.
pub fn canonicalize(surface: &str) -> Result<CanonicalKeys, AlignmentError> {
    let collapsed = collapse_whitespace(surface);
    if collapsed.is_empty() {
        return Err(AlignmentError::invariant(
            "canonicalize",
            "empty surface form",
        ));
    }
    let strong = strong_key(&collapsed);
    if strong.is_empty() {
        return Err(AlignmentError::invariant(
            "canonicalize",
            format!("strong key of {collapsed:?} is empty"),
        ));
    }
    let weak = weak_key(&strong);
    Ok(CanonicalKeys { strong, weak })
}

fn strong_key(collapsed: &str) -> String {
    let lowered = collapsed.to_lowercase();
    let mut key = ARCHAIC_FORMS
        .iter()
        .find(|(from, _)| *from == lowered)
        .map(|(_, to)| (*to).to_string())
        .unwrap_or(lowered);

    key.retain(|c| !c.is_whitespace() && !STRIPPED_CHARS.contains(&c));
    let key = key
        .replace('&', "et")
        .replace("+t", &THORN.to_string())
        .replace("+3", &YOGH.to_string())
        .replace(THORN, "th");
    let key = resolve_yogh(&key).replace("ph", "f");
    let key = fold_letter_classes(&key);
    let key = collapse_repeats(&key);
    let key = collapse_r_syllables(&key).replace("cio", "tio");
    let key = match key.strip_prefix("hour") {
        Some(rest) => format!("our{rest}"),
        None => key,
    };
    trim_inflection(key)
}

fn weak_key(strong: &str) -> String {
    let folded: String = strong
        .chars()
        .map(|c| match c {
            'x' | 'c' => 't',
            'u' => 'o',
            other => other,
        })
        .enumerate()
        .filter(|&(i, c)| i == 0 || !matches!(c, 'i' | 'o'))
        .map(|(_, c)| c)
        .filter(|&c| c != 'h')
        .collect();
    let key = collapse_repeats(&folded);
    let key = WEAK_FIXUPS
        .iter()
        .find(|(from, _)| *from == key)
        .map(|(_, to)| (*to).to_string())
        .unwrap_or(key);
    if key.is_empty() {
        EMPTY_WEAK_KEY.to_string()
    } else {
        key
    }
}

/// Yogh becomes `gh` word-initially or after a back vowel, `z` word-finally
/// and `y` everywhere else. Rules apply in that order.
fn resolve_yogh(key: &str) -> String {
    if !key.contains(YOGH) {
        return key.to_string();
    }
    let key = match key.strip_prefix(YOGH) {
        Some(rest) => format!("gh{rest}"),
        None => key.to_string(),
    };

    let mut after_vowel = String::with_capacity(key.len() + 2);
    let mut prev: Option<char> = None;
    for c in key.chars() {
        if c == YOGH && matches!(prev, Some('a' | 'i' | 'o' | 'u' | 'y')) {
            after_vowel.push_str("gh");
        } else {
            after_vowel.push(c);
        }
        prev = Some(c);
    }

    let key = match after_vowel.strip_suffix(YOGH) {
        Some(rest) => format!("{rest}z"),
        None => after_vowel,
    };
    key.replace(YOGH, "y")
}

/// `th`/`d` to `t`, nasals to `m`, sibilants to `c`, `j y e a` to `i`,
/// `v w` to `u`.
fn fold_letter_classes(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();
    while let Some(c) = chars.next() {
        let folded = match c {
            't' => {
                if chars.peek() == Some(&'h') {
                    chars.next();
                }
                't'
            }
            'd' => 't',
            'm' | 'n' => 'm',
            'z' | 's' | 'k' => 'c',
            'j' | 'y' | 'e' | 'a' => 'i',
            'v' | 'w' => 'u',
            other => other,
        };
        out.push(folded);
    }
    out
}

/// Runs of the same ASCII letter collapse to one occurrence.
fn collapse_repeats(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut last: Option<char> = None;
    for c in key.chars() {
        if c.is_ascii_lowercase() && last == Some(c) {
            continue;
        }
        out.push(c);
        last = Some(c);
    }
    out
}

/// `ir`, `ri` and `iri` all reduce to `r`.
fn collapse_r_syllables(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len());
    let mut i = 0;
    while i < chars.len() {
        let r_at = if chars[i] == 'r' {
            Some(i)
        } else if chars[i] == 'i' && chars.get(i + 1) == Some(&'r') {
            Some(i + 1)
        } else {
            None
        };
        match r_at {
            Some(r) => {
                out.push('r');
                i = r + 1;
                if chars.get(i) == Some(&'i') {
                    i += 1;
                }
            }
            None => {
                out.push(chars[i]);
                i += 1;
            }
        }
    }
    out
}

/// Drops a final `-i` and shortens a final `-is` to `-s`, keeping at least
/// two characters of stem.
fn trim_inflection(mut key: String) -> String {
    if key.ends_with('i') && key.chars().count() >= 3 {
        key.pop();
    }
    if key.ends_with("is") && key.chars().count() >= 4 {
        key.truncate(key.len() - 2);
        key.push('s');
    }
    key
}
