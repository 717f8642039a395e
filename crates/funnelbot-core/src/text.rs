//! Keyword matching helpers shared by the classifiers, the evaluator and the
//! state machine.
//!
//! All matching runs on folded text: lower-cased with Portuguese diacritics
//! stripped, so "Não" and "nao" are the same word. Terms only match on word
//! boundaries, which keeps short terms such as "lg", "sim" or "3" from firing
//! inside longer words.

/// Lower-case and strip diacritics.
pub fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

/// Byte offset of the first word-bounded occurrence of `term` in `haystack`.
///
/// Both arguments must already be folded.
pub fn find_term(haystack: &str, term: &str) -> Option<usize> {
    if term.is_empty() {
        return None;
    }

    let mut from = 0;
    while let Some(pos) = haystack[from..].find(term) {
        let begin = from + pos;
        let end = begin + term.len();

        let before_ok = haystack[..begin]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());

        if before_ok && after_ok {
            return Some(begin);
        }

        from = begin + haystack[begin..].chars().next().map_or(1, char::len_utf8);
    }
    None
}

/// Whether the folded haystack contains the term on word boundaries.
///
/// The term is folded here, so keyword tables can keep their accents.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    find_term(haystack, &fold(term)).is_some()
}

/// Whether any of the terms matches.
pub fn contains_any(haystack: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| contains_term(haystack, term))
}

/// First term in list order that matches. List order encodes priority, so
/// specific terms ("fire stick") must come before generic ones ("tv").
pub fn first_match<'a>(haystack: &str, terms: &[&'a str]) -> Option<&'a str> {
    terms.iter().copied().find(|term| contains_term(haystack, term))
}

/// Length of the longest matching term, used to pick the most specific of
/// several candidate groups.
pub fn longest_match<S: AsRef<str>>(haystack: &str, terms: &[S]) -> Option<usize> {
    terms
        .iter()
        .map(AsRef::as_ref)
        .filter(|term| contains_term(haystack, term))
        .map(str::len)
        .max()
}

/// First maximal run of ASCII digits whose length lies in `min..=max`.
///
/// Runs that are too long are skipped whole rather than truncated.
pub fn find_digit_run(text: &str, min: usize, max: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let len = i - start;
            if (min..=max).contains(&len) {
                return Some(&text[start..i]);
            }
        } else {
            i += 1;
        }
    }
    None
}

/// Truncate to at most `max` characters, appending an ellipsis when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_strips_accents_and_case() {
        assert_eq!(fold("Não FUNCIONA, Vitalício!"), "nao funciona, vitalicio!");
        assert_eq!(fold("Indicação"), "indicacao");
    }

    #[test]
    fn terms_match_on_word_boundaries() {
        let text = fold("Tenho uma TV LG na sala");
        assert!(contains_term(&text, "lg"));
        assert!(contains_term(&text, "tv"));
        assert!(!contains_term(&fold("algum"), "lg"));
        assert!(!contains_term(&fold("assim"), "sim"));
        assert!(contains_term(&fold("sim!"), "sim"));
    }

    #[test]
    fn accented_terms_match_unaccented_input() {
        let text = fold("o app nao abre");
        assert!(contains_term(&text, "não abre"));
    }

    #[test]
    fn later_occurrence_is_found_after_embedded_one() {
        let text = fold("assim sim");
        assert_eq!(find_term(&text, "sim"), Some(6));
    }

    #[test]
    fn first_match_respects_list_order() {
        let text = fold("minha tv android com fire stick");
        assert_eq!(first_match(&text, &["fire stick", "tv android", "tv"]), Some("fire stick"));
    }

    #[test]
    fn longest_match_prefers_specific_terms() {
        let text = fold("uso uma tv box");
        assert_eq!(longest_match(&text, &["1", "tv"]), Some(2));
        assert_eq!(longest_match(&text, &["3", "box", "tv box"]), Some(6));
        assert_eq!(longest_match(&text, &["roku"]), None);
    }

    #[test]
    fn digit_runs() {
        assert_eq!(find_digit_run("pode ser 11999887766", 10, 11), Some("11999887766"));
        assert_eq!(find_digit_run("1199988776", 10, 11), Some("1199988776"));
        assert_eq!(find_digit_run("manda pro meu amigo", 10, 11), None);
        assert_eq!(find_digit_run("5511999887766", 10, 11), None);
        assert_eq!(find_digit_run("(11) 99988-7766", 10, 11), None);
        assert_eq!(find_digit_run("123 e depois 11999887766", 10, 11), Some("11999887766"));
    }

    #[test]
    fn truncate_appends_ellipsis_only_when_cut() {
        assert_eq!(truncate_chars("curto", 10), "curto");
        assert_eq!(truncate_chars("mensagem longa", 8), "mensagem...");
    }
}
