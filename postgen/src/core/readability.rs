//! Readability estimate used for the tone score.

use super::structure::sentences;

const TONE_FLOOR: f64 = 0.2;

/// Flesch-Kincaid grade level. Empty text is grade 0.
pub fn flesch_kincaid_grade(text: &str) -> f64 {
    let words: Vec<&str> = text
        .split_whitespace()
        .filter(|word| word.chars().any(char::is_alphanumeric))
        .collect();
    if words.is_empty() {
        return 0.0;
    }
    let sentence_count = sentences(text).count().max(1);
    let syllables: usize = words.iter().map(|word| syllable_count(word)).sum();

    let word_count = words.len() as f64;
    0.39 * (word_count / sentence_count as f64) + 11.8 * (syllables as f64 / word_count) - 15.59
}

/// Map a grade level onto 0.0..=1.0, easier text scoring higher.
pub fn tone_score_for_grade(grade: f64) -> f64 {
    if grade <= 5.0 {
        1.0
    } else if grade >= 14.0 {
        TONE_FLOOR
    } else {
        (1.0 - (grade - 5.0) * 0.05).max(TONE_FLOOR)
    }
}

pub fn tone_score(text: &str) -> f64 {
    tone_score_for_grade(flesch_kincaid_grade(text))
}

/// Vowel-group heuristic: each run of vowels is a syllable, a trailing silent
/// `e` is dropped, and every word has at least one.
fn syllable_count(word: &str) -> usize {
    let letters: Vec<char> = word
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if letters.is_empty() {
        return 1;
    }

    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut groups = 0;
    let mut previous_vowel = false;
    for &c in &letters {
        let vowel = is_vowel(c);
        if vowel && !previous_vowel {
            groups += 1;
        }
        previous_vowel = vowel;
    }

    let silent_e = letters.len() > 2
        && letters.ends_with(&['e'])
        && !letters.ends_with(&['l', 'e'])
        && !is_vowel(letters[letters.len() - 2]);
    if silent_e && groups > 1 {
        groups -= 1;
    }
    groups.max(1)
}
