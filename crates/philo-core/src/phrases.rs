//! Things a philosopher may say while holding the talk channel.

use crate::ActorId;

/// Fixed phrases. The last entry of the table is generated per speaker.
const PHRASES: [&str; 4] = [
    "Eh, it's not easy to be a philosopher: eat, think, talk, eat...",
    "You know, true is false and false is true if you think of it",
    "2 + 2 = 5 for extremely large values of 2...",
    "If thee cannot speak, thee must be silent",
];

/// Number of entries a speaker can choose from.
pub const PHRASE_COUNT: usize = PHRASES.len() + 1;

/// Returns the phrase at `index` for `speaker`.
///
/// Indexes past the end wrap, so any random index is usable.
pub fn phrase(index: usize, speaker: ActorId) -> String {
    match PHRASES.get(index % PHRASE_COUNT) {
        Some(text) => (*text).to_string(),
        None => format!("My number is {speaker}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_phrase() {
        assert_eq!(
            phrase(3, ActorId::new(0)),
            "If thee cannot speak, thee must be silent"
        );
    }

    #[test]
    fn test_last_phrase_names_speaker() {
        assert_eq!(phrase(4, ActorId::new(6)), "My number is 7");
    }

    #[test]
    fn test_index_wraps() {
        assert_eq!(phrase(PHRASE_COUNT, ActorId::new(0)), phrase(0, ActorId::new(0)));
    }
}
