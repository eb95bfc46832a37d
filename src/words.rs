use include_dir::{include_dir, Dir};
use itertools::Itertools;
use rand::seq::SliceRandom;
use serde::Deserialize;

static WORDS_DIR: Dir = include_dir!("src/words");

/// Embedded pool of common English words the typing reference is drawn
/// from.
#[derive(Deserialize, Clone, Debug)]
pub struct WordList {
    pub name: String,
    pub size: u32,
    pub words: Vec<String>,
}

impl WordList {
    pub fn embedded() -> Self {
        let file = WORDS_DIR
            .get_file("english.json")
            .expect("Word list not embedded");

        let raw = file
            .contents_utf8()
            .expect("Unable to interpret word list as a string");

        serde_json::from_str(raw).expect("Unable to deserialize word list json")
    }

    /// Sample `count` words and join them into the reference text: one
    /// run of single-spaced words with a trailing period.
    pub fn reference_text(&self, count: usize) -> String {
        let mut rng = rand::thread_rng();
        let picked = self
            .words
            .choose_multiple(&mut rng, count.min(self.words.len()))
            .join(" ");

        format!("{picked}.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_list_loads() {
        let list = WordList::embedded();

        assert_eq!(list.name, "english");
        assert!(!list.words.is_empty());
        assert_eq!(list.size as usize, list.words.len());
    }

    #[test]
    fn test_reference_text_shape() {
        let list = WordList::embedded();
        let text = list.reference_text(100);

        assert!(text.ends_with('.'));
        assert_eq!(text.split_whitespace().count(), 100);
        assert!(!text.contains("  "));
    }

    #[test]
    fn test_reference_text_small_sample() {
        let list = WordList::embedded();
        let text = list.reference_text(5);

        assert_eq!(text.split_whitespace().count(), 5);
    }

    #[test]
    fn test_reference_text_caps_at_pool_size() {
        let list = WordList {
            name: "tiny".into(),
            size: 2,
            words: vec!["go".into(), "now".into()],
        };

        let text = list.reference_text(100);
        assert_eq!(text.split_whitespace().count(), 2);
    }
}
