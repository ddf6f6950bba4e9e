//! Note id allocation.
//!
//! Ids are 10 characters drawn from the base58 alphabet, which leaves out the
//! look-alike characters `0`, `O`, `I` and `l` and never produces `-` or `_`.
//! They are safe to embed in URLs and easy to read back while debugging.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::fmt;

pub const NOTE_ID_ALPHABET: &[u8; 58] =
    b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

pub const NOTE_ID_LENGTH: usize = 10;

type CandidateFn = Box<dyn FnMut() -> String + Send>;

enum IdSource {
    Random(StdRng),
    Custom(CandidateFn),
}

/// Generates note ids that avoid a caller-supplied set
pub struct NoteIdGenerator {
    source: IdSource,
}

impl NoteIdGenerator {
    /// Generator seeded from OS entropy
    pub fn new() -> Self {
        Self {
            source: IdSource::Random(StdRng::from_entropy()),
        }
    }

    /// Reproducible generator
    pub fn seeded(seed: u64) -> Self {
        Self {
            source: IdSource::Random(StdRng::seed_from_u64(seed)),
        }
    }

    /// Generator backed by a caller-provided candidate function
    ///
    /// Used by tests to force collisions.
    pub fn with_source(source: impl FnMut() -> String + Send + 'static) -> Self {
        Self {
            source: IdSource::Custom(Box::new(source)),
        }
    }

    /// Return an id that is non-empty and not in `exclude`
    ///
    /// The caller is responsible for adding the id to its own set.
    pub fn create_note_id(&mut self, exclude: &HashSet<String>) -> String {
        loop {
            let candidate = self.candidate();
            if !candidate.is_empty() && !exclude.contains(&candidate) {
                return candidate;
            }
            tracing::trace!("note id collision on {:?}, retrying", candidate);
        }
    }

    fn candidate(&mut self) -> String {
        match &mut self.source {
            IdSource::Random(rng) => random_note_id(rng),
            IdSource::Custom(source) => source(),
        }
    }
}

impl Default for NoteIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NoteIdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            IdSource::Random(_) => "random",
            IdSource::Custom(_) => "custom",
        };
        f.debug_struct("NoteIdGenerator")
            .field("source", &source)
            .finish()
    }
}

fn random_note_id<R: Rng>(rng: &mut R) -> String {
    (0..NOTE_ID_LENGTH)
        .map(|_| NOTE_ID_ALPHABET[rng.gen_range(0..NOTE_ID_ALPHABET.len())] as char)
        .collect()
}

/// Fresh id from the thread-local generator
pub fn create_note_id(exclude: &HashSet<String>) -> String {
    let mut rng = rand::thread_rng();
    loop {
        let candidate = random_note_id(&mut rng);
        if !exclude.contains(&candidate) {
            return candidate;
        }
    }
}

/// Whether `id` has the shape of a generated note id
///
/// Documents may contain ids from other sources; this is only used for
/// diagnostics.
pub fn is_valid_note_id(id: &str) -> bool {
    id.len() == NOTE_ID_LENGTH && id.bytes().all(|b| NOTE_ID_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphabet_excludes_confusable_characters() {
        for banned in [b'-', b'_', b'0', b'O', b'I', b'l'] {
            assert!(!NOTE_ID_ALPHABET.contains(&banned));
        }
    }

    #[test]
    fn test_generated_ids_have_expected_shape() {
        let mut generator = NoteIdGenerator::seeded(7);
        let exclude = HashSet::new();
        for _ in 0..100 {
            let id = generator.create_note_id(&exclude);
            assert!(is_valid_note_id(&id), "unexpected id {id}");
        }
        assert!(is_valid_note_id(&create_note_id(&exclude)));
    }

    #[test]
    fn test_seeded_generators_are_reproducible() {
        let exclude = HashSet::new();
        let a = NoteIdGenerator::seeded(42).create_note_id(&exclude);
        let b = NoteIdGenerator::seeded(42).create_note_id(&exclude);
        assert_eq!(a, b);
    }

    #[test]
    fn test_retries_on_collision() {
        let mut candidates = vec!["taken", "", "also-taken", "fresh"].into_iter();
        let mut generator =
            NoteIdGenerator::with_source(move || candidates.next().unwrap_or("x").to_string());

        let exclude: HashSet<String> = ["taken", "also-taken"]
            .into_iter()
            .map(String::from)
            .collect();

        assert_eq!(generator.create_note_id(&exclude), "fresh");
    }

    #[test]
    fn test_generator_does_not_track_returned_ids() {
        let mut generator = NoteIdGenerator::with_source(|| "same".to_string());
        let exclude = HashSet::new();
        assert_eq!(generator.create_note_id(&exclude), "same");
        assert_eq!(generator.create_note_id(&exclude), "same");
    }
}
