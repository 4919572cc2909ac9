//! Deletion codes are capability tokens: whoever holds an item's code may remove it.
//!
//! Codes are not checked for uniqueness against existing items. With 36^6 (about 2.1 billion)
//! possibilities a collision is both unlikely and harmless, since a code is only ever
//! compared together with its item id.

use crate::constants::DELETION_CODE_ALPHABET;
use crate::constants::DELETION_CODE_LENGTH;
use rand::distributions::Uniform;
use rand::Rng;

/// Draw a fresh code of uppercase letters and digits, independent of all previous codes.
pub fn generate() -> String {
    generate_with(&mut rand::thread_rng())
}

pub fn generate_with<R: Rng>(rng: &mut R) -> String {
    let symbols = Uniform::from(0..DELETION_CODE_ALPHABET.len());
    (0..DELETION_CODE_LENGTH)
        .map(|_| DELETION_CODE_ALPHABET[rng.sample(&symbols)] as char)
        .collect()
}
