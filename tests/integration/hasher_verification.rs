//! Integration tests pinning the digest and combination rules

use dmerk::tree::hasher::{combine_digests, hash_bytes, hash_reader, ALGORITHM_VERSION};
use dmerk::Digest;
use std::io::Cursor;
use std::sync::atomic::AtomicBool;

/// BLAKE3 of the empty input
const EMPTY_DIGEST: &str = "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262";

#[test]
fn test_algorithm_version() {
    assert_eq!(ALGORITHM_VERSION, 1);
}

#[test]
fn test_empty_input_digest() {
    assert_eq!(hash_bytes(b"").to_hex(), EMPTY_DIGEST);
    assert_eq!(combine_digests(Vec::<Digest>::new()).to_hex(), EMPTY_DIGEST);
}

#[test]
fn test_file_digest_is_blake3_of_contents() {
    let content = b"The quick brown fox jumps over the lazy dog";
    let expected = Digest::from(blake3::hash(content));
    assert_eq!(hash_bytes(content), expected);

    let cancel = AtomicBool::new(false);
    let (streamed, size) = hash_reader(Cursor::new(&content[..]), &cancel).unwrap();
    assert_eq!(streamed, expected);
    assert_eq!(size, content.len() as u64);
}

#[test]
fn test_directory_digest_is_blake3_of_sorted_concatenation() {
    let a = hash_bytes(b"a");
    let b = hash_bytes(b"b");
    let (low, high) = if a < b { (a, b) } else { (b, a) };

    let mut concatenated = Vec::new();
    concatenated.extend_from_slice(low.as_bytes());
    concatenated.extend_from_slice(high.as_bytes());

    assert_eq!(combine_digests([high, low]), Digest::from(blake3::hash(&concatenated)));
}
