//! Digest computation for file content and directory combination using BLAKE3

use crate::types::Digest;
use blake3::Hasher;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};

/// Version tag of the digest algorithm and directory combination rule.
///
/// Bump whenever either changes; persisted trees carrying another version are
/// refused by the store and the comparator.
pub const ALGORITHM_VERSION: u32 = 1;

/// Read size used when streaming file content into the hasher.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Stream `reader` through BLAKE3 in fixed-size chunks.
///
/// Returns the digest and the number of bytes consumed. When `cancel` is
/// raised the read stops between chunks with `ErrorKind::Interrupted`.
pub fn hash_reader<R: Read>(mut reader: R, cancel: &AtomicBool) -> io::Result<(Digest, u64)> {
    let mut hasher = Hasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total: u64 = 0;

    loop {
        if cancel.load(Ordering::Relaxed) {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "hashing cancelled"));
        }
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
        total += n as u64;
    }

    Ok((hasher.finalize().into(), total))
}

/// Compute the content digest of an in-memory byte slice
pub fn hash_bytes(content: &[u8]) -> Digest {
    let mut hasher = Hasher::new();
    hasher.update(content);
    hasher.finalize().into()
}

/// Combine child digests into a directory digest.
///
/// digest = hash(sorted(child digests) concatenated)
///
/// Duplicates are kept, so the result depends on the multiset of child
/// digests; names and ordering never enter the computation. Every digest has
/// the same width, so no separators are needed.
pub fn combine_digests<I>(children: I) -> Digest
where
    I: IntoIterator<Item = Digest>,
{
    let mut digests: Vec<Digest> = children.into_iter().collect();
    digests.sort_unstable();

    let mut hasher = Hasher::new();
    for digest in &digests {
        hasher.update(digest.as_bytes());
    }
    hasher.finalize().into()
}
