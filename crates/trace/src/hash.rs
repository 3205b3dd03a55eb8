//! Content-addressed node hashing
//!
//! A node's hash is FNV-1a folded over its name, seeded with its parent's
//! hash. Roots are seeded with the FNV offset basis. Each name is followed by
//! a `0xff` terminator, a byte that never occurs in UTF-8, so `a/bc` and
//! `ab/c` hash differently and an empty name never aliases its parent.

/// 64-bit FNV offset basis
pub const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

/// 64-bit FNV prime
pub const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

const TERMINATOR: u8 = 0xff;

#[inline]
fn fnv1a_byte(hash: u64, byte: u8) -> u64 {
    (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
}

/// Fold `name` into `seed`
#[inline]
pub fn fnv1a_fold(seed: u64, name: &str) -> u64 {
    let hash = name.bytes().fold(seed, fnv1a_byte);
    fnv1a_byte(hash, TERMINATOR)
}

/// Hash of a root node
#[inline]
pub fn root_hash(name: &str) -> u64 {
    fnv1a_fold(FNV_OFFSET_BASIS, name)
}

/// Hash of a child node
#[inline]
pub fn child_hash(parent: u64, name: &str) -> u64 {
    fnv1a_fold(parent, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = child_hash(root_hash("frame"), "update");
        let b = child_hash(root_hash("frame"), "update");
        assert_eq!(a, b);
    }

    #[test]
    fn test_order_sensitive() {
        let root = root_hash("r");
        assert_ne!(child_hash(child_hash(root, "a"), "b"), child_hash(child_hash(root, "b"), "a"));
    }

    #[test]
    fn test_split_point_matters() {
        let root = root_hash("r");
        assert_ne!(
            child_hash(child_hash(root, "a"), "bc"),
            child_hash(child_hash(root, "ab"), "c")
        );
    }

    #[test]
    fn test_empty_name_differs_from_parent() {
        let root = root_hash("r");
        assert_ne!(child_hash(root, ""), root);
    }

    #[test]
    fn test_seeded_from_parent() {
        assert_ne!(child_hash(root_hash("x"), "n"), child_hash(root_hash("y"), "n"));
    }
}
