// src/utils_test.rs

#[cfg(test)]
mod tests {
    use crate::utils::*;

    #[test]
    fn test_complement_canonical_bases() {
        assert_eq!(complement(b'A'), b'T');
        assert_eq!(complement(b'C'), b'G');
        assert_eq!(complement(b'G'), b'C');
        assert_eq!(complement(b'T'), b'A');
        assert_eq!(complement(b'a'), b't');
    }

    #[test]
    fn test_complement_keeps_markers() {
        assert_eq!(complement(b'N'), b'N');
        assert_eq!(complement(b'#'), b'#');
        assert_eq!(complement(b'$'), b'$');
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(b"ACGT"), b"ACGT".to_vec());
        assert_eq!(reverse_complement(b"AAC"), b"GTT".to_vec());
        assert_eq!(reverse_complement(b""), Vec::<u8>::new());
    }

    #[test]
    fn test_all_atgc() {
        assert!(all_atgc(b"ACGTTGCA"));
        assert!(!all_atgc(b"ACGN"));
        assert!(!all_atgc(b"acgt"));
        assert!(!all_atgc(b"#ACG"));
        // The empty sequence is vacuously canonical
        assert!(all_atgc(b""));
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "file", "files"), "file");
        assert_eq!(plural(0, "file", "files"), "files");
        assert_eq!(plural(3, "file", "files"), "files");
    }
}
