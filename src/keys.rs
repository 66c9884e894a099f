// Composite matching keys
//
// Candidate rows and boundary records only agree on (roughly) a district
// name, so matching runs on a derived key: uppercased name + a 2-character
// province discriminator. Uppercasing is the only normalization applied
// here; punctuation, accents, and spacing mismatches are the fuzzy pass's
// problem, not the key's.

use crate::eras::province_prefix;
use crate::errors::Result;

/// Key for a candidate row: `uppercase(riding) + province prefix`.
///
/// Example: riding "Example", province 4 (prefix "10") -> "EXAMPLE10".
pub fn candidate_key(riding: &str, province: u8) -> Result<String> {
    let prefix = province_prefix(province)?;
    Ok(format!("{}{}", riding.to_uppercase(), prefix))
}

/// Key for a boundary record: `uppercase(fedname) + id[0..2]`.
///
/// FED ids carry the province prefix in their first two characters, so the
/// two key forms coincide when candidate and boundary describe the same
/// district. Ids shorter than 2 characters are malformed source data; the
/// whole id is used so the key stays deterministic rather than panicking.
pub fn boundary_key(fedname: &str, id: &str) -> String {
    let prefix = id.get(..2).unwrap_or(id);
    format!("{}{}", fedname.to_uppercase(), prefix)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_key() {
        assert_eq!(candidate_key("EXAMPLE", 4).unwrap(), "EXAMPLE10");
        assert_eq!(candidate_key("example", 4).unwrap(), "EXAMPLE10");
    }

    #[test]
    fn test_boundary_key() {
        assert_eq!(boundary_key("example", "1007654"), "EXAMPLE10");
        assert_eq!(boundary_key("EXAMPLE", "1007654"), "EXAMPLE10");
    }

    #[test]
    fn test_keys_coincide_for_same_district() {
        let c = candidate_key("Cardigan", 9).unwrap();
        let b = boundary_key("CARDIGAN", "11002");
        assert_eq!(c, b);
    }

    #[test]
    fn test_key_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(candidate_key("Têmiscamingue", 10).unwrap(), candidate_key("Têmiscamingue", 10).unwrap());
        }
    }

    #[test]
    fn test_unknown_province_propagates() {
        assert!(candidate_key("ANYWHERE", 99).is_err());
    }

    #[test]
    fn test_short_id_does_not_panic() {
        assert_eq!(boundary_key("X", "1"), "X1");
    }
}
