//! Tests for the credential table

use std::str::FromStr;

use super::*;

// =============================================================================
// Token derivation
// =============================================================================

#[test]
fn test_derive_token_is_base64_sha256() {
    // sha256("pw") = 30c952fa...; base64 of the 32-byte digest is 44 chars
    let token = derive_token("pw");
    assert_eq!(token.len(), 44);
    assert!(token.ends_with('='));
    assert_eq!(token, derive_token("pw"));
    assert_ne!(token, derive_token("pw2"));
}

#[test]
fn test_derive_token_known_vector() {
    // sha256("") = e3b0c442...b855
    assert_eq!(
        derive_token(""),
        "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
    );
}

// =============================================================================
// Parsing
// =============================================================================

#[test]
fn test_parse_single_entry() {
    let table = AuthTable::from_str("a:pw:w").unwrap();
    assert_eq!(table.len(), 1);

    let entry = table.iter().next().unwrap();
    assert_eq!(entry.id(), "a");
    assert_eq!(entry.access(), Access::ReadWrite);
    assert_eq!(entry.token(), derive_token("pw"));
}

#[test]
fn test_parse_access_field() {
    let table = AuthTable::from_str("a:1:w;b:2:Write;c:3:r;d:4:;e:5:admin").unwrap();
    let access: Vec<_> = table.iter().map(|e| e.access()).collect();
    assert_eq!(
        access,
        vec![
            Access::ReadWrite,
            Access::ReadWrite,
            Access::ReadOnly,
            Access::ReadOnly,
            Access::ReadOnly,
        ]
    );
}

#[test]
fn test_parse_skips_empty_entries() {
    let table = AuthTable::from_str(" ;a:pw:w;; b:pw2:r ;").unwrap();
    assert_eq!(table.len(), 2);
}

#[test]
fn test_parse_empty_string() {
    let table = AuthTable::from_str("").unwrap();
    assert!(table.is_empty());
}

#[test]
fn test_parse_password_may_not_swallow_access() {
    let table = AuthTable::from_str("a:pw:w:extra").unwrap();
    let entry = table.iter().next().unwrap();
    assert_eq!(entry.token(), derive_token("pw"));
    assert_eq!(entry.access(), Access::ReadWrite);
}

#[test]
fn test_parse_missing_access() {
    let err = AuthTable::from_str("a:pw:w;b:pw").unwrap_err();
    assert!(matches!(err, AuthError::ParseError { entry: 2, .. }));
    assert!(err.to_string().contains("<ID>:<PW>:<ACCESS>"));
}

#[test]
fn test_parse_missing_password() {
    let err = AuthTable::from_str("lonely").unwrap_err();
    assert!(matches!(err, AuthError::ParseError { entry: 1, .. }));
}

#[test]
fn test_parse_empty_id() {
    let err = AuthTable::from_str(":pw:w").unwrap_err();
    assert!(matches!(err, AuthError::ParseError { entry: 1, .. }));
}

#[test]
fn test_parse_duplicate_id() {
    let err = AuthTable::from_str("a:pw:w;a:other:r").unwrap_err();
    assert!(matches!(err, AuthError::DuplicateId { id } if id == "a"));
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_validate_derived_token() {
    let table = AuthTable::from_str("a:pw:w;b:guest:r").unwrap();

    let entry = table.validate(&derive_token("pw")).unwrap();
    assert_eq!(entry.id(), "a");
    assert_eq!(entry.access(), Access::ReadWrite);

    let entry = table.validate(&derive_token("guest")).unwrap();
    assert_eq!(entry.id(), "b");
    assert_eq!(entry.access(), Access::ReadOnly);
}

#[test]
fn test_validate_rejects_raw_password() {
    let table = AuthTable::from_str("a:pw:w").unwrap();
    assert!(table.validate("pw").is_none());
}

#[test]
fn test_validate_unrelated_token() {
    let table = AuthTable::from_str("a:pw:w").unwrap();
    assert!(table.validate(&derive_token("nope")).is_none());
    assert!(table.validate("").is_none());
}

#[test]
fn test_from_entries_rejects_duplicates() {
    let result = AuthTable::from_entries(vec![
        AuthEntry::new("x", "1", Access::ReadWrite),
        AuthEntry::new("x", "2", Access::ReadOnly),
    ]);
    assert!(matches!(result, Err(AuthError::DuplicateId { .. })));
}
