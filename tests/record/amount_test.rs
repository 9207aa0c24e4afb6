// Token Amount Tests
// 256-bit big-endian amounts with checked arithmetic

use atomlink::record::{AmountError, TokenAmount, AMOUNT_LENGTH};

/// Test: Zero is the default and reports itself as zero
#[test]
fn test_amount_zero() {
    assert!(TokenAmount::zero().is_zero());
    assert_eq!(TokenAmount::zero(), TokenAmount::from_u64(0));
}

/// Test: Full-width hex form roundtrips
#[test]
fn test_amount_hex_roundtrip() {
    let amount = TokenAmount::from_u128(987_654_321_012_345_678);
    assert_eq!(amount.to_hex().len(), AMOUNT_LENGTH * 2);
    assert_eq!(TokenAmount::from_hex(&amount.to_hex()).unwrap(), amount);
}

/// Test: Odd-length hex input is accepted by left-padding a nibble
#[test]
fn test_amount_odd_hex_accepted() {
    assert_eq!(
        TokenAmount::from_hex("f").unwrap(),
        TokenAmount::from_u64(15)
    );
}

/// Test: Hex junk is rejected
#[test]
fn test_amount_bad_hex_rejected() {
    assert!(matches!(
        TokenAmount::from_hex("zz").unwrap_err(),
        AmountError::InvalidHex(_)
    ));
}

/// Test: Byte input wider than 32 bytes is rejected
#[test]
fn test_amount_too_wide_rejected() {
    let err = TokenAmount::from_be_bytes(&[1u8; 33]).unwrap_err();
    assert!(matches!(err, AmountError::TooWide { got: 33 }));
}

/// Test: Addition carries across the u128 boundary
#[test]
fn test_amount_add_carries_past_u128() {
    let sum = TokenAmount::from_u128(u128::MAX)
        .checked_add(&TokenAmount::from_u64(1))
        .unwrap();
    let mut expected = [0u8; 17];
    expected[0] = 1;
    assert_eq!(sum, TokenAmount::from_be_bytes(&expected).unwrap());
}

/// Test: Overflow past 256 bits returns None instead of wrapping
#[test]
fn test_amount_add_overflow() {
    let max = TokenAmount::from_be_bytes(&[0xff; AMOUNT_LENGTH]).unwrap();
    assert!(max.checked_add(&TokenAmount::from_u64(1)).is_none());
}

/// Test: Subtraction borrows and detects underflow
#[test]
fn test_amount_sub() {
    let ten = TokenAmount::from_u64(10);
    let three = TokenAmount::from_u64(3);
    assert_eq!(ten.checked_sub(&three).unwrap(), TokenAmount::from_u64(7));
    assert!(three.checked_sub(&ten).is_none());
}

/// Test: Comparison is numeric, not textual
#[test]
fn test_amount_ordering() {
    assert!(TokenAmount::from_u64(200) > TokenAmount::from_u64(30));
    assert!(TokenAmount::from_u128(1 << 100) > TokenAmount::from_u64(u64::MAX));
}
