use super::{Error, Result};

const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

const PUBKEY_LEN: usize = 32;

/// Shortest / longest base58 encoding of a 32-byte public key.
const MIN_LEN: usize = 32;
const MAX_LEN: usize = 44;

/// True when `address` is base58 and decodes to exactly 32 bytes.
pub fn is_valid_address(address: &str) -> bool {
    (MIN_LEN..=MAX_LEN).contains(&address.len()) && decoded_len(address) == Some(PUBKEY_LEN)
}

/// Length of the base58-decoded value, or `None` on a foreign character or once the value
/// no longer fits in a public key.
fn decoded_len(address: &str) -> Option<usize> {
    let zeros = address.bytes().take_while(|&b| b == b'1').count();
    // Little-endian magnitude of everything after the leading `1`s.
    let mut num: Vec<u8> = Vec::with_capacity(PUBKEY_LEN + 1);

    for b in address.bytes() {
        let digit = BASE58_ALPHABET.iter().position(|&a| a == b)?;
        let mut carry = u32::try_from(digit).ok()?;
        for byte in &mut num {
            carry += u32::from(*byte) * 58;
            *byte = (carry & 0xff) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            num.push((carry & 0xff) as u8);
            carry >>= 8;
            if zeros + num.len() > PUBKEY_LEN {
                return None;
            }
        }
    }

    Some(zeros + num.len())
}

pub fn validate_address(address: &str) -> Result<()> {
    if is_valid_address(address) {
        Ok(())
    } else {
        Err(Error::InvalidAddress(address.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_real_keys() {
        assert!(is_valid_address("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA"));
        assert!(is_valid_address("11111111111111111111111111111111"));
        assert!(is_valid_address("7Xnw7aDxJu1CxPPEkz9ttfGSn2bpH3R1GYYziJxTCv3e"));
    }

    #[test]
    fn rejects_bad_alphabet_and_length() {
        // `0`, `O`, `I` and `l` are not part of base58.
        assert!(!is_valid_address("0kenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA"));
        assert!(!is_valid_address("short"));
        assert!(!is_valid_address(&"1".repeat(45)));
        assert!(!is_valid_address(&"1".repeat(31)));
    }

    #[test]
    fn rejects_keys_that_do_not_decode_to_32_bytes() {
        // Right length and alphabet, but 33 bytes once decoded.
        assert!(!is_valid_address(&"z".repeat(44)));
        // 33 leading zero bytes.
        assert!(!is_valid_address(&"1".repeat(33)));
        // Decodes to fewer than 32 bytes.
        assert!(!is_valid_address(&"2".repeat(32)));
        assert!(matches!(
            validate_address(""),
            Err(Error::InvalidAddress(_))
        ));
    }
}
