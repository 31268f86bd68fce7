//! Conflux core space addresses: 0x-prefixed hex and CIP-37 base32 forms.

use ethers_core::types::Address;
use std::str::FromStr;

const ALPHABET: &[u8; 32] = b"abcdefghjkmnprstuvwxyz0123456789";
const VERSION_BYTE: u8 = 0;
const CHECKSUM_WORDS: usize = 8;
// 21 bytes (version + address) in 5 bit groups
const PAYLOAD_WORDS: usize = 34;

const MAINNET_NETWORK_ID: u64 = 1029;
const TESTNET_NETWORK_ID: u64 = 1;

fn network_prefix(network_id: u64) -> String {
    match network_id {
        MAINNET_NETWORK_ID => "cfx".to_string(),
        TESTNET_NETWORK_ID => "cfxtest".to_string(),
        other => format!("net{other}"),
    }
}

fn network_id(prefix: &str) -> Option<u64> {
    match prefix {
        "cfx" => Some(MAINNET_NETWORK_ID),
        "cfxtest" => Some(TESTNET_NETWORK_ID),
        other => other
            .strip_prefix("net")
            .and_then(|id| id.parse().ok())
            .filter(|id| *id != MAINNET_NETWORK_ID && *id != TESTNET_NETWORK_ID),
    }
}

fn polymod(words: impl IntoIterator<Item = u8>) -> u64 {
    const GENERATORS: [u64; 5] = [
        0x98f2bc8e61,
        0x79b76d99e2,
        0xf33e5fb3c4,
        0xae2eabe2a8,
        0x1e4f43e470,
    ];
    let mut checksum: u64 = 1;
    for word in words {
        let top = checksum >> 35;
        checksum = ((checksum & 0x07ffffffff) << 5) ^ u64::from(word);
        for (i, generator) in GENERATORS.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                checksum ^= generator;
            }
        }
    }
    checksum ^ 1
}

fn checksum(prefix: &str, payload: &[u8]) -> u64 {
    let prefix_words = prefix.bytes().map(|c| c & 0x1f);
    polymod(
        prefix_words
            .chain(std::iter::once(0))
            .chain(payload.iter().copied())
            .chain([0; CHECKSUM_WORDS]),
    )
}

fn to_words(bytes: &[u8]) -> Vec<u8> {
    let mut words = Vec::with_capacity(PAYLOAD_WORDS);
    let (mut accumulator, mut bits) = (0u32, 0u32);
    for byte in bytes {
        accumulator = (accumulator << 8) | u32::from(*byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            words.push(((accumulator >> bits) & 0x1f) as u8);
        }
    }
    if bits > 0 {
        words.push(((accumulator << (5 - bits)) & 0x1f) as u8);
    }
    words
}

/// Inverse of [`to_words`]; fails on non-zero padding.
fn from_words(words: &[u8]) -> Option<Vec<u8>> {
    let mut bytes = Vec::with_capacity(words.len() * 5 / 8);
    let (mut accumulator, mut bits) = (0u32, 0u32);
    for word in words {
        accumulator = (accumulator << 5) | u32::from(*word);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            bytes.push(((accumulator >> bits) & 0xff) as u8);
        }
    }
    (accumulator & ((1 << bits) - 1) == 0).then_some(bytes)
}

/// Encodes `address` as a CIP-37 base32 address of the network `network_id`.
pub fn to_base32(address: &Address, network_id: u64) -> String {
    let prefix = network_prefix(network_id);
    let mut bytes = vec![VERSION_BYTE];
    bytes.extend_from_slice(address.as_bytes());
    let payload = to_words(&bytes);
    let checksum = checksum(&prefix, &payload);

    let checksum_words = (0..CHECKSUM_WORDS).map(|i| ((checksum >> (5 * (7 - i))) & 0x1f) as u8);
    let encoded: String = payload
        .iter()
        .copied()
        .chain(checksum_words)
        .map(|word| ALPHABET[word as usize] as char)
        .collect();
    format!("{prefix}:{encoded}")
}

/// Decodes a CIP-37 base32 address, also in its verbose `CFX:TYPE.USER:...` form.
///
/// Returns the hex address and the network id encoded in the prefix.
pub fn from_base32(value: &str) -> Option<(Address, u64)> {
    let is_lowercase = value == value.to_ascii_lowercase();
    let is_uppercase = value == value.to_ascii_uppercase();
    if !is_lowercase && !is_uppercase {
        return None;
    }
    let value = value.to_ascii_lowercase();

    let mut parts = value.split(':');
    let prefix = parts.next()?;
    let encoded = match (parts.next()?, parts.next(), parts.next()) {
        (encoded, None, _) => encoded,
        (option, Some(encoded), None) if option.starts_with("type.") => encoded,
        _ => return None,
    };
    let network_id = network_id(prefix)?;

    let words = encoded
        .bytes()
        .map(|c| ALPHABET.iter().position(|a| *a == c).map(|word| word as u8))
        .collect::<Option<Vec<_>>>()?;
    if words.len() != PAYLOAD_WORDS + CHECKSUM_WORDS {
        return None;
    }
    if polymod(
        prefix
            .bytes()
            .map(|c| c & 0x1f)
            .chain(std::iter::once(0))
            .chain(words.iter().copied()),
    ) != 0
    {
        return None;
    }

    let bytes = from_words(&words[..PAYLOAD_WORDS])?;
    match bytes.split_first() {
        Some((&VERSION_BYTE, address)) if address.len() == Address::len_bytes() => {
            Some((Address::from_slice(address), network_id))
        }
        _ => None,
    }
}

fn from_hex(value: &str) -> Option<Address> {
    let hex = value.strip_prefix("0x")?;
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Address::from_str(hex).ok()
}

/// Parses either a 0x-prefixed 20 bytes hex string or a CIP-37 base32 address.
pub fn parse_address(value: &str) -> Option<Address> {
    from_hex(value).or_else(|| from_base32(value).map(|(address, _)| address))
}

/// Checks that `value` is a hex or CIP-37 base32 address.
pub fn is_address(value: &str) -> bool {
    parse_address(value).is_some()
}
