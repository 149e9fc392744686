//! Fixed-width key/value codecs and the capability traits the hash index
//! is parameterized over.

/// A value with a fixed-width byte encoding, storable in an index slot.
pub trait FixedCodec: Copy {
    /// Encoded size in bytes.
    const ENCODED_SIZE: usize;

    /// Encodes into the first `ENCODED_SIZE` bytes of `buf`.
    fn encode_into(&self, buf: &mut [u8]);

    /// Decodes from the first `ENCODED_SIZE` bytes of `buf`.
    fn decode_from(buf: &[u8]) -> Self;
}

macro_rules! impl_fixed_codec {
    ($($ty:ty),*) => {
        $(
            impl FixedCodec for $ty {
                const ENCODED_SIZE: usize = std::mem::size_of::<$ty>();

                fn encode_into(&self, buf: &mut [u8]) {
                    buf[..Self::ENCODED_SIZE].copy_from_slice(&self.to_le_bytes());
                }

                fn decode_from(buf: &[u8]) -> Self {
                    let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                    bytes.copy_from_slice(&buf[..Self::ENCODED_SIZE]);
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_fixed_codec!(i32, u32, i64, u64);

/// Key equality capability, supplied by the caller at index construction.
pub trait KeyComparator<K>: Send + Sync {
    /// Returns true if the two keys are equal.
    fn eq(&self, a: &K, b: &K) -> bool;
}

/// Compares keys through their `PartialEq` impl.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultComparator;

impl<K: PartialEq> KeyComparator<K> for DefaultComparator {
    fn eq(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

/// Hash capability mapping a key to an unsigned integer, supplied by the
/// caller at index construction.
pub trait HashFunction<K>: Send + Sync {
    /// Hashes the key.
    fn hash(&self, key: &K) -> u64;
}

/// Multiplicative hash over the key's encoded bytes.
///
/// Supports keys up to 32 encoded bytes, which covers every `FixedCodec`
/// impl in this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct MulHash;

impl MulHash {
    const MULTIPLIER: u64 = 0x517cc1b727220a95;
}

impl<K: FixedCodec> HashFunction<K> for MulHash {
    fn hash(&self, key: &K) -> u64 {
        debug_assert!(K::ENCODED_SIZE <= 32);
        let mut buf = [0u8; 32];
        key.encode_into(&mut buf[..K::ENCODED_SIZE]);

        let mut hash: u64 = 0;
        for chunk in buf[..K::ENCODED_SIZE].chunks(8) {
            let mut word = [0u8; 8];
            word[..chunk.len()].copy_from_slice(chunk);
            hash = (hash ^ u64::from_le_bytes(word)).wrapping_mul(Self::MULTIPLIER);
        }
        hash
    }
}
