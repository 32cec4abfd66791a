//! Conversion between i16 samples and little-endian byte frames

use bytes::{BufMut, Bytes, BytesMut};

/// Encode samples as a little-endian byte frame.
///
/// Output length is exactly twice the sample count.
pub fn encode(samples: &[i16]) -> Bytes {
    let mut buf = BytesMut::with_capacity(samples.len() * 2);
    for &sample in samples {
        buf.put_i16_le(sample);
    }
    buf.freeze()
}

/// Decode a little-endian byte frame back into samples.
///
/// Yields `floor(len / 2)` samples; an odd trailing byte carries no complete
/// sample and is ignored rather than treated as an error.
pub fn decode(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encodes_little_endian_in_order() {
        let encoded = encode(&[513, 1027]);
        assert_eq!(&encoded[..], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn decodes_known_frame() {
        assert_eq!(decode(&[0x01, 0x02, 0x03, 0x04]), vec![513, 1027]);
    }

    #[test]
    fn odd_trailing_byte_is_ignored() {
        assert_eq!(decode(&[0x01, 0x02, 0xff]), vec![513]);
        assert_eq!(decode(&[0xff]), Vec::<i16>::new());
    }

    #[test]
    fn empty_frame() {
        assert!(encode(&[]).is_empty());
        assert!(decode(&[]).is_empty());
    }

    #[test]
    fn negative_samples_survive() {
        let samples = [i16::MIN, -1, 0, 1, i16::MAX];
        assert_eq!(decode(&encode(&samples)), samples);
    }

    proptest! {
        #[test]
        fn roundtrip(samples in proptest::collection::vec(any::<i16>(), 0..2048)) {
            let encoded = encode(&samples);
            prop_assert_eq!(encoded.len(), samples.len() * 2);
            prop_assert_eq!(decode(&encoded), samples);
        }

        #[test]
        fn decode_length_is_half_rounded_down(bytes in proptest::collection::vec(any::<u8>(), 0..4096)) {
            prop_assert_eq!(decode(&bytes).len(), bytes.len() / 2);
        }
    }
}
