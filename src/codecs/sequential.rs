//! Round-robin multi-part codec
//!
//! Payloads are cut into equally sized fragments which are sent in order and
//! then repeated. Every part carries a small header so a decoder can join a
//! transmission at any point:
//!
//! ```text
//! single part:  ur:<type>/<hex payload>
//! multi part:   ur:<type>/<seq_num>-<seq_len>/<hex body>
//! body:         message_len (u32 BE) | checksum (u32 BE) | fragment bytes
//! ```
//!
//! Part `seq_num` (1-based) carries fragment `(seq_num - 1) % seq_len`. The
//! checksum is the first four bytes of the BLAKE3 hash of the whole message.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::codec::{Codec, CodecError, PartDecoder, PartEncoder};
use crate::types::{Ur, is_valid_type};

const HEADER_LEN: usize = 8;

/// Most fragments a transmission may be split into.
///
/// Decoders size their progress state by the fragment count a part claims,
/// so parts announcing more are refused.
pub const MAX_SEQ_LEN: usize = 65_536;

/// Codec factory for [`SequentialEncoder`] and [`SequentialDecoder`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialCodec;

impl Codec for SequentialCodec {
    type Encoder = SequentialEncoder;
    type Decoder = SequentialDecoder;

    fn encoder(&self, ur: &Ur, max_fragment_len: usize) -> Result<SequentialEncoder, CodecError> {
        SequentialEncoder::new(ur, max_fragment_len)
    }

    fn decoder(&self) -> SequentialDecoder {
        SequentialDecoder::new()
    }
}

/// Header shared by every part of one multi-part transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SequenceHeader {
    pub(crate) seq_len: usize,
    pub(crate) message_len: usize,
    pub(crate) checksum: u32,
    pub(crate) fragment_len: usize,
}

impl SequenceHeader {
    /// Fragments must cover the message, and the last one must hold at
    /// least one message byte.
    fn is_consistent(&self) -> bool {
        if self.message_len == 0
            || self.fragment_len == 0
            || self.seq_len == 0
            || self.seq_len > MAX_SEQ_LEN
        {
            return false;
        }
        let (Some(covered), Some(before_last)) = (
            self.fragment_len.checked_mul(self.seq_len),
            self.fragment_len.checked_mul(self.seq_len - 1),
        ) else {
            return false;
        };
        covered >= self.message_len && before_last < self.message_len
    }
}

/// First four bytes of the BLAKE3 hash, big endian
pub fn checksum(data: &[u8]) -> u32 {
    let hash = blake3::hash(data);
    let bytes = hash.as_bytes();
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Fragment length for a message split under `max_fragment_len`.
///
/// Uses the fewest fragments that fit, then evens them out so the last one
/// carries as little padding as possible.
pub fn fragment_len(message_len: usize, max_fragment_len: usize) -> usize {
    let count = message_len.div_ceil(max_fragment_len);
    message_len.div_ceil(count)
}

fn encode_single(ur: &Ur) -> String {
    format!("ur:{}/{}", ur.ur_type(), hex::encode(ur.data()))
}

pub(crate) fn encode_multi(ur_type: &str, seq_num: u32, header: &SequenceHeader, fragment: &[u8]) -> String {
    let mut body = Vec::with_capacity(HEADER_LEN + fragment.len());
    body.extend_from_slice(&(header.message_len as u32).to_be_bytes());
    body.extend_from_slice(&header.checksum.to_be_bytes());
    body.extend_from_slice(fragment);
    format!("ur:{}/{}-{}/{}", ur_type, seq_num, header.seq_len, hex::encode(body))
}

/// Encoder side of [`SequentialCodec`]
#[derive(Debug, Clone)]
pub struct SequentialEncoder {
    ur: Ur,
    header: SequenceHeader,
    fragments: Vec<Vec<u8>>,
    seq_num: u32,
    last_part_indexes: BTreeSet<usize>,
}

impl SequentialEncoder {
    pub fn new(ur: &Ur, max_fragment_len: usize) -> Result<Self, CodecError> {
        if max_fragment_len == 0 {
            return Err(CodecError::ZeroFragmentLength);
        }
        let data = ur.data();
        if data.is_empty() {
            return Err(CodecError::EmptyPayload);
        }
        if u32::try_from(data.len()).is_err() {
            return Err(CodecError::PayloadTooLarge { len: data.len() });
        }

        let frag_len = fragment_len(data.len(), max_fragment_len);
        let count = data.len().div_ceil(frag_len);
        if count > MAX_SEQ_LEN {
            return Err(CodecError::TooManyFragments { count });
        }
        let fragments: Vec<Vec<u8>> = data
            .chunks(frag_len)
            .map(|chunk| {
                let mut fragment = chunk.to_vec();
                fragment.resize(frag_len, 0);
                fragment
            })
            .collect();

        let header = SequenceHeader {
            seq_len: fragments.len(),
            message_len: data.len(),
            checksum: checksum(data),
            fragment_len: frag_len,
        };

        debug!(
            "Encoder for ur:{} ({} bytes) uses {} fragments of {} bytes",
            ur.ur_type(),
            data.len(),
            header.seq_len,
            frag_len
        );

        Ok(Self { ur: ur.clone(), header, fragments, seq_num: 0, last_part_indexes: BTreeSet::new() })
    }
}

impl PartEncoder for SequentialEncoder {
    fn is_single_part(&self) -> bool {
        self.header.seq_len == 1
    }

    fn next_part(&mut self) -> String {
        self.last_part_indexes = BTreeSet::from([0]);
        if self.is_single_part() {
            self.seq_num = 1;
            return encode_single(&self.ur);
        }

        self.seq_num = self.seq_num.wrapping_add(1).max(1);
        let index = (self.seq_num as usize - 1) % self.header.seq_len;
        self.last_part_indexes = BTreeSet::from([index]);
        encode_multi(self.ur.ur_type(), self.seq_num, &self.header, &self.fragments[index])
    }

    fn last_part_indexes(&self) -> &BTreeSet<usize> {
        &self.last_part_indexes
    }

    fn seq_num(&self) -> u32 {
        self.seq_num
    }

    fn seq_len(&self) -> usize {
        self.header.seq_len
    }
}

/// A part parsed from text, before it is checked against the sequence
enum ParsedPart {
    Single { ur_type: String, data: Vec<u8> },
    Multi { ur_type: String, seq_num: u32, header: SequenceHeader, fragment: Vec<u8> },
}

impl ParsedPart {
    fn parse(text: &str) -> Option<Self> {
        let lower = text.to_ascii_lowercase();
        let rest = lower.strip_prefix("ur:")?;
        let components: Vec<&str> = rest.split('/').collect();

        let ur_type = components.first().copied()?;
        if !is_valid_type(ur_type) {
            return None;
        }

        match components.as_slice() {
            [_, payload] => {
                let data = hex::decode(payload).ok()?;
                if data.is_empty() {
                    return None;
                }
                Some(ParsedPart::Single { ur_type: ur_type.to_string(), data })
            }
            [_, seq, payload] => {
                let (seq_num, seq_len) = seq.split_once('-')?;
                let seq_num: u32 = seq_num.parse().ok()?;
                let seq_len: usize = seq_len.parse().ok()?;
                if seq_num == 0 || seq_len == 0 {
                    return None;
                }

                let body = hex::decode(payload).ok()?;
                if body.len() <= HEADER_LEN {
                    return None;
                }
                let message_len = u32::from_be_bytes(body[0..4].try_into().ok()?) as usize;
                let checksum = u32::from_be_bytes(body[4..8].try_into().ok()?);
                let fragment = body[HEADER_LEN..].to_vec();
                let header =
                    SequenceHeader { seq_len, message_len, checksum, fragment_len: fragment.len() };
                if !header.is_consistent() {
                    return None;
                }

                Some(ParsedPart::Multi { ur_type: ur_type.to_string(), seq_num, header, fragment })
            }
            _ => None,
        }
    }
}

/// Decoder side of [`SequentialCodec`]
#[derive(Debug, Default)]
pub struct SequentialDecoder {
    expected_type: Option<String>,
    header: Option<SequenceHeader>,
    fragments: BTreeMap<usize, Vec<u8>>,
    received_part_indexes: BTreeSet<usize>,
    last_part_indexes: BTreeSet<usize>,
    result: Option<Result<Ur, CodecError>>,
}

impl SequentialDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn accept_single(&mut self, ur_type: String, data: Vec<u8>) -> bool {
        // A single-part UR cannot join a multi-part sequence in progress
        if self.header.is_some() {
            return false;
        }
        let ur = match Ur::new(ur_type.clone(), data) {
            Ok(ur) => ur,
            Err(_) => return false,
        };

        self.expected_type = Some(ur_type);
        self.received_part_indexes = BTreeSet::from([0]);
        self.last_part_indexes = BTreeSet::from([0]);
        self.result = Some(Ok(ur));
        true
    }

    fn accept_multi(
        &mut self,
        ur_type: String,
        seq_num: u32,
        header: SequenceHeader,
        fragment: Vec<u8>,
    ) -> bool {
        match self.header {
            Some(existing) if existing != header => {
                trace!("Part {}-{} belongs to another sequence", seq_num, header.seq_len);
                return false;
            }
            Some(_) => {}
            None => {
                self.header = Some(header);
                self.expected_type = Some(ur_type);
            }
        }

        let index = (seq_num as usize - 1) % header.seq_len;
        self.fragments.entry(index).or_insert(fragment);
        self.received_part_indexes.insert(index);
        self.last_part_indexes = BTreeSet::from([index]);

        if self.received_part_indexes.len() == header.seq_len {
            self.result = Some(self.assemble(header));
        }
        true
    }

    fn assemble(&self, header: SequenceHeader) -> Result<Ur, CodecError> {
        let mut message: Vec<u8> = self.fragments.values().flatten().copied().collect();
        if message.len() < header.message_len {
            return Err(CodecError::LengthMismatch {
                expected: header.message_len,
                actual: message.len(),
            });
        }
        message.truncate(header.message_len);

        let actual = checksum(&message);
        if actual != header.checksum {
            return Err(CodecError::ChecksumMismatch { expected: header.checksum, actual });
        }

        let ur_type = self.expected_type.clone().unwrap_or_default();
        Ur::new(ur_type, message)
    }
}

impl PartDecoder for SequentialDecoder {
    fn receive_part(&mut self, part: &str) -> bool {
        if self.result.is_some() {
            return false;
        }

        let Some(parsed) = ParsedPart::parse(part) else {
            return false;
        };

        let ur_type = match &parsed {
            ParsedPart::Single { ur_type, .. } | ParsedPart::Multi { ur_type, .. } => ur_type,
        };
        if self.expected_type.as_deref().is_some_and(|expected| expected != ur_type.as_str()) {
            return false;
        }

        match parsed {
            ParsedPart::Single { ur_type, data } => self.accept_single(ur_type, data),
            ParsedPart::Multi { ur_type, seq_num, header, fragment } => {
                self.accept_multi(ur_type, seq_num, header, fragment)
            }
        }
    }

    fn result(&self) -> Option<&Result<Ur, CodecError>> {
        self.result.as_ref()
    }

    fn expected_part_count(&self) -> usize {
        match (&self.header, &self.expected_type) {
            (Some(header), _) => header.seq_len,
            (None, Some(_)) => 1,
            (None, None) => 0,
        }
    }

    fn expected_type(&self) -> Option<&str> {
        self.expected_type.as_deref()
    }

    fn received_part_indexes(&self) -> &BTreeSet<usize> {
        &self.received_part_indexes
    }

    fn last_part_indexes(&self) -> &BTreeSet<usize> {
        &self.last_part_indexes
    }

    fn estimated_percent_complete(&self) -> f64 {
        if let Some(Ok(_)) = self.result {
            return 1.0;
        }
        let expected = self.expected_part_count();
        if expected == 0 {
            return 0.0;
        }
        (self.received_part_indexes.len() as f64 / expected as f64).min(0.99)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn construction_errors() {
        let empty = Ur::bytes(Vec::new());
        assert_eq!(SequentialEncoder::new(&empty, 10).unwrap_err(), CodecError::EmptyPayload);

        let ur = Ur::bytes(payload(10));
        assert_eq!(SequentialEncoder::new(&ur, 0).unwrap_err(), CodecError::ZeroFragmentLength);
    }

    #[test]
    fn fragment_len_evens_out_fragments() {
        assert_eq!(fragment_len(100, 30), 25);
        assert_eq!(fragment_len(10, 10), 10);
        assert_eq!(fragment_len(11, 10), 6);
    }

    #[test]
    fn single_part_repeats_same_text() {
        let ur = Ur::bytes(b"hi".to_vec());
        let mut encoder = SequentialEncoder::new(&ur, 10).unwrap();
        assert!(encoder.is_single_part());
        assert_eq!(encoder.next_part(), "ur:bytes/6869");
        assert_eq!(encoder.next_part(), "ur:bytes/6869");
        assert_eq!(encoder.seq_len(), 1);
        assert_eq!(encoder.last_part_indexes(), &BTreeSet::from([0]));
    }

    #[test]
    fn multi_part_cycles_round_robin() {
        let ur = Ur::bytes(payload(30));
        let mut encoder = SequentialEncoder::new(&ur, 10).unwrap();
        assert_eq!(encoder.seq_len(), 3);

        let indexes: Vec<usize> = (0..7)
            .map(|_| {
                encoder.next_part();
                *encoder.last_part_indexes().iter().next().unwrap()
            })
            .collect();
        assert_eq!(indexes, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(encoder.seq_num(), 7);
    }

    #[test]
    fn decoder_reassembles_upper_cased_parts() {
        let ur = Ur::new("crypto-psbt", payload(95)).unwrap();
        let mut encoder = SequentialEncoder::new(&ur, 20).unwrap();
        let mut decoder = SequentialDecoder::new();

        for _ in 0..encoder.seq_len() {
            assert!(decoder.receive_part(&encoder.next_part().to_uppercase()));
        }
        assert_eq!(decoder.result(), Some(&Ok(ur)));
        assert_eq!(decoder.estimated_percent_complete(), 1.0);
    }

    #[test]
    fn decoder_tracks_progress_and_duplicates() {
        let ur = Ur::bytes(payload(40));
        let mut encoder = SequentialEncoder::new(&ur, 10).unwrap();
        let mut decoder = SequentialDecoder::new();
        assert_eq!(decoder.expected_part_count(), 0);
        assert_eq!(decoder.expected_type(), None);

        let first = encoder.next_part();
        assert!(decoder.receive_part(&first));
        assert!(decoder.receive_part(&first));
        assert_eq!(decoder.expected_part_count(), 4);
        assert_eq!(decoder.expected_type(), Some("bytes"));
        assert_eq!(decoder.received_part_indexes(), &BTreeSet::from([0]));
        assert_eq!(decoder.estimated_percent_complete(), 0.25);
        assert!(decoder.result().is_none());
    }

    #[test]
    fn decoder_rejects_foreign_parts() {
        let mut encoder = SequentialEncoder::new(&Ur::bytes(payload(40)), 10).unwrap();
        let mut other = SequentialEncoder::new(&Ur::bytes(payload(41)), 10).unwrap();
        let mut typed =
            SequentialEncoder::new(&Ur::new("crypto-seed", payload(40)).unwrap(), 10).unwrap();
        let mut decoder = SequentialDecoder::new();

        assert!(!decoder.receive_part("hello world"));
        assert!(!decoder.receive_part("ur:bytes/zz"));
        assert!(decoder.receive_part(&encoder.next_part()));
        assert!(!decoder.receive_part(&other.next_part()));
        assert!(!decoder.receive_part(&typed.next_part()));
        assert!(!decoder.receive_part("ur:bytes/6869"));
        assert_eq!(decoder.received_part_indexes().len(), 1);
    }

    #[test]
    fn checksum_mismatch_is_a_failure_result() {
        let data = payload(20);
        let header = SequenceHeader {
            seq_len: 2,
            message_len: 20,
            checksum: checksum(&data) ^ 1,
            fragment_len: 10,
        };
        let mut decoder = SequentialDecoder::new();

        assert!(decoder.receive_part(&encode_multi("bytes", 1, &header, &data[..10])));
        assert!(decoder.receive_part(&encode_multi("bytes", 2, &header, &data[10..])));
        assert!(matches!(decoder.result(), Some(Err(CodecError::ChecksumMismatch { .. }))));
        assert!(decoder.estimated_percent_complete() < 1.0);
        assert!(!decoder.receive_part(&encode_multi("bytes", 1, &header, &data[..10])));
    }

    #[test]
    fn oversized_sequence_lengths_are_refused() {
        // seq_len overflows usize arithmetic against the fragment length
        let overflow = format!(
            "ur:bytes/1-9223372036854775809/{}",
            hex::encode([0, 0, 0, 2, 0, 0, 0, 0, 1, 2])
        );
        // A consistent header claiming fifty million one-byte fragments
        let huge = "ur:bytes/1-50000000/02faf0800000000001";

        for part in [overflow.as_str(), huge] {
            let mut decoder = SequentialDecoder::new();
            assert!(!decoder.receive_part(part), "accepted {}", part);
            assert_eq!(decoder.expected_part_count(), 0);
            assert_eq!(decoder.expected_type(), None);
        }
    }

    #[test]
    fn largest_allowed_sequence_is_accepted() {
        let header = SequenceHeader {
            seq_len: MAX_SEQ_LEN,
            message_len: MAX_SEQ_LEN,
            checksum: 0,
            fragment_len: 1,
        };
        let mut decoder = SequentialDecoder::new();
        assert!(decoder.receive_part(&encode_multi("bytes", 1, &header, &[7])));
        assert_eq!(decoder.expected_part_count(), MAX_SEQ_LEN);

        let too_long =
            SequenceHeader { seq_len: MAX_SEQ_LEN + 1, message_len: MAX_SEQ_LEN + 1, ..header };
        let mut decoder = SequentialDecoder::new();
        assert!(!decoder.receive_part(&encode_multi("bytes", 1, &too_long, &[7])));
    }

    #[test]
    fn encoder_refuses_too_many_fragments() {
        let ur = Ur::bytes(payload(MAX_SEQ_LEN + 1));
        assert_eq!(
            SequentialEncoder::new(&ur, 1).unwrap_err(),
            CodecError::TooManyFragments { count: MAX_SEQ_LEN + 1 }
        );
        assert!(SequentialEncoder::new(&ur, 2).is_ok());
    }

    proptest! {
        #[test]
        fn prop_round_trip_from_any_starting_point(
            len in 1usize..600,
            max in 1usize..120,
            skip in 0usize..50,
        ) {
            let ur = Ur::bytes(payload(len));
            let mut encoder = SequentialEncoder::new(&ur, max).unwrap();
            prop_assert_eq!(encoder.is_single_part(), len <= max);

            for _ in 0..skip {
                encoder.next_part();
            }

            let mut decoder = SequentialDecoder::new();
            for _ in 0..encoder.seq_len() {
                prop_assert!(decoder.receive_part(&encoder.next_part()));
            }
            prop_assert_eq!(decoder.result(), Some(&Ok(ur)));
        }

        #[test]
        fn prop_arbitrary_headers_never_panic(
            seq_num in 1u32..,
            seq_len in 1usize..,
            body in proptest::collection::vec(any::<u8>(), 9..32),
        ) {
            let part = format!("ur:bytes/{}-{}/{}", seq_num, seq_len, hex::encode(body));
            let mut decoder = SequentialDecoder::new();
            let accepted = decoder.receive_part(&part);
            prop_assert!(decoder.expected_part_count() <= MAX_SEQ_LEN);
            prop_assert_eq!(accepted, decoder.expected_type().is_some());
        }

        #[test]
        fn prop_fragments_fit_under_max(len in 1usize..2000, max in 1usize..300) {
            let frag = fragment_len(len, max);
            prop_assert!(frag <= max);
            prop_assert!(frag * len.div_ceil(max) >= len);
        }
    }
}
