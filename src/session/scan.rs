//! Scan session: turns batches of scanned text into result events

use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::codec::{Codec, PartDecoder};
use crate::TransferError;
use crate::types::{CodeBatch, FragmentState, ScanProgress, ScanResult};

/// Hooks for haptic or audible feedback while scanning.
pub trait ScanFeedback: Send + 'static {
    /// A part was accepted and the payload is still incomplete
    fn progress(&mut self);

    /// A payload was completed
    fn success(&mut self);

    /// A code was rejected, was not a UR, or the transmission failed
    fn error(&mut self);
}

/// Tracks reception of one multi-part transmission at a time.
///
/// # Post-conditions of [`submit`](Self::submit)
///
/// After a `Completed` or `Failure` event produced by a submitted string the
/// session has already restarted: the decoder is fresh and progress is back
/// to `{0, [Off]}`. Later strings in the same batch start a new transmission.
pub struct ScanSession<C: Codec> {
    codec: C,
    decoder: C::Decoder,
    progress: ScanProgress,
    started_at: Option<Instant>,
    feedback: Option<Box<dyn ScanFeedback>>,
}

impl<C: Codec> ScanSession<C> {
    pub fn new(codec: C) -> Self {
        let decoder = codec.decoder();
        Self { codec, decoder, progress: ScanProgress::default(), started_at: None, feedback: None }
    }

    /// Attach a feedback provider
    pub fn with_feedback(mut self, feedback: impl ScanFeedback) -> Self {
        self.feedback = Some(Box::new(feedback));
        self
    }

    /// Discard any partial accumulation and start over.
    pub fn restart(&mut self) {
        self.decoder = self.codec.decoder();
        self.progress = ScanProgress::default();
        self.started_at = None;
        debug!("Scan session restarted");
    }

    /// Feed every code of `batch` to the decoder.
    ///
    /// Returns exactly one event per code, in iteration order. An empty batch
    /// yields no events.
    pub fn submit(&mut self, batch: &CodeBatch) -> Vec<ScanResult> {
        batch.iter().map(|code| self.submit_code(code)).collect()
    }

    fn submit_code(&mut self, raw: &str) -> ScanResult {
        let part = raw.trim();
        trace!("Submitting code ({} chars)", part.len());

        if !self.decoder.receive_part(part) {
            self.notify_error();
            if self.decoder.expected_type().is_none() {
                debug!("Code is not part of a UR");
                return ScanResult::Other(raw.to_string());
            }
            warn!("Rejected code that is not part of the current transmission");
            return ScanResult::Rejected;
        }

        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }

        match self.decoder.result() {
            None => {
                self.refresh_progress();
                if let Some(feedback) = self.feedback.as_mut() {
                    feedback.progress();
                }
                ScanResult::Progress {
                    estimated_percent_complete: self.progress.estimated_percent_complete,
                    fragment_states: self.progress.fragment_states.clone(),
                }
            }
            Some(Ok(ur)) => {
                let ur = ur.clone();
                debug!(
                    "Completed ur:{} ({} bytes) in {:?}",
                    ur.ur_type(),
                    ur.data().len(),
                    self.elapsed()
                );
                if let Some(feedback) = self.feedback.as_mut() {
                    feedback.success();
                }
                self.restart();
                ScanResult::Completed(ur)
            }
            Some(Err(error)) => {
                let error = TransferError::decode(error.clone());
                warn!("Transmission failed: {}", error);
                self.notify_error();
                self.restart();
                ScanResult::Failure(error)
            }
        }
    }

    /// Report a failure of the code source itself.
    ///
    /// Progress is kept; recovering the source is up to the caller.
    pub fn source_failed(&mut self, error: TransferError) -> ScanResult {
        warn!("Code source failed: {}", error);
        self.notify_error();
        ScanResult::Failure(error)
    }

    fn refresh_progress(&mut self) {
        self.progress = ScanProgress {
            estimated_percent_complete: self.decoder.estimated_percent_complete(),
            fragment_states: FragmentState::for_scan(
                self.decoder.expected_part_count(),
                self.decoder.received_part_indexes(),
                self.decoder.last_part_indexes(),
            ),
            elapsed_ms: self.elapsed().as_millis() as u64,
        };
    }

    fn notify_error(&mut self) {
        if let Some(feedback) = self.feedback.as_mut() {
            feedback.error();
        }
    }

    /// Latest progress snapshot
    pub fn progress(&self) -> &ScanProgress {
        &self.progress
    }

    pub fn estimated_percent_complete(&self) -> f64 {
        self.progress.estimated_percent_complete
    }

    pub fn fragment_states(&self) -> &[FragmentState] {
        &self.progress.fragment_states
    }

    /// Time since the first accepted part of the current transmission
    pub fn elapsed(&self) -> Duration {
        self.started_at.map(|start| start.elapsed()).unwrap_or_default()
    }

    pub fn expected_type(&self) -> Option<&str> {
        self.decoder.expected_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PartEncoder;
    use crate::codec::CodecError;
    use crate::codecs::sequential::{SequenceHeader, checksum, encode_multi};
    use crate::codecs::{SequentialCodec, SequentialEncoder};
    use crate::test_utils::{all_parts, sample_ur};
    use crate::types::Ur;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Debug, PartialEq)]
    struct Counts {
        progress: usize,
        success: usize,
        error: usize,
    }

    struct CountingFeedback(Arc<Mutex<Counts>>);

    impl ScanFeedback for CountingFeedback {
        fn progress(&mut self) {
            self.0.lock().unwrap().progress += 1;
        }
        fn success(&mut self) {
            self.0.lock().unwrap().success += 1;
        }
        fn error(&mut self) {
            self.0.lock().unwrap().error += 1;
        }
    }

    fn one(code: &str) -> CodeBatch {
        CodeBatch::single(code)
    }

    #[test]
    fn empty_batch_produces_nothing() {
        let mut scan = ScanSession::new(SequentialCodec);
        assert!(scan.submit(&CodeBatch::new()).is_empty());
        assert_eq!(scan.progress(), &ScanProgress::default());
    }

    #[test]
    fn unrelated_text_before_any_part_is_other() {
        let mut scan = ScanSession::new(SequentialCodec);
        let events = scan.submit(&one("  https://example.com "));
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ScanResult::Other(text) if text == "  https://example.com "));
        assert_eq!(scan.fragment_states(), &[FragmentState::Off]);
    }

    #[test]
    fn unrelated_text_after_first_part_is_rejected() {
        let ur = sample_ur(100);
        let parts = all_parts(&SequentialCodec, &ur, 25);
        let mut scan = ScanSession::new(SequentialCodec);

        scan.submit(&one(&parts[0]));
        let before = scan.progress().clone();

        let events = scan.submit(&one("https://example.com"));
        assert!(matches!(events.as_slice(), [ScanResult::Rejected]));
        assert_eq!(scan.progress(), &before);
    }

    #[test]
    fn progress_highlights_received_fragments() {
        let ur = sample_ur(100);
        let parts = all_parts(&SequentialCodec, &ur, 25);
        let mut scan = ScanSession::new(SequentialCodec);

        let events = scan.submit(&one(&parts[2]));
        match events.as_slice() {
            [ScanResult::Progress { estimated_percent_complete, fragment_states }] => {
                assert_eq!(*estimated_percent_complete, 0.25);
                assert_eq!(
                    fragment_states,
                    &vec![
                        FragmentState::Off,
                        FragmentState::Off,
                        FragmentState::Highlighted,
                        FragmentState::Off
                    ]
                );
            }
            other => panic!("Expected a progress event, got {:?}", other),
        }
        assert_eq!(scan.fragment_states().len(), 4);
        assert_eq!(scan.expected_type(), Some("bytes"));
    }

    #[test]
    fn complete_transfer_emits_one_completed_and_restarts() {
        let ur = sample_ur(333);
        let parts = all_parts(&SequentialCodec, &ur, 40);
        let mut scan = ScanSession::new(SequentialCodec);

        let mut events = Vec::new();
        for part in &parts {
            events.extend(scan.submit(&one(part)));
        }

        let completed: Vec<&Ur> = events
            .iter()
            .filter_map(|e| match e {
                ScanResult::Completed(ur) => Some(ur),
                _ => None,
            })
            .collect();
        assert_eq!(completed, vec![&ur]);
        assert!(matches!(events.last(), Some(ScanResult::Completed(_))));
        assert_eq!(events.len(), parts.len());

        // Restarted: no stale highlights, no known type
        assert_eq!(scan.progress(), &ScanProgress::default());
        assert_eq!(scan.expected_type(), None);
        assert_eq!(scan.elapsed(), Duration::ZERO);
    }

    #[test]
    fn decode_failure_emits_failure_and_restarts() {
        let data = sample_ur(40).into_data();
        let header = SequenceHeader {
            seq_len: 2,
            message_len: data.len(),
            checksum: checksum(&data) ^ 0xdead_beef,
            fragment_len: 20,
        };
        let counts = Arc::new(Mutex::new(Counts::default()));
        let mut scan =
            ScanSession::new(SequentialCodec).with_feedback(CountingFeedback(counts.clone()));

        let first = scan.submit(&one(&encode_multi("bytes", 1, &header, &data[..20])));
        assert!(matches!(first.as_slice(), [ScanResult::Progress { .. }]));

        let events = scan.submit(&one(&encode_multi("bytes", 2, &header, &data[20..])));
        match events.as_slice() {
            [ScanResult::Failure(TransferError::Decode { source })] => {
                assert!(matches!(source, CodecError::ChecksumMismatch { .. }));
            }
            other => panic!("Expected decode failure, got {:?}", other),
        }

        assert_eq!(scan.progress(), &ScanProgress::default());
        assert_eq!(scan.expected_type(), None);
        assert_eq!(scan.elapsed(), Duration::ZERO);
        assert_eq!(*counts.lock().unwrap(), Counts { progress: 1, success: 0, error: 1 });

        // The fresh decoder takes a new transmission from its first part
        let parts = all_parts(&SequentialCodec, &sample_ur(40), 20);
        assert!(matches!(scan.submit(&one(&parts[1])).as_slice(), [ScanResult::Progress { .. }]));
    }

    #[test]
    fn single_part_completes_immediately() {
        let ur = sample_ur(10);
        let parts = all_parts(&SequentialCodec, &ur, 100);
        assert_eq!(parts.len(), 1);

        let mut scan = ScanSession::new(SequentialCodec);
        let events = scan.submit(&one(&parts[0].to_uppercase()));
        assert!(matches!(events.as_slice(), [ScanResult::Completed(got)] if *got == ur));
    }

    #[test]
    fn whole_transmission_in_one_batch() {
        let ur = sample_ur(64);
        let parts = all_parts(&SequentialCodec, &ur, 16);
        let batch: CodeBatch = parts.iter().map(String::as_str).collect();

        let mut scan = ScanSession::new(SequentialCodec);
        let events = scan.submit(&batch);
        assert_eq!(events.len(), 4);
        assert_eq!(events.iter().filter(|e| matches!(e, ScanResult::Completed(_))).count(), 1);
        assert!(matches!(events.last(), Some(ScanResult::Completed(_))));
    }

    #[test]
    fn rejected_parts_do_not_change_progress() {
        let ur = sample_ur(100);
        let parts = all_parts(&SequentialCodec, &ur, 25);
        let foreign = all_parts(&SequentialCodec, &sample_ur(120), 25);
        let mut scan = ScanSession::new(SequentialCodec);

        scan.submit(&one(&parts[0]));
        scan.submit(&one(&parts[1]));
        let before = scan.progress().clone();

        for part in &foreign {
            let events = scan.submit(&one(part));
            assert!(matches!(events.as_slice(), [ScanResult::Rejected]));
        }
        assert_eq!(scan.progress(), &before);
    }

    #[test]
    fn duplicate_part_marks_fragment_without_new_progress() {
        let ur = sample_ur(100);
        let mut encoder = SequentialEncoder::new(&ur, 25).unwrap();
        let first = encoder.next_part();
        let second = encoder.next_part();
        let mut scan = ScanSession::new(SequentialCodec);

        scan.submit(&one(&first));
        scan.submit(&one(&second));
        scan.submit(&one(&first));
        assert_eq!(scan.estimated_percent_complete(), 0.5);
        assert_eq!(
            scan.fragment_states(),
            &[
                FragmentState::Highlighted,
                FragmentState::Highlighted,
                FragmentState::Off,
                FragmentState::Off
            ]
        );
    }

    #[test]
    fn source_failure_keeps_progress() {
        let ur = sample_ur(100);
        let parts = all_parts(&SequentialCodec, &ur, 25);
        let mut scan = ScanSession::new(SequentialCodec);
        scan.submit(&one(&parts[0]));
        let before = scan.progress().clone();

        let event = scan.source_failed(TransferError::source_failed("camera unplugged"));
        assert!(matches!(event, ScanResult::Failure(TransferError::Source { .. })));
        assert_eq!(scan.progress(), &before);
        assert_eq!(scan.expected_type(), Some("bytes"));
    }

    #[test]
    fn restart_discards_partial_accumulation() {
        let ur = sample_ur(100);
        let parts = all_parts(&SequentialCodec, &ur, 25);
        let mut scan = ScanSession::new(SequentialCodec);
        scan.submit(&one(&parts[0]));
        scan.restart();

        assert_eq!(scan.progress(), &ScanProgress::default());
        // The first part no longer counts
        for part in &parts[1..] {
            scan.submit(&one(part));
        }
        assert_eq!(scan.fragment_states()[0], FragmentState::Off);
        assert_eq!(scan.estimated_percent_complete(), 0.75);
    }

    #[test]
    fn feedback_is_notified() {
        let counts = Arc::new(Mutex::new(Counts::default()));
        let ur = sample_ur(50);
        let parts = all_parts(&SequentialCodec, &ur, 25);
        let mut scan =
            ScanSession::new(SequentialCodec).with_feedback(CountingFeedback(Arc::clone(&counts)));

        scan.submit(&one("not a ur"));
        scan.submit(&one(&parts[0]));
        scan.submit(&one(&parts[1]));

        assert_eq!(*counts.lock().unwrap(), Counts { progress: 1, success: 1, error: 1 });
    }

    #[test]
    fn trailing_whitespace_is_trimmed_before_decoding() {
        let ur = sample_ur(10);
        let parts = all_parts(&SequentialCodec, &ur, 100);
        let mut scan = ScanSession::new(SequentialCodec);

        let events = scan.submit(&one(&format!("\n{}  ", parts[0])));
        assert!(matches!(events.as_slice(), [ScanResult::Completed(_)]));
    }

    #[test]
    fn sample_parts_cover_every_fragment() {
        let ur = sample_ur(90);
        let parts = all_parts(&SequentialCodec, &ur, 30);
        let mut encoder = SequentialEncoder::new(&ur, 30).unwrap();
        assert_eq!(parts.len(), encoder.seq_len());
        assert_eq!(parts[0], encoder.next_part());
    }
}
