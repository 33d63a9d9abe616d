use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::code::{CodeFamily, DetectedCode, MetadataObject};
use crate::traits::camera_delegate::CameraDelegate;

/// Outcome of one batch of metadata objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: u64,
    pub dropped: u64,
}

/// Turns raw metadata objects into `DetectedCode`s for the consumer.
///
/// Nothing is buffered: codes seen while no consumer is registered are gone.
pub struct CodeDetectionSink {
    consumer: Mutex<Option<Arc<dyn CameraDelegate>>>,
    enabled: Mutex<BTreeSet<CodeFamily>>,
}

impl CodeDetectionSink {
    pub fn new() -> Self {
        Self {
            consumer: Mutex::new(None),
            enabled: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn set_consumer(&self, consumer: Option<Arc<dyn CameraDelegate>>) {
        *self.consumer.lock() = consumer;
    }

    pub fn consumer(&self) -> Option<Arc<dyn CameraDelegate>> {
        self.consumer.lock().clone()
    }

    pub fn has_consumer(&self) -> bool {
        self.consumer.lock().is_some()
    }

    pub fn set_enabled_families(&self, families: BTreeSet<CodeFamily>) {
        *self.enabled.lock() = families;
    }

    pub fn enabled_families(&self) -> BTreeSet<CodeFamily> {
        self.enabled.lock().clone()
    }

    /// Keep machine-readable codes of enabled families, in input order.
    /// Returns the codes and the number of code objects rejected.
    pub fn filter(&self, objects: &[MetadataObject]) -> (Vec<DetectedCode>, u64) {
        let enabled = self.enabled.lock();
        let mut codes = Vec::new();
        let mut rejected = 0;

        for object in objects {
            if let MetadataObject::MachineReadableCode { family, payload } = object {
                if enabled.contains(family) {
                    codes.push(DetectedCode::new(family.clone(), payload.clone()));
                } else {
                    log::debug!("dropping code of disabled family {}", family);
                    rejected += 1;
                }
            }
        }
        (codes, rejected)
    }

    /// Filter a batch and forward each code to the consumer in order.
    pub fn on_detections(&self, objects: &[MetadataObject]) -> DeliveryReport {
        let (codes, rejected) = self.filter(objects);
        let mut report = DeliveryReport {
            delivered: 0,
            dropped: rejected,
        };
        if codes.is_empty() {
            return report;
        }

        // Clone out so the consumer runs without the slot locked.
        let Some(consumer) = self.consumer() else {
            log::debug!("no consumer registered, dropping {} code(s)", codes.len());
            report.dropped += codes.len() as u64;
            return report;
        };

        for code in &codes {
            consumer.on_code_detected(code);
            report.delivered += 1;
        }
        report
    }
}

impl Default for CodeDetectionSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of machine-readable code objects in a batch.
pub fn count_codes(objects: &[MetadataObject]) -> u64 {
    objects
        .iter()
        .filter(|o| matches!(o, MetadataObject::MachineReadableCode { .. }))
        .count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink_with(families: &[CodeFamily]) -> CodeDetectionSink {
        let sink = CodeDetectionSink::new();
        sink.set_enabled_families(families.iter().cloned().collect());
        sink
    }

    fn recording_consumer() -> (Arc<Mutex<Vec<DetectedCode>>>, Arc<dyn CameraDelegate>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let slot = Arc::clone(&seen);
        let consumer: Arc<dyn CameraDelegate> =
            Arc::new(move |code: &DetectedCode| slot.lock().push(code.clone()));
        (seen, consumer)
    }

    #[test]
    fn forwards_enabled_code_exactly_once() {
        let sink = sink_with(&[CodeFamily::EAN13]);
        let (seen, consumer) = recording_consumer();
        sink.set_consumer(Some(consumer));

        let report = sink.on_detections(&[MetadataObject::code(CodeFamily::EAN13, "012345678905")]);

        assert_eq!(report, DeliveryReport { delivered: 1, dropped: 0 });
        assert_eq!(
            *seen.lock(),
            vec![DetectedCode::new(CodeFamily::EAN13, "012345678905")]
        );
    }

    #[test]
    fn drops_disabled_families_and_non_codes() {
        let sink = sink_with(&[CodeFamily::QR]);
        let (seen, consumer) = recording_consumer();
        sink.set_consumer(Some(consumer));

        let report = sink.on_detections(&[
            MetadataObject::Face { face_id: 7 },
            MetadataObject::code(CodeFamily::EAN8, "96385074"),
            MetadataObject::code(CodeFamily::QR, "https://example.org"),
            MetadataObject::Other {
                kind: "humanBody".into(),
            },
        ]);

        assert_eq!(report, DeliveryReport { delivered: 1, dropped: 1 });
        assert_eq!(
            *seen.lock(),
            vec![DetectedCode::new(CodeFamily::QR, "https://example.org")]
        );
    }

    #[test]
    fn preserves_detection_order() {
        let sink = sink_with(&[CodeFamily::QR, CodeFamily::CODE128]);
        let (seen, consumer) = recording_consumer();
        sink.set_consumer(Some(consumer));

        sink.on_detections(&[
            MetadataObject::code(CodeFamily::QR, "first"),
            MetadataObject::code(CodeFamily::CODE128, "second"),
            MetadataObject::code(CodeFamily::QR, "third"),
        ]);

        let payloads: Vec<_> = seen.lock().iter().map(|c| c.payload.clone()).collect();
        assert_eq!(payloads, ["first", "second", "third"]);
    }

    #[test]
    fn without_consumer_codes_are_not_replayed() {
        let sink = sink_with(&[CodeFamily::QR]);

        let report = sink.on_detections(&[MetadataObject::code(CodeFamily::QR, "early")]);
        assert_eq!(report, DeliveryReport { delivered: 0, dropped: 1 });

        let (seen, consumer) = recording_consumer();
        sink.set_consumer(Some(consumer));
        sink.on_detections(&[MetadataObject::code(CodeFamily::QR, "late")]);

        assert_eq!(*seen.lock(), vec![DetectedCode::new(CodeFamily::QR, "late")]);
    }

    #[test]
    fn empty_enabled_set_forwards_nothing() {
        let sink = CodeDetectionSink::new();
        let (seen, consumer) = recording_consumer();
        sink.set_consumer(Some(consumer));

        let report = sink.on_detections(&[MetadataObject::code(CodeFamily::EAN13, "0")]);

        assert_eq!(report.delivered, 0);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn consumer_may_reenter_sink() {
        let sink = Arc::new(sink_with(&[CodeFamily::QR]));
        let inner = Arc::clone(&sink);
        let consumer: Arc<dyn CameraDelegate> = Arc::new(move |_: &DetectedCode| {
            // Would deadlock if the slot were held during delivery.
            inner.set_consumer(None);
        });
        sink.set_consumer(Some(consumer));

        let report = sink.on_detections(&[MetadataObject::code(CodeFamily::QR, "x")]);

        assert_eq!(report.delivered, 1);
        assert!(!sink.has_consumer());
    }

    #[test]
    fn counts_only_code_objects() {
        let objects = [
            MetadataObject::Face { face_id: 1 },
            MetadataObject::code(CodeFamily::QR, "a"),
            MetadataObject::code(CodeFamily::AZTEC, "b"),
        ];
        assert_eq!(count_codes(&objects), 2);
    }
}
