//! Emotion classifier seam
//!
//! Classification is optional enrichment: every failure degrades the expression feature
//! instead of aborting frame processing. [`DeadlineClassifier`] moves a classifier onto its
//! own worker thread so that no single call can stall a session past its timeout.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use image::DynamicImage;
use thiserror::Error;
use tracing::warn;

/// Pending requests the worker may hold before new calls are rejected as timeouts
const REQUEST_QUEUE_DEPTH: usize = 1;

/// Responses buffered for the caller, including late ones that will be discarded
const RESPONSE_QUEUE_DEPTH: usize = 4;

/// Why a classification produced no label
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    /// The call did not finish within its deadline (transient)
    #[error("classifier timed out")]
    Timeout,

    /// No label was available for this frame (transient)
    #[error("no emotion label for frame")]
    Unlabeled,

    /// The classifier answered but could not label the frame (transient)
    #[error("classifier rejected frame: {0}")]
    Rejected(String),

    /// The classifier is unreachable; no further calls are made this session
    #[error("classifier unreachable: {0}")]
    ConnectionRefused(String),
}

impl ClassifyError {
    /// Whether the classifier should be abandoned for the rest of the session
    pub fn is_fatal(&self) -> bool {
        matches!(self, ClassifyError::ConnectionRefused(_))
    }
}

/// External face-emotion classifier
pub trait EmotionClassifier: Send {
    fn classify(&self, image: &DynamicImage) -> Result<String, ClassifyError>;
}

impl<F> EmotionClassifier for F
where
    F: Fn(&DynamicImage) -> Result<String, ClassifyError> + Send,
{
    fn classify(&self, image: &DynamicImage) -> Result<String, ClassifyError> {
        self(image)
    }
}

type Request = (u64, DynamicImage);
type Response = (u64, Result<String, ClassifyError>);

/// Runs a classifier on a worker thread and bounds every call by a timeout
///
/// Responses are tagged with the request id; a response arriving after its caller gave
/// up is dropped on the next call. The worker exits once this handle is dropped and its
/// in-flight call returns.
pub struct DeadlineClassifier {
    requests: Sender<Request>,
    responses: Receiver<Response>,
    next_id: AtomicU64,
    timeout: Duration,
}

impl DeadlineClassifier {
    pub fn new<C>(inner: C, timeout: Duration) -> Self
    where
        C: EmotionClassifier + 'static,
    {
        let (requests, request_rx) = bounded::<Request>(REQUEST_QUEUE_DEPTH);
        let (response_tx, responses) = bounded::<Response>(RESPONSE_QUEUE_DEPTH);

        thread::spawn(move || {
            while let Ok((id, image)) = request_rx.recv() {
                let result = inner.classify(&image);
                match response_tx.try_send((id, result)) {
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Disconnected(_)) => break,
                }
            }
        });

        Self {
            requests,
            responses,
            next_id: AtomicU64::new(0),
            timeout,
        }
    }
}

impl EmotionClassifier for DeadlineClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<String, ClassifyError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        match self.requests.try_send((id, image.clone())) {
            Ok(()) => {}
            // Worker still busy with an abandoned call
            Err(TrySendError::Full(_)) => return Err(ClassifyError::Timeout),
            Err(TrySendError::Disconnected(_)) => {
                return Err(ClassifyError::ConnectionRefused(
                    "classifier worker stopped".to_string(),
                ))
            }
        }

        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.responses.recv_timeout(remaining) {
                Ok((response_id, result)) if response_id == id => return result,
                Ok((stale, _)) => {
                    warn!(request = stale, "discarding late classifier response");
                }
                Err(RecvTimeoutError::Timeout) => return Err(ClassifyError::Timeout),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(ClassifyError::ConnectionRefused(
                        "classifier worker stopped".to_string(),
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn blank() -> DynamicImage {
        DynamicImage::new_rgb8(4, 4)
    }

    #[test]
    fn test_fast_classifier_passes_through() {
        let classifier = DeadlineClassifier::new(
            |_: &DynamicImage| -> Result<String, ClassifyError> { Ok("happy".to_string()) },
            Duration::from_secs(2),
        );
        assert_eq!(classifier.classify(&blank()), Ok("happy".to_string()));
        assert_eq!(classifier.classify(&blank()), Ok("happy".to_string()));
    }

    #[test]
    fn test_slow_classifier_times_out() {
        let classifier = DeadlineClassifier::new(
            |_: &DynamicImage| -> Result<String, ClassifyError> {
                thread::sleep(Duration::from_millis(300));
                Ok("sad".to_string())
            },
            Duration::from_millis(20),
        );
        assert_eq!(classifier.classify(&blank()), Err(ClassifyError::Timeout));
    }

    #[test]
    fn test_late_response_is_not_returned_to_next_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let classifier = DeadlineClassifier::new(
            move |_: &DynamicImage| -> Result<String, ClassifyError> {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    thread::sleep(Duration::from_millis(150));
                    Ok("late".to_string())
                } else {
                    Ok("fresh".to_string())
                }
            },
            Duration::from_millis(20),
        );

        assert_eq!(classifier.classify(&blank()), Err(ClassifyError::Timeout));
        thread::sleep(Duration::from_millis(250));

        let classifier = DeadlineClassifier {
            timeout: Duration::from_secs(2),
            ..classifier
        };
        assert_eq!(classifier.classify(&blank()), Ok("fresh".to_string()));
    }

    #[test]
    fn test_errors_pass_through() {
        let classifier = DeadlineClassifier::new(
            |_: &DynamicImage| -> Result<String, ClassifyError> {
                Err(ClassifyError::ConnectionRefused("refused".to_string()))
            },
            Duration::from_secs(2),
        );
        let err = classifier.classify(&blank()).unwrap_err();
        assert!(err.is_fatal());
        assert!(!ClassifyError::Timeout.is_fatal());
    }
}
