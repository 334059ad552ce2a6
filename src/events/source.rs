use crate::common::error::AppError;
use crate::events::model::NetworkEvent;
use std::io::BufRead;
use std::sync::mpsc;

/// Create a connected sender/receiver pair.
///
/// The sender can be cloned onto network threads; the receiver stays with the
/// thread that owns the activity model and is drained there.
pub fn channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel::<NetworkEvent>();
    (EventSender { tx }, EventReceiver { rx })
}

#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<NetworkEvent>,
}

impl EventSender {
    /// Queue an event. Returns false once the receiving side is gone.
    pub fn send(&self, event: NetworkEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<NetworkEvent>,
}

impl EventReceiver {
    /// Events queued so far, without blocking
    pub fn drain(&self) -> impl Iterator<Item = NetworkEvent> + '_ {
        self.rx.try_iter()
    }
}

/// Parse a JSON-lines event capture.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn read_capture<R: BufRead>(reader: R) -> Result<Vec<NetworkEvent>, AppError> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let event: NetworkEvent = serde_json::from_str(trimmed).map_err(|e| {
            AppError::Serialization(format!("Capture line {}: {}", index + 1, e))
        })?;
        events.push(event);
    }
    log::debug!("[Events] Read {} events from capture", events.len());
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::model::{RequestId, RequestTimedOut};
    use std::io::Cursor;
    use std::thread;

    #[test]
    fn test_events_cross_threads_in_order() {
        let (tx, rx) = channel();
        let worker = {
            let tx = tx.clone();
            thread::spawn(move || {
                for id in 0..5u64 {
                    tx.send(NetworkEvent::TimedOut(RequestTimedOut {
                        id: RequestId::from(id),
                    }));
                }
            })
        };
        worker.join().unwrap();

        let ids: Vec<String> = rx.drain().map(|e| e.request_id().to_string()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);
        assert_eq!(rx.drain().count(), 0);
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (tx, rx) = channel();
        drop(rx);
        assert!(!tx.send(NetworkEvent::TimedOut(RequestTimedOut {
            id: RequestId::from(1u64),
        })));
    }

    #[test]
    fn test_read_capture_skips_comments() {
        let capture = "# session\n\n{\"event\":\"timed_out\",\"id\":3}\n";
        let events = read_capture(Cursor::new(capture)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].request_id(), &RequestId::from(3u64));
    }

    #[test]
    fn test_read_capture_reports_line() {
        let capture = "{\"event\":\"timed_out\",\"id\":3}\n{\"event\":\"bogus\"}\n";
        let err = read_capture(Cursor::new(capture)).unwrap_err();
        assert!(err.to_string().contains("Capture line 2"));
    }
}
