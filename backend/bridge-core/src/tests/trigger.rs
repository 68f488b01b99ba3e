use crate::error::trigger::TriggerError;
use crate::trigger::{CANCEL_PULSES, KeystrokeSink, Signal, SignalSink, Trigger};
use crate::trigger::keystroke::{CARRIAGE_RETURN, ESCAPE};
use crate::DISPATCH_PHRASE;

use common::ErrorLocation;

use std::panic::Location;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RecordingSink {
    signals: Mutex<Vec<Signal>>,
}

impl SignalSink for RecordingSink {
    fn send(&self, signal: Signal) -> Result<(), TriggerError> {
        self.signals.lock().unwrap().push(signal);
        Ok(())
    }
}

struct FailingSink;

impl SignalSink for FailingSink {
    fn send(&self, _signal: Signal) -> Result<(), TriggerError> {
        Err(TriggerError::Send {
            message: "console closed".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

/// **VALUE**: Verifies the signal sequence of one firing.
///
/// **WHY THIS MATTERS**: The cancel pulses must come before the dispatch, or a
/// stale partial command on the console swallows the phrase.
///
/// **BUG THIS CATCHES**: Would catch reordering or dropping the pulses.
#[tokio::test]
async fn given_trigger_when_fired_then_cancels_precede_dispatch() {
    // GIVEN: A trigger over a recording sink, no settle delay
    let sink = Arc::new(RecordingSink::default());
    let trigger = Trigger::new(sink.clone()).with_settle_delay(Duration::ZERO);

    // WHEN: Firing
    trigger.fire().await.unwrap();

    // THEN: Pulses then dispatch
    let mut expected = vec![Signal::Cancel; CANCEL_PULSES];
    expected.push(Signal::Dispatch);
    assert_eq!(*sink.signals.lock().unwrap(), expected);
}

/// **VALUE**: Verifies the keystroke bytes written to the console.
///
/// **WHY THIS MATTERS**: The host console only understands raw keystrokes; the
/// byte sequence is the whole protocol on that side.
///
/// **BUG THIS CATCHES**: Would catch a missing carriage return, which leaves the
/// phrase typed but never submitted.
#[tokio::test]
async fn given_keystroke_sink_when_fired_then_escape_phrase_and_return_written() {
    // GIVEN: A keystroke sink over a byte buffer
    let sink = Arc::new(KeystrokeSink::new(Vec::<u8>::new()));
    let trigger = Trigger::new(sink.clone()).with_settle_delay(Duration::ZERO);

    // WHEN: Firing
    trigger.fire().await.unwrap();

    // THEN: ESC ESC phrase CR
    let mut expected = vec![ESCAPE; CANCEL_PULSES];
    expected.extend_from_slice(DISPATCH_PHRASE.as_bytes());
    expected.push(CARRIAGE_RETURN);
    assert_eq!(sink.with_writer(|bytes| bytes.clone()), Some(expected));
}

/// **VALUE**: Verifies that sink failures are reported, not swallowed.
///
/// **WHY THIS MATTERS**: The channel decides what to do with a failed firing (it
/// keeps polling); the trigger itself must not pretend it succeeded.
///
/// **BUG THIS CATCHES**: Would catch `fire` ignoring the sink result.
#[tokio::test]
async fn given_failing_sink_when_fired_then_send_error() {
    // GIVEN: A sink that always fails
    let trigger = Trigger::new(Arc::new(FailingSink)).with_settle_delay(Duration::ZERO);

    // WHEN: Firing
    let result = trigger.fire().await;

    // THEN: The error surfaces
    assert!(matches!(result, Err(TriggerError::Send { .. })));
}
