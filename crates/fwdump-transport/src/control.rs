use std::time::Duration;

use tracing::debug;

use crate::error::Result;

/// Out-of-band control over a device link.
///
/// The byte stream itself carries frames; these operations sit beside it and
/// are only used while bringing the connection up.
pub trait ControlLines {
    /// Assert (`true`) or deassert (`false`) the RTS line.
    fn set_rts(&mut self, asserted: bool) -> Result<()>;

    /// Discard anything pending in the input and output queues.
    fn clear_buffers(&mut self) -> Result<()>;
}

/// Timing of the reset pulse sent before the handshake.
#[derive(Debug, Clone)]
pub struct ResetConfig {
    /// How long RTS stays asserted.
    pub pulse: Duration,
    /// Wait after the queues are cleared, before the first read.
    pub settle: Duration,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            pulse: Duration::from_millis(100),
            settle: Duration::from_millis(100),
        }
    }
}

/// Pulse RTS to reset the device, then clear stale bytes from both queues.
///
/// After this returns the next byte on the stream should be the start of the
/// device's ready banner.
pub fn reset_device<C: ControlLines + ?Sized>(link: &mut C, config: &ResetConfig) -> Result<()> {
    debug!(pulse = ?config.pulse, settle = ?config.settle, "resetting device");
    link.set_rts(true)?;
    std::thread::sleep(config.pulse);
    link.set_rts(false)?;
    link.clear_buffers()?;
    std::thread::sleep(config.settle);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    #[derive(Debug, PartialEq, Eq)]
    enum Event {
        Rts(bool),
        Clear,
    }

    #[derive(Default)]
    struct RecordingLines {
        events: Vec<Event>,
        fail_clear: bool,
    }

    impl ControlLines for RecordingLines {
        fn set_rts(&mut self, asserted: bool) -> Result<()> {
            self.events.push(Event::Rts(asserted));
            Ok(())
        }

        fn clear_buffers(&mut self) -> Result<()> {
            if self.fail_clear {
                return Err(TransportError::ControlLine(std::io::Error::other(
                    "flush refused",
                )));
            }
            self.events.push(Event::Clear);
            Ok(())
        }
    }

    fn instant() -> ResetConfig {
        ResetConfig {
            pulse: Duration::ZERO,
            settle: Duration::ZERO,
        }
    }

    #[test]
    fn reset_pulses_rts_then_clears() {
        let mut lines = RecordingLines::default();
        reset_device(&mut lines, &instant()).unwrap();

        assert_eq!(
            lines.events,
            vec![Event::Rts(true), Event::Rts(false), Event::Clear]
        );
    }

    #[test]
    fn reset_propagates_control_errors() {
        let mut lines = RecordingLines {
            fail_clear: true,
            ..RecordingLines::default()
        };
        let err = reset_device(&mut lines, &instant()).unwrap_err();

        assert!(matches!(err, TransportError::ControlLine(_)));
        assert_eq!(lines.events, vec![Event::Rts(true), Event::Rts(false)]);
    }

    #[test]
    fn default_timings_match_device_boot() {
        let cfg = ResetConfig::default();
        assert_eq!(cfg.pulse, Duration::from_millis(100));
        assert_eq!(cfg.settle, Duration::from_millis(100));
    }
}
