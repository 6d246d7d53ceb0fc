//! Post-invocation ceilings on component responses.
//!
//! Checks run only after a call has fully returned. All limits are
//! inclusive and measured in raw bytes of the serialized payload.

use crate::config::ExecutionLimits;
use crate::error::BridgeError;
use appbridge_types::{ActionResponse, TriggerResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseValidator {
    max_events: usize,
    max_store_bytes: usize,
    max_output_bytes: usize,
}

impl ResponseValidator {
    pub fn new(limits: &ExecutionLimits) -> Self {
        Self {
            max_events: limits.max_events,
            max_store_bytes: limits.max_store_bytes,
            max_output_bytes: limits.max_output_bytes,
        }
    }

    /// Event count is checked before the cursor size.
    pub fn check_trigger(&self, response: &TriggerResponse) -> Result<(), BridgeError> {
        let count = response.events.len();
        if count > self.max_events {
            return Err(BridgeError::TooManyEvents {
                count,
                limit: self.max_events,
            });
        }

        let size = response.store_len();
        if size > self.max_store_bytes {
            return Err(BridgeError::StoreTooLarge {
                size,
                limit: self.max_store_bytes,
            });
        }
        Ok(())
    }

    pub fn check_action(&self, response: &ActionResponse) -> Result<(), BridgeError> {
        let size = response.serialized_output.len();
        if size > self.max_output_bytes {
            return Err(BridgeError::ActionResponseTooLarge {
                size,
                limit: self.max_output_bytes,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appbridge_types::TriggerEvent;
    use proptest::prelude::*;

    const KB64: usize = 64 * 1024;

    fn validator() -> ResponseValidator {
        ResponseValidator::new(&ExecutionLimits::default())
    }

    fn events(n: usize) -> Vec<TriggerEvent> {
        (0..n)
            .map(|i| TriggerEvent::new(i.to_string(), r#"{"key":"value"}"#))
            .collect()
    }

    #[test]
    fn exactly_100_events_accepted() {
        let response = TriggerResponse::new("some store", events(100));
        assert!(validator().check_trigger(&response).is_ok());
    }

    #[test]
    fn over_100_events_rejected() {
        let response = TriggerResponse::new("some store", events(101));
        let err = validator().check_trigger(&response).unwrap_err();
        assert!(matches!(err, BridgeError::TooManyEvents { count: 101, limit: 100 }));
        assert!(err.to_string().contains("Maximum 100 events allowed"));
    }

    #[test]
    fn store_at_limit_accepted() {
        let response = TriggerResponse::new("a".repeat(KB64), events(2));
        assert!(validator().check_trigger(&response).is_ok());
    }

    #[test]
    fn store_one_byte_over_rejected() {
        let response = TriggerResponse::new("a".repeat(KB64 + 1), events(2));
        let err = validator().check_trigger(&response).unwrap_err();
        assert!(matches!(err, BridgeError::StoreTooLarge { size, limit } if size == KB64 + 1 && limit == KB64));
    }

    #[test]
    fn store_measured_in_bytes_not_chars() {
        // 32768 two-byte chars = 65536 bytes, one more pushes it over.
        let at_limit = TriggerResponse::new("é".repeat(KB64 / 2), vec![]);
        assert!(validator().check_trigger(&at_limit).is_ok());
        let over = TriggerResponse::new(format!("{}a", "é".repeat(KB64 / 2)), vec![]);
        assert!(validator().check_trigger(&over).is_err());
    }

    #[test]
    fn event_count_checked_before_store() {
        let response = TriggerResponse::new("a".repeat(KB64 + 1), events(101));
        assert!(matches!(
            validator().check_trigger(&response),
            Err(BridgeError::TooManyEvents { .. })
        ));
    }

    #[test]
    fn action_output_boundary() {
        let ok = ActionResponse::new("a".repeat(KB64));
        assert!(validator().check_action(&ok).is_ok());
        let over = ActionResponse::new("a".repeat(KB64 + 1));
        assert!(matches!(
            validator().check_action(&over),
            Err(BridgeError::ActionResponseTooLarge { .. })
        ));
    }

    #[test]
    fn custom_limits_are_honored() {
        let limits = ExecutionLimits {
            max_events: 2,
            max_store_bytes: 4,
            max_output_bytes: 1,
            ..ExecutionLimits::default()
        };
        let validator = ResponseValidator::new(&limits);
        assert!(validator.check_trigger(&TriggerResponse::new("abcd", events(2))).is_ok());
        assert!(validator.check_trigger(&TriggerResponse::new("abcd", events(3))).is_err());
        assert!(validator.check_trigger(&TriggerResponse::new("abcde", events(0))).is_err());
        assert!(validator.check_action(&ActionResponse::new("ab")).is_err());
    }

    proptest! {
        #[test]
        fn event_ceiling_is_inclusive(n in 0usize..200) {
            let response = TriggerResponse::new("0", events(n));
            prop_assert_eq!(validator().check_trigger(&response).is_ok(), n <= 100);
        }
    }
}
