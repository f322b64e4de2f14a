//! # Inbound messages
//! Messages arrive as a topic string plus a raw payload. They are classified by topic and
//! decoded exactly once, here, into a [`Message`]. Past this point nothing looks at topic
//! strings or JSON anymore.
//!
//! | topic role   | payload                                        |
//! |--------------|------------------------------------------------|
//! | sync         | `{"epoch": 1625074800}`                        |
//! | zone-select  | `Tashkent`                                     |
//! | alarm-update | `[{"time": "07:30", "zone": "UTC"}, ...]`      |
use crate::alarm::{AlarmEntry, MAX_ALARMS};
use crate::config::Topics;
use crate::error::DecodeError;
use heapless::Vec;
use serde::Deserialize;

/// Which of the inbound topics a message arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TopicRole {
    /// Clock sync
    Sync,
    /// Zone selection
    ZoneSelect,
    /// Alarm list replacement
    AlarmUpdate,
}

impl Topics<'_> {
    /// The role of `topic`, `None` if we do not subscribe to it
    #[must_use]
    pub fn classify(&self, topic: &str) -> Option<TopicRole> {
        if topic == self.sync {
            Some(TopicRole::Sync)
        } else if topic == self.zone_select {
            Some(TopicRole::ZoneSelect)
        } else if topic == self.alarm_update {
            Some(TopicRole::AlarmUpdate)
        } else {
            None
        }
    }
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<'a> {
    /// Rebase the clock to `epoch`
    Sync {
        /// Seconds since the unix epoch
        epoch: u64,
    },
    /// Switch to the zone called `zone`
    ZoneSelect {
        /// Zone name, not yet checked against the registry
        zone: &'a str,
    },
    /// Replace all alarms with `alarms`
    AlarmUpdate {
        /// The well formed entries, in payload order
        alarms: Vec<AlarmEntry, MAX_ALARMS>,
        /// Entries dropped because they were malformed or did not fit
        skipped: usize,
    },
}

/// Wire shape of a sync message
#[derive(Deserialize)]
struct SyncPayload {
    /// Seconds since the unix epoch
    epoch: u64,
}

/// Wire shape of one alarm. Both fields are optional so that a missing field is reported the
/// same way as a malformed one.
#[derive(Deserialize)]
struct RawAlarm<'a> {
    /// `HH:MM`
    #[serde(borrow)]
    time: Option<&'a str>,
    /// Zone name
    #[serde(borrow)]
    zone: Option<&'a str>,
}

impl<'a> Message<'a> {
    /// Decode `payload` as a message of kind `role`.
    ///
    /// # Errors
    /// A [`DecodeError`] naming what was wrong with the payload.
    pub fn decode(role: TopicRole, payload: &'a [u8]) -> Result<Self, DecodeError> {
        match role {
            TopicRole::Sync => {
                let (sync, _) = serde_json_core::from_slice::<SyncPayload>(payload)
                    .map_err(|_| DecodeError::MalformedSync)?;
                Ok(Self::Sync { epoch: sync.epoch })
            }
            TopicRole::ZoneSelect => {
                let zone = core::str::from_utf8(payload).map_err(|_| DecodeError::InvalidUtf8)?;
                Ok(Self::ZoneSelect { zone })
            }
            TopicRole::AlarmUpdate => Self::decode_alarms(payload),
        }
    }

    /// Decode an alarm array, dropping entries that are not a well formed alarm.
    /// Every element is decoded on its own, so one bad entry never costs the others.
    fn decode_alarms(payload: &'a [u8]) -> Result<Self, DecodeError> {
        let body = array_body(payload).ok_or(DecodeError::MalformedAlarms)?;

        let mut alarms = Vec::new();
        let mut skipped = 0;
        for element in Elements::new(body) {
            let parsed = serde_json_core::from_slice::<RawAlarm<'a>>(element)
                .ok()
                .and_then(|(raw, _)| match (raw.time, raw.zone) {
                    (Some(time), Some(zone)) => AlarmEntry::parse(time, zone),
                    _ => None,
                });
            let Some(alarm) = parsed else {
                warn!(
                    "skipping malformed alarm {}",
                    core::str::from_utf8(element).unwrap_or("<invalid utf-8>")
                );
                skipped += 1;
                continue;
            };
            if alarms.push(alarm).is_err() {
                warn!("more than {} alarms, skipping the rest", MAX_ALARMS);
                skipped += 1;
            }
        }
        Ok(Self::AlarmUpdate { alarms, skipped })
    }
}

/// Nesting state while walking JSON text byte by byte.
#[derive(Debug, Default)]
struct Scanner {
    /// Open brackets and braces
    depth: usize,
    /// Inside a string literal
    in_string: bool,
    /// The previous byte was a backslash inside a string
    escaped: bool,
}

impl Scanner {
    /// Advance over `byte`, `false` on a closing bracket that has no opener
    fn step(&mut self, byte: u8) -> bool {
        if self.in_string {
            match (self.escaped, byte) {
                (true, _) => self.escaped = false,
                (false, b'\\') => self.escaped = true,
                (false, b'"') => self.in_string = false,
                _ => {}
            }
            return true;
        }
        match byte {
            b'"' => self.in_string = true,
            b'[' | b'{' => self.depth += 1,
            b']' | b'}' => {
                let Some(depth) = self.depth.checked_sub(1) else {
                    return false;
                };
                self.depth = depth;
            }
            _ => {}
        }
        true
    }

    /// Outside of any string, bracket or brace
    const fn at_top(&self) -> bool {
        self.depth == 0 && !self.in_string
    }
}

/// The bytes between the brackets of a top level JSON array, `None` if `payload` is not one
/// balanced array.
fn array_body(payload: &[u8]) -> Option<&[u8]> {
    let body = payload
        .trim_ascii()
        .strip_prefix(b"[")?
        .strip_suffix(b"]")?;
    let mut scanner = Scanner::default();
    for &byte in body {
        if !scanner.step(byte) {
            return None;
        }
    }
    scanner.at_top().then_some(body)
}

/// Splits an array body at its top level commas.
struct Elements<'a> {
    /// What is left to split, `None` once exhausted
    rest: Option<&'a [u8]>,
}

impl<'a> Elements<'a> {
    /// Iterate the elements of `body`, as returned by [`array_body`]
    fn new(body: &'a [u8]) -> Self {
        let body = body.trim_ascii();
        Self {
            rest: (!body.is_empty()).then_some(body),
        }
    }
}

impl<'a> Iterator for Elements<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let rest = self.rest?;
        let mut scanner = Scanner::default();
        let comma = rest.iter().position(|&byte| {
            // the body is balanced, a stray closer cannot occur here
            let _ = scanner.step(byte);
            byte == b',' && scanner.at_top()
        });
        let element = match comma {
            Some(at) => {
                self.rest = Some(&rest[at + 1..]);
                &rest[..at]
            }
            None => {
                self.rest = None;
                rest
            }
        };
        Some(element.trim_ascii())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_are_classified_by_exact_name() {
        let topics = Topics::DEFAULT;
        assert_eq!(topics.classify("clock/sync"), Some(TopicRole::Sync));
        assert_eq!(topics.classify("clock/zone"), Some(TopicRole::ZoneSelect));
        assert_eq!(topics.classify("clock/alarms"), Some(TopicRole::AlarmUpdate));
        assert_eq!(topics.classify("clock/sync/extra"), None);
        assert_eq!(topics.classify("Clock/Sync"), None);
    }

    #[test]
    fn sync_decodes_epoch() {
        let message = Message::decode(TopicRole::Sync, br#"{"epoch": 1625074800}"#).unwrap();
        assert_eq!(message, Message::Sync { epoch: 1_625_074_800 });
    }

    #[test]
    fn sync_rejects_anything_but_an_unsigned_epoch() {
        for payload in [
            &br#"{"epoch": -5}"#[..],
            br#"{"epoch": "1625074800"}"#,
            br#"{"time": 1625074800}"#,
            b"1625074800",
            b"",
        ] {
            assert_eq!(
                Message::decode(TopicRole::Sync, payload),
                Err(DecodeError::MalformedSync)
            );
        }
    }

    #[test]
    fn zone_select_passes_name_through_verbatim() {
        let message = Message::decode(TopicRole::ZoneSelect, b"CET").unwrap();
        assert_eq!(message, Message::ZoneSelect { zone: "CET" });
        assert_eq!(
            Message::decode(TopicRole::ZoneSelect, &[0xff, 0xfe]),
            Err(DecodeError::InvalidUtf8)
        );
    }

    #[test]
    fn malformed_alarm_entry_is_skipped_individually() {
        let payload = br#"[{"time":"9:5","zone":"UTC"},{"time":"07:30","zone":"UTC"}]"#;
        let Message::AlarmUpdate { alarms, skipped } =
            Message::decode(TopicRole::AlarmUpdate, payload).unwrap()
        else {
            panic!("expected an alarm update");
        };
        assert_eq!(skipped, 1);
        assert_eq!(alarms.len(), 1);
        assert!(alarms[0].matches(7, 30, "UTC"));
    }

    #[test]
    fn alarm_entries_missing_a_field_are_skipped() {
        let payload = br#"[{"time":"06:00"},{"zone":"CET"},{"time":"06:15","zone":"CET"}]"#;
        let Message::AlarmUpdate { alarms, skipped } =
            Message::decode(TopicRole::AlarmUpdate, payload).unwrap()
        else {
            panic!("expected an alarm update");
        };
        assert_eq!(skipped, 2);
        assert_eq!(alarms.len(), 1);
        assert_eq!(alarms[0].zone(), "CET");
    }

    #[test]
    fn wrong_typed_alarm_entry_is_skipped_individually() {
        let payload = br#"[{"time":930,"zone":"UTC"},{"time":"07:30","zone":"UTC"},{"time":"08:00","zone":["UTC"]}]"#;
        let Message::AlarmUpdate { alarms, skipped } =
            Message::decode(TopicRole::AlarmUpdate, payload).unwrap()
        else {
            panic!("expected an alarm update");
        };
        assert_eq!(skipped, 2);
        assert_eq!(alarms.len(), 1);
        assert!(alarms[0].matches(7, 30, "UTC"));
    }

    #[test]
    fn commas_and_brackets_inside_strings_do_not_split_entries() {
        let payload = br#" [ {"time":"06:00","zone":"a,b]"} , {"time":"06:15","zone":"{x}"} ] "#;
        let Message::AlarmUpdate { alarms, skipped } =
            Message::decode(TopicRole::AlarmUpdate, payload).unwrap()
        else {
            panic!("expected an alarm update");
        };
        assert_eq!(skipped, 0);
        assert_eq!(alarms[0].zone(), "a,b]");
        assert_eq!(alarms[1].zone(), "{x}");
    }

    #[test]
    fn escaped_quotes_stay_inside_their_element() {
        let body = array_body(br#"["a\",b", {"k":[1,2]}, 3]"#).unwrap();
        let parts: std::vec::Vec<&[u8]> = Elements::new(body).collect();
        assert_eq!(parts, [&br#""a\",b""#[..], br#"{"k":[1,2]}"#, b"3"]);
    }

    #[test]
    fn oversized_batch_is_truncated_not_rejected() {
        let entries: std::vec::Vec<std::string::String> = (0..40)
            .map(|minute| std::format!(r#"{{"time":"05:{minute:02}","zone":"UTC"}}"#))
            .collect();
        let payload = std::format!("[{}]", entries.join(","));
        let Message::AlarmUpdate { alarms, skipped } =
            Message::decode(TopicRole::AlarmUpdate, payload.as_bytes()).unwrap()
        else {
            panic!("expected an alarm update");
        };
        assert_eq!(alarms.len(), MAX_ALARMS);
        assert_eq!(skipped, 40 - MAX_ALARMS);
        assert!(alarms[15].matches(5, 15, "UTC"));
    }

    #[test]
    fn empty_alarm_array_is_valid() {
        let message = Message::decode(TopicRole::AlarmUpdate, b"[]").unwrap();
        assert_eq!(
            message,
            Message::AlarmUpdate {
                alarms: Vec::new(),
                skipped: 0
            }
        );
    }

    #[test]
    fn non_array_alarm_payload_is_malformed() {
        for payload in [
            &b"not json"[..],
            br#"{"time":"07:30","zone":"UTC"}"#,
            b"",
            br#"[{"time":"07:30","zone":"UTC"}"#,
            br#"[{"time":"07:30","zone":"UTC"}]]"#,
            br#"["07:30]"#,
        ] {
            assert_eq!(
                Message::decode(TopicRole::AlarmUpdate, payload),
                Err(DecodeError::MalformedAlarms)
            );
        }
    }
}
