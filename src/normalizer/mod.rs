//! Speaker-event normalizer.
//!
//! Conferencing SDKs deliver active-speaker notifications in several shapes
//! (a bare id field, a users array, a nested payload). This module collapses
//! every shape into one tagged union at the boundary so the ledger never
//! inspects raw JSON. Normalization is total: any payload yields a defined
//! result, never an error.

use serde_json::Value;

/// Participant metadata that may ride along with a speaker signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantMeta {
    pub display_name: Option<String>,
}

/// Canonical result of normalizing one raw notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakerSignal {
    /// No one is speaking (explicit empty roster or unrecognized payload).
    NoSpeaker,
    /// A speaker, optionally with metadata for lazily creating a record.
    Speaker {
        id: String,
        meta: Option<ParticipantMeta>,
    },
}

/// Normalize a raw speaker-change payload.
///
/// Resolution order, first match wins:
/// 1. `activeSpeakerId` field
/// 2. `activeSpeaker` field
/// 3. first entry of a non-empty `users` array (also under `payload.users`)
/// 4. empty users array → no speaker
/// 5. anything else → no speaker
pub fn normalize(payload: &Value) -> SpeakerSignal {
    if let Some(id) = value_as_id(&payload["activeSpeakerId"]) {
        return SpeakerSignal::Speaker { id, meta: None };
    }

    if let Some(id) = value_as_id(&payload["activeSpeaker"]) {
        return SpeakerSignal::Speaker { id, meta: None };
    }

    let users = payload["users"]
        .as_array()
        .or_else(|| payload["payload"]["users"].as_array());

    if let Some(users) = users {
        let Some(first) = users.first() else {
            // Empty roster means silence (e.g. everyone muted).
            return SpeakerSignal::NoSpeaker;
        };

        let id = value_as_id(&first["participantId"])
            .or_else(|| value_as_id(&first["participantUUID"]));

        return match id {
            Some(id) => SpeakerSignal::Speaker {
                id,
                meta: Some(ParticipantMeta {
                    display_name: user_display_name(first),
                }),
            },
            None => SpeakerSignal::NoSpeaker,
        };
    }

    SpeakerSignal::NoSpeaker
}

/// Accept string or numeric identifiers; reject empty strings.
fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn user_display_name(user: &Value) -> Option<String> {
    for key in ["screenName", "displayName", "name"] {
        if let Some(name) = user[key].as_str() {
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direct_active_speaker_id() {
        let signal = normalize(&json!({ "activeSpeakerId": "user-1" }));
        assert_eq!(
            signal,
            SpeakerSignal::Speaker {
                id: "user-1".to_string(),
                meta: None
            }
        );
    }

    #[test]
    fn test_direct_active_speaker_field() {
        let signal = normalize(&json!({ "activeSpeaker": "user-2" }));
        assert_eq!(
            signal,
            SpeakerSignal::Speaker {
                id: "user-2".to_string(),
                meta: None
            }
        );
    }

    #[test]
    fn test_numeric_speaker_id() {
        let signal = normalize(&json!({ "activeSpeakerId": 16778240 }));
        assert_eq!(
            signal,
            SpeakerSignal::Speaker {
                id: "16778240".to_string(),
                meta: None
            }
        );
    }

    #[test]
    fn test_active_speaker_id_wins_over_users() {
        let signal = normalize(&json!({
            "activeSpeakerId": "user-1",
            "users": [{ "participantId": "user-9" }]
        }));
        assert_eq!(
            signal,
            SpeakerSignal::Speaker {
                id: "user-1".to_string(),
                meta: None
            }
        );
    }

    #[test]
    fn test_users_array_takes_first_entry() {
        let signal = normalize(&json!({
            "users": [
                { "participantId": "user-3", "screenName": "Carol" },
                { "participantId": "user-4", "screenName": "Dan" }
            ]
        }));
        assert_eq!(
            signal,
            SpeakerSignal::Speaker {
                id: "user-3".to_string(),
                meta: Some(ParticipantMeta {
                    display_name: Some("Carol".to_string())
                })
            }
        );
    }

    #[test]
    fn test_participant_uuid_fallback() {
        let signal = normalize(&json!({
            "users": [{ "participantUUID": "uuid-7", "displayName": "Eve" }]
        }));
        assert_eq!(
            signal,
            SpeakerSignal::Speaker {
                id: "uuid-7".to_string(),
                meta: Some(ParticipantMeta {
                    display_name: Some("Eve".to_string())
                })
            }
        );
    }

    #[test]
    fn test_nested_payload_users() {
        let signal = normalize(&json!({
            "payload": { "users": [{ "participantId": "user-5", "name": "Frank" }] }
        }));
        assert_eq!(
            signal,
            SpeakerSignal::Speaker {
                id: "user-5".to_string(),
                meta: Some(ParticipantMeta {
                    display_name: Some("Frank".to_string())
                })
            }
        );
    }

    #[test]
    fn test_empty_users_array_means_silence() {
        assert_eq!(normalize(&json!({ "users": [] })), SpeakerSignal::NoSpeaker);
        assert_eq!(
            normalize(&json!({ "payload": { "users": [] } })),
            SpeakerSignal::NoSpeaker
        );
    }

    #[test]
    fn test_user_entry_without_id_means_silence() {
        let signal = normalize(&json!({ "users": [{ "screenName": "Ghost" }] }));
        assert_eq!(signal, SpeakerSignal::NoSpeaker);
    }

    #[test]
    fn test_unrecognized_payloads_degrade_to_silence() {
        assert_eq!(normalize(&json!({})), SpeakerSignal::NoSpeaker);
        assert_eq!(normalize(&json!(null)), SpeakerSignal::NoSpeaker);
        assert_eq!(normalize(&json!("garbage")), SpeakerSignal::NoSpeaker);
        assert_eq!(normalize(&json!(42)), SpeakerSignal::NoSpeaker);
        assert_eq!(
            normalize(&json!({ "activeSpeakerId": "" })),
            SpeakerSignal::NoSpeaker
        );
        assert_eq!(
            normalize(&json!({ "users": "not-an-array" })),
            SpeakerSignal::NoSpeaker
        );
    }

    #[test]
    fn test_display_name_preference_order() {
        let signal = normalize(&json!({
            "users": [{
                "participantId": "u",
                "name": "third",
                "displayName": "second",
                "screenName": "first"
            }]
        }));
        let SpeakerSignal::Speaker { meta, .. } = signal else {
            panic!("expected speaker");
        };
        assert_eq!(meta.unwrap().display_name, Some("first".to_string()));
    }
}
