//! Draht-Umschlag `{ "eventName": string, "data": any }`
//!
//! Gilt in beide Richtungen. Eingehende Umschlaege werden hier nur auf
//! Form geprueft; die Interpretation von `data` passiert in `events`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Fehler beim Dekodieren eines eingehenden Frames
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Frame ist kein gueltiges UTF-8
    #[error("Frame ist kein UTF-8: {0}")]
    KeinUtf8(#[from] std::str::Utf8Error),

    /// Frame ist kein JSON oder hat nicht die Umschlag-Form
    #[error("Ungueltiger Umschlag: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSON-Umschlag einer Nachricht
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "eventName")]
    pub event_name: String,
    /// Fehlt `data` auf dem Draht, ist der Wert `null`
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Erstellt einen neuen Umschlag
    pub fn neu(event_name: impl Into<String>, data: Value) -> Self {
        Self {
            event_name: event_name.into(),
            data,
        }
    }

    /// Dekodiert einen Umschlag aus rohen Frame-Bytes
    pub fn dekodieren(roh: &[u8]) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(roh)?;
        Ok(serde_json::from_str(text)?)
    }

    /// Serialisiert den Umschlag als JSON-Text
    pub fn kodieren(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn umschlag_dekodieren() {
        let env = Envelope::dekodieren(br#"{"eventName":"logon","data":{"to":"b1"}}"#).unwrap();
        assert_eq!(env.event_name, "logon");
        assert_eq!(env.data, json!({ "to": "b1" }));
    }

    #[test]
    fn fehlendes_data_ist_null() {
        let env = Envelope::dekodieren(br#"{"eventName":"update"}"#).unwrap();
        assert_eq!(env.data, Value::Null);
    }

    #[test]
    fn kein_json_ist_fehler() {
        let fehler = Envelope::dekodieren(b"das ist kein json").unwrap_err();
        assert!(matches!(fehler, DecodeError::Json(_)));
    }

    #[test]
    fn fehlender_event_name_ist_fehler() {
        assert!(Envelope::dekodieren(br#"{"data":{}}"#).is_err());
        assert!(Envelope::dekodieren(br#"{"eventName":42,"data":{}}"#).is_err());
        assert!(Envelope::dekodieren(b"[1,2,3]").is_err());
    }

    #[test]
    fn ungueltiges_utf8_ist_fehler() {
        let fehler = Envelope::dekodieren(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(fehler, DecodeError::KeinUtf8(_)));
    }

    #[test]
    fn kodieren_verwendet_camel_case() {
        let text = Envelope::neu("error", json!("x")).kodieren().unwrap();
        assert_eq!(text, r#"{"eventName":"error","data":"x"}"#);
    }
}
