//! WebRTC negotiation payload shapes
//!
//! The signaling core never inspects SDP or candidate contents; these
//! types exist so relayed payloads keep the browser `RTCSessionDescription`
//! and `RTCIceCandidate` field shapes through a decode/re-encode cycle.

use serde::{Deserialize, Serialize};

/// Session description kind, mirroring `RTCSdpType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

/// An SDP blob as the browser hands it over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// Description kind ("offer", "answer", "pranswer", "rollback")
    #[serde(rename = "type")]
    pub kind: SdpType,
    /// The SDP text; absent for rollback descriptions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp: Option<String>,
}

/// An ICE candidate as the browser hands it over
///
/// All fields are optional; an end-of-candidates marker is an empty
/// candidate object. The relay forwards whatever subset was present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_description_field_names() {
        let desc = SessionDescription {
            kind: SdpType::Offer,
            sdp: Some("v=0".to_string()),
        };
        let json = serde_json::to_value(&desc).unwrap();
        assert_eq!(json["type"], "offer");
        assert_eq!(json["sdp"], "v=0");
    }

    #[test]
    fn test_rollback_omits_sdp() {
        let desc = SessionDescription {
            kind: SdpType::Rollback,
            sdp: None,
        };
        let json = serde_json::to_string(&desc).unwrap();
        assert_eq!(json, r#"{"type":"rollback"}"#);
    }

    #[test]
    fn test_ice_candidate_camel_case() {
        let json = r#"{
            "candidate": "candidate:1 1 udp 2122260223 192.0.2.1 54400 typ host",
            "sdpMid": "0",
            "sdpMLineIndex": 0,
            "usernameFragment": "abcd"
        }"#;
        let cand: IceCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(cand.sdp_mid.as_deref(), Some("0"));
        assert_eq!(cand.sdp_m_line_index, Some(0));

        let back = serde_json::to_value(&cand).unwrap();
        assert!(back.get("sdpMLineIndex").is_some());
        assert!(back.get("usernameFragment").is_some());
    }

    #[test]
    fn test_ice_candidate_null_fields_accepted() {
        let json = r#"{"candidate":"","sdpMid":null,"sdpMLineIndex":null}"#;
        let cand: IceCandidate = serde_json::from_str(json).unwrap();
        assert!(cand.sdp_mid.is_none());
        assert!(cand.sdp_m_line_index.is_none());
    }
}
