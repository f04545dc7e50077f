//! SOAP dispatch for `/ConnectionManager/control`, per §4.2's routing table.

use std::collections::HashMap;

use dlnaupnp::description::CONNECTION_MANAGER_SERVICE_TYPE;
use dlnaupnp::soap::{build_soap_fault, build_soap_response, parse_soap_action};

use crate::error::{DirectoryError, Result};

/// Static protocol-info tuples this server advertises as a `Source`, per §6.
const SOURCE_PROTOCOL_INFO: &str = concat!(
    "http-get:*:video/mp4:DLNA.ORG_PN=AVC_MP4_MP_SD_AAC_MULT5;DLNA.ORG_OP=01;",
    "DLNA.ORG_FLAGS=01700000000000000000000000000000,",
    "http-get:*:video/mp4:DLNA.ORG_PN=AVC_MP4_MP_HD_720p_AAC;DLNA.ORG_OP=01;",
    "DLNA.ORG_FLAGS=01700000000000000000000000000000,",
    "http-get:*:video/mp4:DLNA.ORG_PN=AVC_MP4_MP_HD_1080i_AAC;DLNA.ORG_OP=01;",
    "DLNA.ORG_FLAGS=01700000000000000000000000000000,",
    "http-get:*:video/x-matroska:*,",
    "http-get:*:video/avi:*,",
    "http-get:*:audio/mpeg:DLNA.ORG_PN=MP3;DLNA.ORG_OP=01;",
    "DLNA.ORG_FLAGS=01700000000000000000000000000000,",
    "http-get:*:audio/mp4:DLNA.ORG_PN=AAC_ISO_320;DLNA.ORG_OP=01;",
    "DLNA.ORG_FLAGS=01700000000000000000000000000000,",
    "http-get:*:audio/flac:*,",
    "http-get:*:image/jpeg:DLNA.ORG_PN=JPEG_SM;DLNA.ORG_OP=01;",
    "DLNA.ORG_FLAGS=00900000000000000000000000000000,",
    "http-get:*:image/jpeg:DLNA.ORG_PN=JPEG_MED;DLNA.ORG_OP=01;",
    "DLNA.ORG_FLAGS=00900000000000000000000000000000,",
    "http-get:*:image/jpeg:DLNA.ORG_PN=JPEG_LRG;DLNA.ORG_OP=01;",
    "DLNA.ORG_FLAGS=00900000000000000000000000000000",
);

/// Handles `GetProtocolInfo`, `GetCurrentConnectionIDs`, and
/// `GetCurrentConnectionInfo`. We are a MediaServer (a `Source` only), so the
/// device has exactly one static connection, `0`, which never tears down.
pub struct ConnectionManager;

impl ConnectionManager {
    pub fn new() -> Self {
        Self
    }

    pub fn handle_control(&self, body: &[u8]) -> String {
        match self.dispatch(body) {
            Ok(xml) => xml,
            Err(err) => {
                let (code, desc) = err.upnp_error();
                build_soap_fault("s:Client", "UPnPError", Some(code), Some(desc)).unwrap_or_default()
            }
        }
    }

    fn dispatch(&self, body: &[u8]) -> Result<String> {
        let action = parse_soap_action(body)?;
        match action.name.as_str() {
            "GetProtocolInfo" => Self::protocol_info(),
            "GetCurrentConnectionIDs" => Self::current_connection_ids(),
            "GetCurrentConnectionInfo" => Self::current_connection_info(),
            other => Err(DirectoryError::UnknownAction(other.to_string())),
        }
    }

    fn protocol_info() -> Result<String> {
        let mut values = HashMap::new();
        values.insert("Source".to_string(), SOURCE_PROTOCOL_INFO.to_string());
        values.insert("Sink".to_string(), String::new());
        build_soap_response(CONNECTION_MANAGER_SERVICE_TYPE, "GetProtocolInfo", values).map_err(DirectoryError::Render)
    }

    fn current_connection_ids() -> Result<String> {
        let mut values = HashMap::new();
        values.insert("ConnectionIDs".to_string(), "0".to_string());
        build_soap_response(CONNECTION_MANAGER_SERVICE_TYPE, "GetCurrentConnectionIDs", values).map_err(DirectoryError::Render)
    }

    fn current_connection_info() -> Result<String> {
        let mut values = HashMap::new();
        values.insert("RcsID".to_string(), "-1".to_string());
        values.insert("AVTransportID".to_string(), "-1".to_string());
        values.insert("ProtocolInfo".to_string(), String::new());
        values.insert("PeerConnectionManager".to_string(), String::new());
        values.insert("PeerConnectionID".to_string(), "-1".to_string());
        values.insert("Direction".to_string(), "Output".to_string());
        values.insert("Status".to_string(), "OK".to_string());
        build_soap_response(CONNECTION_MANAGER_SERVICE_TYPE, "GetCurrentConnectionInfo", values).map_err(DirectoryError::Render)
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soap_action(name: &str) -> Vec<u8> {
        format!(
            r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <u:{name} xmlns:u="urn:schemas-upnp-org:service:ConnectionManager:1"/>
  </s:Body>
</s:Envelope>"#
        )
        .into_bytes()
    }

    #[test]
    fn get_protocol_info_advertises_source_tuples() {
        let cm = ConnectionManager::new();
        let xml = cm.handle_control(&soap_action("GetProtocolInfo"));
        assert!(xml.contains("video/mp4"));
        assert!(xml.contains("audio/flac"));
    }

    #[test]
    fn get_current_connection_ids_is_always_zero() {
        let cm = ConnectionManager::new();
        let xml = cm.handle_control(&soap_action("GetCurrentConnectionIDs"));
        assert!(xml.contains("<ConnectionIDs>0</ConnectionIDs>"));
    }

    #[test]
    fn get_current_connection_info_reports_static_output_connection() {
        let cm = ConnectionManager::new();
        let xml = cm.handle_control(&soap_action("GetCurrentConnectionInfo"));
        assert!(xml.contains("<Direction>Output</Direction>"));
        assert!(xml.contains("<Status>OK</Status>"));
    }

    #[test]
    fn unknown_action_is_a_fault() {
        let cm = ConnectionManager::new();
        let xml = cm.handle_control(&soap_action("SetCurrentConnection"));
        assert!(xml.contains("<errorCode>401</errorCode>"));
    }
}
