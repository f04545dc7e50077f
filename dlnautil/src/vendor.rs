//! Coarse device-vendor classification shared by SSDP response shaping,
//! DIDL-Lite rendering, and the stream proxy's URL hints. All three look at
//! the same handful of user-agent substrings, so the classification lives
//! here once instead of being reimplemented per crate.

/// A coarse vendor bucket inferred from a renderer's `USER-AGENT` (or, for
/// VLC, simply that it announces itself as VLC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    Samsung,
    Lg,
    Xbox,
    Vlc,
    Other,
}

/// Classifies a user-agent string. Case-insensitive substring match, first
/// hit wins; unmatched strings are [`Vendor::Other`].
pub fn classify(user_agent: &str) -> Vendor {
    let ua = user_agent.to_ascii_lowercase();
    if ua.contains("samsung") || ua.contains("tizen") {
        Vendor::Samsung
    } else if ua.contains("lg") || ua.contains("webos") {
        Vendor::Lg
    } else if ua.contains("xbox") {
        Vendor::Xbox
    } else if ua.contains("vlc") {
        Vendor::Vlc
    } else {
        Vendor::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_vendors() {
        assert_eq!(classify("SEC_HHP_[TV] Samsung Q80"), Vendor::Samsung);
        assert_eq!(classify("Linux/3.14 UPnP/1.0 LGE WebOSTV"), Vendor::Lg);
        assert_eq!(classify("Xbox/10.0 UPnP/1.0"), Vendor::Xbox);
        assert_eq!(classify("VLC/3.0.18 LibVLC/3.0.18"), Vendor::Vlc);
        assert_eq!(classify("Kodi/20.0"), Vendor::Other);
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(classify("SAMSUNG"), Vendor::Samsung);
        assert_eq!(classify("samsung"), Vendor::Samsung);
    }
}
