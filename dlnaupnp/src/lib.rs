//! UPnP plumbing shared by the media server: device/SCPD description
//! rendering, SOAP envelope handling, and the SSDP discovery engine.

pub mod description;
pub mod soap;
pub mod ssdp;
