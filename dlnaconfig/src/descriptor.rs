use uuid::Uuid;

/// Namespace used to derive a device UUID from host identity + server name.
/// Arbitrary but fixed, so the derived UUID is stable across restarts and
/// across machines running under the same identity.
const DEVICE_UUID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6f, 0x2a, 0x11, 0xd4, 0x5e, 0x90, 0x4e, 0x63, 0x9a, 0x7b, 0x1c, 0x4d, 0x8e, 0x02, 0xaf, 0x31,
]);

/// Process-wide, immutable device identity. Built once at startup from
/// configuration and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    pub friendly_name: String,
    pub manufacturer: String,
    pub model_name: String,
    pub model_number: String,
    pub uuid: Uuid,
    pub http_port: u16,
}

impl DeviceDescriptor {
    /// Derives a UUID deterministically from `host_identity` and
    /// `server_name` so it survives process restarts without being
    /// persisted anywhere.
    pub fn derive_uuid(host_identity: &str, server_name: &str) -> Uuid {
        let seed = format!("{host_identity}\0{server_name}");
        Uuid::new_v5(&DEVICE_UUID_NAMESPACE, seed.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_uuid_is_stable() {
        let a = DeviceDescriptor::derive_uuid("host-a", "dlnaserver");
        let b = DeviceDescriptor::derive_uuid("host-a", "dlnaserver");
        assert_eq!(a, b);
    }

    #[test]
    fn derive_uuid_differs_by_identity() {
        let a = DeviceDescriptor::derive_uuid("host-a", "dlnaserver");
        let b = DeviceDescriptor::derive_uuid("host-b", "dlnaserver");
        assert_ne!(a, b);
    }

    #[test]
    fn derive_uuid_differs_by_server_name() {
        let a = DeviceDescriptor::derive_uuid("host-a", "dlnaserver-1");
        let b = DeviceDescriptor::derive_uuid("host-a", "dlnaserver-2");
        assert_ne!(a, b);
    }
}
