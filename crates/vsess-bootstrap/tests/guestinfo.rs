//! End-to-end preparation of guestinfo for a new machine.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use vsess_bootstrap::{
    BootstrapData, ExtraConfig, IGNITION_KEY, METADATA_KEY, NetworkDevice, USERDATA_KEY, encode,
    machine_metadata_ignition, parse_ignition,
};

const IGNITION: &str = r#"{"ignition":{"version":"2.3.0"},"systemd":{"units":[{"name":"kubelet.service","enabled":true}]}}"#;

#[test]
fn test_ignition_payload_reaches_guestinfo() {
    let device = NetworkDevice {
        ip_addrs: vec!["10.0.0.5/24".to_string()],
        gateway4: "10.0.0.1".to_string(),
        ..Default::default()
    };
    let prepared =
        machine_metadata_ignition(&BootstrapData::ignition(IGNITION), "cp-0", &[device]).unwrap();

    let mut config = ExtraConfig::new();
    config.set_user_data(&BootstrapData::ignition(prepared.clone()));

    let stored = config.get(IGNITION_KEY).unwrap();
    let decoded = STANDARD.decode(stored).unwrap();
    assert_eq!(decoded, prepared);

    let round_trip = parse_ignition(&decoded).unwrap();
    assert_eq!(round_trip.storage.files[0].contents.source, "data:,cp-0");
    assert!(round_trip.networkd.units[0].contents.contains("Address=10.0.0.5/24"));
    assert!(round_trip.other.contains_key("systemd"));
}

#[test]
fn test_pre_encoded_user_data_is_not_double_encoded() {
    let plain = "#cloud-config\nruncmd:\n  - echo hi\n";
    let pre_encoded = STANDARD.encode(plain);

    let mut from_plain = ExtraConfig::new();
    from_plain.set_user_data(&BootstrapData::cloud_config(plain));
    let mut from_encoded = ExtraConfig::new();
    from_encoded.set_user_data(&BootstrapData::cloud_config(pre_encoded.clone()));

    assert_eq!(from_plain.get(USERDATA_KEY), from_encoded.get(USERDATA_KEY));
    assert_eq!(from_plain.get(USERDATA_KEY), Some(pre_encoded.as_str()));
}

#[test]
fn test_empty_metadata_is_empty_value() {
    let mut config = ExtraConfig::new();
    config.set_metadata(b"");
    assert_eq!(config.get(METADATA_KEY), Some(""));
    assert_eq!(encode(b""), "");
}
