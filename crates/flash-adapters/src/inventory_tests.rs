use super::*;

#[test]
fn lsblk_device_is_mounted_checks_self_and_children() {
    let leaf = LsblkDevice {
        name: "sdb1".into(),
        size: 100,
        model: None,
        serial: None,
        rm: true,
        mountpoint: Some("/mnt/usb".into()),
        mountpoints: vec![],
        children: vec![],
    };
    assert!(leaf.is_mounted());

    let parent = LsblkDevice {
        name: "sdb".into(),
        size: 200,
        model: None,
        serial: None,
        rm: true,
        mountpoint: None,
        mountpoints: vec![],
        children: vec![leaf],
    };
    assert!(parent.is_mounted());
}

#[test]
fn lsblk_device_unmounted_when_no_mountpoints_anywhere() {
    let dev = LsblkDevice {
        name: "sdc".into(),
        size: 200,
        model: None,
        serial: None,
        rm: true,
        mountpoint: None,
        mountpoints: vec![None],
        children: vec![],
    };
    assert!(!dev.is_mounted());
}

#[test]
fn lsblk_output_parses_real_shaped_json() {
    let raw = r#"{
        "blockdevices": [
            {
                "name": "sdb",
                "size": 16000000000,
                "model": "Cruzer",
                "serial": "abc123",
                "rm": true,
                "mountpoint": null,
                "mountpoints": [null],
                "children": [
                    {
                        "name": "sdb1",
                        "size": 15999000000,
                        "model": null,
                        "serial": null,
                        "rm": true,
                        "mountpoint": "/mnt/usb",
                        "mountpoints": ["/mnt/usb"],
                        "children": []
                    }
                ]
            }
        ]
    }"#;
    let parsed: LsblkOutput = serde_json::from_str(raw).unwrap();
    assert_eq!(parsed.blockdevices.len(), 1);
    assert!(parsed.blockdevices[0].is_mounted());
}

#[cfg(feature = "test-support")]
mod fake_inventory {
    use super::fake::FakeInventory;
    use super::*;

    fn port(cell: &str, topology: &str) -> Port {
        Port {
            cell_id: flash_core::port::CellId::new(cell),
            label: cell.to_string(),
            port_topology_path: topology.to_string(),
            usb_hint: None,
        }
    }

    fn drive(by_path: &str) -> Drive {
        Drive {
            device_path: "/dev/sdb".into(),
            by_path: Some(by_path.to_string()),
            size_bytes: 16_000_000_000,
            model: Some("Cruzer".into()),
            serial: Some("abc123".into()),
            removable: true,
            is_system: false,
            mounted: false,
            usb_speed: UsbSpeed::Usb3_0,
        }
    }

    #[tokio::test]
    async fn bind_ports_matches_by_topology_path() {
        let inventory = FakeInventory::new(vec![drive("pci-0000:00:14.0-usb-0:1:1.0")]);
        let ports = vec![port("cell-a", "pci-0000:00:14.0-usb-0:1:1.0"), port("cell-b", "pci-0000:00:14.0-usb-0:2:1.0")];
        let bindings = inventory.bind_ports(&ports).await.unwrap();
        assert!(bindings[0].drive.is_some());
        assert!(bindings[1].drive.is_none());
    }
}
