use super::*;

fn port(cell: &str, path: &str) -> Port {
    Port {
        cell_id: CellId::new(cell),
        label: cell.to_string(),
        port_topology_path: path.to_string(),
        usb_hint: None,
    }
}

#[test]
fn no_duplicates_returns_none() {
    let ports = vec![port("a", "p1"), port("b", "p2")];
    assert!(find_duplicate_topology_path(&ports).is_none());
}

#[test]
fn duplicate_topology_path_is_detected() {
    let ports = vec![port("a", "p1"), port("b", "p1")];
    assert_eq!(find_duplicate_topology_path(&ports), Some("p1"));
}
