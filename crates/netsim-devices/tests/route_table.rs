use core::net::Ipv4Addr;

use netsim_devices::{Route, RouteTable};

fn route(dest: [u8; 4], mask: [u8; 4], gw: [u8; 4], iface: usize) -> Route {
    Route {
        dest: Ipv4Addr::from(dest),
        mask: Ipv4Addr::from(mask),
        gateway: Ipv4Addr::from(gw),
        iface,
    }
}

#[test]
fn the_longest_matching_prefix_wins() {
    let mut table = RouteTable::default();
    table.add(route([10, 0, 0, 0], [255, 0, 0, 0], [10, 0, 0, 254], 1));
    table.add(route([10, 1, 0, 0], [255, 255, 0, 0], [10, 1, 0, 254], 2));

    let chosen = table.lookup(Ipv4Addr::new(10, 1, 2, 3)).unwrap();
    assert_eq!(chosen.iface, 2);

    let fallback = table.lookup(Ipv4Addr::new(10, 2, 2, 3)).unwrap();
    assert_eq!(fallback.iface, 1);

    assert!(table.lookup(Ipv4Addr::new(192, 168, 0, 1)).is_none());
}

#[test]
fn lookup_is_independent_of_insertion_order() {
    let broad = route([10, 0, 0, 0], [255, 0, 0, 0], [10, 0, 0, 254], 1);
    let narrow = route([10, 1, 0, 0], [255, 255, 0, 0], [10, 1, 0, 254], 2);

    let mut forward = RouteTable::default();
    forward.add(broad);
    forward.add(narrow);

    let mut backward = RouteTable::default();
    backward.add(narrow);
    backward.add(broad);

    let ip = Ipv4Addr::new(10, 1, 2, 3);
    assert_eq!(forward.lookup(ip).unwrap().iface, 2);
    assert_eq!(backward.lookup(ip).unwrap().iface, 2);
}

#[test]
fn adding_an_existing_prefix_replaces_it() {
    let mut table = RouteTable::default();
    table.add(route([10, 0, 0, 0], [255, 0, 0, 0], [10, 0, 0, 254], 1));
    table.add(route([10, 0, 0, 0], [255, 0, 0, 0], [10, 0, 0, 1], 3));

    assert_eq!(table.routes().len(), 1);
    let chosen = table.lookup(Ipv4Addr::new(10, 9, 9, 9)).unwrap();
    assert_eq!(chosen.iface, 3);
    assert_eq!(chosen.gateway, Ipv4Addr::new(10, 0, 0, 1));
}

#[test]
fn remove_and_reset_shrink_the_table() {
    let broad = route([10, 0, 0, 0], [255, 0, 0, 0], [10, 0, 0, 254], 1);
    let narrow = route([10, 1, 0, 0], [255, 255, 0, 0], [10, 1, 0, 254], 2);

    let mut table = RouteTable::default();
    table.add(broad);
    table.add(narrow);

    table.remove(&narrow);
    assert_eq!(table.lookup(Ipv4Addr::new(10, 1, 2, 3)).unwrap().iface, 1);

    table.reset();
    assert!(table.routes().is_empty());
    assert!(table.lookup(Ipv4Addr::new(10, 1, 2, 3)).is_none());
}

#[test]
fn a_default_route_matches_everything_last() {
    let mut table = RouteTable::default();
    table.add(route([0, 0, 0, 0], [0, 0, 0, 0], [10, 0, 0, 254], 1));
    table.add(route([10, 1, 0, 0], [255, 255, 0, 0], [10, 1, 0, 254], 2));

    assert_eq!(table.lookup(Ipv4Addr::new(10, 1, 2, 3)).unwrap().iface, 2);
    assert_eq!(table.lookup(Ipv4Addr::new(8, 8, 8, 8)).unwrap().iface, 1);
}
