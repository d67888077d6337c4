// Copyright 2020 Joyent, Inc.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::thread;
use std::time::Duration;

use tether::endpoint::Endpoint;
use tether::timer::Timer;

#[test]
fn timer_tracks_remaining_time() {
    let timer = Timer::new(200);
    assert!(!timer.expired());
    assert!(timer.remaining() <= Duration::from_millis(200));

    thread::sleep(Duration::from_millis(250));
    assert!(timer.expired());
    assert_eq!(timer.remaining(), Duration::from_millis(0));
}

#[test]
fn timer_zero_wait_is_immediately_expired() {
    let timer = Timer::new(0);
    assert!(timer.expired());
    assert_eq!(timer.remaining(), Duration::from_millis(0));
}

#[test]
fn endpoint_formats_as_address_and_port() {
    let e = Endpoint::new(Ipv4Addr::new(10, 0, 0, 1), 8080);
    assert_eq!(format!("{}", e), "10.0.0.1:8080");
}

#[test]
fn endpoint_is_a_usable_map_key() {
    let mut map = HashMap::new();
    map.insert(Endpoint::new(Ipv4Addr::new(1, 2, 3, 4), 80), "a");
    map.insert(Endpoint::new(Ipv4Addr::new(1, 2, 3, 4), 81), "b");

    assert_eq!(
        map.get(&Endpoint::from((Ipv4Addr::new(1, 2, 3, 4), 80))),
        Some(&"a")
    );
    assert_eq!(map.len(), 2);

    // Same address and port always lands on the same entry.
    map.insert(Endpoint::new(Ipv4Addr::new(1, 2, 3, 4), 80), "c");
    assert_eq!(map.len(), 2);
}
