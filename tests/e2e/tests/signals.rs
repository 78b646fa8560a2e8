//! Signal subscription and delivery over the loopback bus.

use anyhow::Result;
use bridge::{BusError, ConnectionConfig, MatchRule};
use bus_e2e_tests::loopback_connection;
use codec::mem::MemBody;
use types::ObjectPath;

fn changed(path: &str, value: u32) -> codec::Message {
    let signal = MemBody::signal(&ObjectPath::new(path), "org.example.Sensor", "Changed");
    signal.pack(&value).expect("pack signal argument");
    signal
}

#[tokio::test]
async fn subscriber_receives_matching_signals_in_order() -> Result<()> {
    let (bus, conn) = loopback_connection(ConnectionConfig::default());

    let rule = MatchRule::signal()
        .with_interface("org.example.Sensor")
        .with_member("Changed");
    let stream = conn.subscribe(rule.clone())?;
    assert!(bus.match_strings().contains(&rule.to_match_string()));

    bus.emit_signal(changed("/sensor/0", 1));
    bus.emit_signal(changed("/sensor/0", 2));

    let mut value = 0u32;
    stream.next().await?.unpack(&mut value)?;
    assert_eq!(value, 1);
    stream.next().await?.unpack(&mut value)?;
    assert_eq!(value, 2);
    Ok(())
}

#[tokio::test]
async fn non_matching_signals_are_filtered_out() -> Result<()> {
    let (bus, conn) = loopback_connection(ConnectionConfig::default());

    let stream = conn.subscribe(
        MatchRule::signal()
            .with_interface("org.example.Sensor")
            .with_member("Changed"),
    )?;

    let other = MemBody::signal(&ObjectPath::new("/sensor/0"), "org.example.Sensor", "Added");
    bus.emit_signal(other);
    bus.emit_signal(changed("/sensor/0", 9));

    // the first delivery is the matching one; the "Added" signal was dropped
    let first = stream.next().await?;
    assert_eq!(first.member().as_deref(), Some("Changed"));
    let mut value = 0u32;
    first.unpack(&mut value)?;
    assert_eq!(value, 9);
    Ok(())
}

#[tokio::test]
async fn path_scoped_subscription_only_sees_its_path() -> Result<()> {
    let (bus, conn) = loopback_connection(ConnectionConfig::default());

    let stream = conn.subscribe(MatchRule::signal().with_path("/sensor/1"))?;

    bus.emit_signal(changed("/sensor/0", 5));
    bus.emit_signal(changed("/sensor/1", 6));

    let delivered = stream.next().await?;
    assert_eq!(delivered.path().as_deref(), Some("/sensor/1"));
    Ok(())
}

#[tokio::test]
async fn two_subscribers_each_get_their_own_copy() -> Result<()> {
    let (bus, conn) = loopback_connection(ConnectionConfig::default());

    let rule = MatchRule::signal().with_interface("org.example.Sensor");
    let first = conn.subscribe(rule.clone())?;
    let second = conn.subscribe(rule)?;

    bus.emit_signal(changed("/sensor/0", 3));

    let mut value = 0u32;
    first.next().await?.unpack(&mut value)?;
    assert_eq!(value, 3);
    second.next().await?.unpack(&mut value)?;
    assert_eq!(value, 3);
    Ok(())
}

#[tokio::test]
async fn subscription_after_disconnect_is_rejected() {
    let (bus, conn) = loopback_connection(ConnectionConfig::default());
    bus.disconnect();

    match conn.subscribe(MatchRule::signal().with_member("Gone")) {
        Err(BusError::MatchFailed { rule, .. }) => assert!(rule.contains("member='Gone'")),
        Err(other) => panic!("unexpected error: {other:?}"),
        Ok(_) => panic!("subscription unexpectedly succeeded"),
    }
}

#[tokio::test]
async fn locally_sent_signals_loop_back_to_subscribers() -> Result<()> {
    let (_bus, conn) = loopback_connection(ConnectionConfig::default());

    let stream = conn.subscribe(MatchRule::signal().with_member("Ping"))?;

    let signal = MemBody::signal(&ObjectPath::new("/self"), "org.example.Self", "Ping");
    conn.send(&signal)?;

    let delivered = stream.next().await?;
    assert_eq!(delivered.member().as_deref(), Some("Ping"));
    Ok(())
}
