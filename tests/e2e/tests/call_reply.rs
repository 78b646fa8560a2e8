//! Method call round trips over the loopback bus: echo replies, error
//! replies, missing methods, reply timeouts, and concurrent in-flight
//! calls routed back by serial.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Result;
use bridge::{BusError, CallError, ConnectionConfig};
use bus_e2e_tests::loopback_connection;
use codec::mem::MemBody;
use types::Endpoint;

fn echo_endpoint() -> Endpoint {
    Endpoint::new("org.example.Echo", "/org/example/Echo", "org.example.Echo")
}

#[tokio::test]
async fn echo_call_returns_the_argument() -> Result<()> {
    let (bus, conn) = loopback_connection(ConnectionConfig::default());
    bus.respond_to("org.example.Echo", "Echo", |call| {
        let mut text = String::new();
        call.unpack(&mut text)?;
        let reply = MemBody::method_return(call);
        reply.pack(text.as_str())?;
        Ok(Some(reply))
    });

    let call = conn.new_method_call(&echo_endpoint(), "Echo");
    call.pack("hello, bus")?;

    let reply = conn.method_call(&call).await?;
    let mut echoed = String::new();
    reply.unpack(&mut echoed)?;
    assert_eq!(echoed, "hello, bus");
    Ok(())
}

#[tokio::test]
async fn container_arguments_survive_the_round_trip() -> Result<()> {
    let (bus, conn) = loopback_connection(ConnectionConfig::default());
    bus.respond_to("org.example.Echo", "Sum", |call| {
        let mut values: Vec<u32> = Vec::new();
        let mut weights: BTreeMap<String, i32> = BTreeMap::new();
        call.unpacker().arg(&mut values)?.arg(&mut weights)?;
        let total: u32 = values.iter().sum();
        let reply = MemBody::method_return(call);
        reply
            .packer()?
            .arg(&total)?
            .arg(&(weights.len() as u32))?;
        Ok(Some(reply))
    });

    let call = conn.new_method_call(&echo_endpoint(), "Sum");
    let weights: BTreeMap<String, i32> = [("a".to_owned(), 1), ("b".to_owned(), 2)].into();
    call.packer()?.arg(&vec![1u32, 2, 3])?.arg(&weights)?;

    let reply = conn.method_call(&call).await?;
    let (mut total, mut entries) = (0u32, 0u32);
    reply.unpacker().arg(&mut total)?.arg(&mut entries)?;
    assert_eq!(total, 6);
    assert_eq!(entries, 2);
    Ok(())
}

#[tokio::test]
async fn error_reply_resolves_as_call_error() -> Result<()> {
    let (bus, conn) = loopback_connection(ConnectionConfig::default());
    bus.respond_to("org.example.Echo", "Denied", |call| {
        Ok(Some(MemBody::error_reply(
            call,
            "org.example.Error.Denied",
            "not allowed",
        )?))
    });

    let call = conn.new_method_call(&echo_endpoint(), "Denied");
    match conn.method_call(&call).await {
        Err(CallError::ErrorReply { name, message }) => {
            assert_eq!(name, "org.example.Error.Denied");
            assert_eq!(message, "not allowed");
        }
        other => panic!("expected error reply, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn unknown_method_yields_the_standard_error_name() {
    let (_bus, conn) = loopback_connection(ConnectionConfig::default());

    let call = conn.new_method_call(&echo_endpoint(), "NoSuchMethod");
    match conn.method_call(&call).await {
        Err(CallError::ErrorReply { name, .. }) => {
            assert_eq!(name, "org.freedesktop.DBus.Error.UnknownMethod");
        }
        other => panic!("expected unknown-method error, got {other:?}"),
    }
}

#[tokio::test]
async fn responder_failure_becomes_a_failed_error_reply() {
    let (bus, conn) = loopback_connection(ConnectionConfig::default());
    bus.respond_to("org.example.Echo", "Strict", |call| {
        // demands a string argument the caller never packed
        let mut text = String::new();
        call.unpack(&mut text)?;
        Ok(Some(MemBody::method_return(call)))
    });

    let call = conn.new_method_call(&echo_endpoint(), "Strict");
    match conn.method_call(&call).await {
        Err(CallError::ErrorReply { name, .. }) => {
            assert_eq!(name, "org.freedesktop.DBus.Error.Failed");
        }
        other => panic!("expected failed error, got {other:?}"),
    }
}

#[tokio::test]
async fn swallowed_call_times_out() {
    let config = ConnectionConfig {
        reply_timeout: Duration::from_millis(50),
    };
    let (bus, conn) = loopback_connection(config);
    bus.respond_to("org.example.Echo", "Void", |_| Ok(None));

    let call = conn.new_method_call(&echo_endpoint(), "Void");
    match conn.method_call(&call).await {
        Err(CallError::ReplyTimeout(window)) => {
            assert_eq!(window, Duration::from_millis(50));
        }
        other => panic!("expected reply timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn calls_after_disconnect_fail_fast() {
    let (bus, conn) = loopback_connection(ConnectionConfig::default());
    bus.disconnect();

    let call = conn.new_method_call(&echo_endpoint(), "Echo");
    match conn.method_call(&call).await {
        Err(CallError::Bus(BusError::Disconnected)) => {}
        other => panic!("expected disconnected error, got {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_calls_route_replies_by_serial() -> Result<()> {
    let (bus, conn) = loopback_connection(ConnectionConfig::default());
    bus.respond_to("org.example.Echo", "Double", |call| {
        let mut n = 0u32;
        call.unpack(&mut n)?;
        let reply = MemBody::method_return(call);
        reply.pack(&(n * 2))?;
        Ok(Some(reply))
    });

    let first = conn.new_method_call(&echo_endpoint(), "Double");
    first.pack(&21u32)?;
    let second = conn.new_method_call(&echo_endpoint(), "Double");
    second.pack(&100u32)?;

    let (a, b) = futures::join!(conn.method_call(&first), conn.method_call(&second));

    let mut out = 0u32;
    a?.unpack(&mut out)?;
    assert_eq!(out, 42);
    b?.unpack(&mut out)?;
    assert_eq!(out, 200);
    Ok(())
}
