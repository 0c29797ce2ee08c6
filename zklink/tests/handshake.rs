mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;

use common::{SESSION_ID, Terminal, connect, options};
use zklink::{Command, DeviceId, DeviceRegistry, Error, SessionState};
use zklink_core::commkey_payload;

#[tokio::test]
async fn test_connect_without_password() {
    let registry = DeviceRegistry::new();
    let (device, mock) = connect(&registry, "lobby", Terminal::new(), options()).await;
    let device = device.unwrap();

    assert!(device.is_connected());
    assert!(!device.is_authenticated());
    assert_eq!(device.session_id(), SESSION_ID);
    assert_eq!(device.state(), SessionState::Connected);

    device.disable_device().await.unwrap();
    device.enable_device().await.unwrap();

    let received = mock.received();
    assert_eq!(received.len(), 3);

    assert_eq!(received[0].command, Command::Connect);
    assert_eq!(received[0].session_id, 0);
    assert_eq!(received[0].reply_id, 0);

    // Counter starts at 1 after an unauthenticated connect
    assert_eq!(received[1].command, Command::DisableDevice);
    assert_eq!(received[1].session_id, SESSION_ID);
    assert_eq!(received[1].reply_id, 1);
    assert_eq!(received[2].command, Command::EnableDevice);
    assert_eq!(received[2].reply_id, 2);

    registry.disconnect_all().await.unwrap();
}

#[tokio::test]
async fn test_connect_with_password() {
    let registry = DeviceRegistry::new();
    let terminal = Terminal::new().with_password(123456);
    let (device, mock) = connect(&registry, "office", terminal, options().with_password(123456)).await;
    let device = device.unwrap();

    assert!(device.is_connected());
    assert!(device.is_authenticated());

    device.enable_device().await.unwrap();

    let received = mock.received();
    assert_eq!(received[1].command, Command::Auth);
    assert_eq!(received[1].session_id, SESSION_ID);
    assert_eq!(received[1].reply_id, 1);
    assert_eq!(&received[1].data[..], &commkey_payload(123456, SESSION_ID, 50)[..]);

    // Counter jumps to 3 after CMD_AUTH
    assert_eq!(received[2].command, Command::EnableDevice);
    assert_eq!(received[2].reply_id, 3);

    registry.disconnect_all().await.unwrap();
}

#[tokio::test]
async fn test_wrong_password_fails() {
    let registry = DeviceRegistry::new();
    let terminal = Terminal::new().with_password(1);
    let (device, mock) = connect(&registry, "office", terminal, options().with_password(2)).await;

    assert!(matches!(device, Err(Error::AuthenticationFailed)));
    assert!(registry.is_empty());
    assert_eq!(mock.commands(), vec![u16::from(Command::Connect), u16::from(Command::Auth)]);
}

#[tokio::test]
async fn test_connect_rejected() {
    let registry = DeviceRegistry::new();
    let terminal = Terminal::new().rejecting(Command::Connect, Command::AckError);
    let (device, _mock) = connect(&registry, "lobby", terminal, options()).await;

    match device {
        Err(Error::Device { command, code }) => {
            assert_eq!(command, Command::Connect);
            assert_eq!(code, Command::AckError);
        }
        other => panic!("expected device error, got {:?}", other.map(|_| ())),
    }
    assert!(!registry.contains(&DeviceId::from("lobby")));
}

#[tokio::test]
async fn test_silent_device_times_out() {
    let registry = DeviceRegistry::new();
    let terminal = Terminal::new().silent_on(Command::Connect);
    let (device, _mock) = connect(&registry, "lobby", terminal, options()).await;

    let err = device.unwrap_err();
    assert!(matches!(err, Error::Timeout));
    assert!(err.is_recoverable());
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_disconnect_sends_exit() {
    let registry = DeviceRegistry::new();
    let (device, mock) = connect(&registry, "lobby", Terminal::new(), options()).await;
    let device = device.unwrap();

    registry.disconnect(device.id()).await.unwrap();

    assert!(!device.is_connected());
    assert_eq!(device.state(), SessionState::Disconnected);
    assert!(matches!(device.enable_device().await, Err(Error::ConnectionClosed)));

    let commands = mock.commands();
    assert_eq!(commands.last(), Some(&u16::from(Command::Exit)));

    // Second disconnect is a no-op
    device.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_disconnect_when_exit_goes_unanswered() {
    let registry = DeviceRegistry::new();
    let terminal = Terminal::new().silent_on(Command::Exit);
    let (device, _mock) = connect(&registry, "lobby", terminal, options()).await;
    let device = device.unwrap();

    device.disconnect().await.unwrap();
    assert_eq!(device.state(), SessionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_exit_without_reply_timeout() {
    let registry = DeviceRegistry::new();
    let terminal = Terminal::new().silent_on(Command::Exit);
    let (device, mock) = connect(
        &registry,
        "lobby",
        terminal,
        options().with_reply_timeout(None),
    )
    .await;
    let device = device.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(30), registry.disconnect(device.id())).await;
    assert!(result.is_ok(), "disconnect waited forever for CMD_EXIT");
    result.unwrap().unwrap();

    assert_eq!(device.state(), SessionState::Disconnected);
    assert!(registry.is_empty());
    assert_eq!(mock.commands().last(), Some(&u16::from(Command::Exit)));
}
