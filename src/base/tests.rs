use crate::base::neterror::NetError;
use std::io;

#[test]
fn test_net_error_roundtrip() {
    let original = NetError::SocketNotConnected;
    let code = original.as_i32();
    assert_eq!(code, -112);
    let converted = NetError::from(code);
    assert!(matches!(converted, NetError::SocketNotConnected));

    let ws = NetError::WsProtocolError;
    assert_eq!(NetError::from(ws.as_i32()), ws);
}

#[test]
fn test_unknown_error() {
    let err = NetError::from(-9999);
    assert!(matches!(err, NetError::Unknown(-9999)));
    assert_eq!(err.as_i32(), -9999);
}

#[test]
fn test_io_error_roundtrip() {
    // A NetError passed through io::Error comes back intact
    let io_err: io::Error = NetError::TunnelConnectionFailed.into();
    assert_eq!(io_err.kind(), io::ErrorKind::Other);
    assert_eq!(NetError::from(io_err), NetError::TunnelConnectionFailed);

    let io_err: io::Error = NetError::SocketNotConnected.into();
    assert_eq!(io_err.kind(), io::ErrorKind::NotConnected);
}

#[test]
fn test_io_error_by_kind() {
    let err = io::Error::new(io::ErrorKind::ConnectionReset, "rst");
    assert_eq!(NetError::from(err), NetError::ConnectionReset);

    let err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
    assert_eq!(NetError::from(err), NetError::ConnectionClosed);
}
