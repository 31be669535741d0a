use super::*;
use crate::ErrorKind;

#[test]
fn test_parse_host_and_port() {
    let hp: ServerHostAndPort = "h1:100".parse().unwrap();
    assert_eq!(hp.host(), "h1");
    assert_eq!(hp.port(), 100);
    assert_eq!(hp.to_string(), "h1:100");
}

#[test]
fn test_parse_ipv6_host_and_port() {
    let hp: ServerHostAndPort = "[::1]:19190".parse().unwrap();
    assert_eq!(hp.host(), "::1");
    assert_eq!(hp.port(), 19190);
    assert_eq!(hp.to_string(), "[::1]:19190");

    assert!("[]:19190".parse::<ServerHostAndPort>().is_err());
}

#[tokio::test]
async fn test_ipv6_host_is_connectable() {
    let listener = match tokio::net::TcpListener::bind("[::1]:0").await {
        Ok(listener) => listener,
        // IPv6 loopback not configured on this host
        Err(_) => return,
    };
    let port = listener.local_addr().unwrap().port();

    let hp: ServerHostAndPort = format!("[::1]:{port}").parse().unwrap();
    let stream = tokio::net::TcpStream::connect((hp.host(), hp.port())).await;
    assert!(stream.is_ok());
}

#[test]
fn test_parse_rejects_missing_port() {
    let e = "localhost".parse::<ServerHostAndPort>().unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Other);

    let e = "localhost:http".parse::<ServerHostAndPort>().unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Other);

    assert!(":9000".parse::<ServerHostAndPort>().is_err());
}

#[test]
fn test_same_server_ignores_location() {
    let a = ServerDetail::new("S1", "h1:100", Some("v1".to_string()));
    let b = ServerDetail::new("S1", "h2:100", Some("v1".to_string()));
    let c = ServerDetail::new("S2", "h1:100", Some("v1".to_string()));

    assert!(a.is_same_server(&b));
    assert!(!a.is_same_server(&c));
    assert_ne!(a, b);
}

#[test]
fn test_display_includes_every_field() {
    let detail = ServerDetail::new("S1", "h1:100", None);
    assert_eq!(
        detail.to_string(),
        "ServerDetail{serverId=S1, connectionString=h1:100, runningVersion=null}"
    );
    assert_eq!(detail.host_and_port().unwrap(), ServerHostAndPort::new("h1", 100));
}
