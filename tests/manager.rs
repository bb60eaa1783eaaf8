//! Manager lifecycle and command execution tests.
//!
//! A minimal in-process RESP stub stands in for the server, so the tests
//! exercise real pooled connections without an external Redis.

use std::net::SocketAddr;

use skylands_redis::{Credentials, Error, FailurePolicy, RedisManager, State};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Starts a stub that answers PING with PONG and everything else with OK.
async fn spawn_stub() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(serve(socket));
        }
    });
    addr
}

async fn serve(mut socket: TcpStream) {
    let mut buf = [0u8; 512];
    loop {
        let n = match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        let request = String::from_utf8_lossy(&buf[..n]).to_ascii_uppercase();
        let reply: &[u8] = if request.contains("PING") {
            b"+PONG\r\n"
        } else if request.contains("HELLO") {
            b"-ERR unknown command 'HELLO'\r\n"
        } else {
            b"+OK\r\n"
        };
        if socket.write_all(reply).await.is_err() {
            return;
        }
    }
}

fn stub_credentials(addr: SocketAddr) -> Credentials {
    Credentials::new(addr.ip().to_string(), addr.port(), None, "stub-secret")
}

/// A port with nothing listening on it.
async fn unreachable_credentials() -> Credentials {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    Credentials::new("127.0.0.1", port, None, "stub-secret")
}

#[tokio::test]
async fn connect_probes_and_becomes_ready() {
    let addr = spawn_stub().await;
    let manager = RedisManager::connect(stub_credentials(addr)).await.unwrap();

    assert_eq!(manager.state(), State::Ready);
    assert!(manager.is_ready());
    manager.shutdown();
}

#[tokio::test]
async fn execute_returns_command_result() {
    let addr = spawn_stub().await;
    let manager = RedisManager::connect(stub_credentials(addr)).await.unwrap();

    let reply = manager
        .execute(|mut conn| async move {
            let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(reply)
        })
        .await
        .unwrap();

    assert_eq!(reply.as_deref(), Some("PONG"));
    manager.shutdown();
}

#[tokio::test]
async fn execute_after_shutdown_returns_none() {
    let addr = spawn_stub().await;
    let manager = RedisManager::connect(stub_credentials(addr)).await.unwrap();

    manager.shutdown();
    assert_eq!(manager.state(), State::Closed);

    let result = manager
        .execute(|mut conn| async move {
            let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(reply)
        })
        .await
        .unwrap();
    assert!(result.is_none());

    // Repeated shutdown is a no-op.
    manager.shutdown();
    assert_eq!(manager.state(), State::Closed);
}

#[tokio::test(flavor = "multi_thread")]
async fn submit_fanout_resolves_every_value() {
    let addr = spawn_stub().await;
    let manager = RedisManager::builder()
        .max_inflight(8)
        .pool_size(8)
        .connect(stub_credentials(addr))
        .await
        .unwrap();

    let pending: Vec<_> = (0..32)
        .map(|i: i64| {
            manager.submit(move |mut conn| async move {
                let _: String = redis::cmd("PING").query_async(&mut conn).await?;
                Ok(i)
            })
        })
        .collect();

    let mut resolved = Vec::new();
    for future in pending {
        resolved.push(future.await.unwrap().unwrap());
    }
    resolved.sort_unstable();

    let expected: Vec<i64> = (0..32).collect();
    assert_eq!(resolved, expected);
    manager.shutdown();
}

#[tokio::test]
async fn submit_after_shutdown_resolves_none() {
    let addr = spawn_stub().await;
    let manager = RedisManager::connect(stub_credentials(addr)).await.unwrap();
    manager.shutdown();

    let result = manager
        .submit(|mut conn| async move {
            let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(reply)
        })
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn strict_connect_to_unreachable_server_errors() {
    let creds = unreachable_credentials().await;
    let result = RedisManager::connect(creds).await;
    assert!(matches!(result, Err(Error::Checkout(_))));
}

#[tokio::test]
async fn lenient_connect_to_unreachable_server_disables_manager() {
    let creds = unreachable_credentials().await;
    let manager = RedisManager::builder()
        .failure_policy(FailurePolicy::Lenient)
        .connect(creds)
        .await
        .unwrap();

    assert_eq!(manager.state(), State::Disabled);
    assert!(!manager.is_ready());

    let result = manager
        .execute(|mut conn| async move {
            let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(reply)
        })
        .await
        .unwrap();
    assert!(result.is_none());

    // Shutdown never ran a pool close for a disabled manager; the state
    // stays Disabled rather than moving to Closed.
    manager.shutdown();
    assert_eq!(manager.state(), State::Disabled);
}
