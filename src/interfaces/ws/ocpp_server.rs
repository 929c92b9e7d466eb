//! OCPP 1.6 WebSocket server
//!
//! Accepts station connections at `ws://<host>:<port>/ocpp16/{station_code}`
//! (also `/ocpp/{code}` and `/{code}`).

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::application::handlers::{GatewayServices, OcppHandler};
use crate::application::session::{Outbound, SharedSessionRegistry};
use crate::shared::ShutdownSignal;

/// OCPP 1.6 WebSocket subprotocol
const OCPP_SUBPROTOCOL: &str = "ocpp1.6";

/// Path prefixes a station code may follow
const PATH_PREFIXES: [&str; 2] = ["ocpp16/", "ocpp/"];

/// OCPP WebSocket Server
pub struct OcppServer {
    sessions: SharedSessionRegistry,
    services: Arc<GatewayServices>,
    shutdown: ShutdownSignal,
}

impl OcppServer {
    pub fn new(
        sessions: SharedSessionRegistry,
        services: Arc<GatewayServices>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            sessions,
            services,
            shutdown,
        }
    }

    pub async fn bind(addr: &str) -> io::Result<TcpListener> {
        let listener = TcpListener::bind(addr).await?;
        info!(
            "OCPP 1.6 gateway listening on ws://{}/ocpp16/{{station_code}}",
            listener.local_addr()?
        );
        Ok(listener)
    }

    /// Accept connections until shutdown.
    pub async fn serve(self, listener: TcpListener) {
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.spawn_connection(stream, addr),
                        Err(e) => error!(error = %e, "Failed to accept connection"),
                    }
                }
                _ = self.shutdown.wait() => {
                    info!(
                        connected = self.sessions.count(),
                        "WebSocket server received shutdown signal"
                    );
                    break;
                }
            }
        }
    }

    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let sessions = self.sessions.clone();
        let services = self.services.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, addr, sessions, services, shutdown).await {
                debug!(remote_addr = %addr, error = %e, "Connection ended with error");
            }
        });
    }
}

/// Station code from the request path, if there is one.
pub fn extract_station_code(path: &str) -> Option<String> {
    let path = path.trim_matches('/');

    let code = PATH_PREFIXES
        .iter()
        .find_map(|prefix| path.strip_prefix(prefix))
        .unwrap_or(path)
        .trim_matches('/');

    let bare_prefix = PATH_PREFIXES
        .iter()
        .any(|prefix| prefix.trim_end_matches('/') == code);
    if code.is_empty() || code.contains('/') || bare_prefix {
        return None;
    }
    Some(code.to_string())
}

fn not_found() -> ErrorResponse {
    let mut response = ErrorResponse::new(Some("Station code required".to_string()));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

/// Handle a single WebSocket connection
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    sessions: SharedSessionRegistry,
    services: Arc<GatewayServices>,
    shutdown: ShutdownSignal,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let mut station_code: Option<String> = None;

    let ws_stream = tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &Request, mut response: Response| {
            let path = req.uri().path();
            debug!(remote_addr = %addr, path, "WebSocket handshake");

            let Some(code) = extract_station_code(path) else {
                warn!(remote_addr = %addr, path, "Handshake without station code");
                return Err(not_found());
            };

            let offers_ocpp16 = req
                .headers()
                .get_all("Sec-WebSocket-Protocol")
                .iter()
                .filter_map(|v| v.to_str().ok())
                .flat_map(|v| v.split(','))
                .any(|p| p.trim() == OCPP_SUBPROTOCOL);

            if offers_ocpp16 {
                response.headers_mut().insert(
                    "Sec-WebSocket-Protocol",
                    HeaderValue::from_static(OCPP_SUBPROTOCOL),
                );
            }

            station_code = Some(code);
            Ok(response)
        },
    )
    .await?;

    let Some(station_code) = station_code else {
        return Ok(());
    };
    let code = station_code.as_str();

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

    let registration = sessions.attach(code, tx.clone(), Some(addr.to_string()));
    let connection_id = registration.connection_id;
    if let Err(e) = services
        .stations
        .on_connected(code, Some(addr.to_string()), registration.evicted.is_some())
        .await
    {
        error!(station_code = code, error = %e, "Failed to record connection");
    }

    info!(station_code = code, remote_addr = %addr, connection_id, "Station connected");

    // Writer: drains the outbound channel into the socket
    let writer_code = station_code.clone();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            match outbound {
                Outbound::Frame(text) => {
                    debug!(
                        station_code = writer_code.as_str(),
                        frame = text.as_str(),
                        "Sending frame"
                    );
                    if let Err(e) = ws_sender.send(Message::Text(text)).await {
                        warn!(station_code = writer_code.as_str(), error = %e, "Send failed");
                        break;
                    }
                }
                Outbound::Close => {
                    let _ = ws_sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
        let _ = ws_sender.close().await;
    });

    // Reader: frames are handled strictly in order
    let handler = OcppHandler::new(code, services.clone());
    let mut reason: Option<String> = None;

    loop {
        tokio::select! {
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        sessions.touch(code, connection_id, Utc::now());
                        if let Some(reply) = handler.handle(&text).await {
                            if tx.send(Outbound::Frame(reply)).is_err() {
                                reason = Some("writer closed".into());
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        warn!(station_code = code, bytes = data.len(), "Binary frame ignored");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        reason = frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty());
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        reason = Some(e.to_string());
                        break;
                    }
                    None => break,
                }
            }
            _ = shutdown.wait() => {
                reason = Some("server shutdown".into());
                break;
            }
        }
    }

    let _ = tx.send(Outbound::Close);
    drop(tx);

    // Only the registered connection reports the station as gone
    if sessions.detach(code, connection_id) {
        let failed = services.commands.cleanup_station(code);
        if failed > 0 {
            info!(station_code = code, failed, "Failed pending commands on disconnect");
        }
        if let Err(e) = services.stations.on_disconnected(code, reason.clone()).await {
            error!(station_code = code, error = %e, "Failed to record disconnect");
        }
    }

    let _ = writer.await;
    info!(station_code = code, connection_id, reason = ?reason, "Station disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{gateway, memory_db, seed_station, station_status};
    use futures_util::Stream;
    use serde_json::Value;
    use std::time::Duration;
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;
    use tokio_tungstenite::{connect_async, tungstenite};

    #[test]
    fn extracts_station_code_from_path() {
        assert_eq!(extract_station_code("/ocpp16/ST-001"), Some("ST-001".into()));
        assert_eq!(extract_station_code("/ocpp/ST-001"), Some("ST-001".into()));
        assert_eq!(extract_station_code("/ST-001"), Some("ST-001".into()));
        assert_eq!(extract_station_code("/ocpp16/ST-001/"), Some("ST-001".into()));
        assert_eq!(extract_station_code("/ocpp16/"), None);
        assert_eq!(extract_station_code("/ocpp16"), None);
        assert_eq!(extract_station_code("/"), None);
        assert_eq!(extract_station_code("/a/b/c"), None);
    }

    async fn start_server() -> (
        SocketAddr,
        sea_orm::DatabaseConnection,
        SharedSessionRegistry,
        ShutdownSignal,
    ) {
        let db = memory_db().await;
        seed_station(&db, "ST-001").await;
        let gw = gateway(&db);
        let shutdown = ShutdownSignal::new();

        let listener = OcppServer::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = OcppServer::new(gw.sessions.clone(), gw.services, shutdown.clone());
        tokio::spawn(server.serve(listener));

        (addr, db, gw.sessions, shutdown)
    }

    async fn wait_until(mut check: impl FnMut() -> bool) {
        for _ in 0..100 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    async fn next_reply<S>(ws: &mut S) -> Value
    where
        S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    {
        loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => return serde_json::from_str(&text).unwrap(),
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn serves_frames_and_echoes_subprotocol() {
        let (addr, db, sessions, shutdown) = start_server().await;

        let mut request = format!("ws://{addr}/ocpp16/ST-001").into_client_request().unwrap();
        request
            .headers_mut()
            .insert("Sec-WebSocket-Protocol", HeaderValue::from_static("ocpp1.6"));
        let (mut ws, response) = connect_async(request).await.unwrap();
        assert_eq!(
            response.headers().get("Sec-WebSocket-Protocol").unwrap(),
            "ocpp1.6"
        );

        ws.send(Message::Text(r#"[2,"hb-1","Heartbeat",{}]"#.into()))
            .await
            .unwrap();
        let reply = next_reply(&mut ws).await;
        assert_eq!(reply[0], 3);
        assert_eq!(reply[1], "hb-1");
        assert!(sessions.is_connected("ST-001"));

        ws.send(Message::Text(
            r#"[2,"sn-1","StatusNotification",{"connectorId":1,"errorCode":"NoError","status":"Available"}]"#.into(),
        ))
        .await
        .unwrap();
        assert_eq!(next_reply(&mut ws).await[1], "sn-1");
        assert_eq!(station_status(&db, "ST-001").await, "available");

        ws.close(None).await.unwrap();
        wait_until(|| !sessions.is_connected("ST-001")).await;
        // The offline write lands right after the registry entry goes away
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(station_status(&db, "ST-001").await, "offline");

        shutdown.trigger();
    }

    #[tokio::test]
    async fn handshake_without_code_is_rejected() {
        let (addr, _db, _sessions, shutdown) = start_server().await;

        let err = connect_async(format!("ws://{addr}/ocpp16/")).await.unwrap_err();
        match err {
            tungstenite::Error::Http(response) => {
                assert_eq!(response.status(), StatusCode::NOT_FOUND)
            }
            other => panic!("expected HTTP 404, got {other:?}"),
        }

        shutdown.trigger();
    }

    #[tokio::test]
    async fn second_connection_replaces_first() {
        let (addr, _db, sessions, shutdown) = start_server().await;
        let url = format!("ws://{addr}/ST-001");

        let (mut first, _) = connect_async(url.as_str()).await.unwrap();
        wait_until(|| sessions.is_connected("ST-001")).await;
        let first_id = sessions.connection_id("ST-001").unwrap();

        let (_second, _) = connect_async(url.as_str()).await.unwrap();
        wait_until(|| sessions.connection_id("ST-001") != Some(first_id)).await;

        // The old socket receives a close frame
        let closed = loop {
            match first.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break true,
                Some(Ok(_)) => continue,
            }
        };
        assert!(closed);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sessions.is_connected("ST-001"));
        assert_eq!(sessions.count(), 1);

        shutdown.trigger();
    }
}
