//! 连接生命周期管理
//!
//! 负责处理客户端连接，包括：
//! - 监听 TCP 连接
//! - 握手认证（首帧必须是携带 JWT 的 auth 消息）
//! - 按角色加入订阅主题
//! - 出站消息按主题过滤转发
//!
//! 内存传输的内嵌客户端（测试/同进程）走 [`Notifier::connect_local`]，
//! 与 TCP 客户端完全相同的路径。

use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::notifier::{ConnectionInfo, Notifier};
use super::transport::{TcpTransport, Transport, TransportError};
use crate::auth::JwtService;
use crate::utils::AppError;
use shared::message::{
    AuthPayload, ChannelEvent, ChannelMessage, PROTOCOL_VERSION, ResultPayload, Topic,
};

/// Delay before closing connection after sending error (allows client to receive the message)
const HANDSHAKE_ERROR_DELAY_MS: u64 = 100;

impl Notifier {
    /// Start TCP server (for network clients)
    ///
    /// 1. Accepts connections
    /// 2. Authenticates the first frame before any topic join
    /// 3. Forwards topic-matched broadcasts to each client
    /// 4. Gracefully shuts down on cancellation signal
    pub async fn start_tcp_server(&self, jwt: Arc<JwtService>) -> Result<(), AppError> {
        let listener = TcpListener::bind(&self.config.tcp_listen_addr)
            .await
            .map_err(|e| AppError::internal(format!("Failed to bind: {}", e)))?;

        tracing::info!(
            "Realtime channel listening on {}",
            self.config.tcp_listen_addr
        );

        loop {
            tokio::select! {
                _ = self.shutdown_token().cancelled() => {
                    tracing::info!("Realtime channel server shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            tracing::debug!("Client connected: {}", addr);
                            self.spawn_connection_handler(stream, jwt.clone());
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Spawn a new task to handle a TCP client connection
    fn spawn_connection_handler(&self, stream: TcpStream, jwt: Arc<JwtService>) {
        let transport: Arc<dyn Transport> = Arc::new(TcpTransport::from_stream(stream));
        self.connect_local(transport, jwt);
    }

    /// 接入一条已建立的传输连接（TCP 或内存），走完整握手/转发流程
    pub fn connect_local(&self, transport: Arc<dyn Transport>, jwt: Arc<JwtService>) {
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(transport, notifier, jwt).await {
                tracing::debug!("Connection handler finished: {}", e);
            }
        });
    }
}

/// Handle a single client connection
async fn handle_connection(
    transport: Arc<dyn Transport>,
    notifier: Notifier,
    jwt: Arc<JwtService>,
) -> Result<(), TransportError> {
    let addr = transport.peer_addr().unwrap_or_else(|| "unknown".into());

    // 认证握手：失败即关闭，绝不加入任何主题
    let info = match perform_handshake(&transport, &jwt, &addr).await {
        Ok(info) => info,
        Err(e) => {
            let _ = transport.close().await;
            return Err(e);
        }
    };

    let connection_id = Uuid::new_v4().to_string();
    notifier.register(&connection_id, info.clone());
    tracing::debug!(
        connection_id = %connection_id,
        user_id = %info.user_id,
        role = %info.role,
        "Client authenticated and subscribed"
    );

    // 共享的断开检测 token
    let disconnect_token = CancellationToken::new();

    // Start topic-filtered forwarding (当客户端断开时 forwarder 也要停止)
    let forward_handle = spawn_forwarder(
        transport.clone(),
        notifier.subscribe(),
        notifier.shutdown_token().clone(),
        connection_id.clone(),
        info.topics.clone(),
        disconnect_token.clone(),
    );

    // Read messages from client until disconnect
    read_client_messages(&transport, &notifier, &connection_id, disconnect_token).await;

    // Cleanup
    drop(forward_handle);
    let _ = transport.close().await;
    notifier.unregister(&connection_id);
    tracing::debug!(connection_id = %connection_id, "Client removed from registry");

    Ok(())
}

/// Perform the auth handshake with a client
async fn perform_handshake(
    transport: &Arc<dyn Transport>,
    jwt: &JwtService,
    addr: &str,
) -> Result<ConnectionInfo, TransportError> {
    tracing::debug!("Waiting for auth handshake from {}", addr);

    let msg = transport.read_message().await.map_err(|e| {
        tracing::warn!("Client {} handshake error: {}", addr, e);
        e
    })?;

    if msg.event != ChannelEvent::Auth {
        tracing::warn!(
            "Client {} failed to handshake: expected auth, got {}",
            addr,
            msg.event
        );
        send_handshake_error(transport, &msg, "Expected auth message").await;
        return Err(TransportError::Codec("expected auth message".into()));
    }

    let payload: AuthPayload = match msg.parse_payload() {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("Client {} sent invalid auth payload: {}", addr, e);
            send_handshake_error(transport, &msg, "Invalid auth payload").await;
            return Err(TransportError::Codec(e.to_string()));
        }
    };

    // Version check
    if payload.version != PROTOCOL_VERSION {
        tracing::warn!(
            "Client {} protocol version mismatch: expected {}, got {}",
            addr,
            PROTOCOL_VERSION,
            payload.version
        );
        send_handshake_error(
            transport,
            &msg,
            &format!(
                "Protocol version mismatch: server={}, client={}. Please update your client.",
                PROTOCOL_VERSION, payload.version
            ),
        )
        .await;
        return Err(TransportError::Codec("protocol version mismatch".into()));
    }

    // Credential check
    let claims = match jwt.validate_token(&payload.token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!(
                target: "security",
                client_addr = %addr,
                error = %e,
                "Channel authentication failed"
            );
            send_handshake_error(transport, &msg, "Authentication failed").await;
            return Err(TransportError::Codec("authentication failed".into()));
        }
    };

    let topics = Notifier::topics_for(&claims.sub, claims.role);

    tracing::debug!(
        "Client {} handshake success (v{}, user: {}, role: {})",
        addr,
        payload.version,
        claims.sub,
        claims.role
    );

    // 发送回执 (用 correlation_id 关联客户端的 request_id)
    let response = ChannelMessage::event(
        ChannelEvent::Success,
        &ResultPayload::ok(format!("Connected as {}", claims.sub)),
    )
    .with_correlation_id(msg.request_id);
    if let Err(e) = transport.write_message(&response).await {
        tracing::warn!("Failed to send handshake response: {}", e);
    }

    Ok(ConnectionInfo {
        user_id: claims.sub,
        name: claims.name,
        role: claims.role,
        topics,
    })
}

/// Send handshake error to client
async fn send_handshake_error(transport: &Arc<dyn Transport>, msg: &ChannelMessage, message: &str) {
    let response = ChannelMessage::event(ChannelEvent::Error, &ResultPayload::err(message))
        .with_correlation_id(msg.request_id);

    if let Err(e) = transport.write_message(&response).await {
        tracing::debug!("Failed to send handshake error: {}", e);
    }

    // Give client some time to receive the message before closing
    tokio::time::sleep(tokio::time::Duration::from_millis(HANDSHAKE_ERROR_DELAY_MS)).await;
}

/// Spawn task to forward topic-matched broadcasts to one client
fn spawn_forwarder(
    transport: Arc<dyn Transport>,
    mut rx: broadcast::Receiver<ChannelMessage>,
    shutdown_token: CancellationToken,
    connection_id: String,
    topics: Vec<Topic>,
    disconnect_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_token.cancelled() => {
                    tracing::debug!(connection_id = %connection_id, "Forwarder shutting down");
                    break;
                }
                _ = disconnect_token.cancelled() => {
                    tracing::debug!(connection_id = %connection_id, "Client disconnected, forwarder stopping");
                    break;
                }
                msg_result = rx.recv() => {
                    match msg_result {
                        Ok(msg) => {
                            // 主题过滤：不在订阅集合内（且非发给自己的单播）直接跳过
                            if !msg.matches(&connection_id, &topics) {
                                continue;
                            }

                            if let Err(e) = transport.write_message(&msg).await {
                                tracing::debug!(connection_id = %connection_id, "Client write failed: {}", e);
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            // 慢客户端落后：丢弃即可（at-most-once），客户端重连后走同步读路径补状态
                            tracing::warn!(
                                connection_id = %connection_id,
                                dropped_messages = n,
                                "Client lagged behind, events dropped"
                            );
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::debug!(connection_id = %connection_id, "Broadcast channel closed");
                            break;
                        }
                    }
                }
            }
        }

        tracing::debug!(connection_id = %connection_id, "Forwarder stopped");
    })
}

/// Read messages from client and forward to the intent handler
async fn read_client_messages(
    transport: &Arc<dyn Transport>,
    notifier: &Notifier,
    connection_id: &str,
    disconnect_token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = notifier.shutdown_token().cancelled() => {
                break;
            }

            read_result = transport.read_message() => {
                match read_result {
                    Ok(mut msg) => {
                        // Inject connection ID (source tracking)
                        msg.source = Some(connection_id.to_string());

                        // 🛡️ Security: 出站专用事件不接受客户端伪造
                        if msg.event.is_server_only() {
                            tracing::warn!(
                                target: "security",
                                connection_id = %connection_id,
                                event = %msg.event,
                                "Client attempted to send server-only event. Dropping message."
                            );
                            continue;
                        }

                        if notifier.inbound_sender().send(msg).is_err() {
                            tracing::warn!("No intent handler running, inbound message dropped");
                        }
                    }
                    Err(TransportError::Disconnected) => {
                        tracing::debug!(connection_id = %connection_id, "Client disconnected");
                        disconnect_token.cancel();
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(connection_id = %connection_id, "Client read error: {}", e);
                        disconnect_token.cancel();
                        break;
                    }
                }
            }
        }
    }
}
