//! Memory 传输层实现 (同进程通信)
//!
//! 一对交叉的 mpsc 通道，两端各持一半。用于测试和内嵌客户端，
//! 走与 TCP 客户端完全相同的握手/转发路径。

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::sync::mpsc;

use super::{Transport, TransportError};
use shared::message::ChannelMessage;

/// In-process transport endpoint
#[derive(Debug)]
pub struct MemoryTransport {
    tx: mpsc::UnboundedSender<ChannelMessage>,
    rx: Mutex<mpsc::UnboundedReceiver<ChannelMessage>>,
}

impl MemoryTransport {
    /// 创建一对互联端点 (server 端, client 端)
    pub fn pair() -> (MemoryTransport, MemoryTransport) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            MemoryTransport {
                tx: a_tx,
                rx: Mutex::new(b_rx),
            },
            MemoryTransport {
                tx: b_tx,
                rx: Mutex::new(a_rx),
            },
        )
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn read_message(&self) -> Result<ChannelMessage, TransportError> {
        let mut rx = self.rx.lock().await;
        rx.recv().await.ok_or(TransportError::Disconnected)
    }

    async fn write_message(&self, msg: &ChannelMessage) -> Result<(), TransportError> {
        self.tx
            .send(msg.clone())
            .map_err(|_| TransportError::Disconnected)
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn peer_addr(&self) -> Option<String> {
        Some("memory".to_string())
    }
}
