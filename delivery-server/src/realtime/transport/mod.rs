//! Transport 传输层抽象
//!
//! 提供可插拔的传输层架构：
//! - [`TcpTransport`] - 长度前缀 JSON 帧的 TCP 连接
//! - [`MemoryTransport`] - 同进程通信（测试/内嵌客户端）

mod memory;
mod tcp;

pub use memory::MemoryTransport;
pub use tcp::TcpTransport;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use shared::message::ChannelMessage;

/// 单帧上限：防止恶意客户端一帧打爆内存
const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// 传输层错误
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed by peer")]
    Disconnected,

    #[error("frame too large: {0} bytes")]
    FrameTooLarge(usize),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport 传输层特征
///
/// 所有传输实现必须实现此特征，支持消息的读写和连接管理。
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// 从传输层读取一条消息
    async fn read_message(&self) -> Result<ChannelMessage, TransportError>;

    /// 向传输层写入一条消息
    async fn write_message(&self, msg: &ChannelMessage) -> Result<(), TransportError>;

    /// 关闭传输连接
    async fn close(&self) -> Result<(), TransportError>;

    /// 获取对端地址
    fn peer_addr(&self) -> Option<String> {
        None
    }
}

// ========== 辅助函数 ==========

/// 从异步流中读取一帧 (u32 BE 长度前缀 + JSON)
pub(crate) async fn read_from_stream<R: AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<ChannelMessage, TransportError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(TransportError::Disconnected);
        }
        Err(e) => return Err(TransportError::Io(e)),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(TransportError::FrameTooLarge(len));
    }

    let mut payload = vec![0u8; len];
    match reader.read_exact(&mut payload).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(TransportError::Disconnected);
        }
        Err(e) => return Err(TransportError::Io(e)),
    }

    ChannelMessage::from_bytes(&payload).map_err(|e| TransportError::Codec(e.to_string()))
}

/// 向异步流写入一帧
pub(crate) async fn write_to_stream<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg: &ChannelMessage,
) -> Result<(), TransportError> {
    let bytes = msg
        .to_bytes()
        .map_err(|e| TransportError::Codec(e.to_string()))?;
    if bytes.len() > MAX_FRAME_BYTES {
        return Err(TransportError::FrameTooLarge(bytes.len()));
    }

    writer.write_all(&(bytes.len() as u32).to_be_bytes()).await?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}
