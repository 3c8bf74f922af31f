//! 认证授权模块
//!
//! 提供 JWT 认证和当前用户上下文：
//! - [`JwtService`] - JWT 令牌服务
//! - [`CurrentUser`] - 当前用户上下文（HTTP extractor + 通道握手共用）
//!
//! 身份签发（OTP/密码）属于外部身份网关，核心只消费
//! 「已验证身份，角色 R，ID U」这一事实。

pub mod extractor;
pub mod jwt;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
