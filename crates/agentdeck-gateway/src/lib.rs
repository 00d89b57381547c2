//! Gateway client surface: the typed RPC boundary between the engine
//! and the agent gateway, plus an in-process implementation for tests
//! and local wiring.

pub mod channel;
pub mod client;

pub use channel::{ChannelGateway, GatewayRequest};
pub use client::{
    ChatSendParams, GatewayClient, GatewayError, ModelChoice, SessionsPatchParams, chat_send,
    models_list, sessions_patch,
};
