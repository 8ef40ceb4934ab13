//! Discord interface for guildhall
//!
//! This crate turns platform interactions into guild features:
//! - **Commands** (`commands`) - slash command catalog and component custom ids
//! - **Events** (`events`) - interaction model and the feature dispatcher
//! - **Services** (`services`) - event polls, bulk roles, member verification
//! - **Effects** (`effects`) - replies, message edits and roster persistence
//! - **Blocks** (`blocks`) - embed, button, select and modal builders
//!
//! # Architecture
//!
//! ```text
//! GatewayTransport → InteractionRunner → EventDispatcher → Service
//!                                                           ↓
//!                         ChatPlatform ← EffectExecutor ← Effects
//! ```
//!
//! # Key Types
//!
//! - `InteractionRunner` - interaction loop with reconnection logic
//! - `EventDispatcher` - routes interactions to the owning service
//! - `ChatPlatform` - outbound REST calls, implemented by `HttpDiscordPlatform`
//! - `MessageBuilder` - constructs embeds and component rows

pub mod blocks;
pub mod commands;
pub mod effects;
pub mod events;
pub mod gateway;
pub mod http;
pub mod platform;
pub mod services;
pub mod wire;

#[cfg(test)]
pub(crate) mod testing;
