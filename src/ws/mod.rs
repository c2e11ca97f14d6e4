//! WebSocket transport for the rendering/input collaborator

pub mod handler;
pub mod protocol;
