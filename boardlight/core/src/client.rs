//! State Sender
//!
//! The connect-and-send side of the protocol, used by the remote decision
//! process (the match server) to push display states. Fire-and-forget:
//! tokens are written newline-terminated and no response is ever read.
//!
//! ```no_run
//! # use boardlight_core::client::StateSender;
//! # use boardlight_core::protocol::{StateKind, StateMessage};
//! # async fn example() -> std::io::Result<()> {
//! let mut sender = StateSender::connect("127.0.0.1:4321".parse().unwrap()).await?;
//! sender.send(&StateMessage::new(StateKind::Thinking)).await?;
//! sender.send(&StateMessage::score(3)).await?;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;

use crate::protocol::StateMessage;

/// Fire-and-forget sender for display states.
pub struct StateSender {
    stream: TcpStream,
}

impl StateSender {
    /// Connect to the display's fixed address.
    pub async fn connect(addr: SocketAddr) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        debug!(addr = %addr, "connected to display");
        Ok(Self { stream })
    }

    /// Write one message's wire encoding. No response is expected.
    pub async fn send(&mut self, msg: &StateMessage) -> std::io::Result<()> {
        self.stream.write_all(msg.encode().as_bytes()).await?;
        self.stream.flush().await
    }
}
