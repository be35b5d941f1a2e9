use clap::Parser;
use meshcall_core::IceServerConfig;
use meshcall_core::utils::default_ice_servers;
use std::net::SocketAddr;

pub const DEFAULT_OUTBOUND_QUEUE: usize = 64;

/// Welcome and IceConfig are queued before the writer task starts.
pub const MIN_OUTBOUND_QUEUE: usize = 4;

#[derive(Debug, Clone, Parser)]
#[command(name = "meshcall-server", about = "Room-based WebRTC signaling relay")]
pub struct ServerConfig {
    /// Address the HTTP/WebSocket listener binds to.
    #[arg(long, env = "MESHCALL_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// STUN/TURN URLs handed to clients. Defaults to public STUN servers.
    #[arg(long = "ice-server", env = "MESHCALL_ICE_SERVERS", value_delimiter = ',')]
    pub ice_servers: Vec<String>,

    #[arg(long, env = "TURN_USERNAME")]
    pub turn_username: Option<String>,

    #[arg(long, env = "TURN_CREDENTIAL")]
    pub turn_credential: Option<String>,

    /// Frames buffered per connection before new ones are dropped.
    #[arg(long, env = "MESHCALL_OUTBOUND_QUEUE", default_value_t = DEFAULT_OUTBOUND_QUEUE)]
    pub outbound_queue: usize,
}

impl ServerConfig {
    pub fn ice_server_configs(&self) -> Vec<IceServerConfig> {
        if self.ice_servers.is_empty() {
            return default_ice_servers();
        }

        vec![IceServerConfig {
            urls: self.ice_servers.clone(),
            username: self.turn_username.clone(),
            credential: self.turn_credential.clone(),
        }]
    }

    pub fn outbound_capacity(&self) -> usize {
        self.outbound_queue.max(MIN_OUTBOUND_QUEUE)
    }
}
