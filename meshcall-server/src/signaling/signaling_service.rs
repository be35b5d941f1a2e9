use crate::registry::{ConnectionRegistry, Outbound};
use crate::room::{Departure, RoomDirectory};
use crate::router::MessageRouter;
use meshcall_core::{
    ClientSignal, ConnectionId, IceServerConfig, RoomKey, ServerSignal, SignalEnvelope,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

struct SignalingInner {
    registry: ConnectionRegistry,
    directory: RoomDirectory,
    router: MessageRouter,
    ice_servers: Vec<IceServerConfig>,
}

/// Server-side signaling state: who is connected, who is in which room, and
/// where each handshake frame goes. Cheap to clone.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        let registry = ConnectionRegistry::new();
        let directory = RoomDirectory::new();
        let router = MessageRouter::new(registry.clone(), directory.clone());

        Self {
            inner: Arc::new(SignalingInner {
                registry,
                directory,
                router,
                ice_servers,
            }),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.inner.registry
    }

    pub fn directory(&self) -> &RoomDirectory {
        &self.inner.directory
    }

    pub fn router(&self) -> &MessageRouter {
        &self.inner.router
    }

    pub fn get_ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    /// Registers a new connection and greets it with its id and the ICE configuration.
    pub fn connect(&self, outbound: Outbound) -> ConnectionId {
        let id = self.inner.registry.register(outbound);

        self.inner.router.notify(&id, ServerSignal::Welcome { id });
        self.inner.router.notify(
            &id,
            ServerSignal::IceConfig {
                ice_servers: self.get_ice_servers(),
            },
        );

        id
    }

    /// Parses and handles one text frame. Malformed frames get an `Error` reply.
    pub fn handle_text(&self, id: ConnectionId, text: &str) {
        match ClientSignal::from_json(text) {
            Ok(signal) => self.handle(id, signal),
            Err(e) => {
                warn!("Invalid ClientSignal from {}: {}", id, e);
                self.inner.router.notify(
                    &id,
                    ServerSignal::Error {
                        message: e.to_string(),
                    },
                );
            }
        }
    }

    pub fn handle(&self, id: ConnectionId, signal: ClientSignal) {
        match signal {
            ClientSignal::Join { room } => self.join(id, room),

            ClientSignal::Leave => {
                if let Some(departure) = self.inner.directory.leave_any(&id) {
                    info!("Connection {} left room '{}'", id, departure.room);
                    self.announce_departure(id, departure);
                }
            }

            ClientSignal::Signal {
                kind,
                target,
                payload,
            } => {
                let envelope = SignalEnvelope {
                    kind,
                    sender: id,
                    target,
                    payload,
                };
                self.route(envelope);
            }
        }
    }

    fn join(&self, id: ConnectionId, room: RoomKey) {
        info!("Connection {} joins room '{}'", id, room);

        let outcome = self.inner.directory.join(&room, id);
        if let Some(previous) = outcome.previous {
            self.announce_departure(id, previous);
        }

        let mut members: Vec<ConnectionId> = outcome.peers.into_iter().collect();
        members.sort();

        self.inner
            .router
            .notify(&id, ServerSignal::Members { room, members });
    }

    fn route(&self, envelope: SignalEnvelope) {
        let sender = envelope.sender;

        if let Some(target) = envelope.target {
            debug!("Routing {:?} {} -> {}", envelope.kind, sender, target);
            self.inner.router.route_unicast(&target, envelope);
            return;
        }

        match self.inner.directory.room_of(&sender) {
            Some(room) => {
                debug!("Broadcasting {:?} from {} to room '{}'", envelope.kind, sender, room);
                self.inner.router.route_broadcast(&room, &sender, envelope);
            }
            None => {
                debug!("Broadcasting {:?} from {} to lobby", envelope.kind, sender);
                self.inner.router.route_lobby(&sender, envelope);
            }
        }
    }

    fn announce_departure(&self, id: ConnectionId, departure: Departure) {
        self.inner
            .router
            .fan_out(departure.remaining, ServerSignal::PeerLeft { id });
    }

    /// Drops the connection from its room and the registry. Safe to call more than once.
    pub fn disconnect(&self, id: ConnectionId) {
        if let Some(departure) = self.inner.directory.leave_any(&id) {
            info!("Connection {} dropped out of room '{}'", id, departure.room);
            self.announce_departure(id, departure);
        }
        self.inner.registry.unregister(&id);
    }

    pub fn members_of(&self, room: &RoomKey) -> Vec<ConnectionId> {
        let mut members: Vec<ConnectionId> =
            self.inner.directory.members_of(room).into_iter().collect();
        members.sort();
        members
    }
}
