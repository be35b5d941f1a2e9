use crate::registry::ConnectionRegistry;
use crate::room::RoomDirectory;
use crate::router::Delivery;
use meshcall_core::{ConnectionId, RoomKey, ServerSignal, SignalEnvelope};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Forwards frames into per-connection outbound queues.
///
/// Delivery is best effort and at most once: nothing is buffered for a target
/// that is gone, and a full queue drops the frame instead of blocking the caller.
#[derive(Clone)]
pub struct MessageRouter {
    registry: ConnectionRegistry,
    directory: RoomDirectory,
}

impl MessageRouter {
    pub fn new(registry: ConnectionRegistry, directory: RoomDirectory) -> Self {
        Self {
            registry,
            directory,
        }
    }

    /// Sends a control frame (welcome, member list, departures) to one connection.
    pub fn notify(&self, target: &ConnectionId, signal: ServerSignal) -> Delivery {
        let Some(outbound) = self.registry.outbound(target) else {
            debug!("Dropping frame for unknown connection {}", target);
            return Delivery::TargetGone;
        };

        match outbound.try_send(signal) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue full for {}, dropping frame", target);
                Delivery::QueueFull
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Connection {} already closed, dropping frame", target);
                Delivery::TargetGone
            }
        }
    }

    /// Forwards to `target` if it is live and shares the sender's room.
    /// Two room-less connections may always reach each other.
    pub fn route_unicast(&self, target: &ConnectionId, envelope: SignalEnvelope) -> Delivery {
        if !self.registry.is_live(target) {
            warn!(
                "Dropping {:?} from {} to departed connection {}",
                envelope.kind, envelope.sender, target
            );
            return Delivery::TargetGone;
        }
        if self.directory.room_of(&envelope.sender) != self.directory.room_of(target) {
            warn!(
                "Dropping {:?} from {} to {}: not in the same room",
                envelope.kind, envelope.sender, target
            );
            return Delivery::OutsideRoom;
        }
        self.notify(target, ServerSignal::Signal(envelope))
    }

    /// Forwards to every member of `room` except `sender`.
    pub fn route_broadcast(
        &self,
        room: &RoomKey,
        sender: &ConnectionId,
        envelope: SignalEnvelope,
    ) -> Vec<(ConnectionId, Delivery)> {
        let targets = self
            .directory
            .members_of(room)
            .into_iter()
            .filter(|member| member != sender);

        self.fan_out(targets, ServerSignal::Signal(envelope))
    }

    /// Two-party mode: forwards to every live connection that has not joined any room.
    pub fn route_lobby(
        &self,
        sender: &ConnectionId,
        envelope: SignalEnvelope,
    ) -> Vec<(ConnectionId, Delivery)> {
        let targets: Vec<ConnectionId> = self
            .registry
            .live_ids()
            .into_iter()
            .filter(|id| id != sender && self.directory.room_of(id).is_none())
            .collect();

        self.fan_out(targets, ServerSignal::Signal(envelope))
    }

    pub fn fan_out(
        &self,
        targets: impl IntoIterator<Item = ConnectionId>,
        signal: ServerSignal,
    ) -> Vec<(ConnectionId, Delivery)> {
        targets
            .into_iter()
            .map(|target| (target, self.notify(&target, signal.clone())))
            .collect()
    }
}
