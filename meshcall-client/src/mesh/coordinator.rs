use crate::error::MeshError;
use crate::media::LocalMedia;
use crate::mesh::{
    ConnectionStatus, LinkSnapshot, LinkState, MeshCommand, MeshEvent, MeshSnapshot, PeerLink,
};
use crate::signaling::SignalingOutput;
use crate::transport::{LinkTag, PeerSession, SessionFactory, SessionState, TransportEvent};
use anyhow::{Result, bail};
use meshcall_core::{
    ClientSignal, ConnectionId, RoomKey, SdpKind, ServerSignal, SessionDescription,
    SignalEnvelope, SignalKind,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Candidates held per remote that has not offered yet.
pub const MAX_EARLY_CANDIDATES: usize = 32;

#[derive(Debug, Clone)]
pub struct MeshConfig {
    pub command_capacity: usize,
    pub transport_capacity: usize,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            command_capacity: 100,
            transport_capacity: 256,
        }
    }
}

/// Cloneable front door to a running [`MeshCoordinator`].
#[derive(Clone)]
pub struct MeshHandle {
    command_tx: mpsc::Sender<MeshCommand>,
}

impl MeshHandle {
    pub async fn join(&self, room: RoomKey) -> Result<(), MeshError> {
        self.command_tx
            .send(MeshCommand::Join { room })
            .await
            .map_err(|_| MeshError::Stopped)
    }

    /// Resolves once media is stopped and every link is closed.
    pub async fn hangup(&self) -> Result<(), MeshError> {
        let (done, rx) = oneshot::channel();
        self.command_tx
            .send(MeshCommand::Hangup { done })
            .await
            .map_err(|_| MeshError::Stopped)?;
        rx.await.map_err(|_| MeshError::Stopped)
    }

    pub async fn snapshot(&self) -> Result<MeshSnapshot, MeshError> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(MeshCommand::Snapshot { reply })
            .await
            .map_err(|_| MeshError::Stopped)?;
        rx.await.map_err(|_| MeshError::Stopped)
    }
}

/// Client-side actor owning one PeerLink per remote participant.
///
/// Server frames, host commands and transport events are handled one at a
/// time on a single task, so link state never needs a lock.
pub struct MeshCoordinator<F: SessionFactory> {
    factory: F,
    media: Arc<dyn LocalMedia>,
    signaling: Arc<dyn SignalingOutput>,

    local_id: Option<ConnectionId>,
    room: Option<RoomKey>,
    status: ConnectionStatus,
    media_active: bool,
    receive_only: bool,

    links: HashMap<ConnectionId, PeerLink<F::Session>>,

    /// Candidates from remotes we have no link with yet.
    early_candidates: HashMap<ConnectionId, Vec<Value>>,
    next_epoch: u64,

    command_rx: mpsc::Receiver<MeshCommand>,
    signal_rx: mpsc::Receiver<ServerSignal>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    transport_tx: mpsc::Sender<TransportEvent>,
    events: mpsc::UnboundedSender<MeshEvent>,
}

impl<F: SessionFactory> MeshCoordinator<F> {
    /// `signal_rx` carries frames read from the signaling socket;
    /// `signaling` writes frames back to it.
    pub fn new(
        config: MeshConfig,
        factory: F,
        media: Arc<dyn LocalMedia>,
        signaling: Arc<dyn SignalingOutput>,
        signal_rx: mpsc::Receiver<ServerSignal>,
    ) -> (Self, MeshHandle, mpsc::UnboundedReceiver<MeshEvent>) {
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity);
        let (transport_tx, transport_rx) = mpsc::channel(config.transport_capacity);
        let (events, events_rx) = mpsc::unbounded_channel();

        let coordinator = Self {
            factory,
            media,
            signaling,
            local_id: None,
            room: None,
            status: ConnectionStatus::Idle,
            media_active: false,
            receive_only: false,
            links: HashMap::new(),
            early_candidates: HashMap::new(),
            next_epoch: 0,
            command_rx,
            signal_rx,
            transport_rx,
            transport_tx,
            events,
        };

        (coordinator, MeshHandle { command_tx }, events_rx)
    }

    /// Main loop. Runs until every handle is dropped or the signaling
    /// connection closes; should be spawned.
    pub async fn run(mut self) {
        info!("Mesh coordinator started");

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("Command channel closed. Shutting down mesh.");
                            break;
                        }
                    }
                }

                signal = self.signal_rx.recv() => {
                    match signal {
                        Some(s) => self.handle_signal(s).await,
                        None => {
                            warn!("Signaling connection closed");
                            self.set_status(ConnectionStatus::Error);
                            break;
                        }
                    }
                }

                evt = self.transport_rx.recv() => {
                    match evt {
                        Some(e) => self.handle_transport_event(e).await,
                        None => {
                            warn!("Transport channel closed unexpectedly");
                            break;
                        }
                    }
                }
            }
        }

        self.release().await;
        info!("Mesh coordinator finished");
    }

    async fn handle_command(&mut self, cmd: MeshCommand) {
        match cmd {
            MeshCommand::Join { room } => self.join(room).await,

            MeshCommand::Hangup { done } => {
                self.hangup().await;
                let _ = done.send(());
            }

            MeshCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    async fn join(&mut self, room: RoomKey) {
        if self.room.as_ref().is_some_and(|current| *current != room) {
            info!("Switching rooms, closing {} link(s)", self.links.len());
            self.close_all_links().await;
            self.early_candidates.clear();
        }

        self.start_media().await;
        self.set_status(ConnectionStatus::Connecting);
        info!("Joining room {}", room);
        self.signaling.send_signal(ClientSignal::Join { room }).await;
    }

    async fn start_media(&mut self) {
        if self.media_active {
            return;
        }
        match self.media.start().await {
            Ok(()) => {
                self.media_active = true;
                self.receive_only = false;
            }
            Err(e) => {
                warn!("Local media unavailable, continuing receive-only: {:#}", e);
                self.receive_only = true;
                self.emit(MeshEvent::MediaUnavailable {
                    reason: format!("{:#}", e),
                });
            }
        }
    }

    async fn hangup(&mut self) {
        self.release().await;
        if self.room.take().is_some() {
            self.signaling.send_signal(ClientSignal::Leave).await;
        }
        self.set_status(ConnectionStatus::Idle);
    }

    /// Stop media and close every link. Does not touch the room.
    async fn release(&mut self) {
        if self.media_active {
            self.media.stop().await;
            self.media_active = false;
        }
        self.close_all_links().await;
        self.early_candidates.clear();
    }

    fn snapshot(&self) -> MeshSnapshot {
        let mut links: Vec<LinkSnapshot> = self
            .links
            .values()
            .map(|link| LinkSnapshot {
                remote: link.remote(),
                state: link.state(),
                initiated: link.initiated(),
                pending_candidates: link.pending_candidates(),
            })
            .collect();
        links.sort_by_key(|l| l.remote);

        MeshSnapshot {
            local_id: self.local_id,
            room: self.room.clone(),
            status: self.status,
            receive_only: self.receive_only,
            media_active: self.media_active,
            links,
        }
    }

    async fn handle_signal(&mut self, signal: ServerSignal) {
        match signal {
            ServerSignal::Welcome { id } => {
                info!("Assigned connection id {}", id);
                self.local_id = Some(id);
            }

            ServerSignal::IceConfig { ice_servers } => {
                debug!("Received {} ICE server entries", ice_servers.len());
                self.factory.set_ice_servers(ice_servers);
            }

            ServerSignal::Members { room, members } => {
                info!("Joined room {} with {} other member(s)", room, members.len());
                self.room = Some(room);

                // The joiner initiates toward everyone already present.
                for member in members {
                    if Some(member) == self.local_id || self.links.contains_key(&member) {
                        continue;
                    }
                    self.initiate(member).await;
                }
                self.refresh_status();
            }

            ServerSignal::Signal(envelope) => self.handle_envelope(envelope).await,

            ServerSignal::PeerLeft { id } => {
                info!("Peer {} left", id);
                self.early_candidates.remove(&id);
                if self.links.contains_key(&id) {
                    self.teardown(id).await;
                    self.emit(MeshEvent::PeerStatus {
                        peer: id,
                        status: ConnectionStatus::Idle,
                    });
                    self.refresh_status();
                }
            }

            ServerSignal::Error { message } => {
                warn!("Signaling server reported an error: {}", message);
            }
        }
    }

    async fn handle_envelope(&mut self, envelope: SignalEnvelope) {
        let SignalEnvelope {
            kind,
            sender,
            payload,
            ..
        } = envelope;

        if Some(sender) == self.local_id {
            return;
        }
        if self.room.is_none() {
            debug!("Ignoring {:?} from {} outside any room", kind, sender);
            return;
        }

        match kind {
            SignalKind::Offer => self.on_offer(sender, payload).await,
            SignalKind::Answer => self.on_answer(sender, payload).await,
            SignalKind::Candidate => self.on_candidate(sender, payload).await,
        }
    }

    async fn initiate(&mut self, remote: ConnectionId) {
        let tag = self.next_tag(remote);
        let session = match self
            .factory
            .create_session(tag, !self.receive_only, self.transport_tx.clone())
            .await
        {
            Ok(session) => session,
            Err(e) => {
                self.negotiation_failed(remote, e).await;
                return;
            }
        };

        let mut link = PeerLink::new(remote, tag.epoch, true, session);
        for candidate in self.early_candidates.remove(&remote).unwrap_or_default() {
            link.buffer_candidate(candidate);
        }

        match send_offer(&mut link).await {
            Ok(offer) => {
                debug!("Sending offer to {}", remote);
                self.links.insert(remote, link);
                self.send_signal(SignalKind::Offer, remote, offer.to_payload())
                    .await;
                self.emit(MeshEvent::PeerStatus {
                    peer: remote,
                    status: ConnectionStatus::Connecting,
                });
            }
            Err(e) => {
                link.close().await;
                self.negotiation_failed(remote, e).await;
            }
        }
    }

    async fn on_offer(&mut self, sender: ConnectionId, payload: Value) {
        let offer = match parse_description(&payload, SdpKind::Offer) {
            Ok(offer) => offer,
            Err(e) => {
                warn!("Ignoring offer from {}: {:#}", sender, e);
                return;
            }
        };

        match self.links.get(&sender).map(|link| link.state()) {
            None => {}

            // Both sides offered at once; the lower id keeps its offer.
            Some(LinkState::OfferSent) => {
                let Some(local) = self.local_id else {
                    warn!("Offer collision with {} before Welcome", sender);
                    return;
                };
                if local < sender {
                    info!("Offer collision with {}: keeping ours", sender);
                    return;
                }

                info!("Offer collision with {}: yielding", sender);
                if let Some(mut stale) = self.links.remove(&sender) {
                    let carried = stale.take_pending();
                    stale.close().await;
                    self.early_candidates
                        .entry(sender)
                        .or_default()
                        .extend(carried);
                }
            }

            Some(state) => {
                warn!("Ignoring offer from {} in state {:?}", sender, state);
                return;
            }
        }

        self.accept_offer(sender, offer).await;
    }

    async fn accept_offer(&mut self, remote: ConnectionId, offer: SessionDescription) {
        let tag = self.next_tag(remote);
        let session = match self
            .factory
            .create_session(tag, !self.receive_only, self.transport_tx.clone())
            .await
        {
            Ok(session) => session,
            Err(e) => {
                self.negotiation_failed(remote, e).await;
                return;
            }
        };

        let mut link = PeerLink::new(remote, tag.epoch, false, session);
        for candidate in self.early_candidates.remove(&remote).unwrap_or_default() {
            link.buffer_candidate(candidate);
        }

        match send_answer(&mut link, offer).await {
            Ok(answer) => {
                debug!("Sending answer to {}", remote);
                self.links.insert(remote, link);
                self.send_signal(SignalKind::Answer, remote, answer.to_payload())
                    .await;
                self.emit(MeshEvent::PeerStatus {
                    peer: remote,
                    status: ConnectionStatus::Connecting,
                });
            }
            Err(e) => {
                link.close().await;
                self.negotiation_failed(remote, e).await;
            }
        }
    }

    async fn on_answer(&mut self, sender: ConnectionId, payload: Value) {
        let answer = match parse_description(&payload, SdpKind::Answer) {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Ignoring answer from {}: {:#}", sender, e);
                return;
            }
        };

        let Some(link) = self.links.get_mut(&sender) else {
            warn!("Ignoring answer from {}: no link", sender);
            return;
        };
        if link.state() != LinkState::OfferSent {
            warn!(
                "Ignoring answer from {} in state {:?}",
                sender,
                link.state()
            );
            return;
        }

        let result = apply_answer(link, answer).await;
        if let Err(e) = result {
            self.negotiation_failed(sender, e).await;
        }
    }

    async fn on_candidate(&mut self, sender: ConnectionId, payload: Value) {
        if payload.is_null() {
            return;
        }

        match self.links.get_mut(&sender) {
            Some(link) => link.add_candidate(payload).await,
            None => {
                let buffered = self.early_candidates.entry(sender).or_default();
                if buffered.len() >= MAX_EARLY_CANDIDATES {
                    warn!("Too many candidates from {} without an offer, dropping", sender);
                    return;
                }
                debug!("Buffering candidate from {} until its offer arrives", sender);
                buffered.push(payload);
            }
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        let tag = event.tag();
        let current = self.links.get(&tag.remote).map(|link| link.epoch());
        if current != Some(tag.epoch) {
            debug!("Dropping stale transport event for {}", tag.remote);
            return;
        }

        match event {
            TransportEvent::CandidateGenerated(tag, candidate) => {
                self.send_signal(SignalKind::Candidate, tag.remote, candidate)
                    .await;
            }

            TransportEvent::TrackArrived(tag, track) => {
                self.emit(MeshEvent::RemoteTrack {
                    peer: tag.remote,
                    track,
                });
            }

            TransportEvent::StateChanged(tag, state) => {
                self.on_session_state(tag.remote, state).await;
            }
        }
    }

    async fn on_session_state(&mut self, remote: ConnectionId, state: SessionState) {
        match state {
            SessionState::Connecting => {}

            SessionState::Connected => {
                let Some(link) = self.links.get_mut(&remote) else {
                    return;
                };
                if link.state() == LinkState::Established {
                    // recovered from a transient disconnect
                    info!("Link to {} reconnected", remote);
                    self.emit(MeshEvent::PeerStatus {
                        peer: remote,
                        status: ConnectionStatus::Connected,
                    });
                    self.refresh_status();
                    return;
                }
                if let Err(e) = link.advance(LinkState::Established) {
                    debug!("Connected report from {} ignored: {}", remote, e);
                    return;
                }
                info!("Link to {} established", remote);
                self.emit(MeshEvent::PeerStatus {
                    peer: remote,
                    status: ConnectionStatus::Connected,
                });
                self.refresh_status();
            }

            SessionState::Disconnected => {
                // ICE may still recover; the link stays until Failed or Closed
                warn!("Link to {} disconnected, waiting for recovery", remote);
                self.emit(MeshEvent::PeerStatus {
                    peer: remote,
                    status: ConnectionStatus::Connecting,
                });
            }

            SessionState::Failed | SessionState::Closed => {
                warn!("Link to {} lost ({:?})", remote, state);
                self.teardown(remote).await;
                let status = if state == SessionState::Failed {
                    ConnectionStatus::Error
                } else {
                    ConnectionStatus::Idle
                };
                self.emit(MeshEvent::PeerStatus {
                    peer: remote,
                    status,
                });
                self.refresh_status();
            }
        }
    }

    async fn negotiation_failed(&mut self, remote: ConnectionId, e: anyhow::Error) {
        let err = MeshError::Negotiation {
            peer: remote,
            reason: format!("{:#}", e),
        };
        error!("{}", err);

        self.teardown(remote).await;
        self.emit(MeshEvent::PeerStatus {
            peer: remote,
            status: ConnectionStatus::Error,
        });
        self.refresh_status();
    }

    /// Remove and close the link to `remote`, if any.
    async fn teardown(&mut self, remote: ConnectionId) {
        if let Some(mut link) = self.links.remove(&remote) {
            link.close().await;
            self.emit(MeshEvent::PeerRemoved { peer: remote });
        }
    }

    async fn close_all_links(&mut self) {
        let remotes: Vec<ConnectionId> = self.links.keys().copied().collect();
        for remote in remotes {
            self.teardown(remote).await;
        }
    }

    fn next_tag(&mut self, remote: ConnectionId) -> LinkTag {
        self.next_epoch += 1;
        LinkTag {
            remote,
            epoch: self.next_epoch,
        }
    }

    async fn send_signal(&self, kind: SignalKind, target: ConnectionId, payload: Value) {
        self.signaling
            .send_signal(ClientSignal::Signal {
                kind,
                target: Some(target),
                payload,
            })
            .await;
    }

    fn refresh_status(&mut self) {
        if self.room.is_none() {
            return;
        }
        let any_established = self
            .links
            .values()
            .any(|link| link.state() == LinkState::Established);
        if any_established {
            self.set_status(ConnectionStatus::Connected);
        } else {
            self.set_status(ConnectionStatus::Connecting);
        }
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.status == status {
            return;
        }
        self.status = status;
        self.emit(MeshEvent::Status(status));
    }

    fn emit(&self, event: MeshEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }
}

fn parse_description(payload: &Value, expected: SdpKind) -> Result<SessionDescription> {
    let desc = SessionDescription::from_payload(payload)?;
    if desc.kind != expected {
        bail!("expected {:?}, got {:?}", expected, desc.kind);
    }
    Ok(desc)
}

async fn send_offer<S: PeerSession>(link: &mut PeerLink<S>) -> Result<SessionDescription> {
    let offer = link.session().create_offer().await?;
    link.session().set_local_description(offer.clone()).await?;
    link.advance(LinkState::OfferSent)?;
    Ok(offer)
}

async fn send_answer<S: PeerSession>(
    link: &mut PeerLink<S>,
    offer: SessionDescription,
) -> Result<SessionDescription> {
    link.session().set_remote_description(offer).await?;
    link.advance(LinkState::OfferReceived)?;
    link.flush_candidates().await;

    let answer = link.session().create_answer().await?;
    link.session().set_local_description(answer.clone()).await?;
    link.advance(LinkState::AnswerSent)?;
    Ok(answer)
}

async fn apply_answer<S: PeerSession>(
    link: &mut PeerLink<S>,
    answer: SessionDescription,
) -> Result<()> {
    link.session().set_remote_description(answer).await?;
    link.advance(LinkState::AnswerReceived)?;
    link.flush_candidates().await;
    Ok(())
}
