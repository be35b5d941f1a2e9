/// What happened to one forwarded frame. Never surfaced to the sending client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Target is not registered or its writer is gone.
    TargetGone,
    /// Target's outbound queue is full; the frame was dropped.
    QueueFull,
    /// Sender and target are not in the same room.
    OutsideRoom,
}

impl Delivery {
    pub fn is_delivered(self) -> bool {
        self == Delivery::Delivered
    }
}
