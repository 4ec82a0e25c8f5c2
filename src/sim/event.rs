/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and messages.

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    JumpStarted,
    GemCollected { value: u32 },
    /// `by_enemy` is false for a fall out of the level.
    PlayerKilled { by_enemy: bool },
    EnemyShot,
    BulletFired,
    FireRejected,
    ExitReached,
    CheckpointReached { skin: u8 },
    SkinChanged { skin: u8 },
    TimeUp { won: bool },
}
