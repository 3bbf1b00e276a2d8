/// Events emitted while resolving a player action.
/// The presentation layer consumes these for animation/sound.

use crate::domain::kind::Item;
use super::grid::Pos;

/// Sound cues. The engine never plays audio itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SoundEffect {
    AntiDie,
    AntiFire,
    Barrel,
    BumpHead,
    Button,
    CoolOff,
    Crush,
    Defrost,
    Die,
    Disrupted,
    DisruptEnd,
    Disruptor,
    DoorCloses,
    DoorOpens,
    Fire,
    Frozen,
    Grab,
    Jumping,
    LaserDie,
    Melt,
    Missile,
    Move,
    PushAnti,
    PushBox,
    PushMirror,
    Reflect,
    Sink,
    Stun,
    StunOff,
    Stunner,
    Teleport,
    Turn,
    Unlock,
    WoodBurn,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    Sound(SoundEffect),
    BeamDied { at: Pos },
    Crushed { at: Pos },
    Morphed { at: Pos, from: &'static str, to: &'static str },
    Pushed { from: Pos, to: Pos },
    Teleported { from: Pos, to: Pos },
    WaitingOnTunnel { at: Pos },
    DoorOpened { at: Pos },
    DoorClosed { at: Pos },
    ItemCollected { item: Item, amount: i32 },
    Exploded { at: Pos },
    TankKilled,
    Undone,
    Redone,
}
