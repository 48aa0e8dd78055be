//! # Record Definitions
//!
//! Every decoded message is one contiguous run of arena bytes:
//!
//! ```text
//! ┌───────────────┬──────────────┬──────────────┬─────┐
//! │ MessageHeader │ body record  │ FlatSeq #1   │ ... │
//! │ 16 bytes      │ fixed size   │ count + T[n] │     │
//! └───────────────┴──────────────┴──────────────┴─────┘
//! ```
//!
//! Records are `Pod` with explicit padding. Nested sequences are stored as
//! `u32` arena offsets; the accessor of the same name turns the offset back
//! into a typed [`FlatSeq`]. Every string is a one-byte intern id.

use bytemuck::{Pod, Zeroable};
use courier_core::FlatSeq;

/// Grid cell of a geographic position.
///
/// Size: 2 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Pos {
    /// Latitude cell.
    pub lat: u8,
    /// Longitude cell.
    pub lon: u8,
}

impl Pos {
    /// Creates a grid position.
    #[inline]
    #[must_use]
    pub const fn new(lat: u8, lon: u8) -> Self {
        Self { lat, lon }
    }
}

/// An amount of one item.
///
/// Size: 4 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct ItemStack {
    /// Number of units.
    pub amount: u16,
    /// Item name id.
    pub item: u8,
    /// Padding for alignment.
    pub _padding: u8,
}

impl ItemStack {
    /// Creates an item stack.
    #[inline]
    #[must_use]
    pub const fn new(item: u8, amount: u16) -> Self {
        Self {
            amount,
            item,
            _padding: 0,
        }
    }
}

/// Capabilities of the agent's role.
///
/// Size: 12 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Role {
    /// Offset of `FlatSeq<u8>` of tool name ids.
    pub tools: u32,
    /// Battery capacity.
    pub max_battery: u16,
    /// Load capacity.
    pub max_load: u16,
    /// Role name id.
    pub name: u8,
    /// Speed in cells per step.
    pub speed: u8,
    /// Padding for alignment.
    pub _padding: [u8; 2],
}

impl Role {
    /// Tools the role can use.
    #[inline]
    #[must_use]
    pub const fn tools(&self) -> FlatSeq<u8> {
        FlatSeq::from_raw(self.tools)
    }
}

/// Body of a `sim-start` message.
///
/// Size: 24 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Simulation {
    /// Starting money of the team.
    pub seed_capital: u32,
    /// Offset of `FlatSeq<Product>`.
    pub products: u32,
    /// The agent's role.
    pub role: Role,
    /// Number of steps in the simulation.
    pub steps: u16,
    /// Simulation id.
    pub id: u8,
    /// Team name id.
    pub team: u8,
}

impl Simulation {
    /// Size in bytes.
    pub const SIZE: usize = 24;

    /// The product catalogue.
    #[inline]
    #[must_use]
    pub const fn products(&self) -> FlatSeq<Product> {
        FlatSeq::from_raw(self.products)
    }
}

/// One product of the catalogue with its recipe.
///
/// Size: 12 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Product {
    /// Offset of `FlatSeq<ItemStack>` consumed when assembling.
    pub consumed: u32,
    /// Offset of `FlatSeq<u8>` of tools required when assembling.
    pub tools: u32,
    /// Volume of one unit.
    pub volume: u16,
    /// Product name id.
    pub name: u8,
    /// Non-zero if the product is assembled rather than bought.
    pub assembled: u8,
}

impl Product {
    /// Items consumed by assembly.
    #[inline]
    #[must_use]
    pub const fn consumed(&self) -> FlatSeq<ItemStack> {
        FlatSeq::from_raw(self.consumed)
    }

    /// Tools needed for assembly.
    #[inline]
    #[must_use]
    pub const fn tools(&self) -> FlatSeq<u8> {
        FlatSeq::from_raw(self.tools)
    }

    /// Returns true if the product is assembled.
    #[inline]
    #[must_use]
    pub const fn is_assembled(&self) -> bool {
        self.assembled != 0
    }
}

/// The agent's own state.
///
/// Size: 20 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct SelfStatus {
    /// Offset of `FlatSeq<ItemStack>` of carried items.
    pub items: u32,
    /// Offset of `FlatSeq<Pos, u16>` of the planned route.
    pub route: u32,
    /// Battery charge.
    pub charge: u16,
    /// Carried volume.
    pub load: u16,
    /// Current position.
    pub pos: Pos,
    /// [`ActionKind`](super::ActionKind) of the previous step.
    pub last_action: u8,
    /// [`ActionResult`](super::ActionResult) of the previous step.
    pub last_action_result: u8,
    /// Facility name id, 0 if outside any facility.
    pub in_facility: u8,
    /// Position in the facility queue, -1 if not queued.
    pub f_position: i8,
    /// Padding for alignment.
    pub _padding: [u8; 2],
}

impl SelfStatus {
    /// Carried items.
    #[inline]
    #[must_use]
    pub const fn items(&self) -> FlatSeq<ItemStack> {
        FlatSeq::from_raw(self.items)
    }

    /// Remaining route.
    #[inline]
    #[must_use]
    pub const fn route(&self) -> FlatSeq<Pos, u16> {
        FlatSeq::from_raw(self.route)
    }
}

/// Team-wide state.
///
/// Size: 12 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Team {
    /// Offset of `FlatSeq<u8>` of job ids the team works on.
    pub jobs_taken: u32,
    /// Offset of `FlatSeq<u8>` of job ids the team posted.
    pub jobs_posted: u32,
    /// Team money.
    pub money: i32,
}

impl Team {
    /// Jobs taken by the team.
    #[inline]
    #[must_use]
    pub const fn jobs_taken(&self) -> FlatSeq<u8> {
        FlatSeq::from_raw(self.jobs_taken)
    }

    /// Jobs posted by the team.
    #[inline]
    #[must_use]
    pub const fn jobs_posted(&self) -> FlatSeq<u8> {
        FlatSeq::from_raw(self.jobs_posted)
    }
}

/// Body of a `request-action` message.
///
/// Size: 80 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Perception {
    /// Server deadline for the answer, in milliseconds since the epoch.
    pub deadline: u64,
    /// Request id, echoed in the action.
    pub id: u32,
    /// Offset of `FlatSeq<Entity>`.
    pub entities: u32,
    /// Offset of `FlatSeq<ChargingStation>`.
    pub charging_stations: u32,
    /// Offset of `FlatSeq<Facility>`.
    pub dump_locations: u32,
    /// Offset of `FlatSeq<Facility>`.
    pub shops: u32,
    /// Offset of `FlatSeq<Facility>`.
    pub storages: u32,
    /// Offset of `FlatSeq<Facility>`.
    pub workshops: u32,
    /// Offset of `FlatSeq<AuctionJob>`.
    pub auction_jobs: u32,
    /// Offset of `FlatSeq<PricedJob>`.
    pub priced_jobs: u32,
    /// The agent itself.
    pub self_status: SelfStatus,
    /// The agent's team.
    pub team: Team,
    /// Current simulation step.
    pub simulation_step: u16,
    /// Padding for alignment.
    pub _padding: [u8; 2],
}

impl Perception {
    /// Size in bytes.
    pub const SIZE: usize = 80;

    /// Visible agents.
    #[inline]
    #[must_use]
    pub const fn entities(&self) -> FlatSeq<Entity> {
        FlatSeq::from_raw(self.entities)
    }

    /// Charging stations.
    #[inline]
    #[must_use]
    pub const fn charging_stations(&self) -> FlatSeq<ChargingStation> {
        FlatSeq::from_raw(self.charging_stations)
    }

    /// Dump locations.
    #[inline]
    #[must_use]
    pub const fn dump_locations(&self) -> FlatSeq<Facility> {
        FlatSeq::from_raw(self.dump_locations)
    }

    /// Shops.
    #[inline]
    #[must_use]
    pub const fn shops(&self) -> FlatSeq<Facility> {
        FlatSeq::from_raw(self.shops)
    }

    /// Storages.
    #[inline]
    #[must_use]
    pub const fn storages(&self) -> FlatSeq<Facility> {
        FlatSeq::from_raw(self.storages)
    }

    /// Workshops.
    #[inline]
    #[must_use]
    pub const fn workshops(&self) -> FlatSeq<Facility> {
        FlatSeq::from_raw(self.workshops)
    }

    /// Open auction jobs.
    #[inline]
    #[must_use]
    pub const fn auction_jobs(&self) -> FlatSeq<AuctionJob> {
        FlatSeq::from_raw(self.auction_jobs)
    }

    /// Open priced jobs.
    #[inline]
    #[must_use]
    pub const fn priced_jobs(&self) -> FlatSeq<PricedJob> {
        FlatSeq::from_raw(self.priced_jobs)
    }
}

/// A visible agent.
///
/// Size: 5 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Entity {
    /// Agent name id.
    pub name: u8,
    /// Team name id.
    pub team: u8,
    /// Role name id.
    pub role: u8,
    /// Position.
    pub pos: Pos,
}

/// A charging station.
///
/// Size: 10 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct ChargingStation {
    /// Charge per step.
    pub rate: u16,
    /// Price per step.
    pub price: u16,
    /// Queue length, -1 if not visible.
    pub q_size: i16,
    /// Facility name id.
    pub name: u8,
    /// Parallel charging slots.
    pub slots: u8,
    /// Position.
    pub pos: Pos,
}

/// Any facility that carries only a name and a position.
///
/// Size: 3 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Facility {
    /// Facility name id.
    pub name: u8,
    /// Position.
    pub pos: Pos,
}

/// One required item of a job.
///
/// Size: 6 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct JobItem {
    /// Units required.
    pub amount: u16,
    /// Units already delivered.
    pub delivered: u16,
    /// Item name id.
    pub item: u8,
    /// Padding for alignment.
    pub _padding: u8,
}

/// An auction job.
///
/// Size: 20 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct AuctionJob {
    /// Offset of `FlatSeq<JobItem>`.
    pub items: u32,
    /// Fine for not completing the job.
    pub fine: u32,
    /// Highest accepted bid.
    pub max_bid: u32,
    /// First step of the job.
    pub begin: u16,
    /// Last step of the job.
    pub end: u16,
    /// Job id.
    pub id: u8,
    /// Storage name id the items go to.
    pub storage: u8,
    /// Padding for alignment.
    pub _padding: [u8; 2],
}

impl AuctionJob {
    /// Required items.
    #[inline]
    #[must_use]
    pub const fn items(&self) -> FlatSeq<JobItem> {
        FlatSeq::from_raw(self.items)
    }
}

/// A priced job.
///
/// Size: 16 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct PricedJob {
    /// Offset of `FlatSeq<JobItem>`.
    pub items: u32,
    /// Reward for completing the job.
    pub reward: u32,
    /// First step of the job.
    pub begin: u16,
    /// Last step of the job.
    pub end: u16,
    /// Job id.
    pub id: u8,
    /// Storage name id the items go to.
    pub storage: u8,
    /// Padding for alignment.
    pub _padding: [u8; 2],
}

impl PricedJob {
    /// Required items.
    #[inline]
    #[must_use]
    pub const fn items(&self) -> FlatSeq<JobItem> {
        FlatSeq::from_raw(self.items)
    }
}

/// Kinds of inbound messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    /// Server -> Client: result of the login.
    AuthResponse = 1,
    /// Server -> Client: a simulation begins.
    SimStart = 2,
    /// Server -> Client: a simulation ended.
    SimEnd = 3,
    /// Server -> Client: perception, an action is expected.
    RequestAction = 4,
    /// Server -> Client: the server is shutting down.
    Bye = 5,
}

impl MessageKind {
    /// Maps the `type` attribute of `<message>`.
    #[must_use]
    pub fn from_type_str(value: &str) -> Option<Self> {
        match value {
            "auth-response" => Some(Self::AuthResponse),
            "sim-start" => Some(Self::SimStart),
            "sim-end" => Some(Self::SimEnd),
            "request-action" => Some(Self::RequestAction),
            "bye" => Some(Self::Bye),
            _ => None,
        }
    }

    /// Maps a stored kind byte.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::AuthResponse),
            2 => Some(Self::SimStart),
            3 => Some(Self::SimEnd),
            4 => Some(Self::RequestAction),
            5 => Some(Self::Bye),
            _ => None,
        }
    }

    /// The wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthResponse => "auth-response",
            Self::SimStart => "sim-start",
            Self::SimEnd => "sim-end",
            Self::RequestAction => "request-action",
            Self::Bye => "bye",
        }
    }
}

/// Prefix of every decoded message.
///
/// Size: 16 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct MessageHeader {
    /// Server timestamp in milliseconds.
    pub timestamp: u64,
    /// [`MessageKind`] as a byte.
    pub kind: u8,
    /// Padding for alignment.
    pub _padding: [u8; 7],
}

impl MessageHeader {
    /// Size in bytes.
    pub const SIZE: usize = 16;

    /// Creates a header.
    #[inline]
    #[must_use]
    pub const fn new(kind: MessageKind, timestamp: u64) -> Self {
        Self {
            timestamp,
            kind: kind as u8,
            _padding: [0; 7],
        }
    }
}

/// Body of an `auth-response` message.
///
/// Size: 1 byte
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct AuthResponse {
    /// Non-zero if the login was accepted.
    pub succeeded: u8,
}

impl AuthResponse {
    /// Returns true if the login was accepted.
    #[inline]
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.succeeded != 0
    }
}

/// Body of a `sim-end` message.
///
/// Size: 8 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct SimEnd {
    /// Final score.
    pub score: i32,
    /// Final ranking.
    pub ranking: u16,
    /// Padding for alignment.
    pub _padding: [u8; 2],
}
