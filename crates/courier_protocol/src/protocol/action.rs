//! # Actions
//!
//! The closed set of actions an agent can answer a perception with, plus the
//! two name tables the server uses to report the previous step.

use courier_core::FlatSeq;

use super::records::{ItemStack, Pos};

/// Declares a `u8` enum together with its wire names.
macro_rules! wire_names {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $text:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)*
        }

        impl $name {
            /// Every variant, in discriminant order.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)*];

            /// The wire name.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)*
                }
            }

            /// Looks up a wire name.
            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($text => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Maps a stored discriminant.
            #[must_use]
            pub fn from_u8(value: u8) -> Option<Self> {
                Self::ALL.get(usize::from(value)).copied()
            }
        }
    };
}

wire_names! {
    /// Action names as reported in `lastAction` and sent in `<action type>`.
    pub enum ActionKind {
        /// The agent did nothing.
        NoAction = "noAction",
        /// The server did not understand the action.
        UnknownAction = "unknownAction",
        /// The action was dropped at random.
        RandomFail = "randomFail",
        /// Move towards a facility or a position.
        Goto = "goto",
        /// Hand items to another agent.
        Give = "give",
        /// Accept items from another agent.
        Receive = "receive",
        /// Put items into a storage.
        Store = "store",
        /// Take stored items out of a storage.
        Retrieve = "retrieve",
        /// Take delivered items out of a storage.
        RetrieveDelivered = "retrieve_delivered",
        /// Throw items away at a dump location.
        Dump = "dump",
        /// Assemble a product in a workshop.
        Assemble = "assemble",
        /// Help another agent assemble.
        AssistAssemble = "assist_assemble",
        /// Buy items in a shop.
        Buy = "buy",
        /// Deliver items for a job.
        DeliverJob = "deliver_job",
        /// Charge at a charging station.
        Charge = "charge",
        /// Bid for an auction job.
        BidForJob = "bid_for_job",
        /// Post a job.
        PostJob = "post_job",
        /// Call the breakdown service.
        CallBreakdownService = "call_breakdown_service",
        /// Continue a multi-step action.
        Continue = "continue",
        /// Do nothing this step.
        Skip = "skip",
        /// Abort a multi-step action.
        Abort = "abort",
    }
}

wire_names! {
    /// Outcomes reported in `lastActionResult`.
    pub enum ActionResult {
        /// The action succeeded.
        Successful = "successful",
        /// The action failed.
        Failed = "failed",
        /// Wrong location for this action.
        FailedLocation = "failed_location",
        /// The item does not exist.
        FailedUnknownItem = "failed_unknown_item",
        /// The agent does not exist.
        FailedUnknownAgent = "failed_unknown_agent",
        /// The job does not exist.
        FailedUnknownJob = "failed_unknown_job",
        /// The facility does not exist.
        FailedUnknownFacility = "failed_unknown_facility",
        /// No route to the destination.
        FailedNoRoute = "failed_no_route",
        /// Not enough items.
        FailedItemAmount = "failed_item_amount",
        /// Not enough capacity.
        FailedCapacity = "failed_capacity",
        /// The facility does not support this action.
        FailedWrongFacility = "failed_wrong_facility",
        /// Required tools are missing.
        FailedTools = "failed_tools",
        /// Wrong kind of item.
        FailedItemType = "failed_item_type",
        /// The job is not in the right state.
        FailedJobStatus = "failed_job_status",
        /// Wrong kind of job.
        FailedJobType = "failed_job_type",
        /// The other agent did not cooperate.
        FailedCounterpart = "failed_counterpart",
        /// A parameter was malformed.
        FailedWrongParam = "failed_wrong_param",
        /// The server does not know why.
        FailedUnknownError = "failed_unknown_error",
        /// Dropped at random.
        FailedRandom = "failed_random",
        /// Part of the action succeeded.
        PartialSuccess = "partial_success",
        /// The action had no effect.
        Useless = "useless",
    }
}

/// One action, ready to be encoded.
///
/// Names, items, facilities and jobs are intern ids. Item lists of posted
/// jobs live in the arena handed to the encoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Move towards a facility.
    GotoFacility {
        /// Facility name id.
        facility: u8,
    },
    /// Move towards a grid position.
    GotoPosition {
        /// Target cell.
        pos: Pos,
    },
    /// Hand items to another agent.
    Give {
        /// Receiving agent name id.
        agent: u8,
        /// Items to give.
        item: ItemStack,
    },
    /// Accept items from another agent.
    Receive,
    /// Put items into the current storage.
    Store {
        /// Items to store.
        item: ItemStack,
    },
    /// Take stored items out of the current storage.
    Retrieve {
        /// Items to retrieve.
        item: ItemStack,
    },
    /// Take delivered items out of the current storage.
    RetrieveDelivered {
        /// Items to retrieve.
        item: ItemStack,
    },
    /// Throw items away.
    Dump {
        /// Items to dump.
        item: ItemStack,
    },
    /// Assemble one product.
    Assemble {
        /// Product name id.
        item: u8,
    },
    /// Help another agent assemble.
    AssistAssemble {
        /// Assembling agent name id.
        assembler: u8,
    },
    /// Buy items in the current shop.
    Buy {
        /// Items to buy.
        item: ItemStack,
    },
    /// Deliver items for a job.
    DeliverJob {
        /// Job id.
        job: u8,
    },
    /// Charge at the current station.
    Charge,
    /// Bid for an auction job.
    BidForJob {
        /// Job id.
        job: u8,
        /// Bid.
        price: u32,
    },
    /// Post an auction job.
    PostAuctionJob {
        /// Highest accepted bid.
        max_price: u32,
        /// Fine for the winner if the job is not completed.
        fine: u32,
        /// Steps the job stays open after the auction.
        active_steps: u16,
        /// Steps the auction runs.
        auction_steps: u16,
        /// Storage name id.
        storage: u8,
        /// Required items.
        items: FlatSeq<ItemStack>,
    },
    /// Post a priced job.
    PostPricedJob {
        /// Reward.
        price: u32,
        /// Steps the job stays open.
        active_steps: u16,
        /// Storage name id.
        storage: u8,
        /// Required items.
        items: FlatSeq<ItemStack>,
    },
    /// Call the breakdown service.
    CallBreakdownService,
    /// Continue the current multi-step action.
    Continue,
    /// Do nothing.
    Skip,
    /// Abort the current multi-step action.
    Abort,
}

impl Action {
    /// The wire kind of this action.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::GotoFacility { .. } | Self::GotoPosition { .. } => ActionKind::Goto,
            Self::Give { .. } => ActionKind::Give,
            Self::Receive => ActionKind::Receive,
            Self::Store { .. } => ActionKind::Store,
            Self::Retrieve { .. } => ActionKind::Retrieve,
            Self::RetrieveDelivered { .. } => ActionKind::RetrieveDelivered,
            Self::Dump { .. } => ActionKind::Dump,
            Self::Assemble { .. } => ActionKind::Assemble,
            Self::AssistAssemble { .. } => ActionKind::AssistAssemble,
            Self::Buy { .. } => ActionKind::Buy,
            Self::DeliverJob { .. } => ActionKind::DeliverJob,
            Self::Charge => ActionKind::Charge,
            Self::BidForJob { .. } => ActionKind::BidForJob,
            Self::PostAuctionJob { .. } | Self::PostPricedJob { .. } => ActionKind::PostJob,
            Self::CallBreakdownService => ActionKind::CallBreakdownService,
            Self::Continue => ActionKind::Continue,
            Self::Skip => ActionKind::Skip,
            Self::Abort => ActionKind::Abort,
        }
    }
}
