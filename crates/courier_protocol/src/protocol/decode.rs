//! # Inbound Decoder
//!
//! Turns one server document into one contiguous record in the decode arena.
//!
//! ## Two Passes
//!
//! 1. **Size** - walk the tree read-only and add up the record plus every
//!    nested sequence's header and elements. Nothing is interned.
//! 2. **Reserve + trap** - one `reserve_space`, then the relocation trap.
//! 3. **Fill** - walk the tree again in the same order, writing fields,
//!    interning names and mapping coordinates.
//! 4. **Release** - disarm the trap; written bytes must equal reserved bytes.
//!
//! Both passes enumerate children through the same helpers, so a child the
//! sizing pass did not count is never filled.

use std::mem::size_of;

use bytemuck::Pod;
use courier_core::{Arena, Counter, FlatSeq};
use roxmltree::{Document, Node};
use tracing::debug;

use super::action::{ActionKind, ActionResult};
use super::context::ProtocolContext;
use super::error::{ProtocolError, ProtocolResult};
use super::records::{
    AuctionJob, AuthResponse, ChargingStation, Entity, Facility, ItemStack, JobItem,
    MessageHeader, MessageKind, Perception, Pos, PricedJob, Product, Role, SelfStatus, SimEnd,
    Simulation, Team,
};

/// Facility kinds that decode into plain [`Facility`] records, in fill order.
const PLAIN_FACILITIES: [&str; 4] = ["dumpLocation", "shop", "storage", "workshop"];

/// Location of a decoded message inside the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decoded {
    /// Offset of the [`MessageHeader`].
    pub offset: usize,
    /// Message kind.
    pub kind: MessageKind,
    /// Server timestamp.
    pub timestamp: u64,
}

impl Decoded {
    /// Re-reads a message header stored at `offset`.
    #[must_use]
    pub fn at(arena: &Arena, offset: usize) -> Option<Self> {
        let header = arena.try_get::<MessageHeader>(offset)?;
        Some(Self {
            offset,
            kind: MessageKind::from_u8(header.kind)?,
            timestamp: header.timestamp,
        })
    }

    /// Offset of the body record.
    #[inline]
    #[must_use]
    pub const fn body_offset(&self) -> usize {
        self.offset + MessageHeader::SIZE
    }

    /// The body of an `auth-response`.
    #[must_use]
    pub fn auth_response(&self, arena: &Arena) -> Option<AuthResponse> {
        self.body(MessageKind::AuthResponse, arena)
    }

    /// The body of a `sim-start`.
    #[must_use]
    pub fn simulation(&self, arena: &Arena) -> Option<Simulation> {
        self.body(MessageKind::SimStart, arena)
    }

    /// The body of a `request-action`.
    #[must_use]
    pub fn perception(&self, arena: &Arena) -> Option<Perception> {
        self.body(MessageKind::RequestAction, arena)
    }

    /// The body of a `sim-end`.
    #[must_use]
    pub fn sim_end(&self, arena: &Arena) -> Option<SimEnd> {
        self.body(MessageKind::SimEnd, arena)
    }

    fn body<T: Pod>(&self, kind: MessageKind, arena: &Arena) -> Option<T> {
        if self.kind == kind {
            arena.try_get(self.body_offset())
        } else {
            None
        }
    }
}

/// Decodes one frame into `arena`, appending after its current end.
///
/// Trailing NUL bytes are ignored. On error nothing is left behind in the
/// arena.
///
/// # Errors
///
/// Any [`ProtocolError`] describing why the document is unusable.
///
/// # Panics
///
/// Panics if the sizing and fill passes disagree, or (debug builds) if the
/// arena relocates during the fill pass.
pub fn decode_message(
    frame: &[u8],
    context: &mut ProtocolContext,
    arena: &mut Arena,
) -> ProtocolResult<Decoded> {
    let document = Document::parse(frame_text(frame)?)?;
    let (message, kind) = message_root(&document)?;
    let timestamp = uint64(message, "timestamp")?;
    let body = message_body(message, kind)?;
    let needed = MessageHeader::SIZE + body_space(kind, body)?;
    let header = MessageHeader::new(kind, timestamp);

    let offset = match (kind, body) {
        (MessageKind::RequestAction, Some(perception)) => {
            freeze_grid(perception, context)?;
            two_pass(arena, needed, |arena| {
                arena.emplace_back(&header);
                fill_request_action(perception, context, arena)
            })?
        }
        (MessageKind::SimStart, Some(simulation)) => two_pass(arena, needed, |arena| {
            arena.emplace_back(&header);
            fill_sim_start(simulation, context, arena)
        })?,
        (MessageKind::AuthResponse, Some(auth)) => {
            let record = auth_response(auth)?;
            two_pass(arena, needed, |arena| {
                arena.emplace_back(&header);
                arena.emplace_back(&record);
                Ok(())
            })?
        }
        (MessageKind::SimEnd, Some(result)) => {
            let record = SimEnd {
                score: int(result, "score")?,
                ranking: int(result, "ranking")?,
                _padding: [0; 2],
            };
            two_pass(arena, needed, |arena| {
                arena.emplace_back(&header);
                arena.emplace_back(&record);
                Ok(())
            })?
        }
        _ => two_pass(arena, needed, |arena| {
            arena.emplace_back(&header);
            Ok(())
        })?,
    };

    debug!(kind = kind.as_str(), timestamp, bytes = needed, "decoded message");
    Ok(Decoded {
        offset,
        kind,
        timestamp,
    })
}

/// Runs only the sizing pass: the bytes `decode_message` would append.
///
/// # Errors
///
/// Same document errors as [`decode_message`], except those only the fill
/// pass can detect (intern overflow, bad numbers inside sequences).
pub fn required_space(frame: &[u8]) -> ProtocolResult<usize> {
    let document = Document::parse(frame_text(frame)?)?;
    let (message, kind) = message_root(&document)?;
    let body = message_body(message, kind)?;
    Ok(MessageHeader::SIZE + body_space(kind, body)?)
}

/// Reserves `needed` bytes, fills under the trap and checks the byte count.
fn two_pass<F>(arena: &mut Arena, needed: usize, fill: F) -> ProtocolResult<usize>
where
    F: FnOnce(&mut Arena) -> ProtocolResult<()>,
{
    let start = arena.size();
    arena.reserve_space(needed);
    arena.trap(true);
    let filled = fill(arena);
    arena.trap(false);

    if let Err(err) = filled {
        arena.resize(start);
        return Err(err);
    }
    let written = arena.size() - start;
    assert_eq!(
        written, needed,
        "fill pass wrote {written} bytes, sizing pass reserved {needed}"
    );
    Ok(start)
}

fn frame_text(frame: &[u8]) -> ProtocolResult<&str> {
    let end = frame.iter().position(|&b| b == 0).unwrap_or(frame.len());
    Ok(std::str::from_utf8(&frame[..end])?)
}

fn message_root<'a, 'i>(document: &'a Document<'i>) -> ProtocolResult<(Node<'a, 'i>, MessageKind)> {
    let message = document.root_element();
    if !message.has_tag_name("message") {
        return Err(ProtocolError::MissingElement("message"));
    }
    let name = attr(message, "type")?;
    let kind = MessageKind::from_type_str(name)
        .ok_or_else(|| ProtocolError::UnknownMessageType(name.to_owned()))?;
    Ok((message, kind))
}

fn message_body<'a, 'i>(
    message: Node<'a, 'i>,
    kind: MessageKind,
) -> ProtocolResult<Option<Node<'a, 'i>>> {
    let tag = match kind {
        MessageKind::AuthResponse => "authentication",
        MessageKind::SimStart => "simulation",
        MessageKind::SimEnd => "sim-result",
        MessageKind::RequestAction => "perception",
        MessageKind::Bye => return Ok(None),
    };
    required_child(message, tag).map(Some)
}

// =============================================================================
// Tree navigation
// =============================================================================

fn child<'a, 'i>(node: Node<'a, 'i>, tag: &str) -> Option<Node<'a, 'i>> {
    node.children().find(|n| n.has_tag_name(tag))
}

fn required_child<'a, 'i>(node: Node<'a, 'i>, tag: &'static str) -> ProtocolResult<Node<'a, 'i>> {
    child(node, tag).ok_or(ProtocolError::MissingElement(tag))
}

/// Children of `parent` named `tag`. A missing parent has no children.
fn elements<'a, 'i>(
    parent: Option<Node<'a, 'i>>,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'i>> {
    parent
        .into_iter()
        .flat_map(|p| p.children())
        .filter(move |n| n.has_tag_name(tag))
}

/// Children named `tag` of the `container` child of `node`.
fn nested<'a, 'i>(
    node: Node<'a, 'i>,
    container: &'static str,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'i>> {
    elements(child(node, container), tag)
}

/// All element children of `parent`, whatever their tag.
fn all_elements<'a, 'i>(parent: Option<Node<'a, 'i>>) -> impl Iterator<Item = Node<'a, 'i>> {
    parent
        .into_iter()
        .flat_map(|p| p.children())
        .filter(Node::is_element)
}

// =============================================================================
// Attributes
// =============================================================================

fn attr<'a>(node: Node<'a, '_>, name: &'static str) -> ProtocolResult<&'a str> {
    node.attribute(name)
        .ok_or_else(|| ProtocolError::MissingAttribute {
            element: node.tag_name().name().to_owned(),
            attribute: name,
        })
}

fn int<T: TryFrom<i64>>(node: Node<'_, '_>, name: &'static str) -> ProtocolResult<T> {
    let text = attr(node, name)?;
    let value: i64 = text.trim().parse().map_err(|_| ProtocolError::InvalidNumber {
        attribute: name,
        value: text.to_owned(),
    })?;
    T::try_from(value).map_err(|_| ProtocolError::OutOfRange {
        attribute: name,
        value,
    })
}

fn int_or<T: TryFrom<i64>>(node: Node<'_, '_>, name: &'static str, default: T) -> ProtocolResult<T> {
    if node.has_attribute(name) {
        int(node, name)
    } else {
        Ok(default)
    }
}

fn uint64(node: Node<'_, '_>, name: &'static str) -> ProtocolResult<u64> {
    let text = attr(node, name)?;
    text.trim().parse().map_err(|_| ProtocolError::InvalidNumber {
        attribute: name,
        value: text.to_owned(),
    })
}

fn float(node: Node<'_, '_>, name: &'static str) -> ProtocolResult<f64> {
    let text = attr(node, name)?;
    text.trim().parse().map_err(|_| ProtocolError::InvalidNumber {
        attribute: name,
        value: text.to_owned(),
    })
}

/// Loose boolean: true if the value starts with `1`, `t`, `T`, `y` or `Y`.
fn flag(node: Node<'_, '_>, name: &'static str) -> bool {
    node.attribute(name)
        .and_then(|value| value.bytes().next())
        .is_some_and(|first| matches!(first, b'1' | b't' | b'T' | b'y' | b'Y'))
}

fn name_id(node: Node<'_, '_>, name: &'static str, context: &mut ProtocolContext) -> ProtocolResult<u8> {
    context.intern(attr(node, name)?)
}

fn coordinates(node: Node<'_, '_>) -> ProtocolResult<(f64, f64)> {
    Ok((float(node, "lat")?, float(node, "lon")?))
}

fn position(node: Node<'_, '_>, context: &ProtocolContext) -> ProtocolResult<Pos> {
    let (lat, lon) = coordinates(node)?;
    context.grid().to_grid(lat, lon)
}

// =============================================================================
// Sizing pass
// =============================================================================

/// Bytes of a sequence of `count` elements, or an error if `C` cannot count them.
fn seq_space<T: Pod, C: Counter>(count: usize, element: &'static str) -> ProtocolResult<usize> {
    if count > C::MAX {
        return Err(ProtocolError::TooManyElements {
            element,
            count,
            max: C::MAX,
        });
    }
    Ok(FlatSeq::<T, C>::space_for(count))
}

fn body_space(kind: MessageKind, body: Option<Node<'_, '_>>) -> ProtocolResult<usize> {
    match (kind, body) {
        (MessageKind::AuthResponse, _) => Ok(size_of::<AuthResponse>()),
        (MessageKind::SimEnd, _) => Ok(size_of::<SimEnd>()),
        (MessageKind::SimStart, Some(simulation)) => sim_start_space(simulation),
        (MessageKind::RequestAction, Some(perception)) => request_action_space(perception),
        _ => Ok(0),
    }
}

fn sim_start_space(simulation: Node<'_, '_>) -> ProtocolResult<usize> {
    let role = required_child(simulation, "role")?;
    let mut space = size_of::<Simulation>();
    space += seq_space::<u8, u8>(elements(Some(role), "tool").count(), "tool")?;
    space += seq_space::<Product, u8>(nested(simulation, "products", "product").count(), "product")?;
    for product in nested(simulation, "products", "product") {
        space += seq_space::<ItemStack, u8>(nested(product, "consumed", "item").count(), "item")?;
        space += seq_space::<u8, u8>(nested(product, "tools", "item").count(), "item")?;
    }
    Ok(space)
}

fn request_action_space(perception: Node<'_, '_>) -> ProtocolResult<usize> {
    let own = required_child(perception, "self")?;
    let team = child(perception, "team");
    let facilities = child(perception, "facilities");
    let jobs = child(perception, "jobs");

    let mut space = size_of::<Perception>();
    space += seq_space::<ItemStack, u8>(nested(own, "items", "item").count(), "item")?;
    space += seq_space::<Pos, u16>(nested(own, "route", "n").count(), "n")?;
    for list in ["jobs-taken", "jobs-posted"] {
        let count = team.map_or(0, |team| elements(child(team, list), "job").count());
        space += seq_space::<u8, u8>(count, "job")?;
    }
    space += seq_space::<Entity, u8>(nested(perception, "entities", "entity").count(), "entity")?;
    space += seq_space::<ChargingStation, u8>(
        elements(facilities, "chargingStation").count(),
        "chargingStation",
    )?;
    for tag in PLAIN_FACILITIES {
        space += seq_space::<Facility, u8>(elements(facilities, tag).count(), tag)?;
    }

    space += seq_space::<AuctionJob, u8>(elements(jobs, "auctionJob").count(), "auctionJob")?;
    for job in elements(jobs, "auctionJob") {
        space += seq_space::<JobItem, u8>(nested(job, "items", "item").count(), "item")?;
    }
    space += seq_space::<PricedJob, u8>(elements(jobs, "pricedJob").count(), "pricedJob")?;
    for job in elements(jobs, "pricedJob") {
        space += seq_space::<JobItem, u8>(nested(job, "items", "item").count(), "item")?;
    }
    Ok(space)
}

// =============================================================================
// Fill pass
// =============================================================================

fn auth_response(auth: Node<'_, '_>) -> ProtocolResult<AuthResponse> {
    let succeeded = match attr(auth, "result")? {
        "ok" => 1,
        "fail" => 0,
        other => {
            return Err(ProtocolError::InvalidFlag {
                attribute: "result",
                value: other.to_owned(),
            })
        }
    };
    Ok(AuthResponse { succeeded })
}

fn fill_sim_start(
    simulation: Node<'_, '_>,
    context: &mut ProtocolContext,
    arena: &mut Arena,
) -> ProtocolResult<()> {
    let role = required_child(simulation, "role")?;
    let mut record = Simulation {
        seed_capital: int(simulation, "seedCapital")?,
        steps: int(simulation, "steps")?,
        id: name_id(simulation, "id", context)?,
        team: name_id(simulation, "team", context)?,
        role: Role {
            name: name_id(role, "name", context)?,
            speed: int(role, "speed")?,
            max_battery: int(role, "maxBattery")?,
            max_load: int(role, "maxLoad")?,
            ..Role::default()
        },
        ..Simulation::default()
    };
    let at = arena.emplace_back(&record);

    let tools = FlatSeq::<u8>::init(arena);
    for tool in elements(Some(role), "tool") {
        tools.push_back(&name_id(tool, "name", context)?, arena);
    }

    let products = FlatSeq::<Product>::init(arena);
    for product in nested(simulation, "products", "product") {
        let record = Product {
            name: name_id(product, "name", context)?,
            volume: int(product, "volume")?,
            assembled: u8::from(flag(product, "assembled")),
            ..Product::default()
        };
        products.push_back(&record, arena);
    }
    for (index, product) in nested(simulation, "products", "product").enumerate() {
        let consumed = FlatSeq::<ItemStack>::init(arena);
        for item in nested(product, "consumed", "item") {
            let stack = ItemStack::new(name_id(item, "name", context)?, int(item, "amount")?);
            consumed.push_back(&stack, arena);
        }
        let tools = FlatSeq::<u8>::init(arena);
        for tool in nested(product, "tools", "item") {
            tools.push_back(&name_id(tool, "name", context)?, arena);
        }
        products.update(arena, index, |record| {
            record.consumed = consumed.raw();
            record.tools = tools.raw();
        });
    }

    record.role.tools = tools.raw();
    record.products = products.raw();
    arena.emplace(at, &record);
    Ok(())
}

/// Fixes the grid from the first perception: own position, every facility
/// and every entity.
fn freeze_grid(perception: Node<'_, '_>, context: &mut ProtocolContext) -> ProtocolResult<()> {
    if context.grid().is_frozen() {
        return Ok(());
    }
    let own = required_child(perception, "self")?;
    let points = std::iter::once(own)
        .chain(all_elements(child(perception, "facilities")))
        .chain(all_elements(child(perception, "entities")))
        .map(coordinates)
        .collect::<ProtocolResult<Vec<_>>>()?;
    context.grid_mut().freeze(points);
    Ok(())
}

fn last_action(own: Node<'_, '_>) -> ProtocolResult<(ActionKind, ActionResult)> {
    let action = match own.attribute("lastAction").unwrap_or_default() {
        "" => ActionKind::NoAction,
        name => ActionKind::from_name(name)
            .ok_or_else(|| ProtocolError::UnknownAction(name.to_owned()))?,
    };
    let result = match own.attribute("lastActionResult").unwrap_or_default() {
        "" => ActionResult::Successful,
        name => ActionResult::from_name(name)
            .ok_or_else(|| ProtocolError::UnknownActionResult(name.to_owned()))?,
    };
    Ok((action, result))
}

fn fill_request_action(
    perception: Node<'_, '_>,
    context: &mut ProtocolContext,
    arena: &mut Arena,
) -> ProtocolResult<()> {
    let own = required_child(perception, "self")?;
    let team = child(perception, "team");
    let facilities = child(perception, "facilities");
    let jobs = child(perception, "jobs");

    let (action, result) = last_action(own)?;
    let in_facility = match attr(own, "inFacility")? {
        "none" => 0,
        name => context.intern(name)?,
    };
    let mut record = Perception {
        deadline: uint64(perception, "deadline")?,
        id: int(perception, "id")?,
        simulation_step: int(required_child(perception, "simulation")?, "step")?,
        self_status: SelfStatus {
            charge: int(own, "charge")?,
            load: int(own, "load")?,
            pos: position(own, context)?,
            last_action: action as u8,
            last_action_result: result as u8,
            in_facility,
            f_position: int_or(own, "fPosition", -1)?,
            ..SelfStatus::default()
        },
        team: Team {
            money: match team {
                Some(team) => int_or(team, "money", 0)?,
                None => 0,
            },
            ..Team::default()
        },
        ..Perception::default()
    };
    let at = arena.emplace_back(&record);

    let items = FlatSeq::<ItemStack>::init(arena);
    for item in nested(own, "items", "item") {
        items.push_back(&ItemStack::new(name_id(item, "name", context)?, int(item, "amount")?), arena);
    }
    record.self_status.items = items.raw();

    let route = FlatSeq::<Pos, u16>::init(arena);
    for node in nested(own, "route", "n") {
        route.push_back(&position(node, context)?, arena);
    }
    record.self_status.route = route.raw();

    record.team.jobs_taken = job_ids(team, "jobs-taken", context, arena)?.raw();
    record.team.jobs_posted = job_ids(team, "jobs-posted", context, arena)?.raw();

    let entities = FlatSeq::<Entity>::init(arena);
    for entity in nested(perception, "entities", "entity") {
        let record = Entity {
            name: name_id(entity, "name", context)?,
            team: name_id(entity, "team", context)?,
            pos: position(entity, context)?,
            role: name_id(entity, "role", context)?,
        };
        entities.push_back(&record, arena);
    }
    record.entities = entities.raw();

    let stations = FlatSeq::<ChargingStation>::init(arena);
    for station in elements(facilities, "chargingStation") {
        let q_size = match child(station, "info") {
            Some(info) => int(info, "qSize")?,
            None => -1,
        };
        let record = ChargingStation {
            name: name_id(station, "name", context)?,
            pos: position(station, context)?,
            rate: int(station, "rate")?,
            price: int(station, "price")?,
            slots: int(station, "slots")?,
            q_size,
        };
        stations.push_back(&record, arena);
    }
    record.charging_stations = stations.raw();

    let [dumps, shops, storages, workshops] = PLAIN_FACILITIES;
    record.dump_locations = plain_facilities(facilities, dumps, context, arena)?.raw();
    record.shops = plain_facilities(facilities, shops, context, arena)?.raw();
    record.storages = plain_facilities(facilities, storages, context, arena)?.raw();
    record.workshops = plain_facilities(facilities, workshops, context, arena)?.raw();

    let auction = FlatSeq::<AuctionJob>::init(arena);
    for job in elements(jobs, "auctionJob") {
        let record = AuctionJob {
            id: name_id(job, "id", context)?,
            storage: name_id(job, "storage", context)?,
            begin: int(job, "begin")?,
            end: int(job, "end")?,
            fine: int(job, "fine")?,
            max_bid: int(job, "maxBid")?,
            ..AuctionJob::default()
        };
        auction.push_back(&record, arena);
    }
    for (index, job) in elements(jobs, "auctionJob").enumerate() {
        let items = job_items(job, context, arena)?;
        auction.update(arena, index, |record| record.items = items.raw());
    }
    record.auction_jobs = auction.raw();

    let priced = FlatSeq::<PricedJob>::init(arena);
    for job in elements(jobs, "pricedJob") {
        let record = PricedJob {
            id: name_id(job, "id", context)?,
            storage: name_id(job, "storage", context)?,
            begin: int(job, "begin")?,
            end: int(job, "end")?,
            reward: int(job, "reward")?,
            ..PricedJob::default()
        };
        priced.push_back(&record, arena);
    }
    for (index, job) in elements(jobs, "pricedJob").enumerate() {
        let items = job_items(job, context, arena)?;
        priced.update(arena, index, |record| record.items = items.raw());
    }
    record.priced_jobs = priced.raw();

    arena.emplace(at, &record);
    Ok(())
}

fn job_ids(
    team: Option<Node<'_, '_>>,
    list: &'static str,
    context: &mut ProtocolContext,
    arena: &mut Arena,
) -> ProtocolResult<FlatSeq<u8>> {
    let ids = FlatSeq::<u8>::init(arena);
    for job in elements(team.and_then(|team| child(team, list)), "job") {
        ids.push_back(&name_id(job, "id", context)?, arena);
    }
    Ok(ids)
}

fn plain_facilities(
    facilities: Option<Node<'_, '_>>,
    tag: &'static str,
    context: &mut ProtocolContext,
    arena: &mut Arena,
) -> ProtocolResult<FlatSeq<Facility>> {
    let seq = FlatSeq::<Facility>::init(arena);
    for facility in elements(facilities, tag) {
        let record = Facility {
            name: name_id(facility, "name", context)?,
            pos: position(facility, context)?,
        };
        seq.push_back(&record, arena);
    }
    Ok(seq)
}

fn job_items(
    job: Node<'_, '_>,
    context: &mut ProtocolContext,
    arena: &mut Arena,
) -> ProtocolResult<FlatSeq<JobItem>> {
    let items = FlatSeq::<JobItem>::init(arena);
    for item in nested(job, "items", "item") {
        let record = JobItem {
            item: name_id(item, "name", context)?,
            amount: int(item, "amount")?,
            delivered: int_or(item, "delivered", 0)?,
            _padding: 0,
        };
        items.push_back(&record, arena);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &str, context: &mut ProtocolContext, arena: &mut Arena) -> ProtocolResult<Decoded> {
        decode_message(text.as_bytes(), context, arena)
    }

    #[test]
    fn test_auth_response() {
        let mut context = ProtocolContext::new();
        let mut arena = Arena::new();
        let decoded = decode(
            r#"<message type="auth-response" timestamp="17"><authentication result="ok"/></message>"#,
            &mut context,
            &mut arena,
        )
        .unwrap();
        assert_eq!(decoded.kind, MessageKind::AuthResponse);
        assert_eq!(decoded.timestamp, 17);
        assert!(decoded.auth_response(&arena).unwrap().succeeded());
        assert_eq!(decoded.perception(&arena), None);
        assert_eq!(arena.size(), MessageHeader::SIZE + 1);
    }

    #[test]
    fn test_auth_response_bad_flag() {
        let mut context = ProtocolContext::new();
        let mut arena = Arena::new();
        let err = decode(
            r#"<message type="auth-response" timestamp="1"><authentication result="maybe"/></message>"#,
            &mut context,
            &mut arena,
        )
        .unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidFlag { attribute: "result", .. }));
        assert!(arena.is_empty());
    }

    #[test]
    fn test_sim_end_and_bye() {
        let mut context = ProtocolContext::new();
        let mut arena = Arena::new();
        let end = decode(
            r#"<message type="sim-end" timestamp="5"><sim-result ranking="2" score="-40"/></message>"#,
            &mut context,
            &mut arena,
        )
        .unwrap();
        let result = end.sim_end(&arena).unwrap();
        assert_eq!((result.ranking, result.score), (2, -40));

        let bye = decode(r#"<message type="bye" timestamp="6"/>"#, &mut context, &mut arena).unwrap();
        assert_eq!(bye.kind, MessageKind::Bye);
        assert_eq!(bye.offset, MessageHeader::SIZE + size_of::<SimEnd>());
        assert_eq!(Decoded::at(&arena, bye.offset), Some(bye));
    }

    #[test]
    fn test_unknown_message_type() {
        let mut context = ProtocolContext::new();
        let mut arena = Arena::new();
        let err = decode(r#"<message type="hello" timestamp="1"/>"#, &mut context, &mut arena).unwrap_err();
        assert_eq!(err, ProtocolError::UnknownMessageType("hello".to_owned()));
    }

    #[test]
    fn test_malformed_documents() {
        let mut context = ProtocolContext::new();
        let mut arena = Arena::new();
        assert!(matches!(
            decode("<message", &mut context, &mut arena),
            Err(ProtocolError::Xml(_))
        ));
        assert_eq!(
            decode(r#"<envelope type="bye"/>"#, &mut context, &mut arena),
            Err(ProtocolError::MissingElement("message"))
        );
        assert!(matches!(
            decode(r#"<message type="bye"/>"#, &mut context, &mut arena),
            Err(ProtocolError::MissingAttribute { attribute: "timestamp", .. })
        ));
        assert!(matches!(
            decode_message(&[0xFF, 0xFE], &mut context, &mut arena),
            Err(ProtocolError::Utf8(_))
        ));
    }

    #[test]
    fn test_trailing_nul_is_ignored() {
        let mut context = ProtocolContext::new();
        let mut arena = Arena::new();
        let frame = b"<message type=\"bye\" timestamp=\"9\"/>\0";
        assert_eq!(decode_message(frame, &mut context, &mut arena).unwrap().timestamp, 9);
    }

    #[test]
    fn test_failed_fill_leaves_arena_unchanged() {
        let mut context = ProtocolContext::new();
        let mut arena = Arena::new();
        arena.append(b"keep");
        let text = r#"<message type="sim-start" timestamp="1">
            <simulation id="s" seedCapital="10" steps="300" team="A">
                <role name="car" speed="3" maxBattery="500" maxLoad="x"/>
            </simulation></message>"#;
        let err = decode(text, &mut context, &mut arena).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidNumber { attribute: "maxLoad", .. }));
        assert_eq!(arena.as_slice(), b"keep");
        assert!(!arena.is_trapped());
    }

    #[test]
    fn test_number_out_of_range() {
        let mut context = ProtocolContext::new();
        let mut arena = Arena::new();
        let text = r#"<message type="sim-end" timestamp="1"><sim-result ranking="70000" score="0"/></message>"#;
        assert_eq!(
            decode(text, &mut context, &mut arena),
            Err(ProtocolError::OutOfRange {
                attribute: "ranking",
                value: 70000
            })
        );
    }

    #[test]
    fn test_too_many_elements() {
        let tools: String = (0..300).map(|i| format!(r#"<tool name="t{i}"/>"#)).collect();
        let text = format!(
            r#"<message type="sim-start" timestamp="1"><simulation id="s" seedCapital="1" steps="1" team="A"><role name="r" speed="1" maxBattery="1" maxLoad="1">{tools}</role></simulation></message>"#
        );
        assert_eq!(
            required_space(text.as_bytes()),
            Err(ProtocolError::TooManyElements {
                element: "tool",
                count: 300,
                max: 255
            })
        );
    }

    #[test]
    fn test_loose_flags() {
        let document = Document::parse(r#"<p a="true" b="0" c="Yes" d=""/>"#).unwrap();
        let node = document.root_element();
        assert!(flag(node, "a"));
        assert!(!flag(node, "b"));
        assert!(flag(node, "c"));
        assert!(!flag(node, "d"));
        assert!(!flag(node, "missing"));
    }
}
