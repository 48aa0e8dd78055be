//! # Outbound Encoder
//!
//! Builds the documents the client sends: the login request and the answer
//! to a perception.
//!
//! An action travels as `<action id type param/>`; `param` holds the
//! rendered attribute list of a `<param>` element whose shape depends on the
//! action kind. Item lists become `item1..itemN` followed by
//! `amount1..amountN`.

use courier_core::{Arena, FlatSeq};

use super::action::Action;
use super::context::ProtocolContext;
use super::document::{render_attributes, Element};
use super::error::ProtocolResult;
use super::records::ItemStack;

/// The `auth-request` document.
#[must_use]
pub fn auth_request_document(username: &str, password: &str) -> Element {
    message("auth-request").with_child(
        Element::new("authentication")
            .with_attribute("username", username)
            .with_attribute("password", password),
    )
}

/// The `action` document answering perception `id`.
///
/// # Errors
///
/// See [`action_param`].
pub fn action_document(
    id: u32,
    action: &Action,
    context: &ProtocolContext,
    arena: &Arena,
) -> ProtocolResult<Element> {
    let param = action_param(action, context, arena)?;
    Ok(message("action").with_child(
        Element::new("action")
            .with_attribute("id", id)
            .with_attribute("type", action.kind().as_str())
            .with_attribute("param", render_attributes(&param)),
    ))
}

/// The `<param>` element of an action. Item lists are read from `arena`.
///
/// # Errors
///
/// Returns [`ProtocolError::UnknownId`](super::ProtocolError::UnknownId) for
/// an id the context never handed out, and
/// [`ProtocolError::GridUninitialized`](super::ProtocolError::GridUninitialized)
/// for a position before the first perception.
pub fn action_param(
    action: &Action,
    context: &ProtocolContext,
    arena: &Arena,
) -> ProtocolResult<Element> {
    let mut param = Element::new("param");
    match *action {
        Action::GotoFacility { facility } => {
            param.push_attribute("facility", context.name(facility)?);
        }
        Action::GotoPosition { pos } => {
            let (lat, lon) = context.grid().from_grid(pos)?;
            param.push_attribute("lat", lat);
            param.push_attribute("lon", lon);
        }
        Action::Give { agent, item } => {
            param.push_attribute("agent", context.name(agent)?);
            push_stack(&mut param, item, context)?;
        }
        Action::Store { item }
        | Action::Retrieve { item }
        | Action::RetrieveDelivered { item }
        | Action::Dump { item }
        | Action::Buy { item } => push_stack(&mut param, item, context)?,
        Action::Assemble { item } => {
            param.push_attribute("item", context.name(item)?);
        }
        Action::AssistAssemble { assembler } => {
            param.push_attribute("assembler", context.name(assembler)?);
        }
        Action::DeliverJob { job } => {
            param.push_attribute("job", context.name(job)?);
        }
        Action::BidForJob { job, price } => {
            param.push_attribute("job", context.name(job)?);
            param.push_attribute("price", price);
        }
        Action::PostAuctionJob {
            max_price,
            fine,
            active_steps,
            auction_steps,
            storage,
            items,
        } => {
            param.push_attribute("type", "auction");
            param.push_attribute("max_price", max_price);
            param.push_attribute("fine", fine);
            param.push_attribute("active_steps", active_steps);
            param.push_attribute("auction_steps", auction_steps);
            param.push_attribute("storage", context.name(storage)?);
            push_stack_list(&mut param, items, context, arena)?;
        }
        Action::PostPricedJob {
            price,
            active_steps,
            storage,
            items,
        } => {
            param.push_attribute("type", "priced");
            param.push_attribute("price", price);
            param.push_attribute("active_steps", active_steps);
            param.push_attribute("storage", context.name(storage)?);
            push_stack_list(&mut param, items, context, arena)?;
        }
        Action::Receive
        | Action::Charge
        | Action::CallBreakdownService
        | Action::Continue
        | Action::Skip
        | Action::Abort => {}
    }
    Ok(param)
}

fn message(kind: &str) -> Element {
    Element::new("message").with_attribute("type", kind)
}

fn push_stack(param: &mut Element, stack: ItemStack, context: &ProtocolContext) -> ProtocolResult<()> {
    param.push_attribute("item", context.name(stack.item)?);
    param.push_attribute("amount", stack.amount);
    Ok(())
}

fn push_stack_list(
    param: &mut Element,
    items: FlatSeq<ItemStack>,
    context: &ProtocolContext,
    arena: &Arena,
) -> ProtocolResult<()> {
    for (index, stack) in items.iter(arena).enumerate() {
        param.push_attribute(format!("item{}", index + 1), context.name(stack.item)?);
    }
    for (index, stack) in items.iter(arena).enumerate() {
        param.push_attribute(format!("amount{}", index + 1), stack.amount);
    }
    Ok(())
}
