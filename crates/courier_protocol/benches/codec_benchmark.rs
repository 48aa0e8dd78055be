//! # Codec Benchmark
//!
//! Run with: `cargo bench --package courier_protocol`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use courier_core::{Arena, FlatSeq};
use courier_protocol::{
    action_document, decode_message, write_document, Action, ItemStack, ProtocolContext,
};

/// A perception with a realistic city: 16 agents, 40 facilities, 20 jobs.
fn perception() -> String {
    let mut text = String::from(
        r#"<message timestamp="1478000000000" type="request-action"><perception deadline="1478000004000" id="3"><simulation step="12"/>"#,
    );
    text.push_str(
        r#"<self name="a1" team="A" role="Car" lat="51.48" lon="12.33" charge="400" load="20" lastAction="goto" lastActionResult="successful" inFacility="none" fPosition="-1"><items><item name="item1" amount="2"/></items><route>"#,
    );
    for i in 0..30 {
        text.push_str(&format!(r#"<n i="{i}" lat="51.4{i:02}" lon="12.3{i:02}"/>"#));
    }
    text.push_str(r#"</route></self><team money="48000"><jobs-taken/><jobs-posted/></team><entities>"#);
    for i in 0..16 {
        text.push_str(&format!(r#"<entity name="a{i}" team="A" role="Car" lat="51.4{i:02}" lon="12.3{i:02}"/>"#));
    }
    text.push_str("</entities><facilities>");
    for i in 0..10 {
        text.push_str(&format!(
            r#"<chargingStation name="charging{i}" lat="51.45{i}" lon="12.35{i}" rate="50" price="5" slots="2"/><shop name="shop{i}" lat="51.46{i}" lon="12.36{i}"/><storage name="storage{i}" lat="51.47{i}" lon="12.37{i}"/><workshop name="workshop{i}" lat="51.49{i}" lon="12.39{i}"/>"#
        ));
    }
    text.push_str("</facilities><jobs>");
    for i in 0..20 {
        text.push_str(&format!(
            r#"<pricedJob id="job{i}" storage="storage{}" begin="1" end="200" reward="4000"><items><item name="item{}" amount="3"/><item name="item{}" amount="1"/></items></pricedJob>"#,
            i % 10,
            i % 7,
            i % 5
        ));
    }
    text.push_str("</jobs></perception></message>");
    text
}

fn bench_decode_perception(c: &mut Criterion) {
    let text = perception();
    let mut context = ProtocolContext::new();
    let mut arena = Arena::with_capacity(150 * 1024);
    c.bench_function("decode_perception", |b| {
        b.iter(|| {
            arena.reset();
            let decoded = decode_message(black_box(text.as_bytes()), &mut context, &mut arena).unwrap();
            black_box(decoded.offset)
        });
    });
}

fn bench_encode_post_job(c: &mut Criterion) {
    let mut context = ProtocolContext::new();
    let storage = context.intern("storage1").unwrap();
    let mut items_arena = Arena::new();
    let items = FlatSeq::<ItemStack>::init(&mut items_arena);
    for i in 0..5 {
        let item = context.intern(&format!("item{i}")).unwrap();
        items.push_back(&ItemStack::new(item, 2), &mut items_arena);
    }
    let action = Action::PostPricedJob {
        price: 3000,
        active_steps: 100,
        storage,
        items,
    };

    let mut out = Arena::with_capacity(4096);
    c.bench_function("encode_post_priced_job", |b| {
        b.iter(|| {
            out.reset();
            let document = action_document(7, black_box(&action), &context, &items_arena).unwrap();
            black_box(write_document(&document, &mut out).unwrap())
        });
    });
}

criterion_group!(benches, bench_decode_perception, bench_encode_post_job);
criterion_main!(benches);
