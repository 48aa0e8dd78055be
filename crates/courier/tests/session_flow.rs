//! Whole sessions against scripted transports.

use std::fs;
use std::path::PathBuf;

use courier::{
    run_supervised_with, AgentConfig, ClientConfig, Mode, Planner, Round, Session, StatisticsLog,
    StatsError,
};
use courier_core::{Arena, FlatSeq};
use courier_protocol::{Action, ItemStack, MemoryTransport, TransportError, TransportStats};

const AUTH_OK: &str =
    r#"<message type="auth-response" timestamp="1"><authentication result="ok"/></message>"#;

const BYE: &str = r#"<message type="bye" timestamp="99"/>"#;

fn sim_start(agent: &str) -> String {
    format!(
        r#"<message type="sim-start" timestamp="2">
  <simulation id="sim-{agent}" seedCapital="50000" steps="3" team="A">
    <role name="Truck" speed="1" maxBattery="1000" maxLoad="3000"/>
    <products>
      <product name="item1" volume="5" assembled="false"/>
    </products>
  </simulation>
</message>"#
    )
}

fn request_action(agent: &str, id: u32, step: u16, money: i32) -> String {
    format!(
        r#"<message type="request-action" timestamp="3">
  <perception deadline="4" id="{id}">
    <simulation step="{step}"/>
    <self name="{agent}" team="A" role="Truck" lat="51.48" lon="12.33" charge="900" load="0"
          lastAction="skip" lastActionResult="successful" inFacility="none"/>
    <team money="{money}"/>
    <entities/>
    <facilities>
      <shop name="shop1" lat="51.50" lon="12.40"/>
      <storage name="storage1" lat="51.46" lon="12.31"/>
    </facilities>
    <jobs>
      <pricedJob id="job{step}" storage="storage1" begin="0" end="10" reward="100">
        <items><item name="item1" amount="1"/></items>
      </pricedJob>
    </jobs>
  </perception>
</message>"#
    )
}

const SIM_END: &str =
    r#"<message type="sim-end" timestamp="5"><sim-result ranking="1" score="12"/></message>"#;

/// A full session for one agent: login, one simulation of two rounds, bye.
fn frames(agent: &str) -> Vec<String> {
    vec![
        AUTH_OK.to_owned(),
        sim_start(agent),
        request_action(agent, 10, 0, 50_000),
        request_action(agent, 11, 1, 49_000),
        SIM_END.to_owned(),
        BYE.to_owned(),
    ]
}

fn script(agent: &str) -> MemoryTransport {
    let mut transport = MemoryTransport::new();
    for frame in frames(agent) {
        transport.push_frame(&frame);
    }
    transport
}

/// Posts a priced job with one item on every round.
struct PostingPlanner {
    rounds: u32,
}

impl Planner for PostingPlanner {
    fn on_request_action(&mut self, round: &Round<'_>) {
        assert_eq!(round.perceptions.len(), 2);
        self.rounds += 1;
    }

    fn act(&mut self, _agent: usize, round: &Round<'_>, scratch: &mut Arena) -> Action {
        let storage = round.context.lookup("storage1").unwrap();
        let item = round.context.lookup("item1").unwrap();
        let items = FlatSeq::<ItemStack>::init(scratch);
        items.push_back(&ItemStack::new(item, 2), scratch);
        Action::PostPricedJob {
            price: 300,
            active_steps: 20,
            storage,
            items,
        }
    }
}

fn temp_path(name: &str) -> PathBuf {
    let id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("courier_{name}_{id}"))
}

#[test]
fn test_full_session() {
    let mut session = Session::new(4096);
    session.add_agent(&AgentConfig::new("a1", "pw", false), script("a1"));
    session.add_agent(&AgentConfig::new("a2", "pw", true), script("a2"));

    let mut planner = PostingPlanner { rounds: 0 };
    let outcome = session.run(&mut planner).unwrap();
    assert_eq!((outcome.simulations, outcome.rounds), (1, 2));
    assert_eq!(planner.rounds, 2);

    let sent_bytes: usize = (0..2)
        .flat_map(|i| session.transport(i).unwrap().sent().iter().map(Vec::len))
        .sum();
    let received_bytes: usize = ["a1", "a2"]
        .iter()
        .flat_map(|agent| frames(agent))
        .map(|frame| frame.len() + 1)
        .sum();
    assert_eq!(
        outcome.traffic,
        TransportStats {
            sends: 6,
            receives: 12,
            bytes_sent: sent_bytes as u64,
            bytes_received: received_bytes as u64,
        }
    );

    let planned = session.transport(0).unwrap().sent_documents();
    assert_eq!(planned.len(), 3);
    assert!(planned[0].starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(planned[0].contains(r#"type="auth-request""#));
    assert!(planned[1].contains(r#"<action id="10" type="post_job""#));
    assert!(planned[1].contains("item1=&quot;item1&quot;"));
    assert!(planned[1].contains("amount1=&quot;2&quot;"));
    assert!(planned[2].contains(r#"id="11""#));
    assert!(session.transport(0).unwrap().sent().iter().all(|bytes| bytes.ends_with(&[0])));

    // The dummy answers every round with a skip.
    let dummy = session.transport(1).unwrap().sent_documents();
    assert_eq!(dummy.len(), 3);
    assert!(dummy[1].contains(r#"type="skip""#));
    assert!(dummy[1].contains(r#"param="""#));
}

#[test]
fn test_dump_xml_records_both_directions() {
    let path = temp_path("dump.xml");
    let mut session = Session::new(4096);
    session.dump_to(&path).unwrap();
    session.add_agent(&AgentConfig::new("a1", "pw", false), script("a1"));
    session.run(&mut courier::SkipPlanner).unwrap();
    drop(session);

    let dump = fs::read_to_string(&path).unwrap();
    assert!(dump.contains("auth-request"));
    assert!(dump.contains("auth-response"));
    assert!(dump.contains(r#"type="bye""#));
    fs::remove_file(&path).ok();
}

#[test]
fn test_run_starts_a_fresh_dump() {
    let path = temp_path("run_dump.xml");
    fs::write(&path, "left over from an earlier run\n").unwrap();
    let config = ClientConfig {
        agents: vec![AgentConfig::new("a1", "pw", false)],
        dump_xml: Some(path.clone()),
        max_sessions: Some(2),
        reconnect_delay_ms: 0,
        ..ClientConfig::default()
    };

    let report = run_supervised_with(&config, |agent: &AgentConfig| Ok(script(&agent.name)));
    assert_eq!(report.failures, 0);

    let dump = fs::read_to_string(&path).unwrap();
    assert!(!dump.contains("left over"));
    assert_eq!(dump.matches("auth-request").count(), 2);
    fs::remove_file(&path).ok();
}

#[test]
fn test_stats_mode_appends_one_record_per_session() {
    let stats = temp_path("stats.bin");
    let config = ClientConfig {
        mode: Mode::Stats,
        agents: vec![AgentConfig::new("a%", "pw", false)],
        agents_per_team: 2,
        statistics_file: Some(stats.clone()),
        max_sessions: Some(2),
        reconnect_delay_ms: 0,
        ..ClientConfig::default()
    };

    let report = run_supervised_with(&config, |agent: &AgentConfig| Ok(script(&agent.name)));
    assert_eq!(report.sessions, 2);
    assert_eq!(report.failures, 0);
    assert_eq!(report.simulations, 2);

    let log = StatisticsLog::load(&stats).unwrap();
    let records = log.records();
    assert_eq!(records.len(), 2);
    let record = records[0];
    assert_eq!(record.seed_capital, 50_000);
    assert_eq!(record.agents, 2);
    assert_eq!(record.products, 1);
    assert_eq!(record.steps, 2);
    assert_eq!(record.final_money, 49_000);
    assert_eq!(record.distinct_jobs, 2);
    assert_eq!((record.score, record.ranking), (12, 1));
    fs::remove_file(&stats).ok();
}

#[test]
fn test_failed_sessions_are_counted_and_replaced() {
    let config = ClientConfig {
        agents: vec![AgentConfig::new("a1", "pw", false)],
        max_sessions: Some(3),
        reconnect_delay_ms: 0,
        ..ClientConfig::default()
    };
    let mut attempts = 0;
    let report = run_supervised_with(&config, |agent: &AgentConfig| {
        attempts += 1;
        if attempts == 2 {
            Err(TransportError::NotConnected)
        } else {
            Ok(script(&agent.name))
        }
    });
    assert_eq!(report.sessions, 3);
    assert_eq!(report.failures, 1);
    assert_eq!(report.simulations, 2);
}

#[test]
fn test_corrupt_statistics_file_fails_the_session() {
    let stats = temp_path("corrupt.bin");
    fs::write(&stats, [1, 2, 3, 4, 0, 0]).unwrap();
    assert!(matches!(StatisticsLog::load(&stats), Err(StatsError::BadMagic { .. })));

    let config = ClientConfig {
        mode: Mode::Stats,
        agents: vec![AgentConfig::new("a1", "pw", false)],
        statistics_file: Some(stats.clone()),
        max_sessions: Some(1),
        reconnect_delay_ms: 0,
        ..ClientConfig::default()
    };
    let report = run_supervised_with(&config, |agent: &AgentConfig| Ok(script(&agent.name)));
    assert_eq!(report.failures, 1);
    assert_eq!(fs::read(&stats).unwrap(), [1, 2, 3, 4, 0, 0]);
    fs::remove_file(&stats).ok();
}
