//! Integration tests for the delivery scheduler.
//!
//! The mock transport's gate holds a send in flight so control signals
//! can be raised at a known point in the iteration, which keeps the
//! pause/abort/stop tests deterministic without timing guesswork.

mod support;

use std::sync::Arc;

use herald_common::{
    campaign::{Campaign, TemplateFields},
    identity::{Identity, IdentityStatus, Recipient},
    notification::{Severity, TracingSink},
};
use herald_delivery::{
    MemoryDeliveryLog, Scheduler, SchedulerConfig, SchedulerError, SchedulerState, SendOutcome,
};
use support::{MockTransport, wait_for};

fn config() -> SchedulerConfig {
    SchedulerConfig {
        send_gap_secs: 0.0,
        send_timeout_secs: 5,
        poll_interval_ms: 10,
        ..SchedulerConfig::default()
    }
}

fn identity(address: &str) -> Identity {
    Identity::new(address, "secret", "Sender")
}

fn campaign(event: &str, recipients: usize) -> Campaign {
    Campaign::new(
        TemplateFields {
            event: event.into(),
            ..TemplateFields::default()
        },
        "Invitation to {event}",
        "Hi {first_name}, see {event}",
        (0..recipients)
            .map(|i| Recipient::new(format!("r{i}@example.com"), format!("R{i}")))
            .collect(),
    )
}

fn build(
    transport: &Arc<MockTransport>,
    config: SchedulerConfig,
) -> (Scheduler, Arc<MemoryDeliveryLog>) {
    let journal = Arc::new(MemoryDeliveryLog::new());
    let scheduler = Scheduler::new(
        config,
        Arc::clone(transport) as Arc<dyn herald_delivery::Transport>,
        Arc::clone(&journal) as Arc<dyn herald_delivery::DeliveryLog>,
        Arc::new(TracingSink),
    );
    (scheduler, journal)
}

async fn wait_idle(scheduler: &Scheduler) {
    wait_for("scheduler to go idle", || {
        scheduler.status().state == SchedulerState::Idle
    })
    .await;
}

#[tokio::test]
async fn drains_campaign_and_rotates_identities() {
    let transport = MockTransport::new();
    let (scheduler, journal) = build(&transport, config());

    scheduler
        .pool()
        .reload(vec![identity("a@example.com"), identity("b@example.com")]);
    scheduler.enqueue(campaign("expo", 3));
    scheduler.start().unwrap();

    wait_idle(&scheduler).await;

    // Rotation is the global recipient index mod the active subset
    let senders: Vec<String> = transport
        .records()
        .into_iter()
        .map(|(sender, _)| sender)
        .collect();
    assert_eq!(senders, vec!["a@example.com", "b@example.com", "a@example.com"]);

    let history = scheduler.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].sent, 3);
    assert_eq!(history[0].recipients_total, 3);

    assert_eq!(journal.entries().len(), 3);
    assert!(journal
        .entries()
        .iter()
        .all(|entry| entry.outcome == SendOutcome::Sent));

    let status = scheduler.status();
    assert_eq!(status.state, SchedulerState::Idle);
    assert_eq!(status.queued_campaigns, 0);
    assert!(status.campaign.is_none());
}

#[tokio::test]
async fn exhausted_identity_is_paused_and_rotation_continues() {
    let transport = MockTransport::new();
    transport.fail_identity("a@example.com", "550 Daily quota exceeded for user");
    let (scheduler, journal) = build(&transport, config());

    scheduler
        .pool()
        .reload(vec![identity("a@example.com"), identity("b@example.com")]);
    scheduler.enqueue(campaign("expo", 3));
    scheduler.start().unwrap();

    wait_idle(&scheduler).await;

    // a@ took the first attempt, then was paused for the rest of the run
    let records = transport.records();
    assert_eq!(
        records,
        vec![
            ("a@example.com".to_string(), "r0@example.com".to_string()),
            ("b@example.com".to_string(), "r1@example.com".to_string()),
            ("b@example.com".to_string(), "r2@example.com".to_string()),
        ]
    );

    let paused: Vec<IdentityStatus> = scheduler
        .pool()
        .list()
        .into_iter()
        .map(|identity| identity.status)
        .collect();
    assert_eq!(paused, vec![IdentityStatus::Paused, IdentityStatus::Active]);

    let status = scheduler.status();
    let warnings: Vec<_> = status
        .notifications
        .iter()
        .filter(|n| n.severity == Severity::Warning)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("a@example.com"));

    let errors = journal
        .entries()
        .iter()
        .filter(|entry| entry.outcome == SendOutcome::Error)
        .count();
    assert_eq!(errors, 1);

    let history = scheduler.history();
    assert_eq!(history[0].sent, 2);
    assert_eq!(history[0].recipients_total, 3);
}

#[tokio::test]
async fn pool_exhaustion_emits_one_critical_and_leaves_cursor_for_resume() {
    let transport = MockTransport::new();
    transport.fail_identity("a@example.com", "535 authentication rejected");
    transport.fail_identity("b@example.com", "535 authentication rejected");
    let (scheduler, _journal) = build(&transport, config());

    scheduler
        .pool()
        .reload(vec![identity("a@example.com"), identity("b@example.com")]);
    scheduler.enqueue(campaign("expo", 3));
    scheduler.start().unwrap();

    wait_idle(&scheduler).await;

    let status = scheduler.status();
    assert_eq!(status.state, SchedulerState::Idle);
    // Campaign stays queued for a later resume
    assert_eq!(status.queued_campaigns, 1);

    let criticals = status
        .notifications
        .iter()
        .filter(|n| n.severity == Severity::Critical)
        .count();
    assert_eq!(criticals, 1);
    let warnings = status
        .notifications
        .iter()
        .filter(|n| n.severity == Severity::Warning)
        .count();
    assert_eq!(warnings, 2);

    // A fresh identity upload resumes at the last-unsent recipient: r0 was
    // consumed by its failed attempt, r1's halting attempt is re-tried.
    scheduler.pool().reload(vec![identity("c@example.com")]);
    scheduler.start().unwrap();
    wait_idle(&scheduler).await;

    let records = transport.records();
    assert_eq!(
        records,
        vec![
            ("a@example.com".to_string(), "r0@example.com".to_string()),
            ("b@example.com".to_string(), "r1@example.com".to_string()),
            ("c@example.com".to_string(), "r1@example.com".to_string()),
            ("c@example.com".to_string(), "r2@example.com".to_string()),
        ]
    );

    let history = scheduler.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].sent, 2);
    assert_eq!(history[0].recipients_total, 3);
}

#[tokio::test]
async fn abort_checkpoints_and_discards_the_rest() {
    let transport = MockTransport::gated(2);
    // The in-flight send at abort time fails transiently, so exactly two
    // recipients count as sent when the checkpoint is taken.
    transport.fail_recipient("r2@example.com", "450 mailbox busy");
    let (scheduler, _journal) = build(&transport, config());

    scheduler.pool().reload(vec![identity("a@example.com")]);
    scheduler.enqueue(campaign("expo", 5));
    scheduler.start().unwrap();

    wait_for("third send to be in flight", || transport.started() == 3).await;
    scheduler.abort_with_checkpoint().unwrap();
    transport.release(1);

    wait_idle(&scheduler).await;

    let history = scheduler.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].sent, 2);
    assert_eq!(history[0].recipients_total, 5);

    let status = scheduler.status();
    assert_eq!(status.queued_campaigns, 0);
    assert_eq!(status.state, SchedulerState::Idle);

    // A subsequent start with a fresh campaign is unaffected
    transport.release(100);
    scheduler.enqueue(campaign("summit", 2));
    scheduler.start().unwrap();
    wait_idle(&scheduler).await;

    let history = scheduler.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].campaign, "summit");
    assert_eq!(history[1].sent, 2);
}

#[tokio::test]
async fn pause_holds_position_and_resume_continues_exactly_there() {
    let transport = MockTransport::gated(2);
    let (scheduler, _journal) = build(&transport, config());

    scheduler.pool().reload(vec![identity("a@example.com")]);
    scheduler.enqueue(campaign("expo", 4));
    scheduler.start().unwrap();

    wait_for("third send to be in flight", || transport.started() == 3).await;
    scheduler.pause().unwrap();
    // The in-flight send is not interrupted; it completes and then the
    // loop parks without consuming another recipient.
    transport.release(1);

    wait_for("loop to park", || {
        let status = scheduler.status();
        status.state == SchedulerState::Paused && status.sent == 3
    })
    .await;

    transport.release(10);
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(transport.records().len(), 3);

    scheduler.resume().unwrap();
    wait_idle(&scheduler).await;

    let recipients: Vec<String> = transport
        .records()
        .into_iter()
        .map(|(_, recipient)| recipient)
        .collect();
    assert_eq!(
        recipients,
        vec![
            "r0@example.com",
            "r1@example.com",
            "r2@example.com",
            "r3@example.com"
        ]
    );

    let history = scheduler.history();
    assert_eq!(history[0].sent, 4);
    assert_eq!(history[0].recipients_total, 4);
}

#[tokio::test]
async fn hard_stop_keeps_campaign_queued_and_start_resumes_mid_campaign() {
    let transport = MockTransport::gated(2);
    let (scheduler, _journal) = build(&transport, config());

    scheduler
        .pool()
        .reload(vec![identity("a@example.com"), identity("b@example.com")]);
    scheduler.enqueue(campaign("expo", 5));
    scheduler.start().unwrap();

    wait_for("third send to be in flight", || transport.started() == 3).await;
    scheduler.stop().unwrap();
    transport.release(1);

    wait_idle(&scheduler).await;
    assert_eq!(transport.records().len(), 3);
    let status = scheduler.status();
    assert_eq!(status.queued_campaigns, 1);
    assert!(scheduler.history().is_empty());

    // Restart picks up at the exact unsent index with the carried count
    transport.release(100);
    scheduler.start().unwrap();
    wait_idle(&scheduler).await;

    let recipients: Vec<String> = transport
        .records()
        .into_iter()
        .map(|(_, recipient)| recipient)
        .collect();
    assert_eq!(
        recipients,
        vec![
            "r0@example.com",
            "r1@example.com",
            "r2@example.com",
            "r3@example.com",
            "r4@example.com"
        ]
    );

    let history = scheduler.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].sent, 5);
    assert_eq!(history[0].recipients_total, 5);
}

#[tokio::test]
async fn campaigns_drain_in_fifo_order() {
    let transport = MockTransport::new();
    let (scheduler, _journal) = build(&transport, config());

    scheduler.pool().reload(vec![identity("a@example.com")]);
    scheduler.enqueue(campaign("first", 2));
    scheduler.enqueue(campaign("second", 1));
    scheduler.start().unwrap();

    wait_idle(&scheduler).await;

    let history = scheduler.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].campaign, "first");
    assert_eq!(history[1].campaign, "second");
    assert_eq!(transport.records().len(), 3);
}

#[tokio::test]
async fn transport_timeout_is_classified_not_fatal() {
    // No permits ever: the send hangs until the timeout converts it into
    // an ordinary failed attempt.
    let transport = MockTransport::gated(0);
    let mut cfg = config();
    cfg.send_timeout_secs = 0;
    let (scheduler, journal) = build(&transport, cfg);

    scheduler.pool().reload(vec![identity("a@example.com")]);
    scheduler.enqueue(campaign("expo", 1));
    scheduler.start().unwrap();

    wait_idle(&scheduler).await;

    let entries = journal.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].outcome, SendOutcome::Error);
    assert!(entries[0].error.as_deref().unwrap().contains("timeout"));

    // Timed-out recipient was consumed as a transient failure
    let history = scheduler.history();
    assert_eq!(history[0].sent, 0);
    assert_eq!(history[0].recipients_total, 1);
    // Identity not paused: the timeout text matches no exhaustion rule
    assert!(scheduler.pool().list()[0].is_active());
}

#[tokio::test]
async fn start_is_rejected_while_running() {
    let transport = MockTransport::gated(0);
    let (scheduler, _journal) = build(&transport, config());

    scheduler.pool().reload(vec![identity("a@example.com")]);
    scheduler.enqueue(campaign("expo", 1));
    scheduler.start().unwrap();

    wait_for("first send to be in flight", || transport.started() == 1).await;
    assert_eq!(scheduler.start(), Err(SchedulerError::AlreadyRunning));

    scheduler.stop().unwrap();
    transport.release(1);
    wait_idle(&scheduler).await;
}
