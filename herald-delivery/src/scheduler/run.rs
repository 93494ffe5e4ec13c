//! The delivery loop.
//!
//! A single task owns this loop; it is the only writer of the cursor and
//! the scheduler state while running. Control flags are observed at the
//! top of every iteration and during every pacing slice, so signals take
//! effect within one poll interval without interrupting a send already in
//! flight.

use std::sync::Arc;

use herald_common::{
    notification::Severity,
    template::{render_body, render_subject},
};
use tracing::{info, warn};

use crate::{
    classifier::Disposition,
    journal::{LogEntry, SendOutcome},
    scheduler::SchedulerCore,
    transport::TransportError,
};

impl SchedulerCore {
    pub(crate) async fn run(self: Arc<Self>) {
        info!("delivery loop starting");

        'campaigns: loop {
            if self.signals.stop_requested() {
                break;
            }
            let Some(campaign) = self.queue.head() else {
                info!("campaign queue drained");
                break;
            };

            // Bind the cursor to the head campaign, reusing a checkpoint
            // left by an earlier stop or pool exhaustion.
            self.bind_cursor(&campaign.id);

            let total = campaign.total();
            let style = self.config.render_style();
            let subject = render_subject(campaign.subject_template(), &campaign.fields.event);

            loop {
                if self.signals.stop_requested() {
                    info!(campaign = %campaign.id, "hard stop, cursor left in place");
                    break 'campaigns;
                }
                if self.signals.take_abort() {
                    let sent = self.current_sent();
                    if self.queue.finish_head(&campaign.id, sent) {
                        self.clear_cursor();
                        self.push_log(format!(
                            "Aborted campaign {} after {sent}/{total} sends",
                            campaign.fields.event
                        ));
                    }
                    break 'campaigns;
                }
                if self.signals.paused() {
                    tokio::time::sleep(self.config.poll_interval()).await;
                    continue;
                }

                let index = self.cursor_index();
                if index >= total {
                    let sent = self.current_sent();
                    self.queue.finish_head(&campaign.id, sent);
                    self.clear_cursor();
                    self.push_log(format!(
                        "Completed campaign {} ({sent}/{total} sent)",
                        campaign.fields.event
                    ));
                    continue 'campaigns;
                }

                let active = self.pool.active_subset();
                if active.is_empty() {
                    self.notify(
                        Severity::Critical,
                        "All identities paused, halting delivery",
                    );
                    break 'campaigns;
                }

                // Rotation keys off the global recipient index, not an
                // index into the active subset, so assignment stays
                // stable as identities pause mid-run.
                let identity = active[index % active.len()].clone();
                let recipient = campaign.recipients[index].clone();
                let body = render_body(
                    campaign.body_template(),
                    &campaign.fields,
                    &recipient.first_name,
                    &identity.display_name,
                    &style,
                );

                let outcome = match tokio::time::timeout(
                    self.config.send_timeout(),
                    self.transport.send(&identity, &recipient, &subject, &body),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::new(format!(
                        "transport timeout after {}s",
                        self.config.send_timeout_secs
                    ))),
                };

                let delivered = match outcome {
                    Ok(()) => {
                        self.record_attempt(
                            &campaign.fields.event,
                            &identity.address,
                            &recipient.address,
                            None,
                        )
                        .await;
                        self.push_log(format!(
                            "{} sent through {}",
                            recipient.address, identity.address
                        ));
                        true
                    }
                    Err(error) => {
                        self.record_attempt(
                            &campaign.fields.event,
                            &identity.address,
                            &recipient.address,
                            Some(&error.message),
                        )
                        .await;
                        self.push_log(format!(
                            "ERROR {} via {}: {}",
                            recipient.address, identity.address, error.message
                        ));

                        match self.classifier.classify(&error.message) {
                            Disposition::Transient => false,
                            Disposition::IdentityExhausted => {
                                self.pool.mark_paused(&identity.address);
                                self.notify(
                                    Severity::Warning,
                                    format!(
                                        "Identity {} paused: {}",
                                        identity.address, error.message
                                    ),
                                );
                                if self.pool.active_subset().is_empty() {
                                    // Cursor stays on the failed recipient
                                    // so a resumed run re-attempts it.
                                    self.notify(
                                        Severity::Critical,
                                        "All identities paused, halting delivery",
                                    );
                                    break 'campaigns;
                                }
                                false
                            }
                            Disposition::Fatal => {
                                self.notify(
                                    Severity::Critical,
                                    format!("Transport unusable: {}", error.message),
                                );
                                break 'campaigns;
                            }
                        }
                    }
                };

                self.advance_cursor(delivered);

                self.pace().await;
            }
        }

        self.settle_idle();
        info!("delivery loop idle");
    }

    async fn record_attempt(
        &self,
        campaign: &str,
        identity: &str,
        recipient: &str,
        error: Option<&str>,
    ) {
        let outcome = if error.is_some() {
            SendOutcome::Error
        } else {
            SendOutcome::Sent
        };
        let entry = LogEntry::new(
            campaign,
            identity,
            recipient,
            outcome,
            error.map(str::to_string),
        );
        if let Err(journal_error) = self.journal.record(&entry).await {
            warn!(recipient, error = %journal_error, "failed to append delivery log row");
        }
    }

    /// Sleep the inter-send gap in sub-second slices, cutting the wait
    /// short as soon as any control signal is raised.
    async fn pace(&self) {
        let gap = self.config.send_gap();
        if gap.is_zero() {
            return;
        }

        let deadline = tokio::time::Instant::now() + gap;
        loop {
            if self.signals.interrupts_pacing() {
                break;
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                break;
            }
            let slice = std::cmp::min(self.config.poll_interval(), deadline - now);
            tokio::time::sleep(slice).await;
        }
    }
}
