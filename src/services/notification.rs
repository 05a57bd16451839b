use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    config::IssuesConfig,
    error::AppResult,
    host::{DatasetInfo, HostDirectory, Mailer, OrgMember, Role},
    models::{issue, issue_comment},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueEvent {
    Created,
    Closed,
    Reopened,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Recipient {
    name: String,
    email: String,
}

/// Computes who hears about issue lifecycle events and sends the mail.
/// Everything here is best-effort: a failed delivery is logged and the next
/// recipient is tried.
pub struct NotificationService {
    directory: Arc<dyn HostDirectory>,
    mailer: Arc<dyn Mailer>,
    config: IssuesConfig,
}

impl NotificationService {
    pub fn new(
        directory: Arc<dyn HostDirectory>,
        mailer: Arc<dyn Mailer>,
        config: IssuesConfig,
    ) -> Self {
        Self {
            directory,
            mailer,
            config,
        }
    }

    pub async fn dispatch(&self, event: IssueEvent, issue: &issue::Model) -> AppResult<()> {
        if !self.enabled() {
            return Ok(());
        }
        let Some(dataset) = self.directory.dataset(&issue.dataset_id).await? else {
            return Ok(());
        };
        let recipients = self.recipients(&dataset).await?;
        if recipients.is_empty() {
            return Ok(());
        }

        let subject = issue_subject(issue, &dataset);
        let body = event_body(event, issue, &dataset);
        self.deliver(&recipients, &subject, &body).await;
        Ok(())
    }

    pub async fn comment_posted(
        &self,
        issue: &issue::Model,
        comment: &issue_comment::Model,
    ) -> AppResult<()> {
        if !self.enabled() {
            return Ok(());
        }
        let Some(dataset) = self.directory.dataset(&issue.dataset_id).await? else {
            return Ok(());
        };
        let recipients = self.recipients(&dataset).await?;
        if recipients.is_empty() {
            return Ok(());
        }

        let author = self
            .directory
            .user_display(&comment.user_id)
            .await?
            .map(|u| u.name)
            .unwrap_or_else(|| comment.user_id.clone());
        let subject = issue_subject(issue, &dataset);
        let body = format!(
            "{author} commented on issue #{number} ({title}) of dataset {dataset}:\n\n{comment}\n",
            number = issue.number,
            title = issue.title,
            dataset = dataset.title,
            comment = comment.comment,
        );
        self.deliver(&recipients, &subject, &body).await;
        Ok(())
    }

    fn enabled(&self) -> bool {
        self.config.send_email_notifications
            && (self.config.notify_admin || self.config.notify_owner)
    }

    async fn recipients(&self, dataset: &DatasetInfo) -> AppResult<Vec<Recipient>> {
        let mut recipients = Vec::new();

        if self.config.notify_owner {
            if let Some(email) = &dataset.contact_email {
                recipients.push(Recipient {
                    name: dataset
                        .contact_name
                        .clone()
                        .unwrap_or_else(|| dataset.title.clone()),
                    email: email.clone(),
                });
            }
        }

        if self.config.notify_admin {
            if let Some(org_id) = &dataset.organization_id {
                for member in self.directory.organization_members(org_id).await? {
                    if !should_notify(&member, self.config.min_role_required) {
                        continue;
                    }
                    let Some(display) = self.directory.user_display(&member.user_id).await? else {
                        continue;
                    };
                    if let Some(email) = display.email {
                        recipients.push(Recipient {
                            name: display.name,
                            email,
                        });
                    }
                }
            }
        }

        Ok(dedupe_by_email(recipients))
    }

    async fn deliver(&self, recipients: &[Recipient], subject: &str, body: &str) {
        for recipient in recipients {
            if let Err(e) = self
                .mailer
                .send(&recipient.name, &recipient.email, subject, body)
                .await
            {
                tracing::warn!(
                    recipient = %recipient.email,
                    error = ?e,
                    "failed to send issue notification"
                );
            }
        }
    }
}

fn should_notify(member: &OrgMember, min_role: Role) -> bool {
    member.notify && member.capacity >= min_role
}

/// One address hears about an event once, whatever roles it holds.
fn dedupe_by_email(recipients: Vec<Recipient>) -> Vec<Recipient> {
    let mut seen = HashSet::new();
    recipients
        .into_iter()
        .filter(|r| seen.insert(r.email.to_ascii_lowercase()))
        .collect()
}

fn issue_subject(issue: &issue::Model, dataset: &DatasetInfo) -> String {
    format!(
        "Issue #{} on dataset {}: {}",
        issue.number, dataset.title, issue.title
    )
}

fn event_body(event: IssueEvent, issue: &issue::Model, dataset: &DatasetInfo) -> String {
    let action = match event {
        IssueEvent::Created => "was opened",
        IssueEvent::Closed => "was closed",
        IssueEvent::Reopened => "was reopened",
        IssueEvent::Deleted => "was deleted",
    };
    let mut body = format!(
        "Issue #{number} ({title}) on dataset {dataset} {action}.\n",
        number = issue.number,
        title = issue.title,
        dataset = dataset.title,
    );
    if let Some(description) = &issue.description {
        body.push('\n');
        body.push_str(description);
        body.push('\n');
    }
    body
}
