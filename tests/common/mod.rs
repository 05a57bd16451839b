#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use catalog_issues::config::IssuesConfig;
use catalog_issues::host::{
    Action, DatasetControl, DatasetInfo, HostDirectory, Mailer, OrgMember, PermissionChecker, Role,
    UserDisplay,
};
use catalog_issues::migration::Migrator;
use catalog_issues::services::{
    CommentService, IssueService, ModerationService, NotificationService, ReviewGate,
    SearchService, SpamCheckJob, SpamClassifier, SpamScreener, TaskRunner,
};
use catalog_issues::AppResult;

#[derive(Default)]
pub struct FakeDirectory {
    datasets: Mutex<HashMap<String, DatasetInfo>>,
    users: Mutex<HashMap<String, UserDisplay>>,
    members: Mutex<HashMap<String, Vec<OrgMember>>>,
    children: Mutex<HashMap<String, Vec<String>>>,
}

impl FakeDirectory {
    pub fn add_dataset(&self, id: &str, title: &str, organization_id: Option<&str>) {
        self.datasets.lock().unwrap().insert(
            id.to_string(),
            DatasetInfo {
                id: id.to_string(),
                title: title.to_string(),
                organization_id: organization_id.map(|s| s.to_string()),
                contact_name: None,
                contact_email: None,
            },
        );
    }

    pub fn set_dataset_contact(&self, id: &str, name: &str, email: &str) {
        let mut datasets = self.datasets.lock().unwrap();
        let dataset = datasets.get_mut(id).expect("unknown dataset");
        dataset.contact_name = Some(name.to_string());
        dataset.contact_email = Some(email.to_string());
    }

    pub fn add_user(&self, id: &str, name: &str, email: Option<&str>) {
        self.users.lock().unwrap().insert(
            id.to_string(),
            UserDisplay {
                name: name.to_string(),
                email: email.map(|s| s.to_string()),
            },
        );
    }

    pub fn add_member(&self, org_id: &str, user_id: &str, capacity: Role, notify: bool) {
        self.members
            .lock()
            .unwrap()
            .entry(org_id.to_string())
            .or_default()
            .push(OrgMember {
                user_id: user_id.to_string(),
                capacity,
                notify,
            });
    }

    pub fn add_child_org(&self, parent: &str, child: &str) {
        self.children
            .lock()
            .unwrap()
            .entry(parent.to_string())
            .or_default()
            .push(child.to_string());
    }
}

#[async_trait]
impl HostDirectory for FakeDirectory {
    async fn dataset(&self, dataset_id: &str) -> AppResult<Option<DatasetInfo>> {
        Ok(self.datasets.lock().unwrap().get(dataset_id).cloned())
    }

    async fn user_display(&self, user_id: &str) -> AppResult<Option<UserDisplay>> {
        Ok(self.users.lock().unwrap().get(user_id).cloned())
    }

    async fn organization_members(&self, org_id: &str) -> AppResult<Vec<OrgMember>> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .get(org_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn organization_descendants(&self, org_id: &str) -> AppResult<Vec<String>> {
        let children = self.children.lock().unwrap();
        let mut out = Vec::new();
        let mut queue = vec![org_id.to_string()];
        while let Some(current) = queue.pop() {
            for child in children.get(&current).cloned().unwrap_or_default() {
                queue.push(child.clone());
                out.push(child);
            }
        }
        Ok(out)
    }

    async fn organization_datasets(&self, org_ids: &[String]) -> AppResult<Vec<String>> {
        let wanted: HashSet<&String> = org_ids.iter().collect();
        Ok(self
            .datasets
            .lock()
            .unwrap()
            .values()
            .filter(|d| {
                d.organization_id
                    .as_ref()
                    .map(|org| wanted.contains(org))
                    .unwrap_or(false)
            })
            .map(|d| d.id.clone())
            .collect())
    }
}

#[derive(Default)]
pub struct FakePerms {
    dataset_editors: Mutex<HashSet<(String, String)>>,
    org_admins: Mutex<HashSet<(String, String)>>,
}

impl FakePerms {
    pub fn grant_dataset_update(&self, user_id: &str, dataset_id: &str) {
        self.dataset_editors
            .lock()
            .unwrap()
            .insert((user_id.to_string(), dataset_id.to_string()));
    }

    pub fn grant_org_update(&self, user_id: &str, org_id: &str) {
        self.org_admins
            .lock()
            .unwrap()
            .insert((user_id.to_string(), org_id.to_string()));
    }
}

#[async_trait]
impl PermissionChecker for FakePerms {
    async fn can(&self, user_id: &str, action: Action, object_id: &str) -> bool {
        let key = (user_id.to_string(), object_id.to_string());
        match action {
            Action::UpdateDataset => self.dataset_editors.lock().unwrap().contains(&key),
            Action::UpdateOrganization => self.org_admins.lock().unwrap().contains(&key),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to_name: String,
    pub to_email: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    failing: Mutex<bool>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_addresses(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.to_email).collect()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        to_name: &str,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> anyhow::Result<()> {
        if *self.failing.lock().unwrap() {
            anyhow::bail!("smtp unavailable");
        }
        self.sent.lock().unwrap().push(SentMail {
            to_name: to_name.to_string(),
            to_email: to_email.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeDatasetControl {
    flips: Mutex<Vec<(String, bool)>>,
}

impl FakeDatasetControl {
    pub fn flips(&self) -> Vec<(String, bool)> {
        self.flips.lock().unwrap().clone()
    }

    /// Latest privacy state set for the dataset, if any flip happened.
    pub fn is_private(&self, dataset_id: &str) -> Option<bool> {
        self.flips()
            .into_iter()
            .rev()
            .find(|(id, _)| id == dataset_id)
            .map(|(_, private)| private)
    }
}

#[async_trait]
impl DatasetControl for FakeDatasetControl {
    async fn set_private(&self, dataset_id: &str, private: bool) -> AppResult<()> {
        self.flips
            .lock()
            .unwrap()
            .push((dataset_id.to_string(), private));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingRunner {
    jobs: Mutex<Vec<SpamCheckJob>>,
}

impl RecordingRunner {
    pub fn jobs(&self) -> Vec<SpamCheckJob> {
        self.jobs.lock().unwrap().clone()
    }
}

impl TaskRunner for RecordingRunner {
    fn enqueue(&self, job: SpamCheckJob) {
        self.jobs.lock().unwrap().push(job);
    }
}

pub struct StaticClassifier {
    pub verdict: Option<bool>,
}

#[async_trait]
impl SpamClassifier for StaticClassifier {
    async fn classify(&self, _text: &str, _author: &str) -> Option<bool> {
        self.verdict
    }
}

pub struct TestApp {
    pub db: DatabaseConnection,
    pub config: IssuesConfig,
    pub directory: Arc<FakeDirectory>,
    pub perms: Arc<FakePerms>,
    pub mailer: Arc<RecordingMailer>,
    pub control: Arc<FakeDatasetControl>,
    pub tasks: Arc<RecordingRunner>,
    pub issues: IssueService,
    pub comments: CommentService,
    pub moderation: Arc<ModerationService>,
    pub search: SearchService,
}

impl TestApp {
    pub fn screener(&self, verdict: Option<bool>) -> SpamScreener {
        SpamScreener::new(
            self.db.clone(),
            Arc::new(StaticClassifier { verdict }),
            self.moderation.clone(),
            self.directory.clone(),
            self.config.clone(),
        )
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(IssuesConfig::default()).await
}

pub async fn spawn_app_with(config: IssuesConfig) -> TestApp {
    // single connection so every test sees the same in-memory database
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opt)
        .await
        .expect("Failed to connect to test database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let directory = Arc::new(FakeDirectory::default());
    let perms = Arc::new(FakePerms::default());
    let mailer = Arc::new(RecordingMailer::default());
    let control = Arc::new(FakeDatasetControl::default());
    let tasks = Arc::new(RecordingRunner::default());

    let notifier = Arc::new(NotificationService::new(
        directory.clone(),
        mailer.clone(),
        config.clone(),
    ));
    let review_gate = Arc::new(ReviewGate::new(db.clone(), control.clone(), config.clone()));
    let moderation = Arc::new(ModerationService::new(
        db.clone(),
        perms.clone(),
        config.clone(),
    ));
    let issues = IssueService::new(
        db.clone(),
        directory.clone(),
        perms.clone(),
        notifier.clone(),
        review_gate.clone(),
        tasks.clone(),
    );
    let comments = CommentService::new(db.clone(), notifier.clone(), tasks.clone());
    let search = SearchService::new(db.clone(), directory.clone());

    TestApp {
        db,
        config,
        directory,
        perms,
        mailer,
        control,
        tasks,
        issues,
        comments,
        moderation,
        search,
    }
}
