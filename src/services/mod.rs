pub mod comment;
pub mod email;
pub mod issue;
pub mod moderation;
pub mod notification;
pub mod numbering;
pub mod review_gate;
pub mod search;
pub mod spam;

pub use comment::CommentService;
pub use email::EmailService;
pub use issue::{CommentDetail, IssueDetail, IssueService, IssueUpdate};
pub use moderation::{ModerationService, ReportOutcome};
pub use notification::{IssueEvent, NotificationService};
pub use review_gate::ReviewGate;
pub use search::{CommentFilters, CommentSummary, IssueFilters, IssueSort, IssueSummary, SearchPage, SearchService};
pub use spam::{SpamCheckJob, SpamClassifier, SpamScreener, SpawnRunner, TaskRunner};
